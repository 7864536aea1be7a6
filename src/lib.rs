// Expose the modules
pub mod api;
pub mod config;
pub mod flow;
pub mod ledger;
pub mod live_world;
pub mod matching_engine;
pub mod orderbook;
pub mod participants;
pub mod rng;
pub mod rules;
pub mod simulator;
pub mod types;

mod output;
pub use output::{write_accounts_csv, write_top_csv, write_trades_csv};

// Re-export key types for easier usage
pub use api::Api;
pub use config::Config;
pub use flow::{FlowParams, OrderFlowGenerator};
pub use ledger::{Account, OrderMeta};
pub use live_world::{LiveWorld, OrderAck, WorldConfig, WorldStats};
pub use matching_engine::{MatchResult, MatchingEngine};
pub use orderbook::OrderBook;
pub use participants::{
    Action, MarketMaker, MarketMakerParams, MarketView, NoiseTrader, NoiseTraderConfig,
    Participant, ParticipantState,
};
pub use rules::{MarketPhase, RuleSet, RulesConfig, StpMode};
pub use simulator::{BookTop, Event, SimulationResult, Simulator};
pub use types::{
    LevelSummary, MarketStyle, Order, OrderId, OrderStatus, OrderType, OwnerId, Price, Qty,
    RejectReason, Side, TimeInForce, Trade, TradeId, Ts,
};
