//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the participant abstraction stepped by the live runtime:
// a read-only market view in, a list of actions out. Participants own their
// private RNG state and share nothing; the runtime steps them in insertion
// order under its single lock.
//
// | Component          | Description                                             |
// |--------------------|---------------------------------------------------------|
// | MarketView         | Read-only view handed to a participant each tick        |
// | ParticipantState   | The participant's own account figures                   |
// | Action             | Submit / Cancel / ModifyQty emitted by a step           |
// | Participant        | owner + seed + step contract                            |
//--------------------------------------------------------------------------------------------------

mod market_maker;
mod noise_trader;

pub use market_maker::{MarketMaker, MarketMakerParams};
pub use noise_trader::{NoiseTrader, NoiseTraderConfig};

use crate::types::{LevelSummary, Order, OrderId, OwnerId, Price, Qty, Ts};

/// Read-only market view supplied to each participant step.
#[derive(Debug, Clone, Default)]
pub struct MarketView {
    pub ts: Ts,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
    pub last_trade: Option<Price>,
    /// Optional depth snapshot (keep small for performance).
    pub bid_depth: Vec<LevelSummary>,
    pub ask_depth: Vec<LevelSummary>,
}

/// The participant's own account figures at the time of the step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipantState {
    pub owner: OwnerId,
    pub cash_ticks: i64,
    pub position: i64,
}

/// An action a participant wants applied to the market.
#[derive(Debug, Clone)]
pub enum Action {
    /// Submit a new order. An id of 0 asks the runtime to assign one.
    Submit(Order),
    /// Cancel a resting order by id.
    Cancel(OrderId),
    /// Reduce a resting order's quantity.
    ModifyQty { id: OrderId, new_qty: Qty },
}

/// A synthetic market participant stepped once per tick by the runtime.
///
/// Implementations must be deterministic given their seed: two participants
/// constructed and seeded identically emit identical action streams for
/// identical view/state inputs.
pub trait Participant: Send {
    /// Stable owner identifier used for ledger attribution.
    fn owner(&self) -> OwnerId;

    /// Reseeds the participant's private RNG stream.
    fn seed(&mut self, seed: u64);

    /// Appends this tick's actions to `out`.
    fn step(&mut self, ts: Ts, view: &MarketView, state: &ParticipantState, out: &mut Vec<Action>);
}
