//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module holds the exchange rule layer: the session phase, admission
// validation, last-trade memory, and the configuration knobs the matching
// engine consults (tick/lot grid, halt policy, self-trade prevention,
// price bands, volatility interruption, circuit breaker).
//
// | Component     | Description                                                   |
// |---------------|---------------------------------------------------------------|
// | MarketPhase   | Session phase (continuous, auctions, halt, TAL, closed)      |
// | StpMode       | Self-trade prevention policy                                  |
// | RulesConfig   | Enumerated configuration options                              |
// | RuleDecision  | Admission verdict as a value                                  |
// | RuleSet       | Phase tracking + pre_accept + last-trade memory               |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::types::{Order, OrderType, Price, Qty, RejectReason, Trade, Ts};

/// Session phase of the market. Only the matching engine transitions phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketPhase {
    /// Normal continuous double-auction trading.
    Continuous,
    /// Trading halted (circuit breaker or operator action).
    Halted,
    /// Call auction collecting orders for a single-price uncross
    /// (volatility interruption or post-halt reopening).
    Auction,
    /// Post-auction phase permitting trades only at the last trade price.
    TradingAtLast,
    /// End-of-session call auction.
    ClosingAuction,
    /// Market closed; incoming orders are discarded.
    Closed,
}

impl Default for MarketPhase {
    fn default() -> Self {
        Self::Continuous
    }
}

/// Self-trade prevention policy applied when an incoming order would match
/// a resting order of the same owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StpMode {
    /// Self-trades execute normally.
    None,
    /// The incoming (taker) order is killed.
    CancelTaker,
    /// The resting (maker) order is removed and matching continues.
    CancelMaker,
}

/// Enumerated rule options. Durations are in the engine's nanosecond unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Reject (or queue) incoming orders while the market is halted.
    pub enforce_halt: bool,
    /// If halted, queue incoming orders for the reopening auction instead
    /// of rejecting them.
    pub queue_orders_during_halt: bool,

    /// Admission grid: limit prices must be multiples of this.
    pub tick_size: Price,
    /// Admission grid: quantities must be multiples of this.
    pub lot_size: Qty,
    /// Minimum admissible quantity.
    pub min_qty: Qty,

    /// Self-trade prevention policy.
    pub stp: StpMode,

    /// Enable the symmetric price band around the reference price.
    pub enable_price_bands: bool,
    /// Switch breaching marketable orders into a timed volatility auction.
    pub enable_volatility_interruption: bool,
    /// Band half-width in basis points.
    pub band_bps: i64,
    /// Duration of a volatility auction.
    pub vol_auction_duration_ns: Ts,

    /// Enable the drop-triggered circuit breaker.
    pub enable_circuit_breaker: bool,
    /// Drop from the reference price, in basis points, that trips the breaker.
    pub cb_drop_bps: i64,
    /// Halt duration after the breaker trips.
    pub cb_halt_duration_ns: Ts,
    /// Reopening auction duration following the halt.
    pub cb_reopen_auction_duration_ns: Ts,
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            enforce_halt: true,
            queue_orders_during_halt: false,
            tick_size: 1,
            lot_size: 1,
            min_qty: 1,
            stp: StpMode::None,
            enable_price_bands: true,
            enable_volatility_interruption: true,
            band_bps: 1250,
            vol_auction_duration_ns: 5_000_000_000,
            enable_circuit_breaker: false,
            cb_drop_bps: 1000,
            cb_halt_duration_ns: 60_000_000_000,
            cb_reopen_auction_duration_ns: 30_000_000_000,
        }
    }
}

/// Admission verdict. Rejections are values, not exceptional control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleDecision {
    pub accept: bool,
    pub reason: RejectReason,
}

impl RuleDecision {
    pub const ACCEPT: RuleDecision = RuleDecision {
        accept: true,
        reason: RejectReason::None,
    };

    #[inline]
    pub fn reject(reason: RejectReason) -> Self {
        Self {
            accept: false,
            reason,
        }
    }
}

/// Rule state: current phase, last-trade memory and configuration. The
/// phase setter is public but only the matching engine drives transitions.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    cfg: RulesConfig,
    phase: MarketPhase,
    last_trade_price: Option<Price>,
}

impl RuleSet {
    pub fn new(cfg: RulesConfig) -> Self {
        Self {
            cfg,
            phase: MarketPhase::Continuous,
            last_trade_price: None,
        }
    }

    /// Validates an incoming order. Checks run in a fixed order and the
    /// first failure wins:
    ///
    /// 1. basic validity (`qty > 0`, limit `price >= 0`)
    /// 2. halt enforcement (unless orders queue to the reopening auction)
    /// 3. tick grid for limit prices
    /// 4. minimum quantity
    /// 5. lot grid
    pub fn pre_accept(&self, incoming: &Order) -> RuleDecision {
        if !incoming.is_valid() {
            return RuleDecision::reject(RejectReason::InvalidOrder);
        }

        if self.phase == MarketPhase::Halted
            && self.cfg.enforce_halt
            && !self.cfg.queue_orders_during_halt
        {
            return RuleDecision::reject(RejectReason::MarketHalted);
        }

        if incoming.order_type == OrderType::Limit
            && incoming.price % self.cfg.tick_size.max(1) != 0
        {
            return RuleDecision::reject(RejectReason::PriceNotOnTick);
        }

        if incoming.qty < self.cfg.min_qty {
            return RuleDecision::reject(RejectReason::QtyBelowMinimum);
        }

        if incoming.qty % self.cfg.lot_size.max(1) != 0 {
            return RuleDecision::reject(RejectReason::QtyNotOnLot);
        }

        RuleDecision::ACCEPT
    }

    /// Updates reference info for later rules (bands, breaker, TAL). The
    /// last trade of the slice wins.
    pub fn on_trades(&mut self, trades: &[Trade]) {
        if let Some(last) = trades.last() {
            self.last_trade_price = Some(last.price);
        }
    }

    #[inline]
    pub fn phase(&self) -> MarketPhase {
        self.phase
    }

    #[inline]
    pub fn set_phase(&mut self, phase: MarketPhase) {
        self.phase = phase;
    }

    #[inline]
    pub fn last_trade_price(&self) -> Option<Price> {
        self.last_trade_price
    }

    #[inline]
    pub fn config(&self) -> &RulesConfig {
        &self.cfg
    }

    #[inline]
    pub fn config_mut(&mut self) -> &mut RulesConfig {
        &mut self.cfg
    }
}
