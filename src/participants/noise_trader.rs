//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// A noise trader: on each step it submits, with some probability, a single
// random order — market or limit — around the current mid. It never cancels
// and tracks no inventory; it exists to supply an order flow with realistic
// texture.
//--------------------------------------------------------------------------------------------------

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{Action, MarketView, Participant, ParticipantState};
use crate::types::{MarketStyle, Order, OrderType, OwnerId, Price, Qty, Side, TimeInForce, Ts};

/// Configuration for a noise trader. Self-contained: the grid values mirror
/// the exchange rules so generated orders pass admission.
#[derive(Debug, Clone, Copy)]
pub struct NoiseTraderConfig {
    /// Probability of sending an order on each timestep.
    pub intensity_per_step: f64,
    /// Probability that the order is a market order rather than a limit.
    pub prob_market: f64,
    /// If limit: how far from mid, in ticks.
    pub max_offset_ticks: i64,
    /// Quantity distribution (uniform in [min_qty, max_qty]).
    pub min_qty: Qty,
    pub max_qty: Qty,
    /// Price grid to snap limit prices onto.
    pub tick_size: Price,
    /// Quantity grid to snap sizes onto.
    pub lot_size: Qty,
    /// Reference price when the book is empty.
    pub default_mid: Price,
}

impl Default for NoiseTraderConfig {
    fn default() -> Self {
        Self {
            intensity_per_step: 0.20,
            prob_market: 0.15,
            max_offset_ticks: 5,
            min_qty: 1,
            max_qty: 10,
            tick_size: 1,
            lot_size: 1,
            default_mid: 100,
        }
    }
}

/// A random order source quoting around the mid.
pub struct NoiseTrader {
    owner: OwnerId,
    cfg: NoiseTraderConfig,
    rng: ChaCha8Rng,
}

impl NoiseTrader {
    pub fn new(owner: OwnerId, cfg: NoiseTraderConfig) -> Self {
        Self {
            owner,
            cfg,
            rng: ChaCha8Rng::seed_from_u64(0),
        }
    }

    fn snap_to_tick(&self, px: Price) -> Price {
        let tick = self.cfg.tick_size.max(1);
        (px / tick) * tick
    }

    fn snap_to_lot(&self, qty: Qty) -> Qty {
        let lot = self.cfg.lot_size.max(1);
        let q = qty.max(self.cfg.min_qty);
        (q / lot) * lot
    }
}

impl Participant for NoiseTrader {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn step(
        &mut self,
        ts: Ts,
        view: &MarketView,
        _state: &ParticipantState,
        out: &mut Vec<Action>,
    ) {
        if self.rng.gen::<f64>() > self.cfg.intensity_per_step {
            return;
        }

        // Need a reference price; fall back to a stable default on an empty book.
        let reference = view
            .mid
            .unwrap_or(self.cfg.default_mid * self.cfg.tick_size.max(1));

        let side = if self.rng.gen_bool(0.5) {
            Side::Buy
        } else {
            Side::Sell
        };

        let mut qty = self.rng.gen_range(self.cfg.min_qty..=self.cfg.max_qty.max(self.cfg.min_qty));
        qty = self.snap_to_lot(qty);
        if qty <= 0 {
            qty = self.cfg.min_qty.max(self.cfg.lot_size);
        }

        let is_market = self.rng.gen::<f64>() < self.cfg.prob_market;

        let order = if is_market {
            Order {
                id: 0,
                ts,
                side,
                order_type: OrderType::Market,
                price: 0,
                qty,
                owner: self.owner,
                tif: TimeInForce::IOC,
                mkt_style: MarketStyle::PureMarket,
            }
        } else {
            let offset = self.rng.gen_range(1..=self.cfg.max_offset_ticks.max(1));
            let mut px = match side {
                Side::Buy => reference - offset,
                Side::Sell => reference + offset,
            };
            px = self.snap_to_tick(px);
            if px <= 0 {
                px = self.snap_to_tick(reference).max(self.cfg.tick_size.max(1));
            }
            Order {
                id: 0,
                ts,
                side,
                order_type: OrderType::Limit,
                price: px,
                qty,
                owner: self.owner,
                tif: TimeInForce::GTC,
                mkt_style: MarketStyle::PureMarket,
            }
        };

        out.push(Action::Submit(order));
    }
}
