//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// A simple two-sided market maker: every refresh interval it cancels its
// previous quotes and posts a new bid/ask pair around the reference price,
// skewed against its inventory so a long book quotes lower and a short book
// quotes higher. Quoting is fully deterministic; the seed hook is a no-op.
//--------------------------------------------------------------------------------------------------

use super::{Action, MarketView, Participant, ParticipantState};
use crate::rules::RulesConfig;
use crate::types::{MarketStyle, Order, OrderId, OrderType, OwnerId, Price, Qty, Side, TimeInForce, Ts};

/// Quoting parameters for the market maker.
#[derive(Debug, Clone, Copy)]
pub struct MarketMakerParams {
    /// Full quoted spread in ticks.
    pub spread_ticks: Price,
    /// Quantity posted on each side.
    pub quote_qty: Qty,
    /// Interval between quote refreshes.
    pub refresh_ns: Ts,
    /// Skew in ticks applied per unit of inventory.
    pub skew_per_unit: i64,
    /// Cap on the inventory skew, in ticks.
    pub max_skew_ticks: i64,
    /// Reference price used before any trade exists on an empty book.
    pub default_mid: Price,
}

impl Default for MarketMakerParams {
    fn default() -> Self {
        Self {
            spread_ticks: 2,
            quote_qty: 10,
            refresh_ns: 1_000_000,
            skew_per_unit: 1,
            max_skew_ticks: 10,
            default_mid: 100,
        }
    }
}

/// A deterministic two-sided quoting participant.
pub struct MarketMaker {
    owner: OwnerId,
    rules_cfg: RulesConfig,
    params: MarketMakerParams,
    next_refresh_ts: Ts,
    local_seq: u32,
    bid_id: OrderId,
    ask_id: OrderId,
}

impl MarketMaker {
    pub fn new(owner: OwnerId, rules_cfg: RulesConfig, params: MarketMakerParams) -> Self {
        Self {
            owner,
            rules_cfg,
            params,
            next_refresh_ts: 0,
            local_seq: 1,
            bid_id: 0,
            ask_id: 0,
        }
    }

    /// Owner in the high bits, local sequence in the low bits, so ids never
    /// collide across participants.
    fn next_id(&mut self) -> OrderId {
        let hi = (self.owner & 0xFFFF_FFFF) << 32;
        let lo = u64::from(self.local_seq);
        self.local_seq += 1;
        hi | lo
    }

    fn clamp_price(px: Price) -> Price {
        px.max(1)
    }
}

impl Participant for MarketMaker {
    fn owner(&self) -> OwnerId {
        self.owner
    }

    fn seed(&mut self, _seed: u64) {
        // quoting is deterministic; no randomness is consumed
    }

    fn step(
        &mut self,
        ts: Ts,
        view: &MarketView,
        state: &ParticipantState,
        out: &mut Vec<Action>,
    ) {
        let tick = self.rules_cfg.tick_size.max(1);
        let lot = self.rules_cfg.lot_size.max(1);
        let min_qty = self.rules_cfg.min_qty.max(1);

        if ts < self.next_refresh_ts {
            return;
        }
        self.next_refresh_ts = ts + self.params.refresh_ns;

        // retire the previous quotes, if any
        if self.bid_id != 0 {
            out.push(Action::Cancel(self.bid_id));
        }
        if self.ask_id != 0 {
            out.push(Action::Cancel(self.ask_id));
        }

        let reference = view
            .mid
            .or(view.last_trade)
            .unwrap_or(self.params.default_mid * tick);

        // inventory skew: long -> quote lower, short -> quote higher
        let mut skew = state.position * self.params.skew_per_unit;
        skew = skew.clamp(-self.params.max_skew_ticks, self.params.max_skew_ticks);

        let half = self.params.spread_ticks / 2;
        let rem = self.params.spread_ticks - half;

        let mut bid_px = Self::clamp_price(reference - half - skew);
        let mut ask_px = Self::clamp_price(reference + rem - skew);

        // snap to the tick grid, bid down and ask up
        bid_px = (bid_px / tick) * tick;
        ask_px = ((ask_px + tick - 1) / tick) * tick;
        if ask_px <= bid_px {
            ask_px = bid_px + tick;
        }

        let mut qty = self.params.quote_qty.max(min_qty);
        if qty % lot != 0 {
            qty = ((qty / lot) + 1) * lot;
        }

        let bid = Order {
            id: self.next_id(),
            ts,
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: bid_px,
            qty,
            owner: self.owner,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        };
        self.bid_id = bid.id;
        out.push(Action::Submit(bid));

        let ask = Order {
            id: self.next_id(),
            ts,
            side: Side::Sell,
            order_type: OrderType::Limit,
            price: ask_px,
            qty,
            owner: self.owner,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        };
        self.ask_id = ask.id;
        out.push(Action::Submit(ask));
    }
}
