//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Offline deterministic replay: a timestamped event log is stable-sorted by
// (ts, input index), applied through the matching engine one event at a time,
// and the top of book is recorded after every event. Cancel/modify failures
// are counted, not raised.
//
// | Component         | Description                                          |
// |-------------------|------------------------------------------------------|
// | Event             | AddLimit / AddMarket / Cancel / Modify               |
// | BookTop           | Top-of-book sample (ts, best bid/ask, mid)           |
// | SimulationResult  | Trades, top series, failure counters                 |
// | Simulator         | Replay driver over a MatchingEngine                  |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::matching_engine::MatchingEngine;
use crate::types::{
    midprice, MarketStyle, Order, OrderId, OrderType, OwnerId, Price, Qty, Side, TimeInForce, Trade,
    Ts,
};

/// A timestamped input event for offline replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    AddLimit {
        id: OrderId,
        ts: Ts,
        side: Side,
        price: Price,
        qty: Qty,
        owner: OwnerId,
    },
    AddMarket {
        id: OrderId,
        ts: Ts,
        side: Side,
        qty: Qty,
        owner: OwnerId,
    },
    Cancel {
        id: OrderId,
        ts: Ts,
    },
    Modify {
        id: OrderId,
        ts: Ts,
        new_qty: Qty,
    },
}

impl Event {
    /// Timestamp of the event, used for the stable replay ordering.
    pub fn ts(&self) -> Ts {
        match self {
            Event::AddLimit { ts, .. }
            | Event::AddMarket { ts, .. }
            | Event::Cancel { ts, .. }
            | Event::Modify { ts, .. } => *ts,
        }
    }
}

/// Top-of-book sample recorded after an event or a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookTop {
    pub ts: Ts,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub mid: Option<Price>,
}

impl BookTop {
    /// Samples the engine's book at `ts`.
    pub fn sample(ts: Ts, engine: &MatchingEngine) -> Self {
        let best_bid = engine.book().best_bid();
        let best_ask = engine.book().best_ask();
        Self {
            ts,
            best_bid,
            best_ask,
            mid: midprice(best_bid, best_ask),
        }
    }
}

/// Outcome of an offline replay.
#[derive(Debug, Clone, Default)]
pub struct SimulationResult {
    pub trades: Vec<Trade>,
    /// Top-of-book snapshot after each applied event.
    pub tops: Vec<BookTop>,
    pub cancel_failures: u32,
    pub modify_failures: u32,
}

/// Deterministic replay driver over a timestamped event log.
#[derive(Debug, Default)]
pub struct Simulator {
    engine: MatchingEngine,
}

impl Simulator {
    pub fn new(engine: MatchingEngine) -> Self {
        Self { engine }
    }

    #[inline]
    pub fn engine(&self) -> &MatchingEngine {
        &self.engine
    }

    #[inline]
    pub fn engine_mut(&mut self) -> &mut MatchingEngine {
        &mut self.engine
    }

    /// Replays the events in `(ts, input index)` order. The sort is stable,
    /// so same-timestamp events keep their input order.
    pub fn run(&mut self, events: &[Event]) -> SimulationResult {
        let mut out = SimulationResult::default();

        let mut order: Vec<usize> = (0..events.len()).collect();
        order.sort_by_key(|&i| (events[i].ts(), i));

        for i in order {
            match &events[i] {
                Event::AddLimit {
                    id,
                    ts,
                    side,
                    price,
                    qty,
                    owner,
                } => {
                    let o = Order {
                        id: *id,
                        ts: *ts,
                        side: *side,
                        order_type: OrderType::Limit,
                        price: *price,
                        qty: *qty,
                        owner: *owner,
                        tif: TimeInForce::GTC,
                        mkt_style: MarketStyle::PureMarket,
                    };
                    let res = self.engine.process(o);
                    out.trades.extend(res.trades);
                    out.tops.push(BookTop::sample(*ts, &self.engine));
                }
                Event::AddMarket {
                    id,
                    ts,
                    side,
                    qty,
                    owner,
                } => {
                    let o = Order {
                        id: *id,
                        ts: *ts,
                        side: *side,
                        order_type: OrderType::Market,
                        price: 0,
                        qty: *qty,
                        owner: *owner,
                        tif: TimeInForce::IOC,
                        mkt_style: MarketStyle::PureMarket,
                    };
                    let res = self.engine.process(o);
                    out.trades.extend(res.trades);
                    out.tops.push(BookTop::sample(*ts, &self.engine));
                }
                Event::Cancel { id, ts } => {
                    // cancel is book-level (resting orders only)
                    if !self.engine.book_mut().cancel(*id) {
                        out.cancel_failures += 1;
                    }
                    out.tops.push(BookTop::sample(*ts, &self.engine));
                }
                Event::Modify { id, ts, new_qty } => {
                    if !self.engine.book_mut().modify_qty(*id, *new_qty) {
                        out.modify_failures += 1;
                    }
                    out.tops.push(BookTop::sample(*ts, &self.engine));
                }
            }
        }

        out
    }
}
