//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading symbol.
// It maintains bid and ask orders in price-time priority (FIFO) order.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | Main order book structure managing bids and asks                          |
// | PriceLevel    | Groups orders at the same price level with a cached total                 |
// | Locator index | Maps order id -> (side, price) for direct cancel and reduce-only modify  |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|--------------------------|
// | PriceLevel    | FIFO queue of orders at one price                  | front, is_empty          |
// | OrderBook     | Main order book implementation                     | add_resting_limit        |
// |               |                                                    | cancel                   |
// |               |                                                    | modify_qty               |
// |               |                                                    | best_bid / best_ask      |
// |               |                                                    | depth                    |
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                               | Return Type              |
// |-----------------------|-------------------------------------------|--------------------------|
// | add_resting_limit     | Inserts a non-crossing resting limit      | bool                     |
// | cancel                | Removes a resting order by id             | bool                     |
// | modify_qty            | Reduce-only quantity change               | bool                     |
// | best_bid / best_ask   | Top-of-book prices                        | Option<Price>            |
// | depth                 | Top-N level summaries, best first         | Vec<LevelSummary>        |
// | is_crossed            | Sanity check on resting liquidity         | bool                     |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::types::{LevelSummary, Order, OrderId, OrderType, Price, Qty, Side};

/// Represents a price level in the order book, maintaining a FIFO queue of
/// orders at the same price point plus a cached quantity total.
#[derive(Debug, Clone, Default)]
pub struct PriceLevel {
    /// FIFO queue of resting orders at this price.
    pub orders: VecDeque<Order>,
    /// Total remaining quantity of all orders at this price level.
    pub total_qty: Qty,
}

impl PriceLevel {
    /// Returns the next order to be matched without removing it.
    #[inline]
    pub fn front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Returns true if this price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Returns the number of orders at this price level.
    #[inline]
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

/// The main order book structure that maintains bid and ask orders in
/// price-time priority. Uses BTreeMap for price level organization,
/// VecDeque for FIFO ordering within price levels, and an id locator
/// for direct cancel/modify without scanning the whole book.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Bid side orders organized by price (iterated in reverse for best-first).
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask side orders organized by price (ascending, best-first).
    asks: BTreeMap<Price, PriceLevel>,
    /// Maps order id to its (side, price) location for fast cancellation.
    locator: HashMap<OrderId, (Side, Price)>,
}

impl OrderBook {
    /// Creates a new empty order book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a *resting* limit order in price-time priority.
    ///
    /// # Returns
    /// * `true` - the order was appended to the tail of its price level
    /// * `false` - the order is invalid, not a limit, or would cross the
    ///   opposite best; the book is left unchanged
    pub fn add_resting_limit(&mut self, order: Order) -> bool {
        if !order.is_valid() {
            return false;
        }
        if order.order_type != OrderType::Limit {
            return false;
        }
        if self.would_cross(&order) {
            return false;
        }

        self.locator.insert(order.id, (order.side, order.price));

        let level = self
            .side_mut(order.side)
            .entry(order.price)
            .or_default();
        level.total_qty += order.qty;
        level.orders.push_back(order);
        true
    }

    /// Removes a resting order from the book via the locator index.
    ///
    /// # Returns
    /// * `true` - the order was found and removed
    /// * `false` - no resting order with this id exists
    ///
    /// # Notes
    /// - Maintains FIFO ordering of remaining orders
    /// - Updates the cached total at the price level
    /// - Removes empty price levels
    pub fn cancel(&mut self, id: OrderId) -> bool {
        let Some((side, price)) = self.locator.remove(&id) else {
            return false;
        };

        let levels = self.side_mut(side);
        let Some(level) = levels.get_mut(&price) else {
            debug_assert!(false, "locator points at a missing level");
            return false;
        };

        if let Some(pos) = level.orders.iter().position(|o| o.id == id) {
            if let Some(order) = level.orders.remove(pos) {
                level.total_qty -= order.qty;
                if level.orders.is_empty() {
                    levels.remove(&price);
                }
                return true;
            }
        }

        debug_assert!(false, "locator points at a missing queue entry");
        false
    }

    /// Reduce-only quantity modification. The order keeps its queue position
    /// (a reduction is not a re-priority event).
    ///
    /// # Returns
    /// * `true` - quantity was reduced to `new_qty`
    /// * `false` - `new_qty <= 0`, `new_qty` exceeds the current remaining
    ///   quantity, or the order does not rest in the book; state unchanged
    pub fn modify_qty(&mut self, id: OrderId, new_qty: Qty) -> bool {
        if new_qty <= 0 {
            return false;
        }
        let Some(&(side, price)) = self.locator.get(&id) else {
            return false;
        };

        let Some(level) = self.side_mut(side).get_mut(&price) else {
            debug_assert!(false, "locator points at a missing level");
            return false;
        };

        let Some(order) = level.orders.iter_mut().find(|o| o.id == id) else {
            debug_assert!(false, "locator points at a missing queue entry");
            return false;
        };

        if new_qty > order.qty {
            return false;
        }
        let delta = order.qty - new_qty;
        order.qty = new_qty;
        level.total_qty -= delta;
        true
    }

    /// Returns the best bid price (highest bid with orders).
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Returns the best ask price (lowest ask with orders).
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Returns true if resting liquidity crosses itself. This should stay
    /// false if orders are only admitted through `add_resting_limit`.
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bb), Some(ba)) => bb >= ba,
            _ => false,
        }
    }

    /// Returns true if the given side holds no orders.
    pub fn is_empty(&self, side: Side) -> bool {
        match side {
            Side::Buy => self.bids.is_empty(),
            Side::Sell => self.asks.is_empty(),
        }
    }

    /// Returns the number of distinct price levels on a side.
    pub fn level_count(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    /// L2 depth snapshot: top-N levels for a side in best-first order.
    pub fn depth(&self, side: Side, levels: usize) -> Vec<LevelSummary> {
        let mut out = Vec::with_capacity(levels.min(self.level_count(side)));
        if levels == 0 {
            return out;
        }

        match side {
            Side::Buy => {
                for (price, level) in self.bids.iter().rev().take(levels) {
                    out.push(LevelSummary {
                        price: *price,
                        total_qty: level.total_qty,
                        order_count: level.order_count() as u32,
                    });
                }
            }
            Side::Sell => {
                for (price, level) in self.asks.iter().take(levels) {
                    out.push(LevelSummary {
                        price: *price,
                        total_qty: level.total_qty,
                        order_count: level.order_count() as u32,
                    });
                }
            }
        }
        out
    }

    // ---------------------------------------------------------------------
    // Engine-internal accessors. The matching walk mutates the FIFO queues
    // in place; these keep the level totals and the locator coherent.
    // ---------------------------------------------------------------------

    /// Front order of the best level on a side, without removing it.
    pub(crate) fn peek_best(&self, side: Side) -> Option<&Order> {
        match side {
            Side::Buy => self.bids.iter().next_back().and_then(|(_, l)| l.front()),
            Side::Sell => self.asks.iter().next().and_then(|(_, l)| l.front()),
        }
    }

    /// Reduces the front order of the best level by `fill_qty`, popping it
    /// when exhausted and erasing the level when empty.
    pub(crate) fn fill_best(&mut self, side: Side, fill_qty: Qty) {
        let Some(best_price) = self.best_price(side) else {
            debug_assert!(false, "fill_best on an empty side");
            return;
        };
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let Some(level) = levels.get_mut(&best_price) else {
            return;
        };
        let Some(maker) = level.orders.front_mut() else {
            return;
        };
        debug_assert!(fill_qty > 0 && fill_qty <= maker.qty);

        maker.qty -= fill_qty;
        level.total_qty -= fill_qty;
        if maker.qty == 0 {
            if let Some(done) = level.orders.pop_front() {
                self.locator.remove(&done.id);
            }
            if level.orders.is_empty() {
                levels.remove(&best_price);
            }
        }
    }

    /// Removes and returns the front order of the best level on a side.
    pub(crate) fn pop_best(&mut self, side: Side) -> Option<Order> {
        let best_price = self.best_price(side)?;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        let level = levels.get_mut(&best_price)?;
        let order = level.orders.pop_front()?;
        level.total_qty -= order.qty;
        if level.orders.is_empty() {
            levels.remove(&best_price);
        }
        self.locator.remove(&order.id);
        Some(order)
    }

    /// Sums the quantity reachable by a taker on the given side, bounded by
    /// an optional limit price, stopping early once `cap` is reached.
    pub(crate) fn eligible_qty(&self, side: Side, limit: Option<Price>, cap: Qty) -> Qty {
        let mut acc: Qty = 0;
        match side {
            Side::Buy => {
                for (price, level) in self.bids.iter().rev() {
                    if let Some(lim) = limit {
                        if *price < lim {
                            break;
                        }
                    }
                    acc += level.total_qty;
                    if acc >= cap {
                        break;
                    }
                }
            }
            Side::Sell => {
                for (price, level) in self.asks.iter() {
                    if let Some(lim) = limit {
                        if *price > lim {
                            break;
                        }
                    }
                    acc += level.total_qty;
                    if acc >= cap {
                        break;
                    }
                }
            }
        }
        acc
    }

    /// Drains every resting order from both sides, best-first within a side
    /// and FIFO within a level, clearing the book and its locator index.
    pub(crate) fn drain_all(&mut self) -> Vec<Order> {
        let mut out = Vec::with_capacity(self.locator.len());
        for (_, level) in std::mem::take(&mut self.bids).into_iter().rev() {
            out.extend(level.orders);
        }
        for (_, level) in std::mem::take(&mut self.asks) {
            out.extend(level.orders);
        }
        self.locator.clear();
        out
    }

    /// Best price on a side.
    #[inline]
    pub(crate) fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    #[inline]
    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        }
    }

    fn would_cross(&self, order: &Order) -> bool {
        match order.side {
            Side::Buy => match self.best_ask() {
                Some(ba) => order.price >= ba,
                None => false,
            },
            Side::Sell => match self.best_bid() {
                Some(bb) => order.price <= bb,
                None => false,
            },
        }
    }

    /// Verifies the structural invariants: level totals match queued orders,
    /// no empty levels, locator and queues agree. Debug/test aid.
    #[cfg(any(test, debug_assertions))]
    pub fn assert_consistent(&self) {
        let mut seen = 0usize;
        for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            for (price, level) in levels {
                assert!(!level.orders.is_empty(), "empty level at {price}");
                let sum: Qty = level.orders.iter().map(|o| o.qty).sum();
                assert_eq!(sum, level.total_qty, "total_qty drift at {price}");
                for o in &level.orders {
                    assert_eq!(self.locator.get(&o.id), Some(&(side, *price)));
                    seen += 1;
                }
            }
        }
        assert_eq!(seen, self.locator.len(), "locator holds stale entries");
        assert!(!self.is_crossed(), "book is crossed");
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                              |
// |-------------------------------|----------------------------------------------------------|
// | test_empty_orderbook          | Verifies initial empty state                             |
// | test_add_and_depth            | Resting insert and level aggregation                     |
// | test_reject_crossing_insert   | Crossing inserts leave the book unchanged                |
// | test_cancel                   | Cancel via locator, empty level erasure                  |
// | test_cancel_twice             | Cancel of a resting id succeeds exactly once             |
// | test_modify_reduce_only       | Reduce succeeds, increase fails, position kept           |
// | test_fifo_priority            | FIFO within a price level                                |
// | test_drain_all                | Circuit-breaker drain empties book and locator           |
// | test_eligible_qty             | Limit-bounded liquidity summation                        |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MarketStyle, TimeInForce};

    /// Creates a resting limit order with the given parameters.
    fn limit(id: OrderId, ts: i64, side: Side, price: Price, qty: Qty) -> Order {
        Order {
            id,
            ts,
            side,
            order_type: OrderType::Limit,
            price,
            qty,
            owner: 1,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        }
    }

    /// Tests that a new orderbook is properly initialized empty.
    #[test]
    fn test_empty_orderbook() {
        let book = OrderBook::new();
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert!(book.is_empty(Side::Buy));
        assert!(book.is_empty(Side::Sell));
        assert!(book.depth(Side::Buy, 5).is_empty());
        assert!(!book.is_crossed());
    }

    /// Tests resting inserts and the aggregated depth view.
    #[test]
    fn test_add_and_depth() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 10, Side::Buy, 100, 5)));
        assert!(book.add_resting_limit(limit(2, 11, Side::Buy, 100, 7)));
        assert!(book.add_resting_limit(limit(3, 12, Side::Buy, 99, 4)));
        assert!(book.add_resting_limit(limit(4, 13, Side::Sell, 105, 2)));

        assert_eq!(book.best_bid(), Some(100));
        assert_eq!(book.best_ask(), Some(105));

        let bids = book.depth(Side::Buy, 5);
        assert_eq!(bids.len(), 2);
        assert_eq!(bids[0].price, 100);
        assert_eq!(bids[0].total_qty, 12);
        assert_eq!(bids[0].order_count, 2);
        assert_eq!(bids[1].price, 99);

        book.assert_consistent();
    }

    /// Tests that crossing or invalid inserts are refused without mutation.
    #[test]
    fn test_reject_crossing_insert() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 1, Side::Sell, 105, 5)));

        // Buy at/above the best ask would cross
        assert!(!book.add_resting_limit(limit(2, 2, Side::Buy, 105, 5)));
        assert!(!book.add_resting_limit(limit(3, 3, Side::Buy, 110, 5)));
        // Below it rests fine
        assert!(book.add_resting_limit(limit(4, 4, Side::Buy, 104, 5)));
        // Sell at/below the best bid would cross
        assert!(!book.add_resting_limit(limit(5, 5, Side::Sell, 104, 5)));

        // Non-limit and non-positive qty are refused
        let mut mkt = limit(6, 6, Side::Buy, 0, 5);
        mkt.order_type = OrderType::Market;
        assert!(!book.add_resting_limit(mkt));
        assert!(!book.add_resting_limit(limit(7, 7, Side::Buy, 90, 0)));

        book.assert_consistent();
    }

    /// Tests cancel via the locator index and empty-level erasure.
    #[test]
    fn test_cancel() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 10, Side::Buy, 100, 5)));
        assert!(book.add_resting_limit(limit(2, 11, Side::Buy, 100, 7)));

        assert_eq!(book.depth(Side::Buy, 1)[0].total_qty, 12);
        assert!(book.cancel(1));
        assert_eq!(book.depth(Side::Buy, 1)[0].total_qty, 7);

        assert!(!book.cancel(9999));

        // removing the last order erases the level
        assert!(book.cancel(2));
        assert!(book.is_empty(Side::Buy));
        book.assert_consistent();
    }

    /// Cancel of a resting id returns true exactly once.
    #[test]
    fn test_cancel_twice() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 10, Side::Sell, 110, 10)));
        assert!(book.cancel(1));
        assert!(!book.cancel(1));
    }

    /// Tests reduce-only modify semantics and queue position retention.
    #[test]
    fn test_modify_reduce_only() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 10, Side::Sell, 110, 10)));
        assert!(book.add_resting_limit(limit(2, 11, Side::Sell, 110, 4)));

        assert!(book.modify_qty(1, 6));
        assert_eq!(book.depth(Side::Sell, 1)[0].total_qty, 10);

        // increase is refused, state unchanged
        assert!(!book.modify_qty(1, 12));
        assert_eq!(book.depth(Side::Sell, 1)[0].total_qty, 10);

        // non-positive and unknown ids are refused
        assert!(!book.modify_qty(1, 0));
        assert!(!book.modify_qty(9999, 1));

        // queue position is unchanged: id 1 still matches first
        assert_eq!(book.peek_best(Side::Sell).map(|o| o.id), Some(1));
        book.assert_consistent();
    }

    /// Tests FIFO ordering of orders within price levels.
    #[test]
    fn test_fifo_priority() {
        let mut book = OrderBook::new();
        for (id, ts) in [(1u64, 10i64), (2, 11), (3, 12)] {
            assert!(book.add_resting_limit(limit(id, ts, Side::Buy, 100, 1)));
        }
        assert_eq!(book.peek_best(Side::Buy).map(|o| o.id), Some(1));
        assert_eq!(book.pop_best(Side::Buy).map(|o| o.id), Some(1));
        assert_eq!(book.peek_best(Side::Buy).map(|o| o.id), Some(2));
        book.assert_consistent();
    }

    /// Tests the circuit-breaker drain: everything out, nothing left behind.
    #[test]
    fn test_drain_all() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 1, Side::Buy, 99, 5)));
        assert!(book.add_resting_limit(limit(2, 2, Side::Buy, 100, 5)));
        assert!(book.add_resting_limit(limit(3, 3, Side::Sell, 105, 5)));

        let drained = book.drain_all();
        assert_eq!(drained.len(), 3);
        // bids best-first, then asks best-first
        assert_eq!(drained[0].id, 2);
        assert_eq!(drained[1].id, 1);
        assert_eq!(drained[2].id, 3);

        assert!(book.is_empty(Side::Buy));
        assert!(book.is_empty(Side::Sell));
        assert!(!book.cancel(1));
        book.assert_consistent();
    }

    /// Tests limit-bounded liquidity summation used by the FOK preflight.
    #[test]
    fn test_eligible_qty() {
        let mut book = OrderBook::new();
        assert!(book.add_resting_limit(limit(1, 1, Side::Sell, 100, 2)));
        assert!(book.add_resting_limit(limit(2, 2, Side::Sell, 101, 3)));
        assert!(book.add_resting_limit(limit(3, 3, Side::Sell, 102, 4)));

        // unbounded walk accumulates until the cap
        assert_eq!(book.eligible_qty(Side::Sell, None, 100), 9);
        // bounded by a buy limit of 101
        assert_eq!(book.eligible_qty(Side::Sell, Some(101), 100), 5);
        // early exit at the cap
        assert!(book.eligible_qty(Side::Sell, None, 2) >= 2);
    }
}
