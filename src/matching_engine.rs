//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements the core matching engine logic for processing orders and generating
// trades. The engine follows price-time priority and layers the session state machine on top:
// continuous trading, volatility and closing auctions, trading-at-last, and the circuit breaker
// with halted-book reopening.
//
// | Component                | Description                                                |
// |--------------------------|-----------------------------------------------------------|
// | MatchingEngine           | Main engine for processing and matching orders             |
// | MatchResult              | Represents the outcome of a processing operation           |
// | process                  | Single entry point: flush -> admission -> phase routing    |
// | flush                    | Materializes due phase transitions at a timestamp          |
// | uncross_auction          | Single-price batch match of the auction queue              |
//
//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name                    | Description                                       | Key Methods      |
// |-------------------------|---------------------------------------------------|------------------|
// | MatchingEngine          | Core matching engine                              | process          |
// |                         |                                                   | flush            |
// |                         |                                                   | start_closing_auction |
// |                         |                                                   | start_trading_at_last |
// | MatchResult             | Result of a processing operation                  | trades, resting  |
//
//--------------------------------------------------------------------------------------------------
// STATE MACHINE
//--------------------------------------------------------------------------------------------------
// | From           | Event                            | To                          |
// |----------------|----------------------------------|-----------------------------|
// | Continuous     | band-breaching marketable order  | Auction (timed)             |
// | Continuous     | circuit-breaker trigger          | Halted (book drained)       |
// | Auction        | flush at end_ts                  | Continuous (trades emitted) |
// | Halted         | flush at halt_end                | Auction (reopening)         |
// | ClosingAuction | flush at end_ts                  | Closed                      |
// | TradingAtLast  | flush at tal_end                 | Continuous                  |
//--------------------------------------------------------------------------------------------------

use tracing::{debug, info, warn};

use crate::orderbook::OrderBook;
use crate::rules::{MarketPhase, RuleSet, StpMode};
use crate::types::{
    midprice, MarketStyle, Order, OrderId, OrderStatus, OrderType, Price, Qty, RejectReason, Side,
    TimeInForce, Trade, TradeId, Ts,
};

/// Represents the outcome of a processing operation.
///
/// `trades` carries every trade materialized by the call, including trades
/// produced by the leading `flush` (an expired auction uncrossing, for
/// example), even when the incoming order itself is rejected. `filled_qty`
/// and `resting` refer to the incoming order only.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Trades generated by this call (flush-produced first, then the
    /// incoming order's fills).
    pub trades: Vec<Trade>,
    /// The remainder of the incoming order if it came to rest in the book.
    pub resting: Option<Order>,
    /// Quantity of the incoming order filled by this call.
    pub filled_qty: Qty,
    /// Admission outcome of the incoming order.
    pub status: OrderStatus,
    /// Rejection (or self-trade kill) reason; `None` when clean.
    pub reject_reason: RejectReason,
}

/// The core matching engine: a state machine over the order book, the rule
/// set, the auction queue and the circuit-breaker memory. Phase transitions
/// are total functions of time and state; they never fail.
#[derive(Debug)]
pub struct MatchingEngine {
    /// The order book for the symbol this engine is managing.
    book: OrderBook,
    /// Rule layer: phase, admission, last-trade memory, configuration.
    rules: RuleSet,
    /// Monotonic trade id counter, starting at 1.
    next_trade_id: TradeId,
    /// Orders collected while an auction (or a queue-during-halt) is open.
    auction_queue: Vec<Order>,
    /// End timestamp of the currently open auction.
    auction_end_ts: Ts,
    /// End timestamp of the trading-at-last window.
    tal_end_ts: Ts,
    /// Circuit-breaker reference price, set on the first-ever observed trade.
    cb_ref_price: Option<Price>,
    /// End timestamp of a circuit-breaker halt.
    halt_end_ts: Ts,
    /// End timestamp of the reopening auction that follows the halt.
    reopen_auction_end_ts: Ts,
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingEngine {
    /// Creates an engine with default rules.
    pub fn new() -> Self {
        Self::with_rules(RuleSet::default())
    }

    /// Creates an engine with the given rule set.
    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            book: OrderBook::new(),
            rules,
            next_trade_id: 1,
            auction_queue: Vec::new(),
            auction_end_ts: 0,
            tal_end_ts: 0,
            cb_ref_price: None,
            halt_end_ts: 0,
            reopen_auction_end_ts: 0,
        }
    }

    #[inline]
    pub fn book(&self) -> &OrderBook {
        &self.book
    }

    #[inline]
    pub fn book_mut(&mut self) -> &mut OrderBook {
        &mut self.book
    }

    #[inline]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    #[inline]
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.rules
    }

    /// Switches the session into the end-of-day closing auction.
    pub fn start_closing_auction(&mut self, end_ts: Ts) {
        info!(end_ts, "entering closing auction");
        self.rules.set_phase(MarketPhase::ClosingAuction);
        self.auction_end_ts = end_ts;
    }

    /// Switches the session into trading-at-last until `end_ts`.
    pub fn start_trading_at_last(&mut self, end_ts: Ts) {
        info!(end_ts, "entering trading-at-last");
        self.rules.set_phase(MarketPhase::TradingAtLast);
        self.tal_end_ts = end_ts;
    }

    /// Materializes any phase transition that is due at `ts` and returns the
    /// trades it produced. Transitions cascade within one call: a halt whose
    /// reopening auction has also expired uncrosses immediately.
    pub fn flush(&mut self, ts: Ts) -> Vec<Trade> {
        if self.rules.phase() == MarketPhase::TradingAtLast && ts >= self.tal_end_ts {
            info!(ts, "trading-at-last expired, resuming continuous");
            self.rules.set_phase(MarketPhase::Continuous);
        }

        if self.rules.phase() == MarketPhase::Halted && ts >= self.halt_end_ts {
            info!(ts, "halt expired, entering reopening auction");
            self.rules.set_phase(MarketPhase::Auction);
            // auction_end_ts was preset to reopen_auction_end_ts at trigger
        }

        let phase = self.rules.phase();
        if (phase == MarketPhase::Auction || phase == MarketPhase::ClosingAuction)
            && ts >= self.auction_end_ts
        {
            let closing = phase == MarketPhase::ClosingAuction;
            let trades = self.uncross_auction(self.auction_end_ts);
            self.rules.on_trades(&trades);
            let next = if closing {
                MarketPhase::Closed
            } else {
                MarketPhase::Continuous
            };
            info!(ts, trades = trades.len(), ?next, "auction uncrossed");
            self.rules.set_phase(next);
            return trades;
        }

        Vec::new()
    }

    /// Processes a new order through the engine. Single entry point.
    ///
    /// Step order: flush due transitions, admission, phase routing, volatility
    /// check, FOK preflight, execution walk, remainder handling, last-trade
    /// update, circuit breaker.
    pub fn process(&mut self, mut incoming: Order) -> MatchResult {
        let mut out = MatchResult {
            trades: self.flush(incoming.ts),
            ..MatchResult::default()
        };

        let decision = self.rules.pre_accept(&incoming);
        if !decision.accept {
            out.status = OrderStatus::Rejected;
            out.reject_reason = decision.reason;
            return out;
        }

        match self.rules.phase() {
            MarketPhase::Closed => {
                debug!(order_id = incoming.id, "market closed, order discarded");
                out
            }
            MarketPhase::Halted => {
                // pre_accept only lets orders through a halt when queueing
                // to the reopening auction is configured
                self.auction_queue.push(incoming);
                out
            }
            MarketPhase::Auction | MarketPhase::ClosingAuction => {
                self.auction_queue.push(incoming);
                out
            }
            MarketPhase::TradingAtLast => self.process_at_last(incoming, out),
            MarketPhase::Continuous => {
                if self.should_trigger_volatility_auction(&incoming) {
                    let end_ts = incoming.ts + self.rules.config().vol_auction_duration_ns;
                    warn!(
                        order_id = incoming.id,
                        end_ts, "price band breached, entering volatility auction"
                    );
                    self.rules.set_phase(MarketPhase::Auction);
                    self.auction_end_ts = end_ts;
                    self.auction_queue.push(incoming);
                    return out;
                }

                if incoming.tif == TimeInForce::FOK && !self.fok_fillable(&incoming) {
                    // accepted-but-killed: zero trades, book bitwise unchanged
                    return out;
                }

                let mut fills = Vec::new();
                let stp_killed = self.execute(&mut fills, &mut incoming);
                if stp_killed {
                    out.reject_reason = RejectReason::SelfTradePrevented;
                }
                out.filled_qty = fills.iter().map(|t| t.qty).sum();

                self.settle_remainder(&mut out, incoming, &fills);

                self.rules.on_trades(&fills);
                self.maybe_trigger_circuit_breaker(&fills);

                out.trades.extend(fills);
                out
            }
        }
    }

    /// Trading-at-last: only the last trade price is admissible. The order is
    /// coerced to a limit at that price and executed without volatility or
    /// circuit-breaker safeguards.
    fn process_at_last(&mut self, mut incoming: Order, mut out: MatchResult) -> MatchResult {
        let Some(last) = self.rules.last_trade_price() else {
            out.status = OrderStatus::Rejected;
            out.reject_reason = RejectReason::NoReferencePrice;
            return out;
        };
        if incoming.order_type == OrderType::Limit && incoming.price != last {
            out.status = OrderStatus::Rejected;
            out.reject_reason = RejectReason::PriceNotAtLast;
            return out;
        }

        incoming.order_type = OrderType::Limit;
        incoming.price = last;

        if incoming.tif == TimeInForce::FOK && !self.fok_fillable(&incoming) {
            return out;
        }

        let mut fills = Vec::new();
        let stp_killed = self.execute(&mut fills, &mut incoming);
        if stp_killed {
            out.reject_reason = RejectReason::SelfTradePrevented;
        }
        out.filled_qty = fills.iter().map(|t| t.qty).sum();

        self.settle_remainder(&mut out, incoming, &fills);
        self.rules.on_trades(&fills);

        out.trades.extend(fills);
        out
    }

    /// Applies the remainder policy after the execution walk.
    fn settle_remainder(&mut self, out: &mut MatchResult, incoming: Order, fills: &[Trade]) {
        if incoming.qty <= 0 {
            return;
        }
        match incoming.order_type {
            OrderType::Limit => match incoming.tif {
                TimeInForce::GTC => {
                    // remainder rests only if it no longer crosses
                    if self.book.add_resting_limit(incoming) {
                        out.resting = Some(incoming);
                    }
                }
                TimeInForce::IOC | TimeInForce::FOK => {}
            },
            OrderType::Market => {
                if incoming.mkt_style == MarketStyle::MarketToLimit && !fills.is_empty() {
                    let mut rest = incoming;
                    rest.order_type = OrderType::Limit;
                    rest.price = fills[fills.len() - 1].price;
                    rest.tif = TimeInForce::GTC;
                    if self.book.add_resting_limit(rest) {
                        out.resting = Some(rest);
                    }
                }
            }
        }
    }

    /// Matches the taker against the opposite side, best price first, FIFO
    /// within a level. Returns true if self-trade prevention killed the taker.
    fn execute(&mut self, fills: &mut Vec<Trade>, taker: &mut Order) -> bool {
        let opp = taker.side.opposite();
        let stp = self.rules.config().stp;

        while taker.qty > 0 {
            let Some(maker) = self.book.peek_best(opp).copied() else {
                break;
            };

            if taker.order_type == OrderType::Limit {
                let crosses = match taker.side {
                    Side::Buy => maker.price <= taker.price,
                    Side::Sell => maker.price >= taker.price,
                };
                if !crosses {
                    break;
                }
            }

            if maker.owner == taker.owner {
                match stp {
                    StpMode::CancelTaker => {
                        debug!(taker_id = taker.id, "self-trade prevented, taker killed");
                        taker.qty = 0;
                        return true;
                    }
                    StpMode::CancelMaker => {
                        debug!(maker_id = maker.id, "self-trade prevented, maker removed");
                        self.book.pop_best(opp);
                        continue;
                    }
                    StpMode::None => {}
                }
            }

            let q = taker.qty.min(maker.qty);
            fills.push(self.make_trade(taker.ts, maker.price, q, maker.id, taker.id));
            taker.qty -= q;
            self.book.fill_best(opp, q);
        }
        false
    }

    /// FOK preflight: is the eligible opposite-side depth at least the full
    /// order quantity?
    fn fok_fillable(&self, incoming: &Order) -> bool {
        let limit = (incoming.order_type == OrderType::Limit).then_some(incoming.price);
        let available = self
            .book
            .eligible_qty(incoming.side.opposite(), limit, incoming.qty);
        available >= incoming.qty
    }

    // ---------------------------------------------------------------------
    // Price bands / volatility interruption
    // ---------------------------------------------------------------------

    /// Reference price for band checks: last trade if known, else midprice.
    fn reference_price(&self) -> Option<Price> {
        self.rules
            .last_trade_price()
            .or_else(|| midprice(self.book.best_bid(), self.book.best_ask()))
    }

    /// Price of the first fill this order would take: top of the opposite
    /// book, or `None` when a limit order would not cross it.
    fn first_execution_price(&self, incoming: &Order) -> Option<Price> {
        let opp_best = self.book.best_price(incoming.side.opposite())?;
        if incoming.order_type == OrderType::Limit {
            let crosses = match incoming.side {
                Side::Buy => incoming.price >= opp_best,
                Side::Sell => incoming.price <= opp_best,
            };
            if !crosses {
                return None;
            }
        }
        Some(opp_best)
    }

    fn breaches_price_band(&self, exec_px: Price, ref_px: Price) -> bool {
        let band = self.rules.config().band_bps;
        let lo = ref_px * (10_000 - band) / 10_000;
        let hi = ref_px * (10_000 + band) / 10_000;
        exec_px < lo || exec_px > hi
    }

    fn should_trigger_volatility_auction(&self, incoming: &Order) -> bool {
        let cfg = self.rules.config();
        if !cfg.enable_price_bands || !cfg.enable_volatility_interruption {
            return false;
        }
        let Some(exec_px) = self.first_execution_price(incoming) else {
            return false;
        };
        let Some(ref_px) = self.reference_price() else {
            return false;
        };
        self.breaches_price_band(exec_px, ref_px)
    }

    // ---------------------------------------------------------------------
    // Call auction uncross
    // ---------------------------------------------------------------------

    /// Single-price batch match of the auction queue at `uncross_ts`.
    ///
    /// Picks the candidate price maximizing executable volume (tie-break:
    /// closest to the reference price when known, else the lowest candidate),
    /// matches eligible orders head-to-head in `(ts, id)` order, rests all
    /// residual and ineligible limits, and drops market residuals. The queue
    /// is empty afterwards.
    fn uncross_auction(&mut self, uncross_ts: Ts) -> Vec<Trade> {
        let mut queue = std::mem::take(&mut self.auction_queue);
        queue.sort_by_key(|o| (o.ts, o.id));

        let Some(clearing_px) = self.compute_clearing_price(&queue) else {
            // No clearing price: rest all queued limits, drop markets.
            for o in queue {
                if o.order_type == OrderType::Limit {
                    let _ = self.book.add_resting_limit(o);
                }
            }
            return Vec::new();
        };

        let mut buys: Vec<Order> = Vec::new();
        let mut sells: Vec<Order> = Vec::new();
        let mut leftovers: Vec<Order> = Vec::new();

        for o in queue {
            let eligible = match (o.side, o.order_type) {
                (_, OrderType::Market) => true,
                (Side::Buy, OrderType::Limit) => o.price >= clearing_px,
                (Side::Sell, OrderType::Limit) => o.price <= clearing_px,
            };
            if eligible {
                match o.side {
                    Side::Buy => buys.push(o),
                    Side::Sell => sells.push(o),
                }
            } else {
                leftovers.push(o);
            }
        }

        // Head-to-head match at the single clearing price. By convention the
        // sell leg is recorded as maker and the buy leg as taker.
        let mut trades = Vec::new();
        let (mut bi, mut si) = (0usize, 0usize);
        while bi < buys.len() && si < sells.len() {
            let q = buys[bi].qty.min(sells[si].qty);
            trades.push(self.make_trade(uncross_ts, clearing_px, q, sells[si].id, buys[bi].id));
            buys[bi].qty -= q;
            sells[si].qty -= q;
            if buys[bi].qty == 0 {
                bi += 1;
            }
            if sells[si].qty == 0 {
                si += 1;
            }
        }

        // Residual eligible orders re-enter the book alongside the
        // ineligible ones; market residuals are dropped.
        leftovers.extend(buys.drain(bi..));
        leftovers.extend(sells.drain(si..));
        leftovers.sort_by_key(|o| (o.ts, o.id));
        for o in leftovers {
            if o.order_type == OrderType::Limit && o.qty > 0 {
                let _ = self.book.add_resting_limit(o);
            }
        }

        trades
    }

    /// Clearing price candidates are the limit prices present in the queue;
    /// the winner maximizes executable volume.
    fn compute_clearing_price(&self, queue: &[Order]) -> Option<Price> {
        let mut candidates: Vec<Price> = queue
            .iter()
            .filter(|o| o.order_type == OrderType::Limit)
            .map(|o| o.price)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();
        if candidates.is_empty() {
            return None;
        }

        let reference = self.reference_price();
        let mut best: Option<(Price, Qty)> = None;
        for px in candidates {
            let vol = Self::executable_volume_at(queue, px);
            if vol <= 0 {
                continue;
            }
            best = match best {
                None => Some((px, vol)),
                Some((best_px, best_vol)) => {
                    if vol > best_vol {
                        Some((px, vol))
                    } else if vol == best_vol {
                        // tie-break toward the reference price; candidates
                        // arrive ascending, so ties keep the lower price
                        match reference {
                            Some(r) if (px - r).abs() < (best_px - r).abs() => Some((px, vol)),
                            _ => Some((best_px, best_vol)),
                        }
                    } else {
                        Some((best_px, best_vol))
                    }
                }
            };
        }
        best.map(|(px, _)| px)
    }

    /// min(eligible buy qty, eligible sell qty) at a candidate price. Market
    /// orders are always eligible.
    fn executable_volume_at(queue: &[Order], px: Price) -> Qty {
        let mut buy_qty: Qty = 0;
        let mut sell_qty: Qty = 0;
        for o in queue {
            match (o.side, o.order_type) {
                (Side::Buy, OrderType::Market) => buy_qty += o.qty,
                (Side::Sell, OrderType::Market) => sell_qty += o.qty,
                (Side::Buy, OrderType::Limit) if o.price >= px => buy_qty += o.qty,
                (Side::Sell, OrderType::Limit) if o.price <= px => sell_qty += o.qty,
                _ => {}
            }
        }
        buy_qty.min(sell_qty)
    }

    // ---------------------------------------------------------------------
    // Circuit breaker
    // ---------------------------------------------------------------------

    /// Evaluated after continuous-phase trades. The reference price is set on
    /// the first-ever observed trade and is never reset. A trade at or below
    /// `ref * (10000 - cb_drop_bps) / 10000` halts the market, drains every
    /// resting order into the auction queue and schedules the reopening
    /// auction behind the halt.
    fn maybe_trigger_circuit_breaker(&mut self, trades: &[Trade]) {
        let cfg = *self.rules.config();
        if !cfg.enable_circuit_breaker {
            return;
        }
        if self.rules.phase() != MarketPhase::Continuous {
            return;
        }
        let Some(last) = trades.last() else {
            return;
        };
        if self.cb_ref_price.is_none() {
            self.cb_ref_price = Some(trades[0].price);
        }
        let ref_px = self.cb_ref_price.unwrap_or(last.price);

        let threshold = ref_px * (10_000 - cfg.cb_drop_bps) / 10_000;
        if last.price > threshold {
            return;
        }

        self.halt_end_ts = last.ts + cfg.cb_halt_duration_ns;
        self.reopen_auction_end_ts = self.halt_end_ts + cfg.cb_reopen_auction_duration_ns;
        self.auction_end_ts = self.reopen_auction_end_ts;
        warn!(
            price = last.price,
            ref_px,
            halt_end = self.halt_end_ts,
            "circuit breaker tripped, halting market"
        );

        self.rules.set_phase(MarketPhase::Halted);
        let drained = self.book.drain_all();
        self.auction_queue.extend(drained);
    }

    fn make_trade(
        &mut self,
        ts: Ts,
        price: Price,
        qty: Qty,
        maker: OrderId,
        taker: OrderId,
    ) -> Trade {
        let trade = Trade {
            id: self.next_trade_id,
            ts,
            price,
            qty,
            maker_order_id: maker,
            taker_order_id: taker,
        };
        self.next_trade_id += 1;
        trade
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                  | Description                                          |
// |---------------------------------------|------------------------------------------------------|
// | test_basic_cross                      | Market buy lifts a resting ask at maker price        |
// | test_limit_walk_price_time_priority   | FIFO makers at equal price, bounded by limit         |
// | test_reject_invalid_order             | Zero qty rejected with InvalidOrder                  |
// | test_halt_queues_when_configured      | Halt queues to reopening auction when enabled        |
// | test_halt_rejects_without_queueing    | Halt rejects when queueing is disabled               |
// | test_limit_ioc_drops_remainder        | IOC residue never rests                              |
// | test_fok_unfillable_leaves_book       | FOK kill leaves the book bitwise unchanged           |
// | test_fok_fillable_executes_fully      | FOK executes atomically when depth suffices          |
// | test_market_to_limit_rests_remainder  | MTL residue rests at last execution price            |
// | test_pure_market_drops_remainder      | Pure market residue is dropped                       |
// | test_stp_cancel_taker                 | CancelTaker kills incoming, maker stays              |
// | test_stp_cancel_maker                 | CancelMaker removes maker, no trade emitted          |
// | test_volatility_auction_and_uncross   | Band breach queues, uncross clears at single price   |
// | test_uncross_no_clearing_price        | One-sided auction rests limits, drops markets        |
// | test_trading_at_last                  | TAL admits only the last price, expires to continuous|
// | test_trading_at_last_without_reference| TAL without a last trade rejects NoReferencePrice    |
// | test_circuit_breaker_halts_and_reopens| Drop trips halt, drained book reopens via auction    |
// | test_closed_discards_silently         | Closed phase accepts and discards                    |
// | test_closing_auction_uncross          | Closing uncross prints queued interest, stays closed |
// | test_trade_ids_strictly_increase      | Monotonic trade ids across phases                    |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RulesConfig;

    fn limit(id: u64, ts: Ts, side: Side, price: Price, qty: Qty, owner: u64) -> Order {
        Order {
            id,
            ts,
            side,
            order_type: OrderType::Limit,
            price,
            qty,
            owner,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        }
    }

    fn market(id: u64, ts: Ts, side: Side, qty: Qty, owner: u64) -> Order {
        Order {
            id,
            ts,
            side,
            order_type: OrderType::Market,
            price: 0,
            qty,
            owner,
            tif: TimeInForce::IOC,
            mkt_style: MarketStyle::PureMarket,
        }
    }

    /// Sell 105x5 rests, market buy 3 lifts it at the maker price.
    #[test]
    fn test_basic_cross() {
        let mut eng = MatchingEngine::new();
        let r = eng.process(limit(1, 1, Side::Sell, 105, 5, 1));
        assert_eq!(r.status, OrderStatus::Accepted);
        assert!(r.trades.is_empty());
        assert!(r.resting.is_some());

        let r = eng.process(market(2, 2, Side::Buy, 3, 9));
        assert_eq!(r.trades.len(), 1);
        let t = &r.trades[0];
        assert_eq!(t.price, 105);
        assert_eq!(t.qty, 3);
        assert_eq!(t.maker_order_id, 1);
        assert_eq!(t.taker_order_id, 2);
        assert_eq!(r.filled_qty, 3);

        // resting id=1 keeps its remainder of 2
        let asks = eng.book().depth(Side::Sell, 1);
        assert_eq!(asks[0].total_qty, 2);
        eng.book().assert_consistent();
    }

    /// Two makers at one price fill in FIFO order; the walk stops at the
    /// taker's limit.
    #[test]
    fn test_limit_walk_price_time_priority() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 5, 1));
        eng.process(limit(2, 2, Side::Sell, 100, 4, 2));
        eng.process(limit(3, 3, Side::Sell, 101, 4, 3));

        let r = eng.process(limit(10, 4, Side::Buy, 100, 12, 9));
        assert_eq!(r.trades.len(), 2);
        assert_eq!(r.trades[0].maker_order_id, 1);
        assert_eq!(r.trades[0].qty, 5);
        assert_eq!(r.trades[1].maker_order_id, 2);
        assert_eq!(r.trades[1].qty, 4);
        assert_eq!(r.filled_qty, 9);

        // 101 is beyond the limit; remainder would cross nothing and rests
        assert_eq!(r.resting.map(|o| o.qty), Some(3));
        assert_eq!(eng.book().best_bid(), Some(100));
        assert_eq!(eng.book().best_ask(), Some(101));
        eng.book().assert_consistent();
    }

    #[test]
    fn test_reject_invalid_order() {
        let mut eng = MatchingEngine::new();
        let r = eng.process(limit(1, 1, Side::Buy, 100, 0, 1));
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(r.reject_reason, RejectReason::InvalidOrder);
        assert!(r.trades.is_empty());
    }

    /// Halt queues orders to the reopening auction when configured.
    #[test]
    fn test_halt_queues_when_configured() {
        let mut cfg = RulesConfig::default();
        cfg.enforce_halt = true;
        cfg.queue_orders_during_halt = true;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));
        eng.rules_mut().set_phase(MarketPhase::Halted);
        eng.halt_end_ts = 1_000;
        eng.auction_end_ts = 2_000;
        eng.reopen_auction_end_ts = 2_000;

        let r = eng.process(limit(1, 1, Side::Buy, 100, 10, 1));
        assert_eq!(r.status, OrderStatus::Accepted);
        assert_eq!(r.reject_reason, RejectReason::None);
        assert!(r.trades.is_empty());
        assert_eq!(eng.auction_queue.len(), 1);
    }

    #[test]
    fn test_halt_rejects_without_queueing() {
        let mut cfg = RulesConfig::default();
        cfg.enforce_halt = true;
        cfg.queue_orders_during_halt = false;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));
        eng.rules_mut().set_phase(MarketPhase::Halted);
        eng.halt_end_ts = Ts::MAX;

        let r = eng.process(limit(1, 1, Side::Buy, 100, 10, 1));
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(r.reject_reason, RejectReason::MarketHalted);
    }

    #[test]
    fn test_limit_ioc_drops_remainder() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 2, 1));

        let mut o = limit(2, 2, Side::Buy, 100, 5, 9);
        o.tif = TimeInForce::IOC;
        let r = eng.process(o);
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.filled_qty, 2);
        assert!(r.resting.is_none());
        assert_eq!(eng.book().best_bid(), None);
    }

    /// FOK with insufficient depth: accepted, zero trades, book unchanged.
    #[test]
    fn test_fok_unfillable_leaves_book() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 2, 1));

        let mut o = limit(2, 2, Side::Buy, 100, 5, 9);
        o.tif = TimeInForce::FOK;
        let r = eng.process(o);
        assert_eq!(r.status, OrderStatus::Accepted);
        assert!(r.trades.is_empty());
        assert!(r.resting.is_none());

        let asks = eng.book().depth(Side::Sell, 5);
        assert_eq!(asks.len(), 1);
        assert_eq!(asks[0].total_qty, 2);
        assert_eq!(asks[0].order_count, 1);
        eng.book().assert_consistent();
    }

    #[test]
    fn test_fok_fillable_executes_fully() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 3, 1));
        eng.process(limit(2, 2, Side::Sell, 101, 4, 2));

        let mut o = limit(3, 3, Side::Buy, 101, 6, 9);
        o.tif = TimeInForce::FOK;
        let r = eng.process(o);
        assert_eq!(r.filled_qty, 6);
        assert_eq!(r.trades.len(), 2);
        assert!(r.resting.is_none());
        eng.book().assert_consistent();
    }

    /// Market-to-limit rests its remainder at the last execution price.
    #[test]
    fn test_market_to_limit_rests_remainder() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 3, 1));

        let mut o = market(2, 2, Side::Buy, 10, 9);
        o.mkt_style = MarketStyle::MarketToLimit;
        let r = eng.process(o);
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.filled_qty, 3);
        let rest = r.resting.expect("remainder should rest");
        assert_eq!(rest.order_type, OrderType::Limit);
        assert_eq!(rest.price, 100);
        assert_eq!(rest.qty, 7);
        assert_eq!(eng.book().best_bid(), Some(100));
    }

    #[test]
    fn test_pure_market_drops_remainder() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 3, 1));

        let r = eng.process(market(2, 2, Side::Buy, 10, 9));
        assert_eq!(r.filled_qty, 3);
        assert!(r.resting.is_none());
        assert_eq!(eng.book().best_bid(), None);
        assert_eq!(eng.book().best_ask(), None);
    }

    /// CancelTaker: incoming dies at the first same-owner maker, which stays.
    #[test]
    fn test_stp_cancel_taker() {
        let mut cfg = RulesConfig::default();
        cfg.stp = StpMode::CancelTaker;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));
        eng.process(limit(1, 1, Side::Sell, 100, 10, 7));

        let r = eng.process(limit(2, 2, Side::Buy, 100, 5, 7));
        assert!(r.trades.is_empty());
        assert_eq!(r.reject_reason, RejectReason::SelfTradePrevented);
        assert!(r.resting.is_none());

        // the maker is untouched
        assert_eq!(eng.book().depth(Side::Sell, 1)[0].total_qty, 10);
        eng.book().assert_consistent();
    }

    /// CancelMaker: the resting order is removed without a trade and the
    /// incoming order continues against the next liquidity.
    #[test]
    fn test_stp_cancel_maker() {
        let mut cfg = RulesConfig::default();
        cfg.stp = StpMode::CancelMaker;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));
        eng.process(limit(1, 1, Side::Sell, 100, 10, 7));
        eng.process(limit(2, 2, Side::Sell, 100, 4, 3));

        let r = eng.process(limit(3, 3, Side::Buy, 100, 5, 7));
        // owner 7's maker vanished, the trade printed against owner 3
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].maker_order_id, 2);
        assert_eq!(r.trades[0].qty, 4);
        assert!(!eng.book_mut().cancel(1), "maker should be gone");

        // leftover buy qty 1 rested after the asks emptied
        assert_eq!(eng.book().best_bid(), Some(100));
        eng.book().assert_consistent();
    }

    /// Band breach parks the market in a timed auction; the uncross clears
    /// everything at one price and reopens continuous trading.
    #[test]
    fn test_volatility_auction_and_uncross() {
        let mut cfg = RulesConfig::default();
        cfg.band_bps = 100; // 1%
        cfg.vol_auction_duration_ns = 5;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));

        // Seed the reference trade at 10000
        assert!(eng.book_mut().add_resting_limit(limit(1, 1, Side::Sell, 10_000, 1, 2)));
        let r = eng.process(market(2, 2, Side::Buy, 1, 3));
        assert_eq!(r.trades.len(), 1);
        assert_eq!(eng.rules().last_trade_price(), Some(10_000));

        // Far ask, then a market buy that would execute 20% away
        assert!(eng.book_mut().add_resting_limit(limit(3, 3, Side::Sell, 12_000, 10, 9)));
        let r = eng.process(market(10, 10, Side::Buy, 5, 7));
        assert!(r.trades.is_empty());
        assert_eq!(eng.rules().phase(), MarketPhase::Auction);

        // Two-sided interest collected during the auction
        eng.process(limit(11, 11, Side::Buy, 11_800, 5, 1));
        eng.process(limit(12, 12, Side::Buy, 11_900, 5, 1));
        eng.process(limit(13, 13, Side::Sell, 11_800, 6, 2));
        eng.process(limit(14, 14, Side::Sell, 11_900, 2, 2));
        assert_eq!(eng.rules().phase(), MarketPhase::Auction);

        // A benign order past the end triggers the uncross first
        let r = eng.process(limit(15, 20, Side::Buy, 1, 1, 8));
        assert_eq!(eng.rules().phase(), MarketPhase::Continuous);
        assert!(!r.trades.is_empty());

        // all auction trades share one clearing price and the uncross ts
        let px0 = r.trades[0].price;
        for t in &r.trades {
            assert_eq!(t.price, px0);
            assert_eq!(t.ts, 15);
        }
        assert_eq!(eng.rules().last_trade_price(), Some(px0));
        eng.book().assert_consistent();
    }

    /// A one-sided auction has no clearing price: limits rest, markets drop.
    #[test]
    fn test_uncross_no_clearing_price() {
        let mut cfg = RulesConfig::default();
        cfg.band_bps = 100;
        cfg.vol_auction_duration_ns = 5;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));

        assert!(eng.book_mut().add_resting_limit(limit(1, 1, Side::Sell, 10_000, 1, 2)));
        eng.process(market(2, 2, Side::Buy, 1, 3));
        assert!(eng.book_mut().add_resting_limit(limit(3, 3, Side::Sell, 12_000, 10, 9)));
        eng.process(market(10, 10, Side::Buy, 5, 7));
        assert_eq!(eng.rules().phase(), MarketPhase::Auction);

        // only buy-side interest arrives
        eng.process(limit(11, 11, Side::Buy, 9_990, 5, 1));

        let trades = eng.flush(20);
        assert!(trades.is_empty());
        assert_eq!(eng.rules().phase(), MarketPhase::Continuous);
        // the queued limit rests; the queued market buy is gone
        assert_eq!(eng.book().best_bid(), Some(9_990));
        eng.book().assert_consistent();
    }

    /// TAL admits only the last trade price and expires back to continuous.
    #[test]
    fn test_trading_at_last() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 5, 1));
        eng.process(market(2, 2, Side::Buy, 2, 9));
        assert_eq!(eng.rules().last_trade_price(), Some(100));

        eng.start_trading_at_last(50);

        // wrong price is rejected
        let r = eng.process(limit(3, 10, Side::Buy, 101, 1, 9));
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(r.reject_reason, RejectReason::PriceNotAtLast);

        // at the last price it trades against the remaining ask
        let r = eng.process(limit(4, 11, Side::Buy, 100, 2, 9));
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].price, 100);

        // market orders are coerced to the last price
        let r = eng.process(market(5, 12, Side::Buy, 1, 9));
        assert_eq!(r.trades.len(), 1);
        assert_eq!(r.trades[0].price, 100);

        // expiry restores continuous trading
        let r = eng.process(limit(6, 60, Side::Buy, 99, 1, 9));
        assert_eq!(eng.rules().phase(), MarketPhase::Continuous);
        assert_eq!(r.status, OrderStatus::Accepted);
    }

    /// TAL without a reference price rejects with NoReferencePrice.
    #[test]
    fn test_trading_at_last_without_reference() {
        let mut eng = MatchingEngine::new();
        eng.start_trading_at_last(50);
        let r = eng.process(limit(1, 1, Side::Buy, 100, 1, 9));
        assert_eq!(r.status, OrderStatus::Rejected);
        assert_eq!(r.reject_reason, RejectReason::NoReferencePrice);
    }

    /// A 10% drop trips the breaker: the book is drained into the reopening
    /// auction, the halt expires into it, and the uncross reopens the market.
    #[test]
    fn test_circuit_breaker_halts_and_reopens() {
        let mut cfg = RulesConfig::default();
        cfg.enable_circuit_breaker = true;
        cfg.cb_drop_bps = 1_000;
        cfg.cb_halt_duration_ns = 100;
        cfg.cb_reopen_auction_duration_ns = 100;
        cfg.enable_price_bands = false;
        cfg.queue_orders_during_halt = true;
        let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));

        // reference trade at 10000
        eng.process(limit(1, 1, Side::Sell, 10_000, 1, 1));
        eng.process(market(2, 2, Side::Buy, 1, 9));
        assert_eq!(eng.rules().phase(), MarketPhase::Continuous);

        // standing liquidity that will be drained on the halt
        eng.process(limit(3, 3, Side::Buy, 8_900, 5, 4));

        // trade 10% below the reference trips the breaker
        eng.process(limit(4, 4, Side::Sell, 9_000, 1, 1));
        let r = eng.process(limit(5, 5, Side::Buy, 9_000, 1, 9));
        assert_eq!(r.trades.len(), 1);
        assert_eq!(eng.rules().phase(), MarketPhase::Halted);
        assert!(eng.book().is_empty(Side::Buy));
        assert!(eng.book().is_empty(Side::Sell));

        // halt_end = 5 + 100, reopen end = halt_end + 100
        assert_eq!(eng.halt_end_ts, 105);
        assert_eq!(eng.reopen_auction_end_ts, 205);

        // during the halt, orders queue for the reopening auction
        let r = eng.process(limit(6, 50, Side::Sell, 8_900, 2, 5));
        assert_eq!(r.status, OrderStatus::Accepted);

        // flush past the halt end enters the reopening auction
        assert!(eng.flush(110).is_empty());
        assert_eq!(eng.rules().phase(), MarketPhase::Auction);

        // flush past the reopening end uncrosses the drained liquidity
        let trades = eng.flush(210);
        assert_eq!(eng.rules().phase(), MarketPhase::Continuous);
        assert!(!trades.is_empty());
        assert_eq!(trades[0].price, 8_900);
        assert_eq!(trades[0].ts, 205);
        eng.book().assert_consistent();
    }

    #[test]
    fn test_closed_discards_silently() {
        let mut eng = MatchingEngine::new();
        eng.start_closing_auction(10);
        let trades = eng.flush(10);
        assert!(trades.is_empty());
        assert_eq!(eng.rules().phase(), MarketPhase::Closed);

        let r = eng.process(limit(1, 20, Side::Buy, 100, 1, 1));
        assert_eq!(r.status, OrderStatus::Accepted);
        assert!(r.trades.is_empty());
        assert_eq!(eng.book().best_bid(), None);
    }

    /// Closing auction matches queued two-sided interest at its end and the
    /// market stays closed.
    #[test]
    fn test_closing_auction_uncross() {
        let mut eng = MatchingEngine::new();
        eng.process(limit(1, 1, Side::Sell, 100, 5, 1));
        eng.process(market(2, 2, Side::Buy, 1, 9));

        eng.start_closing_auction(100);
        eng.process(limit(3, 10, Side::Buy, 100, 3, 4));
        eng.process(limit(4, 11, Side::Sell, 100, 2, 5));

        let trades = eng.flush(100);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, 100);
        assert_eq!(trades[0].qty, 2);
        assert_eq!(trades[0].maker_order_id, 4);
        assert_eq!(trades[0].taker_order_id, 3);
        assert_eq!(trades[0].ts, 100);
        assert_eq!(eng.rules().phase(), MarketPhase::Closed);
    }

    #[test]
    fn test_trade_ids_strictly_increase() {
        let mut eng = MatchingEngine::new();
        let mut last_id = 0;
        for i in 0..5u64 {
            eng.process(limit(i * 2 + 1, i as Ts + 1, Side::Sell, 100, 1, 1));
            let r = eng.process(market(i * 2 + 2, i as Ts + 1, Side::Buy, 1, 9));
            assert_eq!(r.trades.len(), 1);
            assert!(r.trades[0].id > last_id);
            last_id = r.trades[0].id;
        }
    }
}
