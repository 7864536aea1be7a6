//! End-to-end scenarios exercised through the public crate API: basic
//! crossing, reduce-only modification, the volatility auction cycle,
//! self-trade prevention and FOK atomicity.

use tickmatch::{
    MarketPhase, MarketStyle, MatchingEngine, Order, OrderStatus, OrderType, Price, Qty, RuleSet,
    RulesConfig, Side, StpMode, TimeInForce, Ts,
};

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

/// Sell limit 105x5, then market buy 3: one trade at 105 for 3, the resting
/// order keeps 2.
#[test]
fn basic_cross() {
    let mut eng = MatchingEngine::new();
    let r = eng.process(limit(1, 1, Side::Sell, 105, 5, 1));
    assert_eq!(r.status, OrderStatus::Accepted);

    let r = eng.process(market(2, 2, Side::Buy, 3, 9));
    assert_eq!(r.trades.len(), 1);
    assert_eq!(r.trades[0].price, 105);
    assert_eq!(r.trades[0].qty, 3);
    assert_eq!(r.trades[0].maker_order_id, 1);
    assert_eq!(r.trades[0].taker_order_id, 2);

    let depth = eng.book().depth(Side::Sell, 1);
    assert_eq!(depth[0].total_qty, 2);
}

/// Reduce-only modify: shrinking succeeds and updates the level total,
/// growing fails and leaves everything untouched.
#[test]
fn reduce_only_modify() {
    let mut eng = MatchingEngine::new();
    eng.process(limit(1, 1, Side::Sell, 110, 10, 1));

    assert!(eng.book_mut().modify_qty(1, 6));
    assert_eq!(eng.book().depth(Side::Sell, 1)[0].total_qty, 6);

    assert!(!eng.book_mut().modify_qty(1, 12));
    assert_eq!(eng.book().depth(Side::Sell, 1)[0].total_qty, 6);
}

/// Volatility interruption: a band-breaching marketable order opens a timed
/// auction; the uncross prints everything at one clearing price and returns
/// the market to continuous trading.
#[test]
fn auction_trigger_and_uncross() {
    let mut cfg = RulesConfig::default();
    cfg.band_bps = 100;
    cfg.vol_auction_duration_ns = 5;
    let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));

    // Seed the last trade at 10000
    assert!(eng
        .book_mut()
        .add_resting_limit(limit(1, 1, Side::Sell, 10_000, 1, 2)));
    let r = eng.process(market(2, 2, Side::Buy, 1, 3));
    assert_eq!(r.trades.len(), 1);

    // A far ask and a marketable buy 20% away from the reference
    assert!(eng
        .book_mut()
        .add_resting_limit(limit(3, 3, Side::Sell, 12_000, 10, 9)));
    let r = eng.process(market(10, 10, Side::Buy, 5, 7));
    assert!(r.trades.is_empty());
    assert_eq!(eng.rules().phase(), MarketPhase::Auction);

    // Interest collected during the auction
    eng.process(limit(11, 11, Side::Buy, 11_800, 5, 1));
    eng.process(limit(12, 12, Side::Buy, 11_900, 5, 1));
    eng.process(limit(13, 13, Side::Sell, 11_800, 6, 2));
    eng.process(limit(14, 14, Side::Sell, 11_900, 2, 2));

    // Any benign order past the end runs the uncross first
    let r = eng.process(limit(15, 20, Side::Buy, 1, 1, 8));
    assert_eq!(eng.rules().phase(), MarketPhase::Continuous);
    assert!(!r.trades.is_empty());

    let clearing = r.trades[0].price;
    for t in &r.trades {
        assert_eq!(t.price, clearing, "uncross trades share one clearing price");
    }
}

/// CancelMaker self-trade prevention: the same-owner maker is removed without
/// a trade and the incoming order matches the next available liquidity.
#[test]
fn self_trade_prevention_cancel_maker() {
    let mut cfg = RulesConfig::default();
    cfg.stp = StpMode::CancelMaker;
    let mut eng = MatchingEngine::with_rules(RuleSet::new(cfg));

    eng.process(limit(1, 1, Side::Sell, 100, 10, 7));
    let r = eng.process(limit(2, 2, Side::Buy, 100, 5, 7));

    assert!(r.trades.is_empty(), "no trade against the same owner");
    assert!(!eng.book_mut().cancel(1), "maker was removed");
    // the buy survived and rests after the ask side emptied
    assert_eq!(eng.book().best_bid(), Some(100));
}

/// FOK atomicity: an unfillable FOK leaves the book bitwise unchanged.
#[test]
fn fok_unfillable() {
    let mut eng = MatchingEngine::new();
    eng.process(limit(1, 1, Side::Sell, 100, 2, 1));

    let before = eng.book().depth(Side::Sell, 10);
    let mut o = limit(2, 2, Side::Buy, 100, 5, 9);
    o.tif = TimeInForce::FOK;
    let r = eng.process(o);

    assert_eq!(r.status, OrderStatus::Accepted);
    assert!(r.trades.is_empty());
    assert_eq!(eng.book().depth(Side::Sell, 10), before);
    assert_eq!(eng.book().best_bid(), None);
}

/// Conservation of quantity: fills + residual + dropped always equals the
/// original quantity, across a mix of TIFs.
#[test]
fn quantity_conservation() {
    let mut eng = MatchingEngine::new();
    eng.process(limit(1, 1, Side::Sell, 100, 4, 1));
    eng.process(limit(2, 2, Side::Sell, 101, 4, 2));

    // GTC limit for 10 at 101: fills 8, rests 2
    let r = eng.process(limit(3, 3, Side::Buy, 101, 10, 9));
    let filled: Qty = r.trades.iter().map(|t| t.qty).sum();
    let resting = r.resting.map(|o| o.qty).unwrap_or(0);
    assert_eq!(filled + resting, 10);

    // IOC limit for 5 with 0 available: everything dropped
    let mut o = limit(4, 4, Side::Buy, 99, 5, 9);
    o.tif = TimeInForce::IOC;
    let r = eng.process(o);
    let filled: Qty = r.trades.iter().map(|t| t.qty).sum();
    assert_eq!(filled, 0);
    assert!(r.resting.is_none());
}
