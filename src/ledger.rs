//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Per-owner accounting. Every trade credits the seller and debits the buyer
// in cash ticks and moves one position the opposite way; buyer and seller are
// resolved through the order-meta registry populated at admission, because
// the trade record alone cannot tell which leg bought.
//
// | Component   | Description                                          |
// |-------------|------------------------------------------------------|
// | Account     | cash_ticks, position, mark-to-market                 |
// | OrderMeta   | (owner, side) captured when an order is admitted     |
// | apply_trades| Folds a trade batch into the account map             |
//--------------------------------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use crate::types::{OrderId, OwnerId, Price, Side, Trade, Ts};

/// Running account of one owner, in integer ticks and units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Account {
    /// Realized cash: sells credit, buys debit.
    pub cash_ticks: i64,
    /// Net position in units.
    pub position: i64,
    /// cash + position marked at the most recent mid.
    pub mtm_ticks: i64,
}

/// Owner and side of an admitted order, for buyer/seller attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderMeta {
    pub owner: OwnerId,
    pub side: Side,
}

/// Applies a batch of trades to the account map.
///
/// For each trade the buyer is whichever leg's registered side is `Buy`;
/// position moves `+qty` to the buyer and `-qty` to the seller, cash moves
/// `price * qty` the other way. When `mid` is known, the touched accounts'
/// mark-to-market is refreshed against it. Trades whose legs were never
/// registered are skipped.
pub fn apply_trades(
    ts: Ts,
    trades: &[Trade],
    order_meta: &HashMap<OrderId, OrderMeta>,
    accounts: &mut HashMap<OwnerId, Account>,
    mid: Option<Price>,
) {
    for trade in trades {
        let maker = order_meta.get(&trade.maker_order_id);
        let taker = order_meta.get(&trade.taker_order_id);
        let (Some(maker), Some(taker)) = (maker, taker) else {
            trace!(trade_id = trade.id, "trade leg without registered meta, skipped");
            continue;
        };

        let (buyer, seller) = if taker.side == Side::Buy {
            (taker.owner, maker.owner)
        } else {
            (maker.owner, taker.owner)
        };

        let notional = trade.price * trade.qty;
        {
            let acct = accounts.entry(buyer).or_default();
            acct.position += trade.qty;
            acct.cash_ticks -= notional;
        }
        {
            let acct = accounts.entry(seller).or_default();
            acct.position -= trade.qty;
            acct.cash_ticks += notional;
        }

        if let Some(mark) = mid {
            for owner in [buyer, seller] {
                if let Some(acct) = accounts.get_mut(&owner) {
                    acct.mtm_ticks = acct.cash_ticks + acct.position * mark;
                }
            }
        }

        trace!(ts, trade_id = trade.id, buyer, seller, qty = trade.qty, "trade applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(owner: OwnerId, side: Side) -> OrderMeta {
        OrderMeta { owner, side }
    }

    fn trade(id: u64, price: Price, qty: i64, maker: OrderId, taker: OrderId) -> Trade {
        Trade {
            id,
            ts: 1,
            price,
            qty,
            maker_order_id: maker,
            taker_order_id: taker,
        }
    }

    /// Buyer gains position and pays cash; seller mirrors it exactly.
    #[test]
    fn test_buyer_seller_attribution() {
        let mut order_meta = HashMap::new();
        order_meta.insert(1, meta(10, Side::Sell)); // maker sold
        order_meta.insert(2, meta(20, Side::Buy)); // taker bought

        let mut accounts = HashMap::new();
        apply_trades(1, &[trade(1, 105, 3, 1, 2)], &order_meta, &mut accounts, None);

        let buyer = accounts[&20];
        let seller = accounts[&10];
        assert_eq!(buyer.position, 3);
        assert_eq!(buyer.cash_ticks, -315);
        assert_eq!(seller.position, -3);
        assert_eq!(seller.cash_ticks, 315);
    }

    /// Auction convention (maker = sell, taker = buy) attributes the same way.
    #[test]
    fn test_attribution_follows_meta_not_aggressor() {
        let mut order_meta = HashMap::new();
        // here the *maker* is the buyer: a resting bid lifted by a sell
        order_meta.insert(5, meta(7, Side::Buy));
        order_meta.insert(6, meta(8, Side::Sell));

        let mut accounts = HashMap::new();
        apply_trades(1, &[trade(1, 100, 2, 5, 6)], &order_meta, &mut accounts, None);

        assert_eq!(accounts[&7].position, 2);
        assert_eq!(accounts[&8].position, -2);
    }

    /// Mark-to-market refreshes against the supplied mid.
    #[test]
    fn test_mark_to_market() {
        let mut order_meta = HashMap::new();
        order_meta.insert(1, meta(10, Side::Sell));
        order_meta.insert(2, meta(20, Side::Buy));

        let mut accounts = HashMap::new();
        apply_trades(1, &[trade(1, 100, 1, 1, 2)], &order_meta, &mut accounts, Some(110));

        // buyer: cash -100, position 1 marked at 110 => +10
        assert_eq!(accounts[&20].mtm_ticks, 10);
        // seller: cash +100, position -1 marked at 110 => -10
        assert_eq!(accounts[&10].mtm_ticks, -10);
    }

    /// Unregistered legs are skipped without touching any account.
    #[test]
    fn test_unregistered_leg_skipped() {
        let order_meta = HashMap::new();
        let mut accounts = HashMap::new();
        apply_trades(1, &[trade(1, 100, 1, 1, 2)], &order_meta, &mut accounts, None);
        assert!(accounts.is_empty());
    }

    /// A self-trade (same owner on both legs) nets to zero.
    #[test]
    fn test_self_trade_nets_flat() {
        let mut order_meta = HashMap::new();
        order_meta.insert(1, meta(7, Side::Sell));
        order_meta.insert(2, meta(7, Side::Buy));

        let mut accounts = HashMap::new();
        apply_trades(1, &[trade(1, 100, 5, 1, 2)], &order_meta, &mut accounts, None);
        assert_eq!(accounts[&7].position, 0);
        assert_eq!(accounts[&7].cash_ticks, 0);
    }
}
