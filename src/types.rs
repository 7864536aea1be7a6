//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the core data types used throughout the matching engine,
// including orders, trades, and various status/type enums. All arithmetic is
// integer-only: prices and quantities are ticks and units, timestamps are
// nanosecond counters.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ALIASES            | Price/Qty/Ts/OrderId/TradeId/OwnerId integer aliases.            |
// | ENUMS              | Defines discrete sets of values (Side, OrderType, TimeInForce...). |
// | STRUCTS            | Defines the structure of Orders, Trades and level summaries.     |
// | HELPERS            | Side opposite, midprice, validity predicates.                    |
// | TESTS              | Contains unit tests for the defined types.                       |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

//--------------------------------------------------------------------------------------------------
//  ALIASES
//--------------------------------------------------------------------------------------------------

/// Price in integer ticks.
pub type Price = i64;
/// Quantity in integer units (shares/contracts).
pub type Qty = i64;
/// Timestamp in nanoseconds on a driven counter (not wall clock).
pub type Ts = i64;
/// Unique order identifier.
pub type OrderId = u64;
/// Unique trade identifier.
pub type TradeId = u64;
/// Identifier of the owning participant/account.
pub type OwnerId = u64;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                               |
// |---------------|-------------------------------------------|
// | Side          | Represents the side of an order (Buy/Sell). |
// | OrderType     | Represents the type of an order.          |
// | TimeInForce   | Order duration policy.                    |
// | MarketStyle   | Market order remainder policy.            |
// | OrderStatus   | Admission outcome of an order.            |
// | RejectReason  | Structured rejection taxonomy.            |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (Buy or Sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order.
    Buy,
    /// A sell order.
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[inline]
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Represents the type of an order, influencing its matching behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// An order that executes at a specific price or better.
    Limit,
    /// An order that executes immediately at the best available price.
    Market,
}

/// Defines how long an order remains active in the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good Till Cancel - remains active until explicitly cancelled.
    GTC,
    /// Immediate Or Cancel - fills what it can, remainder is dropped.
    IOC,
    /// Fill Or Kill - fills completely or not at all, atomically.
    FOK,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::GTC
    }
}

/// Remainder policy for market orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStyle {
    /// Unfilled remainder is dropped.
    PureMarket,
    /// Unfilled remainder rests as a GTC limit at the last execution price.
    MarketToLimit,
}

impl Default for MarketStyle {
    fn default() -> Self {
        Self::PureMarket
    }
}

/// Admission outcome reported in a `MatchResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order passed admission and was routed by phase.
    Accepted,
    /// The order failed admission; see the attached `RejectReason`.
    Rejected,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Accepted
    }
}

/// Structured rejection taxonomy. Rejections are values, never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    /// No rejection.
    None,
    /// Quantity or price failed basic validity.
    InvalidOrder,
    /// Market is halted and halt enforcement is active.
    MarketHalted,
    /// Limit price is not a multiple of the tick size.
    PriceNotOnTick,
    /// Quantity is not a multiple of the lot size.
    QtyNotOnLot,
    /// Quantity is below the configured minimum.
    QtyBelowMinimum,
    /// The order would have traded against the same owner.
    SelfTradePrevented,
    /// Trading-at-last requires a last trade price and none exists.
    NoReferencePrice,
    /// Trading-at-last limit orders must price exactly at the last trade.
    PriceNotAtLast,
}

impl Default for RejectReason {
    fn default() -> Self {
        Self::None
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                   |
// |---------------|-----------------------------------------------|
// | Order         | Represents a trading order in the system.     |
// | Trade         | Represents a completed trade between orders.  |
// | LevelSummary  | Aggregated view of one price level.           |
//--------------------------------------------------------------------------------------------------

/// Represents a trading order. Identity is immutable once admitted; only the
/// remaining `qty` decreases while resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier for the order.
    pub id: OrderId,
    /// Timestamp the order entered the engine.
    pub ts: Ts,
    /// Side of the order (Buy or Sell).
    pub side: Side,
    /// Type of the order (Limit or Market).
    pub order_type: OrderType,
    /// Limit price in ticks. Only meaningful for Limit orders.
    pub price: Price,
    /// Remaining quantity. Must be > 0 to be valid.
    pub qty: Qty,
    /// Identifier of the owning participant.
    pub owner: OwnerId,
    /// Duration policy for the order.
    pub tif: TimeInForce,
    /// Remainder policy for market orders.
    pub mkt_style: MarketStyle,
}

impl Order {
    /// Returns true if the order passes basic validity: positive quantity,
    /// and a non-negative price for limit orders.
    #[inline]
    pub fn is_valid(&self) -> bool {
        if self.qty <= 0 {
            return false;
        }
        if self.order_type == OrderType::Market {
            return true;
        }
        self.price >= 0
    }
}

impl Default for Order {
    fn default() -> Self {
        Self {
            id: 0,
            ts: 0,
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: 0,
            qty: 0,
            owner: 0,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        }
    }
}

/// Represents a completed trade resulting from matching two orders.
///
/// Continuous trades price at the maker; auction uncross trades print at the
/// clearing price with `maker = sell, taker = buy` by convention, so the
/// maker/taker pair must not be read as aggressor information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique identifier for the trade, strictly monotonic per engine.
    pub id: TradeId,
    /// Timestamp the trade printed.
    pub ts: Ts,
    /// Execution price in ticks.
    pub price: Price,
    /// Quantity traded. Always > 0.
    pub qty: Qty,
    /// ID of the order that was resting on the book (maker).
    pub maker_order_id: OrderId,
    /// ID of the order that matched the resting order (taker).
    pub taker_order_id: OrderId,
}

impl Trade {
    /// Returns true if the trade satisfies its invariants.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.qty > 0 && self.price >= 0
    }
}

/// A lightweight "Level 2" view: price + total quantity + number of resting orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// The price for this level.
    pub price: Price,
    /// Total resting quantity at this price level.
    pub total_qty: Qty,
    /// Number of resting orders at this price level.
    pub order_count: u32,
}

//--------------------------------------------------------------------------------------------------
//  HELPERS
//--------------------------------------------------------------------------------------------------

/// Integer-floor midprice of the two best quotes, if both exist.
#[inline]
pub fn midprice(best_bid: Option<Price>, best_ask: Option<Price>) -> Option<Price> {
    match (best_bid, best_ask) {
        (Some(bb), Some(ba)) => Some((bb + ba) / 2),
        _ => None,
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                       | Description                                      |
// |----------------------------|--------------------------------------------------|
// | test_order_validity        | Verify Order validity predicate.                 |
// | test_trade_validity        | Verify Trade validity predicate.                 |
// | test_side_opposite         | Check Side::opposite.                            |
// | test_midprice              | Integer midprice with missing quotes.            |
// | test_enum_wire_format      | Enums serialize as string names.                 |
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_validity() {
        let mut o = Order {
            id: 1,
            ts: 1,
            side: Side::Buy,
            order_type: OrderType::Limit,
            price: 100,
            qty: 10,
            owner: 1,
            tif: TimeInForce::GTC,
            mkt_style: MarketStyle::PureMarket,
        };
        assert!(o.is_valid());

        o.qty = 0;
        assert!(!o.is_valid());

        o.qty = 5;
        o.price = -1;
        assert!(!o.is_valid());

        // Market orders ignore price
        o.order_type = OrderType::Market;
        assert!(o.is_valid());
    }

    #[test]
    fn test_trade_validity() {
        let t = Trade {
            id: 1,
            ts: 5,
            price: 100,
            qty: 3,
            maker_order_id: 1,
            taker_order_id: 2,
        };
        assert!(t.is_valid());
        assert!(!Trade { qty: 0, ..t }.is_valid());
        assert!(!Trade { price: -1, ..t }.is_valid());
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_midprice() {
        assert_eq!(midprice(Some(100), Some(102)), Some(101));
        // integer floor
        assert_eq!(midprice(Some(100), Some(101)), Some(100));
        assert_eq!(midprice(None, Some(101)), None);
        assert_eq!(midprice(Some(100), None), None);
    }

    #[test]
    fn test_enum_wire_format() {
        assert_eq!(serde_json::to_string(&Side::Buy).unwrap(), "\"Buy\"");
        assert_eq!(serde_json::to_string(&OrderType::Market).unwrap(), "\"Market\"");
        assert_eq!(serde_json::to_string(&TimeInForce::FOK).unwrap(), "\"FOK\"");
        let tif: TimeInForce = serde_json::from_str("\"IOC\"").unwrap();
        assert_eq!(tif, TimeInForce::IOC);
    }
}
