//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Data transfer objects for the gateway. Wire enums are string-valued
// ("Buy"/"Sell", "Limit"/"Market", "GTC"/"IOC"/"FOK"); market orders coerce
// price to 0 and default to IOC when no time-in-force is given.
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::ledger::Account;
use crate::live_world::OrderAck;
use crate::types::{
    MarketStyle, Order, OrderId, OrderStatus, OrderType, OwnerId, Price, Qty, RejectReason, Side,
    TimeInForce, Ts,
};

/// Request to place a new order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrderRequest {
    /// Side of the order (Buy/Sell).
    pub side: Side,

    /// Type of the order (Limit/Market).
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Limit price in ticks. Ignored (coerced to 0) for market orders.
    #[serde(default)]
    pub price: Option<Price>,

    /// Quantity in units.
    pub qty: Qty,

    /// Owner/account identifier.
    pub owner: OwnerId,

    /// Time in force. Market orders default to IOC, limits to GTC.
    #[serde(default)]
    pub tif: Option<TimeInForce>,

    /// Remainder policy for market orders.
    #[serde(default)]
    pub mkt_style: Option<MarketStyle>,
}

impl PlaceOrderRequest {
    /// Converts the request into an engine order. The runtime assigns the id
    /// and stamps the timestamp at the tick the command drains.
    pub fn into_order(self) -> Order {
        let (price, tif) = match self.order_type {
            OrderType::Market => (0, self.tif.unwrap_or(TimeInForce::IOC)),
            OrderType::Limit => (self.price.unwrap_or(0), self.tif.unwrap_or(TimeInForce::GTC)),
        };
        Order {
            id: 0,
            ts: 0,
            side: self.side,
            order_type: self.order_type,
            price,
            qty: self.qty,
            owner: self.owner,
            tif,
            mkt_style: self.mkt_style.unwrap_or(MarketStyle::PureMarket),
        }
    }
}

/// Ack returned for a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAckResponse {
    pub assigned_id: OrderId,
    pub status: OrderStatus,
    pub reject_reason: RejectReason,
}

impl From<OrderAck> for OrderAckResponse {
    fn from(ack: OrderAck) -> Self {
        Self {
            assigned_id: ack.id,
            status: ack.status,
            reject_reason: ack.reject_reason,
        }
    }
}

/// Ack for cancel/modify commands: the command was enqueued, the outcome
/// materializes on the next tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub enqueued: bool,
}

/// Body of a reduce-only modify request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModifyQtyRequest {
    pub new_qty: Qty,
}

/// One side level of the depth response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthLevelDto {
    pub price: Price,
    pub qty: Qty,
    pub orders: u32,
}

/// Depth response: top-N levels per side, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepthResponse {
    pub bids: Vec<DepthLevelDto>,
    pub asks: Vec<DepthLevelDto>,
}

/// One account row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDto {
    pub owner: OwnerId,
    pub cash_ticks: i64,
    pub position: i64,
    pub mtm_ticks: i64,
}

impl AccountDto {
    pub fn from_entry(owner: OwnerId, acct: Account) -> Self {
        Self {
            owner,
            cash_ticks: acct.cash_ticks,
            position: acct.position,
            mtm_ticks: acct.mtm_ticks,
        }
    }
}

/// Query parameters with optional bounds for the read endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotQuery {
    pub max_trades: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepthQuery {
    pub levels: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MidSeriesQuery {
    pub window_ns: Option<Ts>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Market orders coerce price to 0 and default to IOC.
    #[test]
    fn test_market_order_coercion() {
        let req: PlaceOrderRequest = serde_json::from_str(
            r#"{"side":"Buy","type":"Market","price":999,"qty":5,"owner":3}"#,
        )
        .unwrap();
        let o = req.into_order();
        assert_eq!(o.order_type, OrderType::Market);
        assert_eq!(o.price, 0);
        assert_eq!(o.tif, TimeInForce::IOC);
        assert_eq!(o.qty, 5);
    }

    /// Limit orders default to GTC and keep their price.
    #[test]
    fn test_limit_order_defaults() {
        let req: PlaceOrderRequest =
            serde_json::from_str(r#"{"side":"Sell","type":"Limit","price":105,"qty":2,"owner":1}"#)
                .unwrap();
        let o = req.into_order();
        assert_eq!(o.price, 105);
        assert_eq!(o.tif, TimeInForce::GTC);
    }

    /// An explicit tif survives the conversion.
    #[test]
    fn test_explicit_tif() {
        let req: PlaceOrderRequest = serde_json::from_str(
            r#"{"side":"Buy","type":"Limit","price":100,"qty":2,"owner":1,"tif":"FOK"}"#,
        )
        .unwrap();
        assert_eq!(req.into_order().tif, TimeInForce::FOK);
    }
}
