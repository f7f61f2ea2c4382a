//! Wire format of the event bus
//!
//! One JSON message per lifecycle event:
//!
//! ```text
//! { "id": "<uuid>", "type": "ORDER_PUT|ORDER_UPDATE|ORDER_DELETE|TRADE_PUT|RECEIPT_PUT",
//!   "timestamp": "<RFC3339>", "data": <payload> }
//! ```
//!
//! All decimals cross the wire as fixed-point strings. Trade events carry a
//! freshly generated trade id minted at emission time.

use chrono::{DateTime, Utc};
use matching_engine::events::BookEvent;
use matching_engine::receipt::Receipt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use types::order::{Order, OrderKind, Role, Side, Tif};
use types::trade::Trade;
use uuid::Uuid;

/// Message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageKind {
    OrderPut,
    OrderUpdate,
    OrderDelete,
    TradePut,
    ReceiptPut,
}

/// Envelope of one bus message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl BusMessage {
    /// Serialize a lifecycle event into its bus message.
    pub fn from_event(event: &BookEvent) -> serde_json::Result<Self> {
        let (kind, data) = match event {
            BookEvent::OrderPut(order) => (
                MessageKind::OrderPut,
                serde_json::to_value(OrderDto::from(order))?,
            ),
            BookEvent::OrderUpdate(order) => (
                MessageKind::OrderUpdate,
                serde_json::to_value(OrderDto::from(order))?,
            ),
            BookEvent::OrderDelete(order) => (
                MessageKind::OrderDelete,
                serde_json::to_value(OrderDto::from(order))?,
            ),
            BookEvent::TradePut(trade) => (
                MessageKind::TradePut,
                serde_json::to_value(TradePutDto {
                    id: Uuid::now_v7(),
                    trade: TradeEntryDto::from(trade),
                })?,
            ),
            BookEvent::ReceiptPut(receipt) => (
                MessageKind::ReceiptPut,
                serde_json::to_value(ReceiptDto::from(receipt))?,
            ),
        };
        Ok(Self {
            id: Uuid::now_v7(),
            kind,
            timestamp: Utc::now(),
            data,
        })
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Full order snapshot as carried on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDto {
    pub id: String,
    pub order_type: String,
    pub user_id: String,
    /// 0 = BUY, 1 = SELL
    pub side: u8,
    pub is_quote: bool,
    pub quantity: String,
    pub original_qty: String,
    pub price: String,
    pub stop: String,
    pub canceled: bool,
    pub role: String,
    pub tif: String,
    pub oco: String,
}

impl From<&Order> for OrderDto {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            order_type: match order.kind {
                OrderKind::Market => "MARKET",
                OrderKind::Limit => "LIMIT",
                OrderKind::StopLimit => "STOP-LIMIT",
            }
            .to_string(),
            user_id: order.user_id.to_string(),
            side: match order.side {
                Side::Buy => 0,
                Side::Sell => 1,
            },
            is_quote: order.is_quote,
            quantity: order.quantity_remaining.to_string(),
            original_qty: order.quantity_original.to_string(),
            price: order
                .price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "0".to_string()),
            stop: order
                .stop_price
                .map(|p| p.to_string())
                .unwrap_or_else(|| "0".to_string()),
            canceled: order.canceled,
            role: match order.role {
                Some(Role::Maker) => "MAKER",
                Some(Role::Taker) => "TAKER",
                None => "",
            }
            .to_string(),
            tif: match order.tif {
                Some(Tif::Gtc) => "GTC",
                Some(Tif::Ioc) => "IOC",
                Some(Tif::Fok) => "FOK",
                None => "",
            }
            .to_string(),
            oco: order
                .oco
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_default(),
        }
    }
}

/// One party's trade entry as it appears in trade and receipt payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEntryDto {
    pub order_id: String,
    pub user_id: String,
    pub role: String,
    pub price: String,
    pub is_quote: bool,
    pub quantity: String,
}

impl From<&Trade> for TradeEntryDto {
    fn from(trade: &Trade) -> Self {
        Self {
            order_id: trade.order_id.to_string(),
            user_id: trade.user_id.to_string(),
            role: match trade.role {
                Role::Maker => "MAKER",
                Role::Taker => "TAKER",
            }
            .to_string(),
            price: trade.price.to_string(),
            is_quote: trade.is_quote,
            quantity: trade.quantity.to_string(),
        }
    }
}

/// TRADE_PUT payload: a trade entry with its emission-minted id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePutDto {
    pub id: Uuid,
    #[serde(flatten)]
    pub trade: TradeEntryDto,
}

/// RECEIPT_PUT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptDto {
    pub user_id: String,
    pub order_id: String,
    pub trades: Vec<TradeEntryDto>,
    pub filled_qty: String,
}

impl From<&Receipt> for ReceiptDto {
    fn from(receipt: &Receipt) -> Self {
        Self {
            user_id: receipt.user_id.to_string(),
            order_id: receipt.order_id.to_string(),
            trades: receipt.trades.iter().map(TradeEntryDto::from).collect(),
            filled_qty: receipt.filled_qty.to_string(),
        }
    }
}
