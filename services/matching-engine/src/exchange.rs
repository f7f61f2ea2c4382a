//! Single-writer execution of order books
//!
//! Each symbol's book is owned by exactly one writer task; submissions,
//! cancellations, and reads are serialized through its command channel, so
//! the book itself needs no locking. Symbols run independently — there is
//! no cross-symbol synchronization because no operation spans symbols.
//!
//! The only cross-thread boundary of the core is the bounded outbound event
//! channel: when it fills up, the writer blocks on `send`, applying
//! backpressure end-to-end.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use types::errors::{BookError, EngineError};
use types::ids::{OrderId, Symbol};
use types::order::Order;

use crate::events::BookEvent;
use crate::matching::Done;
use crate::orderbook::{BookConfig, OrderBook, ProcessOutcome};
use crate::receipt::Receipt;

/// Tunables of the exchange front.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub book: BookConfig,
    /// Capacity of each per-symbol command channel.
    pub command_buffer: usize,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            book: BookConfig::default(),
            command_buffer: 256,
        }
    }
}

enum Command {
    Submit {
        order: Order,
        reply: oneshot::Sender<Result<(Done, Vec<Receipt>), EngineError>>,
    },
    Cancel {
        order_id: OrderId,
        reply: oneshot::Sender<Result<Option<Order>, EngineError>>,
    },
    Get {
        order_id: OrderId,
        reply: oneshot::Sender<Option<Order>>,
    },
}

/// Routes operations to per-symbol writer tasks.
pub struct Exchange {
    writers: HashMap<String, mpsc::Sender<Command>>,
}

impl Exchange {
    /// Spawn one writer task per symbol. Lifecycle events flow into the
    /// given bounded channel in the order the writers produce them.
    pub fn new(
        symbols: Vec<Symbol>,
        config: ExchangeConfig,
        events: mpsc::Sender<BookEvent>,
    ) -> Self {
        let mut writers = HashMap::new();
        for symbol in symbols {
            let (tx, rx) = mpsc::channel(config.command_buffer);
            let book = OrderBook::new(symbol.clone(), config.book.clone());
            tokio::spawn(writer_loop(book, rx, events.clone()));
            writers.insert(symbol.as_str().to_string(), tx);
        }
        info!(symbols = writers.len(), "exchange started");
        Self { writers }
    }

    /// Submit an order to its symbol's book.
    pub async fn submit(
        &self,
        symbol: &str,
        order: Order,
    ) -> Result<(Done, Vec<Receipt>), EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(symbol, Command::Submit { order, reply }).await?;
        rx.await
            .map_err(|_| EngineError::Invariant(format!("writer for {symbol} stopped")))?
    }

    /// Cancel an order on its symbol's book.
    pub async fn cancel(
        &self,
        symbol: &str,
        order_id: OrderId,
    ) -> Result<Option<Order>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(symbol, Command::Cancel { order_id, reply }).await?;
        rx.await
            .map_err(|_| EngineError::Invariant(format!("writer for {symbol} stopped")))?
    }

    /// Read an order through the symbol's writer, serializing with writes.
    pub async fn get(&self, symbol: &str, order_id: OrderId) -> Result<Option<Order>, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(symbol, Command::Get { order_id, reply }).await?;
        rx.await
            .map_err(|_| EngineError::Invariant(format!("writer for {symbol} stopped")))
    }

    /// Symbols served by this exchange.
    pub fn symbols(&self) -> Vec<&str> {
        self.writers.keys().map(String::as_str).collect()
    }

    async fn send(&self, symbol: &str, command: Command) -> Result<(), EngineError> {
        let writer = self
            .writers
            .get(symbol)
            .ok_or_else(|| BookError::UnknownSymbol(symbol.to_string()))?;
        writer
            .send(command)
            .await
            .map_err(|_| EngineError::Invariant(format!("writer for {symbol} stopped")))
    }
}

async fn writer_loop(
    mut book: OrderBook,
    mut rx: mpsc::Receiver<Command>,
    events: mpsc::Sender<BookEvent>,
) {
    let symbol = book.symbol().clone();
    debug!(symbol = %symbol, "writer started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Submit { order, reply } => match book.process(order) {
                Ok(outcome) => {
                    publish_outcome(&events, &outcome).await;
                    let ProcessOutcome { done, receipts, .. } = outcome;
                    let _ = reply.send(Ok((done, receipts)));
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            Command::Cancel { order_id, reply } => match book.cancel(&order_id) {
                Ok(Some(order)) => {
                    emit(&events, BookEvent::OrderDelete(order.clone())).await;
                    let _ = reply.send(Ok(Some(order)));
                }
                other => {
                    let _ = reply.send(other);
                }
            },
            Command::Get { order_id, reply } => {
                let _ = reply.send(book.get(&order_id).cloned());
            }
        }
    }

    debug!(symbol = %symbol, "writer stopped");
}

/// Emit one submission's transitions: the order snapshot first, then its
/// trades, stop activations, side-effect cancellations, and receipts. A
/// consumer therefore sees ORDER_PUT for an id before any TRADE_PUT
/// referencing it, and RECEIPT_PUT last.
async fn publish_outcome(events: &mpsc::Sender<BookEvent>, outcome: &ProcessOutcome) {
    emit(events, BookEvent::OrderPut(outcome.order.clone())).await;
    for trade in &outcome.done.trades {
        emit(events, BookEvent::TradePut(trade.clone())).await;
    }
    for order in &outcome.activated {
        emit(events, BookEvent::OrderUpdate(order.clone())).await;
    }
    for order in &outcome.canceled {
        emit(events, BookEvent::OrderDelete(order.clone())).await;
    }
    for receipt in &outcome.receipts {
        emit(events, BookEvent::ReceiptPut(receipt.clone())).await;
    }
}

async fn emit(events: &mpsc::Sender<BookEvent>, event: BookEvent) {
    let label = event.label();
    if events.send(event).await.is_err() {
        // The pipeline is gone; domain state stays authoritative.
        warn!(event = label, "event channel closed, dropping event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::decimal::Decimal;
    use types::ids::UserId;
    use types::order::{Side, Tif};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn limit(id: &str, user: &str, side: Side, qty: &str, px: &str) -> Order {
        Order::new_limit(
            OrderId::new(id),
            side,
            d(qty),
            d(px),
            Tif::Gtc,
            UserId::new(user),
        )
        .unwrap()
    }

    fn exchange() -> (Exchange, mpsc::Receiver<BookEvent>) {
        let (events_tx, events_rx) = mpsc::channel(1024);
        let exchange = Exchange::new(
            vec![Symbol::new("BTC/USDT"), Symbol::new("ETH/USDT")],
            ExchangeConfig::default(),
            events_tx,
        );
        (exchange, events_rx)
    }

    #[tokio::test]
    async fn test_submit_routes_by_symbol() {
        let (exchange, _events) = exchange();

        let (done, _) = exchange
            .submit("BTC/USDT", limit("b1", "u1", Side::Buy, "1", "100"))
            .await
            .unwrap();
        assert!(done.stored);

        // Same id on another symbol is a distinct book
        let (done, _) = exchange
            .submit("ETH/USDT", limit("b1", "u1", Side::Buy, "1", "100"))
            .await
            .unwrap();
        assert!(done.stored);
    }

    #[tokio::test]
    async fn test_unknown_symbol_rejected() {
        let (exchange, _events) = exchange();

        let err = exchange
            .submit("DOGE/USDT", limit("b1", "u1", Side::Buy, "1", "100"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Book(BookError::UnknownSymbol(_))
        ));
    }

    #[tokio::test]
    async fn test_submissions_processed_in_order() {
        let (exchange, _events) = exchange();

        exchange
            .submit("BTC/USDT", limit("first", "u1", Side::Buy, "1", "100"))
            .await
            .unwrap();
        exchange
            .submit("BTC/USDT", limit("second", "u2", Side::Buy, "1", "100"))
            .await
            .unwrap();

        // A sell for 1 fills the earlier bid, price-time priority
        let (done, _) = exchange
            .submit("BTC/USDT", limit("s1", "u3", Side::Sell, "1", "100"))
            .await
            .unwrap();
        assert_eq!(done.trades[0].order_id.as_str(), "first");
    }

    #[tokio::test]
    async fn test_event_order_for_submission() {
        let (exchange, mut events) = exchange();

        exchange
            .submit("BTC/USDT", limit("ask", "u1", Side::Sell, "1", "100"))
            .await
            .unwrap();
        exchange
            .submit("BTC/USDT", limit("bid", "u2", Side::Buy, "1", "100"))
            .await
            .unwrap();

        let mut labels = Vec::new();
        while let Ok(event) = events.try_recv() {
            labels.push(match &event {
                BookEvent::OrderPut(o) => format!("ORDER_PUT:{}", o.id),
                BookEvent::TradePut(t) => format!("TRADE_PUT:{}", t.order_id),
                BookEvent::ReceiptPut(r) => format!("RECEIPT_PUT:{}", r.order_id),
                other => other.label().to_string(),
            });
        }
        assert_eq!(
            labels,
            vec![
                "ORDER_PUT:ask",
                "ORDER_PUT:bid",
                "TRADE_PUT:ask",
                "TRADE_PUT:bid",
                "RECEIPT_PUT:bid",
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_and_get() {
        let (exchange, _events) = exchange();
        exchange
            .submit("BTC/USDT", limit("b1", "u1", Side::Buy, "1", "100"))
            .await
            .unwrap();

        let found = exchange
            .get("BTC/USDT", OrderId::new("b1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id.as_str(), "b1");

        let canceled = exchange
            .cancel("BTC/USDT", OrderId::new("b1"))
            .await
            .unwrap()
            .unwrap();
        assert!(canceled.is_canceled());
        assert!(exchange
            .get("BTC/USDT", OrderId::new("b1"))
            .await
            .unwrap()
            .is_none());
    }
}
