//! Error taxonomy for the matching engine
//!
//! Domain errors surface synchronously through the submission result and are
//! never retried by the core. Infrastructure errors live at the event
//! pipeline boundary, not here.

use thiserror::Error;

use crate::ids::OrderId;

/// Top-level engine error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("decimal error: {0}")]
    Decimal(#[from] DecimalError),

    #[error("order error: {0}")]
    Order(#[from] OrderError),

    #[error("book error: {0}")]
    Book(#[from] BookError),

    /// Violated internal invariant. Engineering bug, not a business outcome.
    #[error("engine invariant violated: {0}")]
    Invariant(String),
}

/// Arithmetic failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecimalError {
    #[error("malformed decimal: {0}")]
    Malformed(String),

    #[error("decimal overflow")]
    Overflow,

    #[error("division by zero")]
    DivisionByZero,
}

/// Per-order validation and state failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("invalid quantity: {0}")]
    InvalidQuantity(String),

    #[error("invalid price: {0}")]
    InvalidPrice(String),

    #[error("invalid stop price: {0}")]
    InvalidStopPrice(String),

    #[error("fill of {delta} exceeds remaining quantity {remaining}")]
    OverFill { remaining: String, delta: String },
}

/// Submission-level and policy failures raised by an order book
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BookError {
    #[error("order {0} is canceled")]
    OrderCanceled(OrderId),

    #[error("order id {0} already exists")]
    DuplicateId(OrderId),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("order {0} is partially filled and cannot be canceled")]
    PartialFillCannotCancel(OrderId),

    #[error("self cross detected between orders of one user")]
    SelfCrossBlocked,
}
