use thiserror::Error;

use crate::order::OrderStatus;

/// Failure taxonomy shared by the embedded services and the HTTP layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShopError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// No credential was presented.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A credential was presented but is invalid or expired.
    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: String,
        requested: u32,
        available: u32,
    },

    #[error("illegal order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("catalog is empty")]
    EmptyCatalog,

    #[error("storage error: {0}")]
    Storage(String),
}

pub type ShopResult<T> = Result<T, ShopError>;

impl From<serde_json::Error> for ShopError {
    fn from(err: serde_json::Error) -> Self {
        ShopError::Storage(err.to_string())
    }
}

impl From<std::io::Error> for ShopError {
    fn from(err: std::io::Error) -> Self {
        ShopError::Storage(err.to_string())
    }
}
