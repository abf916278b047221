use thiserror::Error;

use crate::{
    db_types::{InvalidOrderNumber, OrderNumber, Points},
    traits::{LedgerError, OrderStoreError},
};

#[derive(Debug, Clone, Error)]
pub enum OrderApiError {
    #[error("{0}")]
    InvalidFormat(#[from] InvalidOrderNumber),
    #[error("Order {0} has already been uploaded by another user")]
    UploadedByOther(OrderNumber),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<OrderStoreError> for OrderApiError {
    fn from(e: OrderStoreError) -> Self {
        match e {
            OrderStoreError::UploadedByOther(number) => Self::UploadedByOther(number),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum WithdrawalApiError {
    #[error("{0}")]
    InvalidFormat(#[from] InvalidOrderNumber),
    #[error("Withdrawal amount must be positive, but was {0}")]
    InvalidAmount(Points),
    #[error("Insufficient funds to withdraw {0}")]
    InsufficientFunds(Points),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<LedgerError> for WithdrawalApiError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds { requested } => Self::InsufficientFunds(requested),
            LedgerError::InvalidAmount(amount) => Self::InvalidAmount(amount),
            e => Self::DatabaseError(e.to_string()),
        }
    }
}
