use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use loyalty_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::helpers::is_valid_luhn;

//--------------------------------------     OrderNumber       ---------------------------------------------------------
/// A purchase or withdrawal order number. Only strings of digits that pass the Luhn check can be constructed via
/// [`OrderNumber::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(String);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid order number: {0:?}")]
pub struct InvalidOrderNumber(pub String);

impl OrderNumber {
    /// Trims the input and checks it against the Luhn algorithm.
    pub fn parse(raw: &str) -> Result<Self, InvalidOrderNumber> {
        let trimmed = raw.trim();
        if is_valid_luhn(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(InvalidOrderNumber(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for OrderNumber {
    type Err = InvalidOrderNumber;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded, but the accrual service has not reported on it yet.
    New,
    /// The accrual service is calculating the reward for the order.
    Processing,
    /// The accrual service rejected the order. No points will be awarded.
    Invalid,
    /// The accrual service has awarded points for the order.
    Processed,
}

impl OrderStatusType {
    /// PROCESSED and INVALID are final. No verdict may move an order out of either.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Invalid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "INVALID" => Ok(Self::Invalid),
            "PROCESSED" => Ok(Self::Processed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Order {
    pub id: i64,
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: OrderStatusType,
    /// Only meaningful once the order is PROCESSED. Zero otherwise.
    pub accrual: Points,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    OperationKind    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    Accrual,
    Withdrawal,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::Accrual => write!(f, "ACCRUAL"),
            OperationKind::Withdrawal => write!(f, "WITHDRAWAL"),
        }
    }
}

impl FromStr for OperationKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACCRUAL" => Ok(Self::Accrual),
            "WITHDRAWAL" => Ok(Self::Withdrawal),
            s => Err(ConversionError(format!("Invalid operation kind: {s}"))),
        }
    }
}

//--------------------------------------   BalanceOperation   ---------------------------------------------------------
/// A single, immutable entry in a user's ledger.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct BalanceOperation {
    pub id: i64,
    pub user_id: i64,
    pub kind: OperationKind,
    /// Always positive. The sign is implied by `kind`.
    pub amount: Points,
    pub order_reference: OrderNumber,
    pub created_at: DateTime<Utc>,
}

impl BalanceOperation {
    /// The effect of this operation on the available balance.
    pub fn signed_amount(&self) -> Points {
        match self.kind {
            OperationKind::Accrual => self.amount,
            OperationKind::Withdrawal => -self.amount,
        }
    }
}

//--------------------------------------    BalanceSummary    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BalanceSummary {
    /// Σ ACCRUAL − Σ WITHDRAWAL
    pub current: Points,
    /// Σ WITHDRAWAL
    pub withdrawn: Points,
}

impl BalanceSummary {
    pub fn from_operations<'a, I: IntoIterator<Item = &'a BalanceOperation>>(ops: I) -> Self {
        ops.into_iter().fold(Self::default(), |mut acc, op| {
            acc.current += op.signed_amount();
            if op.kind == OperationKind::Withdrawal {
                acc.withdrawn += op.amount;
            }
            acc
        })
    }
}
