//! Loyalty Engine
//!
//! The loyalty engine keeps track of the purchase orders users upload, asks an external accrual service how many
//! points each order earns, and maintains a per-user ledger of those points and any withdrawals made against them.
//!
//! The library is divided into these sections:
//! 1. Storage ([`traits`] and the SQLite backend). The traits define the contracts a backend must uphold: unique
//!    order numbers, terminal order states that never change, at most one credit per order, and a balance that never
//!    goes negative. The data types used by the backends live in [`db_types`].
//! 2. Order accrual reconciliation ([`mod@accrual`]). A scanner and a pool of workers that poll the accrual service
//!    for every order awaiting a verdict and apply the answers.
//! 3. The public API ([`mod@api`]) used by the REST server for uploads, balances and withdrawals.
//!
//! The engine also emits [`events`] when an order is resolved or points are withdrawn.
pub mod accrual;
pub mod api;
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use accrual::{AccrualConfig, AccrualSubsystem, HttpAccrualGateway};
pub use api::{
    balance_api::BalanceApi,
    errors::{OrderApiError, WithdrawalApiError},
    order_api::{OrderApi, UploadResult},
    withdrawal_api::WithdrawalApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{AccrualSettlement, BalanceLedger, OrderManagement};
