//! # Storage contracts
//!
//! The traits in this module define what a storage backend must provide for the loyalty engine. The engine itself
//! never talks to a database directly.
//!
//! * [`OrderManagement`] is the order store. It owns the uniqueness of order numbers and the terminal-state guard on
//!   order status.
//! * [`BalanceLedger`] is the append-only ledger of accruals and withdrawals. It owns the invariant that a user's
//!   available balance never drops below zero, and that each order is credited at most once.
//! * [`AccrualSettlement`] combines the two for the one operation that must touch both atomically: marking an order
//!   as PROCESSED and crediting its accrual.
//!
//! Every method returns a `Send` future so that generic workers can be spawned onto the tokio runtime.
mod accrual_settlement;
mod balance_ledger;
mod data_objects;
mod order_management;

pub use accrual_settlement::{AccrualSettlement, SettlementError};
pub use balance_ledger::{BalanceLedger, LedgerError};
pub use data_objects::{CreditResult, Settlement, VerdictOutcome};
pub use order_management::{OrderManagement, OrderStoreError};
