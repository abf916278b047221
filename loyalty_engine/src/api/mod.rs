//! # Loyalty engine public API
//!
//! Each API wraps a storage backend that implements the traits it needs, so callers can pick just the functionality
//! they want.
//!
//! * [`order_api`] accepts order uploads and lists a user's orders.
//! * [`balance_api`] reports balances, withdrawals and the full ledger history.
//! * [`withdrawal_api`] spends points against the ledger.
//!
//! ```rust,ignore
//! use loyalty_engine::{BalanceApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! // SqliteDatabase implements BalanceLedger
//! let api = BalanceApi::new(db);
//! let balance = api.balance(user_id).await?;
//! ```
pub mod balance_api;
pub mod errors;
pub mod order_api;
pub mod withdrawal_api;
