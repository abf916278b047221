//! # Loyalty points server
//! The REST front end for the loyalty engine. It is responsible for:
//! * accepting order uploads from users and handing them to the accrual workers,
//! * reporting balances and withdrawal history,
//! * spending points on withdrawals,
//! * running the accrual subsystem in the background for as long as the server is up.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `GET /health`: Returns a 200 OK response.
//! * `POST /api/user/orders`: Upload an order number (plain text body).
//! * `GET /api/user/orders`: The caller's orders, newest first.
//! * `GET /api/user/balance`: The caller's current balance and total withdrawn.
//! * `POST /api/user/balance/withdraw`: Spend points against a withdrawal order number.
//! * `GET /api/user/withdrawals`: The caller's withdrawals, newest first.
//!
//! Every `/api` route needs an `X-User-Id` header. See [identity](identity/index.html).

pub mod accrual_worker;
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod identity;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
