//! Helpers for testing the engine and anything built on it.
mod memory_db;
mod scripted_gateway;

#[cfg(feature = "sqlite")]
pub mod prepare_env;

pub use memory_db::MemoryDatabase;
pub use scripted_gateway::ScriptedGateway;
