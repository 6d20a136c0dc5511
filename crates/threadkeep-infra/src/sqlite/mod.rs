//! SQLite storage layer: WAL pool and the durable transcript backend.

pub mod pool;
pub mod transcript;
