//! Storage layer for Study AI

pub mod db;
pub mod models;
pub mod pool;

pub use db::Database;
pub use models::*;
pub use pool::{ConnectionPool, PoolConfig};
