//! # camlink-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the storage port traits defined in `camlink-app::ports::storage`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `camlink-app` (for port traits) and `camlink-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod repos;

mod time;

pub use error::StorageError;
pub use pool::{Config, Database};
pub use repos::{SqliteAutomationConfigRepository, SqliteHistoryStore, SqliteOperationLogRepository};
