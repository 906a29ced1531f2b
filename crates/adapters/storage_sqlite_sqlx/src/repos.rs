//! Repository implementations backed by `SQLite`.

mod automation_config_repo;
mod history_store;
mod operation_log_repo;

pub use automation_config_repo::SqliteAutomationConfigRepository;
pub use history_store::SqliteHistoryStore;
pub use operation_log_repo::SqliteOperationLogRepository;
