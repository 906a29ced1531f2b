//! # camlink-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `CommandTransport` — publish payloads to the broker
//!   - `HistoryStore` — append status and climate samples
//!   - `OperationLogRepository` — audit rows for issued commands
//!   - `AutomationConfigRepository` — per-device thresholds
//!   - `EventPublisher` / `Clock`
//! - Provide the use-case services:
//!   - `DeviceStateCache` — latest status per device, online checks
//!   - `CommandDispatcher` — dispatch, await and correlate commands
//!   - `AutomationEngine` — hysteresis control with a manual pause window
//! - Route inbound messages (`router`) through a bounded worker pool (`ingest`)
//! - Provide **in-process infrastructure** (event broadcaster) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `camlink-domain` only (plus `tokio` for channels, timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod automation_engine;
pub mod event_bus;
pub mod ingest;
pub mod ports;
pub mod router;
pub mod services;

#[cfg(test)]
mod test_support;
