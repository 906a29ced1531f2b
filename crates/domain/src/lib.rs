//! # camlink-domain
//!
//! Pure domain model for the camlink camera/sensor gateway.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Commands** (correlation ids, the closed operation catalogue, wire payloads)
//! - Define **Device state** (status snapshots, online window, status view)
//! - Define **Telemetry** (command replies, climate readings, uploads, config reports)
//! - Define **Automation** (thresholds, latches and hysteresis decisions)
//! - Define **Operation log** records and **history** samples
//! - Define **Live events** pushed to subscribers
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod automation;
pub mod command;
pub mod device;
pub mod event;
pub mod history;
pub mod operation_log;
pub mod telemetry;
