//! # camlink-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Push live gateway events to browsers over **Server-Sent Events**
//!   (`/api/events/stream`), one broadcaster subscription per connection
//! - Answer device status queries from the in-memory state cache
//!   (`/api/devices`, `/api/devices/{client_id}/status`)
//! - Expose a `/health` check
//!
//! ## Dependency rule
//! Depends on `camlink-app` (for services and port traits) and `camlink-domain`
//! (for the types serialized in responses). Never leaks axum types into the
//! domain.

pub mod api;
pub mod router;
pub mod state;
