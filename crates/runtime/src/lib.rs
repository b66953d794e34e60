//! Async host for the action discovery pipeline.
//!
//! `game-core` runs one actor at a time and never blocks on anything but the
//! CPU. This crate schedules many of those runs on a tokio runtime and wires
//! up the pieces a long-running service needs around them.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the [`DiscoveryService`] and its configuration
//! - [`api`] exposes the error type downstream clients handle
//! - [`trace`] streams pipeline trace events through a bounded channel
//! - [`logging`] installs the process-wide tracing subscriber
pub mod api;
pub mod logging;
pub mod runtime;
pub mod trace;

mod workers;

pub use api::{Result, RuntimeError};
pub use runtime::{DiscoveryService, DiscoveryWorld, RuntimeConfig};
pub use trace::{ChannelTraceSink, TraceEvent};
pub use workers::{DiscoveryMetrics, MetricsSnapshot};
