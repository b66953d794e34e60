//! Error type surfaced by the runtime API.
//!
//! Per-actor pipeline failures are not errors here; they come back as a
//! `failed` [`game_core::PipelineResult`]. These variants cover the
//! machinery around the pipeline.
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("discovery worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("discovery service is shut down")]
    ServiceClosed,

    #[error("failed to load runtime config {}: {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("failed to initialize logging: {0}")]
    Logging(String),
}
