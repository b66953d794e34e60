//! Process-wide logging setup.
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::api::{Result, RuntimeError};

/// Directive used when neither `filter` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str = "info";

/// Installs a `fmt` subscriber filtered by `filter`, or by `RUST_LOG` when
/// `filter` is `None`.
///
/// Only one global subscriber can exist per process; a second call returns
/// [`RuntimeError::Logging`].
pub fn init(filter: Option<&str>) -> Result<()> {
    let env_filter = match filter {
        Some(directives) => {
            EnvFilter::try_new(directives).map_err(|err| RuntimeError::Logging(err.to_string()))?
        }
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|err| RuntimeError::Logging(err.to_string()))?;

    tracing::debug!("logging initialized");
    Ok(())
}
