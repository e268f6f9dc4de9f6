//! Log output for binaries built on the name game client.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::NamegameError;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "namegame=debug";

/// Installs a formatted `tracing` subscriber filtered by `RUST_LOG`,
/// falling back to [`DEFAULT_FILTER`].
///
/// # Errors
/// Returns [`NamegameError::Logging`] if a global subscriber is already
/// installed.
pub fn init_logging() -> Result<(), NamegameError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_cleanly() {
        // The first call may race other tests; the second always loses.
        let _ = init_logging();
        assert!(matches!(init_logging(), Err(NamegameError::Logging(_))));
    }
}
