//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

use crate::types::{BridgeError, Result};

/// Installs the global fmt subscriber, filtered by `directives` in
/// `EnvFilter` syntax (e.g. `"pagebridge=debug,pagebridge::exchange=trace"`).
///
/// Fails when the directives do not parse or a global subscriber is already set.
pub fn init_logging(directives: &str) -> Result<()> {
    let filter = EnvFilter::try_new(directives)
        .map_err(|err| BridgeError::Config(format!("log filter `{directives}`: {err}")))?;
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|err| BridgeError::Config(format!("tracing subscriber not installed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_directive() {
        match init_logging("pagebridge=notalevel") {
            Err(err @ BridgeError::Config(_)) => {
                assert!(err.to_string().contains("pagebridge=notalevel"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
