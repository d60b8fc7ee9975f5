//! Tracing subscriber setup for the `oneview` binary.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LEVEL: &str = "warn";

/// Filter directive used when `RUST_LOG` is unset: `level` for everything,
/// and the same level for this crate.
pub fn default_directive(level: &str) -> String {
    let level = if level.trim().is_empty() {
        DEFAULT_LEVEL
    } else {
        level.trim()
    };
    format!("{level},{}={level}", env!("CARGO_CRATE_NAME"))
}

/// Install a stderr fmt subscriber. `RUST_LOG` takes precedence over `level`.
pub fn init(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive(level)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("debug"), "debug,oneview=debug");
        assert_eq!(default_directive(" "), "warn,oneview=warn");
    }

    #[test]
    fn test_directive_parses() {
        assert!(EnvFilter::try_new(default_directive("info")).is_ok());
    }
}
