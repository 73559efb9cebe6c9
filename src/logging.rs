//! Log output for the command-line tools
//!
//! The library only emits `tracing` events; installing a subscriber is left
//! to the binaries. Logs always go to stderr since `bdiff` may be writing a
//! patch to stdout.

use std::io::{self, IsTerminal};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Map a `-V` count to a filter level
///
/// `0=warn, 1=info, 2=debug, 3+=trace`
pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG`, when set, takes precedence over `verbosity`.
pub fn init_logging(verbosity: u8) -> io::Result<()> {
    let level = level_for(verbosity);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("bdiff={level},bpatch={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal())
                .with_target(verbosity >= 3)
                .without_time(),
        )
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_for(0), "warn");
        assert_eq!(level_for(1), "info");
        assert_eq!(level_for(2), "debug");
        assert_eq!(level_for(3), "trace");
        assert_eq!(level_for(9), "trace");
    }

    #[test]
    fn test_second_init_fails() {
        // Whichever call wins, the global subscriber can only be set once.
        let first = init_logging(0);
        let second = init_logging(0);
        assert!(first.is_err() || second.is_err());
    }
}
