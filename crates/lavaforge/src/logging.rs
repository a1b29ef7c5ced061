//! Log output for applications built on Lavaforge.
//!
//! The library crates only emit `tracing` events. Binaries call [`init`]
//! once at startup to print them.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, or by
/// `default_directive` when `RUST_LOG` is unset or invalid.
///
/// `default_directive` is an `EnvFilter` directive such as `"info"` or
/// `"lavaforge_session=debug,info"`, typically the `log_level` of the
/// node configuration.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}
