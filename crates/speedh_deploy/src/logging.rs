//! Tracing setup shared by the binaries.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default directives when `RUST_LOG` is unset.
#[must_use]
pub const fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "speedh=debug,info"
    } else {
        "speedh=info,warn"
    }
}

/// Installs a compact stderr subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling it twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives_parse() {
        for verbose in [false, true] {
            assert!(default_directives(verbose).parse::<EnvFilter>().is_ok());
        }
    }

    #[test]
    fn test_init_twice() {
        init(false);
        init(true);
    }
}
