//! Opt-in `tracing` subscriber for binaries and examples built on geodyn.
//!
//! The library crates only emit events; nothing is printed unless a
//! subscriber is installed, either by the caller or through [`init`].

use std::error::Error;

use tracing_subscriber::EnvFilter;

/// All workspace crate targets that should receive log output.
const CRATE_TARGETS: &[&str] = &[
    "geodyn",
    "geodyn_lisa",
    "geodyn_markov",
    "geodyn_spatial",
    "geodyn_stats",
];

/// Filter directives for a verbosity level.
///
/// Mapping:
/// - 0 -> warn
/// - 1 -> info (chain classification summaries, permutation results)
/// - 2 -> debug
/// - 3+ -> trace
pub fn filter_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    CRATE_TARGETS
        .iter()
        .map(|t| format!("{t}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs a global formatting subscriber for the geodyn crates.
///
/// `RUST_LOG` overrides the verbosity level if set.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init(verbosity: u8) -> Result<(), Box<dyn Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));

    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_cover_every_crate() {
        let d = filter_directives(1);
        for target in CRATE_TARGETS {
            assert!(d.contains(&format!("{target}=info")));
        }
        assert!(filter_directives(0).starts_with("geodyn=warn"));
        assert!(filter_directives(9).ends_with("geodyn_stats=trace"));
    }

    #[test]
    fn second_init_fails() {
        let _ = init(0);
        assert!(init(0).is_err());
    }
}
