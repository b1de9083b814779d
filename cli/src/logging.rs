use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

/// Directives layered on top of whatever level is chosen, so a `debug` run
/// is not drowned in HTTP internals.
const QUIET_DEPENDENCIES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn"];

fn build_filter(rust_log: Option<&str>, default_level: &str) -> EnvFilter {
    let mut filter = match rust_log {
        Some(directive) if !directive.trim().is_empty() => EnvFilter::new(directive),
        _ => EnvFilter::new(default_level),
    };
    for directive in QUIET_DEPENDENCIES {
        if let Ok(d) = directive.parse() {
            filter = filter.add_directive(d);
        }
    }
    filter
}

/// Install the global subscriber, writing to stderr. `RUST_LOG` wins over
/// `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    let rust_log = std::env::var("RUST_LOG").ok();
    fmt()
        .with_env_filter(build_filter(rust_log.as_deref(), default_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}
