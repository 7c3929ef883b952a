use crate::core::config::LoggingConfig;
use anyhow::Context;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// HTTP plumbing that is noisy at debug level. Applied only when `RUST_LOG`
/// is not set.
const QUIET_TARGETS: &[&str] = &["hyper_util=warn", "hyper=warn", "cookie_store=warn"];

/// Install the global subscriber. Fails instead of panicking when the
/// embedding application already installed one.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let env_directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(&config.level, env_directives.as_deref())?;

    let console = config.console || config.format == "console";
    let console_layer = console.then(|| fmt::layer().with_line_number(true));
    let json_layer = (!console).then(|| fmt::layer().json().flatten_event(true));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!(level = %config.level, console, "Tracing initialized");
    Ok(())
}

/// `RUST_LOG` directives win over the configured level.
fn build_filter(level: &str, env_directives: Option<&str>) -> anyhow::Result<EnvFilter> {
    if let Some(directives) = env_directives.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::builder()
            .parse(directives)
            .with_context(|| format!("Invalid {} directives '{directives}'", EnvFilter::DEFAULT_ENV));
    }

    let level: LevelFilter = level
        .parse()
        .with_context(|| format!("Invalid log level '{level}'"))?;
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .parse("")?;
    for target in QUIET_TARGETS {
        filter = filter.add_directive(target.parse()?);
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_configured_level() {
        let filter = build_filter("debug", None).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));

        let rendered = filter.to_string();
        assert!(rendered.contains("hyper_util=warn"));
        assert!(rendered.contains("debug"));
    }

    #[test]
    fn test_env_directives_override_level() {
        let filter = build_filter("info", Some("padel_client=trace")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
        assert!(!filter.to_string().contains("hyper_util"));

        // Blank RUST_LOG falls back to the configured level
        let filter = build_filter("warn", Some("  ")).unwrap();
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn test_invalid_level_is_rejected() {
        assert!(build_filter("verbose", None).is_err());
        assert!(build_filter("info", Some("padel_client=loud")).is_err());
    }

    #[test]
    fn test_second_init_reports_error() {
        let config = LoggingConfig::default();
        // Another test may have installed a subscriber first; either way a
        // repeated install must not panic.
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
