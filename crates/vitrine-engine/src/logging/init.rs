use std::sync::Once;

/// GPU backend crates that are noisy at `info`.
const BACKEND_TARGETS: &[&str] = &["wgpu_core", "wgpu_hal", "naga"];

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info",
/// "vitrine_engine=debug,wgpu_core=warn"). When unset, `RUST_LOG` is used, and
/// failing that `default_level`.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub default_level: log::LevelFilter,
    /// Caps GPU backend crates at `warn` unless the filter names them.
    pub quiet_backends: bool,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            default_level: log::LevelFilter::Info,
            quiet_backends: true,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

/// Resolves the filter string from the config and the `RUST_LOG` value.
fn effective_filter(config: &LoggingConfig, env: Option<&str>) -> String {
    let mut filter = config
        .env_filter
        .as_deref()
        .or(env)
        .map(str::to_owned)
        .unwrap_or_else(|| config.default_level.to_string().to_lowercase());

    if config.quiet_backends {
        for target in BACKEND_TARGETS {
            if !filter.contains(target) {
                filter.push_str(&format!(",{target}=warn"));
            }
        }
    }
    filter
}

static INIT: Once = Once::new();

/// Initializes the global logger once. Later calls are ignored.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let filter = effective_filter(&config, env.as_deref());

        env_logger::Builder::new()
            .parse_filters(&filter)
            .write_style(config.write_style)
            .init();

        log::debug!("logging initialized with filter {filter:?}");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_filter_wins_over_env() {
        let config = LoggingConfig {
            env_filter: Some("debug".into()),
            quiet_backends: false,
            ..LoggingConfig::default()
        };
        assert_eq!(effective_filter(&config, Some("trace")), "debug");
    }

    #[test]
    fn env_is_used_when_no_filter_configured() {
        let config = LoggingConfig {
            quiet_backends: false,
            ..LoggingConfig::default()
        };
        assert_eq!(effective_filter(&config, Some("warn")), "warn");
    }

    #[test]
    fn default_level_is_the_fallback() {
        let config = LoggingConfig {
            quiet_backends: false,
            ..LoggingConfig::default()
        };
        assert_eq!(effective_filter(&config, None), "info");
    }

    #[test]
    fn backends_are_capped_unless_named() {
        let config = LoggingConfig {
            env_filter: Some("info,naga=debug".into()),
            ..LoggingConfig::default()
        };
        assert_eq!(
            effective_filter(&config, None),
            "info,naga=debug,wgpu_core=warn,wgpu_hal=warn"
        );
    }
}
