//! Structured logging for Strata.
//!
//! Console output with uptime timestamps and thread names (worker threads are
//! named `chunk-gen-N` / `chunk-mesh-N`), plus a JSON log file in debug
//! builds. The level comes from `RUST_LOG`, then the config's
//! `debug.log_level`, then [`DEFAULT_DIRECTIVES`].

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use strata_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_DIRECTIVES: &str = "info,wgpu=warn,naga=warn";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "strata.log";

/// Filter directives taken from the config, falling back to the default.
pub fn config_directives(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    }
}

/// Create an `EnvFilter` with [`DEFAULT_DIRECTIVES`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_DIRECTIVES)
}

/// Opens (truncating) the JSON log file inside `log_dir`, creating the
/// directory if needed.
pub fn open_log_file(log_dir: &Path) -> Option<File> {
    std::fs::create_dir_all(log_dir).ok()?;
    File::create(log_dir.join(LOG_FILE_NAME)).ok()
}

/// Installs the global tracing subscriber.
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
///
/// ```no_run
/// use strata_config::Config;
/// use strata_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(std::path::Path::new("./logs")), cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) -> bool {
    let directives = config_directives(config);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry().with(env_filter).with(console_layer);

    if debug_build
        && let Some(log_dir) = log_dir
        && let Some(log_file) = open_log_file(log_dir)
    {
        let file_layer = fmt::layer()
            .with_writer(Mutex::new(log_file))
            .with_ansi(false)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(fmt::time::uptime())
            .json();
        return subscriber.with(file_layer).try_init().is_ok();
    }

    subscriber.try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        let filter = format!("{}", default_env_filter());
        assert!(filter.contains("wgpu=warn"));
        assert!(filter.contains("naga=warn"));
        assert!(filter.contains("info"));
    }

    #[test]
    fn test_config_level_overrides_default() {
        let mut config = Config::default();
        config.debug.log_level = "debug,strata_lighting=trace".to_string();
        assert_eq!(config_directives(Some(&config)), "debug,strata_lighting=trace");

        config.debug.log_level = "  ".to_string();
        assert_eq!(config_directives(Some(&config)), DEFAULT_DIRECTIVES);
        assert_eq!(config_directives(None), DEFAULT_DIRECTIVES);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,strata_render=trace",
            "warn,strata_mesh=debug,strata_voxel=trace",
            "error",
        ];
        for filter_str in valid_filters {
            assert!(EnvFilter::try_new(filter_str).is_ok(), "failed to parse {filter_str}");
        }
    }

    #[test]
    fn test_json_file_layer_writes_structured_lines() {
        let dir = tempfile::tempdir().unwrap();
        let file = open_log_file(&dir.path().join("logs")).unwrap();
        let layer = fmt::layer().with_writer(Mutex::new(file)).with_ansi(false).json();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(chunk = 3, "generated");
        });

        let contents = std::fs::read_to_string(dir.path().join("logs").join(LOG_FILE_NAME)).unwrap();
        let line = contents.lines().next().unwrap();
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["fields"]["message"], "generated");
        assert_eq!(value["fields"]["chunk"], 3);
    }

    #[test]
    fn test_second_init_is_rejected() {
        // The first call may lose to another test in this binary.
        let _ = init_logging(None, false, None);
        assert!(!init_logging(None, false, None));
    }
}
