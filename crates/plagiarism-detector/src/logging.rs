//! Tracing setup for the detector binaries and pipeline stage macros

use std::env;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Targets logged at the configured level
const DETECTOR_TARGETS: [&str; 4] =
    ["plagiarism_detector", "plagiarism_services", "detector", "detector_api"];

/// Dependencies pinned to their own level; `ignore` is chatty while walking checkouts
const DEPENDENCY_LEVELS: [(&str, &str); 5] = [
    ("tower_http", "debug"),
    ("axum", "info"),
    ("hyper", "warn"),
    ("reqwest", "warn"),
    ("ignore", "warn"),
];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable multi-line output
    Pretty,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: Level,
    pub format: LogFormat,
    pub include_location: bool,
    pub include_thread_ids: bool,
    pub include_timestamps: bool,
    /// Emit span enter/exit events
    pub log_spans: bool,
    /// `RUST_LOG`-style directives; replaces the per-target defaults
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            include_location: true,
            include_thread_ids: true,
            include_timestamps: true,
            log_spans: false,
            env_filter: None,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name).ok().and_then(|s| s.parse().ok()).unwrap_or(default)
}

impl LoggingConfig {
    /// Read `LOG_LEVEL`, `LOG_JSON_FORMAT`, `LOG_INCLUDE_*`, `LOG_SPANS` and `RUST_LOG`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let format = if env_flag("LOG_JSON_FORMAT", false) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        };

        Self {
            level: env::var("LOG_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.level),
            format,
            include_location: env_flag("LOG_INCLUDE_LOCATION", defaults.include_location),
            include_thread_ids: env_flag("LOG_INCLUDE_THREAD_IDS", defaults.include_thread_ids),
            include_timestamps: env_flag("LOG_INCLUDE_TIMESTAMPS", defaults.include_timestamps),
            log_spans: env_flag("LOG_SPANS", defaults.log_spans),
            env_filter: env::var("RUST_LOG").ok(),
        }
    }

    /// JSON events without source locations, for the API server
    pub fn production(self) -> Self {
        Self { format: LogFormat::Json, include_location: false, log_spans: false, ..self }
    }

    /// Pretty DEBUG output with locations and span events
    pub fn development(self) -> Self {
        Self {
            level: Level::DEBUG,
            format: LogFormat::Pretty,
            include_location: true,
            log_spans: true,
            ..self
        }
    }

    /// Install the global subscriber; fails if one is already set
    pub fn init_tracing(&self) -> Result<()> {
        let filter = self.build_env_filter()?;
        Registry::default().with(self.format_layer().with_filter(filter)).try_init()?;
        Ok(())
    }

    fn build_env_filter(&self) -> Result<EnvFilter> {
        if let Some(directives) = &self.env_filter {
            return Ok(EnvFilter::try_new(directives)?);
        }

        let mut filter = EnvFilter::default();
        for target in DETECTOR_TARGETS {
            filter = filter.add_directive(format!("{target}={}", self.level).parse()?);
        }
        for (target, level) in DEPENDENCY_LEVELS {
            filter = filter.add_directive(format!("{target}={level}").parse()?);
        }
        Ok(filter)
    }

    fn span_events(&self) -> FmtSpan {
        if self.log_spans { FmtSpan::ENTER | FmtSpan::EXIT } else { FmtSpan::NONE }
    }

    fn format_layer(&self) -> BoxedLayer {
        let base = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_thread_ids(self.include_thread_ids)
            .with_span_events(self.span_events());

        match self.format {
            LogFormat::Json => {
                let layer = base.json().with_current_span(true).with_span_list(true);
                if self.include_timestamps { layer.boxed() } else { layer.without_time().boxed() }
            }
            LogFormat::Pretty => {
                let layer = base.pretty().with_target(false);
                if self.include_timestamps { layer.boxed() } else { layer.without_time().boxed() }
            }
        }
    }
}

pub fn init_default_logging() -> Result<()> {
    LoggingConfig::from_env().init_tracing()
}

pub fn init_production_logging() -> Result<()> {
    LoggingConfig::from_env().production().init_tracing()
}

pub fn init_development_logging() -> Result<()> {
    LoggingConfig::from_env().development().init_tracing()
}

/// `log_stage_start!(stage, job_id, field = value, ...)`
#[macro_export]
macro_rules! log_stage_start {
    ($stage:expr, $job:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            stage = $stage,
            job_id = %$job,
            status = "started",
            $($field = $value,)*
            "▶️  Stage started"
        );
    };
}

/// `log_stage_success!(stage, job_id, elapsed, field = value, ...)`
#[macro_export]
macro_rules! log_stage_success {
    ($stage:expr, $job:expr, $elapsed:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            stage = $stage,
            job_id = %$job,
            status = "success",
            duration_ms = $elapsed.as_millis() as u64,
            $($field = $value,)*
            "✅ Stage completed"
        );
    };
}

/// `log_stage_error!(stage, job_id, error, field = value, ...)`
#[macro_export]
macro_rules! log_stage_error {
    ($stage:expr, $job:expr, $error:expr $(, $field:ident = $value:expr)* $(,)?) => {
        tracing::error!(
            stage = $stage,
            job_id = %$job,
            status = "error",
            error = %$error,
            $($field = $value,)*
            "❌ Stage failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_profiles() {
        let fixture = LoggingConfig { include_thread_ids: false, ..LoggingConfig::default() };

        let production = fixture.clone().production();
        let development = fixture.development();

        assert_eq!(production.format, LogFormat::Json);
        assert!(!production.include_location);
        assert_eq!(production.level, Level::INFO);
        assert_eq!(development.format, LogFormat::Pretty);
        assert_eq!(development.level, Level::DEBUG);
        assert!(development.log_spans);
        assert!(!development.include_thread_ids);
    }

    #[test]
    fn test_filter_directives() {
        let fixtures = vec![
            (None, true),
            (Some("plagiarism_detector=trace,tower_http=off"), true),
            (Some("plagiarism_detector=loudest"), false),
        ];

        for (directives, expected) in fixtures {
            let config = LoggingConfig {
                env_filter: directives.map(str::to_string),
                ..LoggingConfig::default()
            };
            let actual = config.build_env_filter().is_ok();
            assert_eq!(actual, expected, "Directives: {:?}", directives);
        }
    }
}
