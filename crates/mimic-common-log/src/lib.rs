//! Logging infrastructure for mimic.
//!
//! The model itself only emits `tracing` events; binaries and test suites
//! decide where they go by calling [`init`] or [`init_for_tests`].

use std::io;
use std::path::PathBuf;
use std::sync::Once;

use tracing_subscriber::{
    fmt::{self, format::FmtSpan, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Environment variable holding the level (or filter directives).
pub const LEVEL_ENV: &str = "MIMIC_LOG_LEVEL";
pub const FORMAT_ENV: &str = "MIMIC_LOG_FORMAT";
pub const FILE_ENV: &str = "MIMIC_LOG_FILE";
pub const SOURCE_ENV: &str = "MIMIC_LOG_SOURCE";
pub const SPANS_ENV: &str = "MIMIC_LOG_SPANS";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level.
    pub level: LogLevel,
    /// Filter directives such as `mimic_core=trace`; override `level`.
    pub directives: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Also append to this file.
    pub file_path: Option<PathBuf>,
    pub timestamps: bool,
    /// Include file and line of the event.
    pub source_location: bool,
    /// Emit span open/close events.
    pub span_events: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl From<LogLevel> for tracing_subscriber::filter::LevelFilter {
    fn from(level: LogLevel) -> Self {
        use tracing_subscriber::filter::LevelFilter;
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Multi-field human-readable lines.
    #[default]
    Pretty,
    Compact,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            "compact" => Self::Compact,
            _ => Self::Pretty,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            directives: None,
            format: LogFormat::default(),
            file_path: None,
            timestamps: true,
            source_location: false,
            span_events: false,
        }
    }
}

impl LogConfig {
    /// Read `MIMIC_LOG_*` variables, falling back to `RUST_LOG` for the level.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(level) = lookup(LEVEL_ENV).or_else(|| lookup("RUST_LOG")) {
            match LogLevel::parse(&level) {
                Some(level) => config.level = level,
                None if !level.trim().is_empty() => config.directives = Some(level),
                None => {}
            }
        }
        if let Some(format) = lookup(FORMAT_ENV) {
            config.format = LogFormat::parse(&format);
        }
        if let Some(file_path) = lookup(FILE_ENV) {
            config.file_path = Some(PathBuf::from(file_path));
        }
        if let Some(source) = lookup(SOURCE_ENV) {
            config.source_location = is_enabled(&source);
        }
        if let Some(spans) = lookup(SPANS_ENV) {
            config.span_events = is_enabled(&spans);
        }

        config
    }

    fn filter(&self) -> Result<EnvFilter, LogError> {
        match &self.directives {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|e| LogError::Filter(e.to_string()))
            }
            None => Ok(EnvFilter::new(self.level.as_str())),
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

fn is_enabled(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn fmt_layer<W>(config: &LogConfig, writer: W, ansi: bool) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(true)
        .with_file(config.source_location)
        .with_line_number(config.source_location)
        .with_span_events(config.span_events());

    match (config.format, config.timestamps) {
        (LogFormat::Pretty, true) => layer.boxed(),
        (LogFormat::Pretty, false) => layer.without_time().boxed(),
        (LogFormat::Compact, true) => layer.compact().boxed(),
        (LogFormat::Compact, false) => layer.compact().without_time().boxed(),
        (LogFormat::Json, true) => layer.json().boxed(),
        (LogFormat::Json, false) => layer.json().without_time().boxed(),
    }
}

/// Install the global subscriber described by `config`.
pub fn init(config: LogConfig) -> Result<(), LogError> {
    let filter = config.filter()?;
    let mut layers: Vec<BoxedLayer> = vec![fmt_layer(&config, io::stderr, true)];

    if let Some(file_path) = &config.file_path {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file_path)?;
        layers.push(fmt_layer(&config, file, false));
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LogError::Init(e.to_string()))
}

static TEST_INIT: Once = Once::new();

/// Route events to the test harness's captured output. Safe to call from
/// every test; only the first call installs anything.
pub fn init_for_tests() {
    TEST_INIT.call_once(|| {
        let config = LogConfig::from_env();
        let filter = config
            .filter()
            .unwrap_or_else(|_| EnvFilter::new(LogLevel::default().as_str()));
        // Another subscriber may already be installed by the test binary.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().compact().with_test_writer())
            .with(filter)
            .try_init();
    });
}

/// Logging errors.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to initialize logging: {0}")]
    Init(String),

    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to open log file: {0}")]
    File(#[from] io::Error),
}

pub use tracing::{debug, error, info, trace, warn};
