// Logging for Satchel
//
// Satchel logs through the `tracing` ecosystem. The library itself only emits
// events; a host decides whether and how they are shown by installing a
// subscriber, for which this module offers a few presets.
//
// # Usage Examples
//
// ```rust
// use satchel::logging;
//
// // INFO level, human-readable console output
// logging::init_default();
//
// // Or pick the settings yourself
// let config = logging::LogConfig {
//     level: tracing::Level::DEBUG,
//     json_format: false,
//     ..Default::default()
// };
// logging::init(config);
// ```
//
// Only the first initialization in a process takes effect. `RUST_LOG` is
// honoured on top of the configured level.

use std::fs::{File, OpenOptions};
use std::io;
use std::sync::{Mutex, Once};

use tracing::{Level, Subscriber};
use tracing_subscriber::{
    EnvFilter, Layer, filter::LevelFilter, fmt, prelude::*, registry::LookupSpan,
};

/// Configuration for the Satchel logging presets.
///
/// # Examples
///
/// ```rust
/// use satchel::logging::LogConfig;
/// use tracing::Level;
///
/// let config = LogConfig {
///     level: Level::DEBUG,
///     target_filters: Some("satchel::worker=trace".to_string()),
///     ..Default::default()
/// };
/// assert!(config.show_thread_info);
/// ```
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum log level to display
    pub level: Level,
    /// Whether to use JSON format for logs
    pub json_format: bool,
    /// Whether to include file and line information
    pub show_file_line: bool,
    /// Whether to include thread name/id; worker threads are named after their id
    pub show_thread_info: bool,
    /// Whether to include timestamps
    pub show_time: bool,
    /// Target filter expressions (format: "target=level,target2=level2,...")
    pub target_filters: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            show_file_line: true,
            show_thread_info: true,
            show_time: true,
            target_filters: None,
        }
    }
}

static INIT: Once = Once::new();

/// Initialize the logging system with the given configuration.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init(config: LogConfig) {
    INIT.call_once(|| {
        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer(&config));
        set_global_subscriber(subscriber);
    });
}

/// Initialize logging to both the console and an append-only file.
///
/// # Errors
/// Returns an error if the log file cannot be opened or created. Nothing is
/// installed in that case.
pub fn init_with_file(config: LogConfig, log_file: &str) -> io::Result<()> {
    let file = open_log_file(log_file)?;

    INIT.call_once(|| {
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .with_file(true)
            .with_line_number(true)
            .with_thread_names(true)
            .with_thread_ids(true);

        let subscriber = tracing_subscriber::registry()
            .with(env_filter(&config))
            .with(console_layer(&config))
            .with(file_layer);
        set_global_subscriber(subscriber);
    });

    Ok(())
}

fn env_filter(config: &LogConfig) -> EnvFilter {
    let mut env_filter =
        EnvFilter::from_default_env().add_directive(LevelFilter::from_level(config.level).into());

    if let Some(filters) = &config.target_filters {
        for filter in filters.split(',') {
            match filter.trim().parse() {
                Ok(directive) => env_filter = env_filter.add_directive(directive),
                Err(err) => eprintln!("Ignoring log filter {filter:?}: {err}"),
            }
        }
    }
    env_filter
}

fn console_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync + 'static>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    if config.json_format {
        return fmt::layer()
            .json()
            .flatten_event(true)
            .with_thread_names(config.show_thread_info)
            .with_thread_ids(config.show_thread_info)
            .boxed();
    }

    let layer = fmt::layer()
        .with_ansi(atty::is(atty::Stream::Stdout))
        .with_file(config.show_file_line)
        .with_line_number(config.show_file_line)
        .with_thread_names(config.show_thread_info)
        .with_thread_ids(config.show_thread_info);

    if config.show_time {
        layer.boxed()
    } else {
        layer.without_time().boxed()
    }
}

fn set_global_subscriber<S>(subscriber: S)
where
    S: Subscriber + Send + Sync + 'static,
{
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Error setting global tracing subscriber: {}", err);
    }
}

/// Opens `path` for appending, creating it if needed.
pub fn open_log_file(path: &str) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// INFO level, human-readable console output.
pub fn init_default() {
    init(LogConfig::default());
}

/// DEBUG level everywhere, per-item tracing for workers.
pub fn init_development() {
    init(LogConfig {
        level: Level::DEBUG,
        target_filters: Some("satchel=debug,satchel::worker=trace".to_string()),
        ..Default::default()
    });
}

/// JSON output at INFO level, without source locations.
pub fn init_production() {
    init(LogConfig {
        level: Level::INFO,
        json_format: true,
        show_file_line: false,
        show_thread_info: true,
        show_time: true,
        target_filters: None,
    });
}

/// Warnings and errors only, compact output.
pub fn init_test() {
    init(LogConfig {
        level: Level::WARN,
        json_format: false,
        show_file_line: true,
        show_thread_info: false,
        show_time: false,
        target_filters: None,
    });
}

/// Span covering one run of a worker pool.
///
/// ```rust
/// let span = satchel::pool_span!(uuid::Uuid::nil(), 4);
/// let _guard = span.enter();
/// ```
#[macro_export]
macro_rules! pool_span {
    ($run_id:expr, $workers:expr) => {
        tracing::info_span!("pool", run_id = %$run_id, workers = $workers)
    };
    ($run_id:expr, $workers:expr, $($fields:tt)*) => {
        tracing::info_span!("pool", run_id = %$run_id, workers = $workers, $($fields)*)
    };
}

/// Span covering the lifetime of one worker thread.
#[macro_export]
macro_rules! worker_span {
    ($run_id:expr, $worker_id:expr) => {
        tracing::debug_span!("worker", run_id = %$run_id, id = $worker_id)
    };
    ($run_id:expr, $worker_id:expr, $($fields:tt)*) => {
        tracing::debug_span!("worker", run_id = %$run_id, id = $worker_id, $($fields)*)
    };
}

/// Log a worker lifecycle event.
///
/// ```rust
/// satchel::log_worker!(0, "finished", processed = 12);
/// ```
#[macro_export]
macro_rules! log_worker {
    ($worker_id:expr, $event:expr) => {
        tracing::debug!(worker = $worker_id, event = $event)
    };
    ($worker_id:expr, $event:expr, $($fields:tt)*) => {
        tracing::debug!(worker = $worker_id, event = $event, $($fields)*)
    };
}
