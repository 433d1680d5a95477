use std::io;
use std::path::PathBuf;

use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime, time::UtcTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::cli::types::{LogFormat, LogLevel};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file_prefix: Option<String>,
    pub directory: PathBuf,
    pub max_log_files: usize,
}

/// Install the global subscriber. The returned guard flushes the file writer
/// on drop and must be held for as long as the process logs.
pub fn configure_global_tracing(
    config: LogConfig,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error + Send + Sync>> {
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second]Z"
    ));

    let level = config.level.as_tracing_level();
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("dump_cache={}", level).parse()?)
        .add_directive("tower_http=info".parse()?)
        .add_directive("tokio=warn".parse()?)
        .add_directive("hyper=warn".parse()?);

    let mut layers = vec![console_layer(config.format, timer.clone())];
    let mut guard = None;

    if let Some(prefix) = &config.file_prefix {
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .max_log_files(config.max_log_files)
            .build(&config.directory)?;
        let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

        layers.push(file_layer(config.format, timer, non_blocking_file));
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    Ok(guard)
}

fn console_layer<T>(format: LogFormat, timer: T) -> BoxedLayer
where
    T: FormatTime + Send + Sync + 'static,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_ids(true)
            .with_line_number(false)
            .with_file(true)
            .with_timer(timer)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(timer)
            .with_writer(io::stdout)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_timer(timer)
            .with_writer(io::stdout)
            .boxed(),
    }
}

fn file_layer<T>(
    format: LogFormat,
    timer: T,
    writer: tracing_appender::non_blocking::NonBlocking,
) -> BoxedLayer
where
    T: FormatTime + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_timer(timer)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_thread_ids(true)
            .with_ansi(false)
            .with_timer(timer)
            .with_writer(writer)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(false)
            .with_timer(timer)
            .with_writer(writer)
            .boxed(),
    }
}
