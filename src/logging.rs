//! Log setup.
//! Native: stderr plus a daily rolling file in the platform data dir.
//! Browser: the webview's devtools console.

use tracing::Subscriber;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, Layer};

/// Plain `LEVEL message` lines at `info` and above, for a console that
/// timestamps and colors on its own.
pub fn console_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer::<S>()
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(writer)
        .with_filter(LevelFilter::INFO)
}

/// Route bridge logs to `console.*`. Safe to call again when the bridge is
/// re-injected into the same page; the first subscriber stays.
#[cfg(target_arch = "wasm32")]
pub fn init_console() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let installed = tracing_subscriber::registry()
        .with(console_layer(tracing_web::MakeWebConsoleWriter::new()))
        .try_init();
    if installed.is_ok() {
        tracing::debug!("[Logging] Console subscriber installed");
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::*;

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};

    use thiserror::Error;
    use time::macros::format_description;
    use time::UtcOffset;
    use tracing_appender::non_blocking::WorkerGuard;
    use tracing_subscriber::fmt::time::OffsetTime;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    const LOG_FILE_PREFIX: &str = "bridge.log";

    #[derive(Debug, Error)]
    pub enum LoggingError {
        #[error("No platform data directory available")]
        NoDataDir,
        #[error("Failed to create log directory: {0}")]
        Io(#[from] std::io::Error),
        #[error("A global subscriber is already installed: {0}")]
        Init(#[from] tracing_subscriber::util::TryInitError),
    }

    /// Default log directory (`<data dir>/logs`)
    pub fn log_dir() -> Result<PathBuf, LoggingError> {
        let dirs = directories::ProjectDirs::from("com", "TuneBar", "TuneBar")
            .ok_or(LoggingError::NoDataDir)?;
        Ok(dirs.data_local_dir().join("logs"))
    }

    /// Install the global subscriber. Keep the returned guard alive for the
    /// lifetime of the process or buffered file lines are lost.
    ///
    /// Filter comes from `RUST_LOG`, defaulting to `info`.
    pub fn init() -> Result<WorkerGuard, LoggingError> {
        init_in(&log_dir()?)
    }

    pub fn init_in(dir: &Path) -> Result<WorkerGuard, LoggingError> {
        std::fs::create_dir_all(dir)?;

        let file_appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

        // Local offset can be unavailable on multithreaded unix processes; UTC is fine then
        let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
        let timer = OffsetTime::new(
            offset,
            format_description!("[hour]:[minute]:[second].[subsecond digits:3]"),
        );

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_timer(timer.clone())
                    .with_writer(std::io::stderr),
            )
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_timer(timer)
                    .with_writer(file_writer),
            )
            .try_init()?;

        tracing::info!("[Logging] Writing logs to {}", dir.display());
        Ok(guard)
    }
}
