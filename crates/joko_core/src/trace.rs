use miette::{IntoDiagnostic, Result, WrapErr};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const LOG_FILE_NAME: &str = "jokolay.log";

/// Installs the global subscriber: a fmt layer on stderr and a non blocking one writing into `log_dir`.
/// The filter comes from `RUST_LOG`, `info` when absent.
/// The returned guard must be kept alive until exit, dropping it flushes the file.
pub fn install_tracing(log_dir: &std::path::Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .into_diagnostic()
        .wrap_err("failed to create log directory")?;
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_timer(fmt::time::uptime())
                .with_writer(writer),
        )
        .try_init()
        .into_diagnostic()
        .wrap_err("failed to install tracing subscriber")?;
    Ok(guard)
}
