use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const DEFAULT_FILTER: &str = "paperchat=debug,paperchat_core=debug,info";

/// Log directory under the platform data dir, or `./logs` as a fallback.
pub fn log_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("paperchat").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// File logging always; stderr only for one-shot commands, since the TUI
/// owns the terminal.
pub fn init_tracing(to_stderr: bool) -> tracing_appender::non_blocking::WorkerGuard {
    let file_appender = tracing_appender::rolling::never(log_dir(), "paperchat.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    let stderr_layer = to_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(tracing_subscriber::filter::LevelFilter::WARN)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking),
        )
        .init();

    guard
}
