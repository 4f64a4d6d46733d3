//! File logging setup
//!
//! The menu owns the terminal, so there is no console layer: events go to a
//! daily rolling file or nowhere. Audit events use the `jumpbox::audit` target.

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use jumpbox_core::config::LogSettings;

/// Returns a guard that must be kept alive for the duration of the program.
/// `RUST_LOG` overrides the configured level.
pub fn init_logging(settings: &LogSettings) -> anyhow::Result<Option<WorkerGuard>> {
    let Some(dir) = &settings.dir else {
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))?;

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.level)
            .with_context(|| format!("invalid log level '{}'", settings.level))?,
    };

    let file_appender = tracing_appender::rolling::daily(dir, "jumpbox.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("logging already initialized")?;

    Ok(Some(guard))
}
