use std::path::PathBuf;

use once_cell::sync::OnceCell;
use tracing_subscriber::{
    fmt, fmt::time::UtcTime, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::error::{AppError, AppResult};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();
static LOGGER_GUARD: OnceCell<tracing_appender::non_blocking::WorkerGuard> = OnceCell::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,planet::calendar=debug,planet::solver=debug";
const LOG_FILE_PREFIX: &str = "planet.log";

#[derive(Debug, Clone, Default)]
pub struct LoggingOptions {
    /// Directory for the daily rolling log file; stdout only when `None`.
    pub log_dir: Option<PathBuf>,
    /// Overrides `DEFAULT_LOG_DIRECTIVES` when `RUST_LOG` is not set.
    pub directives: Option<String>,
}

pub fn init_logging(options: &LoggingOptions) -> AppResult<()> {
    LOGGER_INIT
        .get_or_try_init(|| {
            let default_directives = options
                .directives
                .as_deref()
                .unwrap_or(DEFAULT_LOG_DIRECTIVES);
            let env_filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_directives))
                .map_err(|err| AppError::validation(format!("invalid log directives: {err}")))?;

            let file_layer = match &options.log_dir {
                Some(log_dir) => {
                    std::fs::create_dir_all(log_dir)?;
                    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
                    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                    LOGGER_GUARD
                        .set(guard)
                        .map_err(|_| AppError::validation("logging already initialised"))?;
                    Some(
                        fmt::layer()
                            .with_writer(non_blocking)
                            .with_ansi(false)
                            .with_target(true)
                            .with_timer(UtcTime::rfc_3339()),
                    )
                }
                None => None,
            };

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_timer(UtcTime::rfc_3339()),
                )
                .try_init()
                .map_err(|err| AppError::validation(format!("failed to install subscriber: {err}")))?;

            Ok(())
        })
        .map(|_| ())
}
