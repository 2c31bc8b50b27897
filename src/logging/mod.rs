//! Логирование на `tracing`: фильтр, консольный вывод и, по желанию,
//! файловый вывод с ежедневной ротацией.

pub mod config;
mod filters;
mod formatter;
pub mod handle;
pub mod sinks;

pub use config::{FileLogConfig, LogFormat, LoggingConfig};
pub use handle::LoggingHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry};

use crate::error::OperatorError;

/// Инициализация логирования с конфигурацией.
///
/// Устанавливает глобальный subscriber, поэтому вызывается один раз на
/// процесс. Возвращённый handle нужно закрыть через
/// [`LoggingHandle::shutdown`].
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingHandle, OperatorError> {
    config.validate()?;
    config.ensure_log_dir()?;

    let env_filter = filters::build_filter_from_config(config);
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(sinks::console::layer_with_config(config));

    let file_guard = match &config.file {
        Some(file) => {
            let (file_layer, guard) = sinks::file::layer_with_config(file, config.format);
            layers.push(file_layer);
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .map_err(|e| OperatorError::Logging(e.to_string()))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = %config.format,
        file_enabled = config.file.is_some(),
        "Logging system initialized"
    );

    Ok(LoggingHandle::new(file_guard))
}
