use std::{path::Path, time::Duration};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    error::{OperatorError, OperatorResult},
    logging::{LogFormat, LoggingConfig},
    rendezvous::EngineConfig,
};

/// Префикс переменных окружения: `OPERATOR_BIND_ADDR`,
/// `OPERATOR_ENGINE__REQUEST_QUEUE_CAPACITY`, `OPERATOR_LOGGING__LEVEL`.
pub const ENV_PREFIX: &str = "OPERATOR";

pub const DEFAULT_BIND_ADDR: &str = "localhost:8000";
/// 128 KiB
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 128 * 1024;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Адрес HTTP-сервера
    pub bind_addr: String,
    /// Максимальная длина поля `data` в байтах
    pub max_message_size: usize,
    /// Сколько HTTP-запрос ждёт встречную сторону
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Значения из командной строки. `None`: флаг не задан.
#[derive(Debug, Default, Clone)]
pub struct SettingsOverrides {
    pub bind_addr: Option<String>,
    pub max_message_size: Option<usize>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl Settings {
    /// Собирает настройки из всех источников и проверяет их.
    pub fn load(
        config_file: Option<&Path>,
        overrides: &SettingsOverrides,
    ) -> OperatorResult<Self> {
        let mut builder = Config::builder()
            // Значения по умолчанию
            .set_default("bind_addr", DEFAULT_BIND_ADDR)?
            .set_default("max_message_size", DEFAULT_MAX_MESSAGE_SIZE as i64)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let cfg = builder
            // Переменные окружения с префиксом OPERATOR_
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            // Флаги командной строки
            .set_override_option("bind_addr", overrides.bind_addr.clone())?
            .set_override_option(
                "max_message_size",
                overrides.max_message_size.map(|v| v as i64),
            )?
            .set_override_option(
                "request_timeout_secs",
                overrides.request_timeout_secs.map(|v| v as i64),
            )?
            .set_override_option("logging.level", overrides.log_level.clone())?
            .set_override_option(
                "logging.format",
                overrides.log_format.map(|f| f.to_string()),
            )?
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> OperatorResult<()> {
        if self.bind_addr.trim().is_empty() {
            return Err(OperatorError::InvalidConfig("bind_addr is empty".into()));
        }
        if self.max_message_size == 0 {
            return Err(OperatorError::InvalidConfig(
                "max_message_size must be positive".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(OperatorError::InvalidConfig(
                "request_timeout_secs must be positive".into(),
            ));
        }
        if self.engine.request_queue_capacity == 0 {
            return Err(OperatorError::InvalidConfig(
                "engine.request_queue_capacity must be positive".into(),
            ));
        }
        self.logging.validate()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            engine: EngineConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
