use std::{fmt, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::OperatorError;

/// Формат вывода логов в консоль.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Многострочный, для разработки
    Pretty,
    /// Однострочный
    #[default]
    Compact,
    /// Структурированный JSON, для сборщиков логов
    Json,
}

/// Настройки логирования.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Уровень или полная директива `EnvFilter` ("debug",
    /// "operator=debug,tower_http=info"). `RUST_LOG` имеет приоритет.
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    /// Дублирование логов в файл с ежедневной ротацией.
    pub file: Option<FileLogConfig>,
}

/// Файловый вывод логов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLogConfig {
    pub dir: PathBuf,
    #[serde(default = "default_file_prefix")]
    pub prefix: String,
}

impl LoggingConfig {
    /// Директива для `EnvFilter`, собранная из конфигурации.
    pub fn filter_directive(&self) -> String {
        self.level.trim().to_string()
    }

    pub fn validate(&self) -> Result<(), OperatorError> {
        if self.level.trim().is_empty() {
            return Err(OperatorError::InvalidConfig("logging.level is empty".into()));
        }
        if let Some(file) = &self.file {
            if file.prefix.trim().is_empty() {
                return Err(OperatorError::InvalidConfig(
                    "logging.file.prefix is empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Создаёт каталог для файлового вывода, если он включён.
    pub fn ensure_log_dir(&self) -> Result<(), OperatorError> {
        if let Some(file) = &self.file {
            std::fs::create_dir_all(&file.dir)?;
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            file: None,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Compact => "compact",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for LogFormat {
    type Err = OperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(OperatorError::InvalidConfig(format!(
                "unknown log format: {other}"
            ))),
        }
    }
}

fn default_file_prefix() -> String {
    "operator.log".to_string()
}
