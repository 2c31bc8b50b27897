//! Настройки процесса: значения по умолчанию, файл, переменные окружения
//! `OPERATOR_*` и флаги командной строки (в порядке возрастания приоритета).

pub mod settings;

pub use settings::{Settings, SettingsOverrides, ENV_PREFIX};
