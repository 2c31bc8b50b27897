use tracing_subscriber::EnvFilter;

use crate::logging::config::LoggingConfig;

const FALLBACK_DIRECTIVE: &str = "info";

/// Фильтр событий: `RUST_LOG`, если задан, иначе директива из конфигурации.
///
/// Некорректная директива из конфигурации не роняет запуск, а заменяется
/// на `info`.
pub fn build_filter_from_config(config: &LoggingConfig) -> EnvFilter {
    if let Ok(env_filter) = EnvFilter::try_from_default_env() {
        return env_filter;
    }
    filter_from_directive(&config.filter_directive())
}

pub(crate) fn filter_from_directive(directive: &str) -> EnvFilter {
    match EnvFilter::try_new(directive) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!(
                "Invalid log filter directive from config ('{directive}'): {e}; falling back to '{FALLBACK_DIRECTIVE}'"
            );
            EnvFilter::new(FALLBACK_DIRECTIVE)
        }
    }
}
