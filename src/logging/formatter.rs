use std::io::{self, Stdout};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::Layer as LayerTrait,
    registry::LookupSpan,
};

use crate::logging::config::{LogFormat, LoggingConfig};

/// Консольный fmt-слой в формате из конфигурации.
///
/// Возвращаем boxed trait-объект, чтобы стереть конкретный тип формата
/// (json/pretty/compact).
pub fn build_formatter_from_config<S>(config: &LoggingConfig) -> Box<dyn LayerTrait<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let writer: fn() -> Stdout = io::stdout;

    match config.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(writer)
                .with_ansi(false)
                .with_target(config.with_target);
            Box::new(layer)
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .event_format(fmt::format().pretty())
                .with_span_events(FmtSpan::CLOSE)
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target)
                .with_line_number(true);
            Box::new(layer)
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .event_format(fmt::format().compact())
                .with_writer(writer)
                .with_ansi(config.with_ansi)
                .with_target(config.with_target);
            Box::new(layer)
        }
    }
}
