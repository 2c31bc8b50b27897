use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::Layer as LayerTrait, registry::LookupSpan};

use crate::logging::config::{FileLogConfig, LogFormat};

/// Файловый слой: ежедневная ротация, неблокирующая запись.
///
/// Возвращённый `WorkerGuard` нужно держать до конца работы процесса,
/// иначе буфер не будет сброшен.
pub fn layer_with_config<S>(
    file: &FileLogConfig,
    format: LogFormat,
) -> (Box<dyn LayerTrait<S> + Send + Sync>, WorkerGuard)
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let appender = rolling::daily(&file.dir, &file.prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer: Box<dyn LayerTrait<S> + Send + Sync> = match format {
        LogFormat::Json => Box::new(fmt::layer().json().with_ansi(false).with_writer(writer)),
        LogFormat::Pretty | LogFormat::Compact => {
            Box::new(fmt::layer().with_ansi(false).with_writer(writer))
        }
    };

    (layer, guard)
}
