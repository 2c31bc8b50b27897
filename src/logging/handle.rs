use std::time::{Duration, Instant};

use tracing_appender::non_blocking::WorkerGuard;

/// Handle для управления lifecycle логирования.
///
/// Держит guard файлового вывода: пока handle жив, фоновый поток
/// записи работает и буфер не теряется.
#[derive(Debug)]
pub struct LoggingHandle {
    file_guard: Option<WorkerGuard>,
    shutdown_called: bool,
    /// Порог, после которого медленный сброс считается проблемой
    flush_timeout: Duration,
}

impl LoggingHandle {
    pub fn new(file_guard: Option<WorkerGuard>) -> Self {
        Self {
            file_guard,
            shutdown_called: false,
            flush_timeout: Duration::from_secs(5),
        }
    }

    pub fn with_flush_timeout(
        mut self,
        timeout: Duration,
    ) -> Self {
        self.flush_timeout = timeout;
        self
    }

    pub fn has_file_sink(&self) -> bool {
        self.file_guard.is_some()
    }

    /// Сбрасывает буферы и останавливает фоновую запись.
    pub fn shutdown(mut self) {
        self.shutdown_called = true;

        tracing::info!(
            file_sink = self.has_file_sink(),
            timeout_ms = self.flush_timeout.as_millis() as u64,
            "Initiating logging shutdown"
        );

        let start = Instant::now();
        drop(self.file_guard.take());
        let elapsed = start.elapsed();

        // После сброса guard файловый вывод уже остановлен.
        if elapsed > self.flush_timeout {
            eprintln!(
                "WARNING: Logging shutdown took {}ms (timeout: {}ms)",
                elapsed.as_millis(),
                self.flush_timeout.as_millis()
            );
        }
    }
}

impl Drop for LoggingHandle {
    fn drop(&mut self) {
        if !self.shutdown_called && self.file_guard.is_some() {
            eprintln!(
                "WARNING: LoggingHandle dropped without explicit shutdown(). \
                 Some logs may be lost. Call .shutdown() for graceful cleanup."
            )
        }
    }
}
