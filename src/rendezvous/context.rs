use std::{future::pending, sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    time::{sleep_until, Instant},
};

pub use operator_error::ContextError;

/// Контекст вызова: сигнал отмены плюс необязательный дедлайн.
///
/// Передаётся в каждую блокирующую операцию движка. Дешёво клонируется;
/// производные контексты наследуют отмену родителя.
#[derive(Debug, Clone)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Ручка отмены для контекста, созданного через [`Context::with_cancel`].
///
/// Отмена идемпотентна. Удаление ручки без вызова `cancel()` контекст не
/// отменяет.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Context {
    /// Контекст без отмены и без дедлайна.
    pub fn background() -> Self {
        Self {
            cancel: None,
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            cancel: None,
            deadline: Some(deadline),
        }
    }

    /// Контекст, который можно отменить явно через возвращённую ручку.
    pub fn with_cancel() -> (Self, CancelHandle) {
        let (tx, rx) = watch::channel(false);
        let ctx = Self {
            cancel: Some(rx),
            deadline: None,
        };
        (ctx, CancelHandle { tx: Arc::new(tx) })
    }

    /// Производный контекст: отмена наследуется, дедлайн: более ранний из
    /// родительского и `now + timeout`.
    pub fn child_with_timeout(
        &self,
        timeout: Duration,
    ) -> Self {
        let own = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(parent) if parent < own => parent,
            _ => own,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Неблокирующая проверка: завершён ли контекст.
    ///
    /// Явная отмена имеет приоритет над дедлайном.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Ожидает завершения контекста и возвращает причину.
    ///
    /// Для контекста без отмены и дедлайна никогда не завершается.
    pub async fn done(&self) -> ContextError {
        let cancelled = wait_cancelled(self.cancel.clone());
        let expired = async {
            match self.deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => ContextError::Cancelled,
            _ = expired => ContextError::DeadlineExceeded,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl CancelHandle {
    /// Отменяет связанный контекст и все производные от него.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Ждёт флага `true` в watch-канале.
///
/// Если отправитель удалён, не отменив контекст, отмены уже не будет:
/// future остаётся в ожидании навсегда.
pub(crate) async fn wait_cancelled(rx: Option<watch::Receiver<bool>>) {
    let Some(mut rx) = rx else {
        return pending().await;
    };
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            return pending().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что фоновый контекст не завершается сам по себе.
    #[tokio::test]
    async fn test_background_never_done() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err());
    }

    /// Тест проверяет срабатывание дедлайна (виртуальное время).
    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires() {
        let ctx = Context::with_timeout(Duration::from_secs(5));
        assert!(ctx.err().is_none());

        let reason = ctx.done().await;
        assert_eq!(reason, ContextError::DeadlineExceeded);
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancel_fires() {
        let (ctx, handle) = Context::with_cancel();
        let waiter = tokio::spawn({
            let ctx = ctx.clone();
            async move { ctx.done().await }
        });

        handle.cancel();
        assert_eq!(waiter.await.unwrap(), ContextError::Cancelled);
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
        assert!(handle.is_cancelled());
    }

    /// Тест проверяет, что повторная отмена безопасна.
    #[tokio::test]
    async fn test_cancel_is_idempotent() {
        let (ctx, handle) = Context::with_cancel();
        handle.cancel();
        handle.cancel();
        assert_eq!(ctx.done().await, ContextError::Cancelled);
    }

    /// Тест проверяет, что удаление ручки без отмены контекст не отменяет.
    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let (ctx, handle) = Context::with_cancel();
        drop(handle);

        assert!(ctx.err().is_none());
        let res = tokio::time::timeout(Duration::from_millis(20), ctx.done()).await;
        assert!(res.is_err());
    }

    /// Тест проверяет, что производный контекст наследует отмену и берёт
    /// более ранний дедлайн.
    #[tokio::test(start_paused = true)]
    async fn test_child_inherits_cancel_and_earlier_deadline() {
        let (parent, handle) = Context::with_cancel();
        let child = parent.child_with_timeout(Duration::from_secs(30));
        handle.cancel();
        assert_eq!(child.done().await, ContextError::Cancelled);

        let short = Context::with_timeout(Duration::from_secs(1));
        let child = short.child_with_timeout(Duration::from_secs(30));
        assert_eq!(child.deadline(), short.deadline());
    }

    /// Тест проверяет приоритет явной отмены над истёкшим дедлайном.
    #[tokio::test(start_paused = true)]
    async fn test_cancel_wins_over_deadline() {
        let (parent, handle) = Context::with_cancel();
        let child = parent.child_with_timeout(Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(5)).await;
        handle.cancel();

        assert_eq!(child.err(), Some(ContextError::Cancelled));
        assert_eq!(child.done().await, ContextError::Cancelled);
    }
}
