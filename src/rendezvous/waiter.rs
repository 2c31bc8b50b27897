use tokio::sync::{mpsc, oneshot, watch};

use super::{
    context::{wait_cancelled, Context},
    registry::WaiterId,
};
use crate::RendezvousError;

/// Роль ожидающего: в каком реестре он зарегистрирован.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Publish,
    Subscribe,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publish => "publish",
            Self::Subscribe => "subscribe",
        }
    }
}

/// Одноразовая точка передачи значения.
///
/// Передача неблокирующая: значение либо принято, либо сразу возвращается
/// отправителю (получатель уже ушёл). Отправка поглощает точку, поэтому
/// выиграть её может только одна сторона.
#[derive(Debug)]
pub struct Handoff<T> {
    tx: oneshot::Sender<T>,
}

impl<T> Handoff<T> {
    pub fn channel() -> (Self, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Попытка передать значение. `Err(value)`: получатель уже не ждёт.
    pub fn offer(
        self,
        value: T,
    ) -> Result<(), T> {
        self.tx.send(value)
    }
}

/// Ожидающая публикация: данные и точка подтверждения.
#[derive(Debug)]
pub struct PendingPublish {
    pub data: String,
    pub ack: Handoff<()>,
}

/// Ожидающая подписка: точка приёма данных.
#[derive(Debug)]
pub struct PendingSubscribe {
    pub slot: Handoff<String>,
}

/// Запрос координатору на удаление ожидающего из реестра.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregister {
    pub role: Role,
    pub address: String,
    pub id: WaiterId,
}

/// Отправляет [`Unregister`] при удалении, если не разоружён.
///
/// Гарантирует очистку реестра и тогда, когда future вызова просто
/// выброшен (например, HTTP-клиент отключился).
#[derive(Debug)]
struct UnregisterGuard {
    request: Option<Unregister>,
    tx: mpsc::UnboundedSender<Unregister>,
}

impl UnregisterGuard {
    fn disarm(&mut self) {
        self.request = None;
    }
}

impl Drop for UnregisterGuard {
    fn drop(&mut self) {
        if let Some(request) = self.request.take() {
            // Координатор мог уже завершиться: тогда чистить нечего.
            let _ = self.tx.send(request);
        }
    }
}

/// Припаркованный вызов. Разрешается ровно один раз:
/// передачей, завершением контекста или закрытием движка.
#[derive(Debug)]
pub struct Parked<T> {
    rx: oneshot::Receiver<T>,
    guard: UnregisterGuard,
}

impl<T> Parked<T> {
    pub(crate) fn new(
        unregister: Unregister,
        rx: oneshot::Receiver<T>,
        tx: mpsc::UnboundedSender<Unregister>,
    ) -> Self {
        Self {
            rx,
            guard: UnregisterGuard {
                request: Some(unregister),
                tx,
            },
        }
    }

    /// Ждёт передачи значения.
    ///
    /// Если контекст завершился или движок закрыт, приёмник закрывается и
    /// делается последняя неблокирующая попытка чтения: значение, уже
    /// отданное встречной стороной, не теряется.
    pub async fn wait(
        mut self,
        ctx: &Context,
        closed: watch::Receiver<bool>,
    ) -> Result<T, RendezvousError> {
        let outcome = tokio::select! {
            biased;
            value = &mut self.rx => value.map_err(|_| RendezvousError::Closed),
            reason = ctx.done() => Err(reason.into()),
            _ = wait_cancelled(Some(closed)) => Err(RendezvousError::Closed),
        };

        let result = match outcome {
            Ok(value) => Ok(value),
            Err(err) => {
                self.rx.close();
                self.rx.try_recv().map_err(|_| err)
            }
        };

        // После успешной передачи координатор уже убрал запись из реестра.
        if result.is_ok() {
            self.guard.disarm();
        }
        result
    }
}
