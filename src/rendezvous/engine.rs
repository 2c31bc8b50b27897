use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::{debug, info, trace};

use super::{
    context::{wait_cancelled, Context},
    registry::{WaiterId, WaiterRegistry},
    stats::{EngineStats, StatsSnapshot},
    waiter::{Handoff, Parked, PendingPublish, PendingSubscribe, Role, Unregister},
};
use crate::RendezvousError;

/// Ёмкость очереди запросов к координатору по умолчанию.
pub const DEFAULT_REQUEST_QUEUE_CAPACITY: usize = 1024;

/// Настройки движка.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Сколько запросов может ждать координатора, прежде чем `publish` /
    /// `subscribe` начнут ждать места в очереди.
    #[serde(default = "default_queue_capacity")]
    pub request_queue_capacity: usize,
}

/// Срез ожидающих по одному адресу.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingCounts {
    pub publishes: usize,
    pub subscribes: usize,
}

impl PendingCounts {
    pub fn is_empty(&self) -> bool {
        self.publishes == 0 && self.subscribes == 0
    }
}

/// Rendezvous-движок: сопоставляет `publish` и `subscribe` по адресу и
/// передаёт значение напрямую от издателя подписчику.
///
/// Все изменения реестров выполняются одним последовательным координатором,
/// поэтому два встречных сопоставления одного ожидающего не могут оба
/// завершиться успехом (доставка не более одного раза).
///
/// Порядок между несколькими ожидающими одного адреса не гарантируется.
/// Клонирование дешёвое: клоны разделяют один координатор.
#[derive(Debug, Clone)]
pub struct RendezvousEngine {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    requests: mpsc::Sender<Request>,
    closed: watch::Sender<bool>,
    stats: Arc<EngineStats>,
    coordinator: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Debug)]
enum Request {
    Publish {
        address: String,
        data: String,
        reply: oneshot::Sender<PublishOutcome>,
    },
    Subscribe {
        address: String,
        reply: oneshot::Sender<SubscribeOutcome>,
    },
    Inspect {
        address: String,
        reply: oneshot::Sender<PendingCounts>,
    },
}

#[derive(Debug)]
enum PublishOutcome {
    Delivered,
    Parked(Parked<()>),
}

#[derive(Debug)]
enum SubscribeOutcome {
    Received(String),
    Parked(Parked<String>),
}

////////////////////////////////////////////////////////////////////////////////
// Публичный API
////////////////////////////////////////////////////////////////////////////////

impl RendezvousEngine {
    /// Создаёт движок и запускает координатор.
    ///
    /// Должен вызываться внутри Tokio runtime.
    pub fn new(config: EngineConfig) -> Self {
        let (requests, requests_rx) = mpsc::channel(config.request_queue_capacity.max(1));
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (closed, closed_rx) = watch::channel(false);
        let stats = Arc::new(EngineStats::new());

        let coordinator = Coordinator {
            publishes: WaiterRegistry::new(),
            subscribes: WaiterRegistry::new(),
            next_id: 0,
            unregister_tx,
            stats: stats.clone(),
        };
        let handle = tokio::spawn(coordinator.run(requests_rx, unregister_rx, closed_rx));

        Self {
            shared: Arc::new(Shared {
                requests,
                closed,
                stats,
                coordinator: Mutex::new(Some(handle)),
            }),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Публикует `data` по адресу `address`.
    ///
    /// Если подписчик уже ждёт: значение передаётся сразу. Иначе вызов ждёт
    /// подписчика, завершения `ctx` или закрытия движка.
    pub async fn publish(
        &self,
        ctx: &Context,
        address: &str,
        data: impl Into<String>,
    ) -> Result<(), RendezvousError> {
        self.shared.stats.record_publish();

        let (reply, outcome) = oneshot::channel();
        let request = Request::Publish {
            address: address.to_owned(),
            data: data.into(),
            reply,
        };
        if let Err(err) = self.submit(ctx, request).await {
            self.shared.stats.record_outcome::<()>(&Err(err), false);
            return Err(err);
        }

        let (result, parked) = match outcome.await {
            Ok(PublishOutcome::Delivered) => (Ok(()), false),
            Ok(PublishOutcome::Parked(waiter)) => (waiter.wait(ctx, self.closed_rx()).await, true),
            Err(_) => (Err(RendezvousError::Closed), false),
        };
        self.shared.stats.record_outcome(&result, parked);
        result
    }

    /// Ждёт значение по адресу `address`.
    ///
    /// Симметрично [`publish`](Self::publish): сначала пробует забрать данные
    /// уже ожидающего издателя, иначе паркуется.
    pub async fn subscribe(
        &self,
        ctx: &Context,
        address: &str,
    ) -> Result<String, RendezvousError> {
        self.shared.stats.record_subscribe();

        let (reply, outcome) = oneshot::channel();
        let request = Request::Subscribe {
            address: address.to_owned(),
            reply,
        };
        if let Err(err) = self.submit(ctx, request).await {
            self.shared.stats.record_outcome::<()>(&Err(err), false);
            return Err(err);
        }

        let (result, parked) = match outcome.await {
            Ok(SubscribeOutcome::Received(data)) => (Ok(data), false),
            Ok(SubscribeOutcome::Parked(waiter)) => (waiter.wait(ctx, self.closed_rx()).await, true),
            Err(_) => (Err(RendezvousError::Closed), false),
        };
        self.shared.stats.record_outcome(&result, parked);
        result
    }

    /// Количество ожидающих по адресу, согласованное с координатором.
    ///
    /// Запросы на удаление, отправленные до вызова, к этому моменту уже
    /// обработаны.
    pub async fn pending(
        &self,
        address: &str,
    ) -> Result<PendingCounts, RendezvousError> {
        let (reply, counts) = oneshot::channel();
        let request = Request::Inspect {
            address: address.to_owned(),
            reply,
        };
        self.submit(&Context::background(), request).await?;
        counts.await.map_err(|_| RendezvousError::Closed)
    }

    /// Закрывает движок. Идемпотентно, не блокирует.
    ///
    /// Все ожидающие вызовы завершаются с [`RendezvousError::Closed`], данные
    /// ожидающих публикаций не доставляются. Возвращает `true` только для
    /// вызова, который действительно закрыл движок.
    pub fn close(&self) -> bool {
        let closed_now = self.shared.closed.send_if_modified(|closed| {
            if *closed {
                false
            } else {
                *closed = true;
                true
            }
        });
        if closed_now {
            info!("rendezvous engine closed");
        }
        closed_now
    }

    /// Закрывает движок и дожидается остановки координатора.
    pub async fn shutdown(&self) {
        self.close();
        let handle = self.shared.coordinator.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "rendezvous coordinator task failed");
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.closed.borrow()
    }

    /// Ждёт закрытия движка.
    pub async fn closed(&self) {
        wait_cancelled(Some(self.closed_rx())).await
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot()
    }

    fn closed_rx(&self) -> watch::Receiver<bool> {
        self.shared.closed.subscribe()
    }

    /// Передаёт запрос координатору.
    ///
    /// Ожидание места в очереди конкурирует с контекстом и закрытием: до
    /// постановки в очередь запрос ни на что не повлиял.
    async fn submit(
        &self,
        ctx: &Context,
        request: Request,
    ) -> Result<(), RendezvousError> {
        if self.is_closed() {
            return Err(RendezvousError::Closed);
        }
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        tokio::select! {
            biased;
            sent = self.shared.requests.send(request) => sent.map_err(|_| RendezvousError::Closed),
            reason = ctx.done() => Err(reason.into()),
            _ = wait_cancelled(Some(self.closed_rx())) => Err(RendezvousError::Closed),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            request_queue_capacity: DEFAULT_REQUEST_QUEUE_CAPACITY,
        }
    }
}

fn default_queue_capacity() -> usize {
    DEFAULT_REQUEST_QUEUE_CAPACITY
}

////////////////////////////////////////////////////////////////////////////////
// Координатор
////////////////////////////////////////////////////////////////////////////////

/// Единственный владелец обоих реестров.
///
/// Никогда не ждёт вызывающих: каждая передача: неблокирующая попытка.
struct Coordinator {
    publishes: WaiterRegistry<PendingPublish>,
    subscribes: WaiterRegistry<PendingSubscribe>,
    next_id: u64,
    unregister_tx: mpsc::UnboundedSender<Unregister>,
    stats: Arc<EngineStats>,
}

impl Coordinator {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut unregister: mpsc::UnboundedReceiver<Unregister>,
        closed: watch::Receiver<bool>,
    ) {
        info!("rendezvous coordinator started");

        let closed_signal = wait_cancelled(Some(closed));
        tokio::pin!(closed_signal);

        loop {
            // Удаления обрабатываются раньше запросов: отменённые ожидающие
            // не должны участвовать в сопоставлении и в снимках.
            tokio::select! {
                biased;
                _ = &mut closed_signal => break,
                Some(request) = unregister.recv() => self.unregister(request),
                request = requests.recv() => match request {
                    Some(request) => self.handle(request),
                    None => break,
                },
            }
        }

        self.shutdown(&mut requests);
    }

    fn handle(
        &mut self,
        request: Request,
    ) {
        match request {
            Request::Publish {
                address,
                data,
                reply,
            } => self.publish(address, data, reply),
            Request::Subscribe { address, reply } => self.subscribe(address, reply),
            Request::Inspect { address, reply } => {
                let _ = reply.send(PendingCounts {
                    publishes: self.publishes.len(&address),
                    subscribes: self.subscribes.len(&address),
                });
            }
        }
    }

    fn publish(
        &mut self,
        address: String,
        mut data: String,
        reply: oneshot::Sender<PublishOutcome>,
    ) {
        if reply.is_closed() {
            trace!(address = %address, "publish caller left before matching");
            return;
        }

        for id in self.subscribes.list(&address) {
            let Some(waiter) = self.subscribes.remove(&address, id) else {
                continue;
            };

            match waiter.slot.offer(data) {
                Ok(()) => {
                    debug!(address = %address, waiter = %id, "publish matched waiting subscriber");
                    self.stats.record_immediate_match();
                    self.publish_gauges();
                    let _ = reply.send(PublishOutcome::Delivered);
                    return;
                }
                Err(returned) => {
                    // Подписчик уже ушёл (отмена/таймаут), его запись всё
                    // равно подлежала удалению.
                    trace!(address = %address, waiter = %id, "subscriber gone, trying next");
                    data = returned;
                }
            }
        }

        let id = self.next_id();
        let (ack, rx) = Handoff::channel();
        self.publishes.add(&address, id, PendingPublish { data, ack });
        self.stats.record_parked();
        self.publish_gauges();
        debug!(address = %address, waiter = %id, "publish parked");

        let parked = Parked::new(
            Unregister {
                role: Role::Publish,
                address,
                id,
            },
            rx,
            self.unregister_tx.clone(),
        );
        // Если вызывающий уже ушёл, Parked удалится здесь же и поставит
        // запрос на удаление в очередь.
        let _ = reply.send(PublishOutcome::Parked(parked));
    }

    fn subscribe(
        &mut self,
        address: String,
        reply: oneshot::Sender<SubscribeOutcome>,
    ) {
        if reply.is_closed() {
            trace!(address = %address, "subscribe caller left before matching");
            return;
        }

        for id in self.publishes.list(&address) {
            let Some(PendingPublish { data, ack }) = self.publishes.remove(&address, id) else {
                continue;
            };

            if ack.offer(()).is_ok() {
                debug!(address = %address, waiter = %id, "subscribe matched waiting publish");
                self.stats.record_immediate_match();
                self.publish_gauges();
                let _ = reply.send(SubscribeOutcome::Received(data));
                return;
            }
            trace!(address = %address, waiter = %id, "publisher gone, trying next");
        }

        let id = self.next_id();
        let (slot, rx) = Handoff::channel();
        self.subscribes.add(&address, id, PendingSubscribe { slot });
        self.stats.record_parked();
        self.publish_gauges();
        debug!(address = %address, waiter = %id, "subscribe parked");

        let parked = Parked::new(
            Unregister {
                role: Role::Subscribe,
                address,
                id,
            },
            rx,
            self.unregister_tx.clone(),
        );
        let _ = reply.send(SubscribeOutcome::Parked(parked));
    }

    /// Идемпотентное удаление: запись могла уже уйти в сопоставлении.
    fn unregister(
        &mut self,
        request: Unregister,
    ) {
        let removed = match request.role {
            Role::Publish => self.publishes.remove(&request.address, request.id).is_some(),
            Role::Subscribe => self.subscribes.remove(&request.address, request.id).is_some(),
        };
        if !removed {
            return;
        }
        self.publish_gauges();
        debug!(
            address = %request.address,
            waiter = %request.id,
            role = request.role.as_str(),
            "waiter unregistered"
        );
    }

    fn shutdown(
        mut self,
        requests: &mut mpsc::Receiver<Request>,
    ) {
        // Удаление отправляющих сторон освобождает всех припаркованных.
        let dropped_publishes = self.publishes.drain().count();
        let dropped_subscribes = self.subscribes.drain().count();
        self.publish_gauges();

        // Запросы, не дошедшие до обработки, получат Closed через
        // удалённый reply.
        requests.close();
        let mut dropped_requests = 0usize;
        while requests.try_recv().is_ok() {
            dropped_requests += 1;
        }

        info!(
            dropped_publishes,
            dropped_subscribes, dropped_requests, "rendezvous coordinator stopped"
        );
    }

    fn next_id(&mut self) -> WaiterId {
        self.next_id += 1;
        WaiterId(self.next_id)
    }

    fn publish_gauges(&self) {
        self.stats
            .set_waiting(self.publishes.total(), self.subscribes.total());
    }
}
