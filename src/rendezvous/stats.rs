use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::RendezvousError;

/// Счётчики движка.
///
/// Пишутся и координатором, и вызывающими задачами, поэтому атомарные;
/// порядок между счётчиками не важен (`Relaxed`).
#[derive(Debug, Default)]
pub struct EngineStats {
    /// Всего вызовов `publish`
    publishes: AtomicU64,
    /// Всего вызовов `subscribe`
    subscribes: AtomicU64,
    /// Сопоставлено сразу, без парковки
    immediate_matches: AtomicU64,
    /// Зарегистрировано ожидающих
    parked: AtomicU64,
    /// Припаркованных вызовов, завершившихся передачей
    handoffs: AtomicU64,
    cancelled: AtomicU64,
    timed_out: AtomicU64,
    /// Вызовов, получивших `Closed`
    closed: AtomicU64,
    /// Сейчас ждут в реестре публикаций
    waiting_publishes: AtomicU64,
    /// Сейчас ждут в реестре подписок
    waiting_subscribes: AtomicU64,
}

/// Снимок счётчиков (для health-эндпоинта и логов).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub publishes: u64,
    pub subscribes: u64,
    pub immediate_matches: u64,
    pub parked: u64,
    pub handoffs: u64,
    pub cancelled: u64,
    pub timed_out: u64,
    pub closed: u64,
    pub waiting_publishes: u64,
    pub waiting_subscribes: u64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_publish(&self) {
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_subscribe(&self) {
        self.subscribes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_immediate_match(&self) {
        self.immediate_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_parked(&self) {
        self.parked.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn set_waiting(
        &self,
        publishes: usize,
        subscribes: usize,
    ) {
        self.waiting_publishes
            .store(publishes as u64, Ordering::Relaxed);
        self.waiting_subscribes
            .store(subscribes as u64, Ordering::Relaxed);
    }

    /// Учитывает итог вызова. `parked`: вызов ждал в реестре.
    pub(crate) fn record_outcome<T>(
        &self,
        result: &Result<T, RendezvousError>,
        parked: bool,
    ) {
        let counter = match result {
            Ok(_) if parked => &self.handoffs,
            Ok(_) => return,
            Err(RendezvousError::Cancelled) => &self.cancelled,
            Err(RendezvousError::TimedOut) => &self.timed_out,
            Err(RendezvousError::Closed) => &self.closed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            publishes: self.publishes.load(Ordering::Relaxed),
            subscribes: self.subscribes.load(Ordering::Relaxed),
            immediate_matches: self.immediate_matches.load(Ordering::Relaxed),
            parked: self.parked.load(Ordering::Relaxed),
            handoffs: self.handoffs.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
            waiting_publishes: self.waiting_publishes.load(Ordering::Relaxed),
            waiting_subscribes: self.waiting_subscribes.load(Ordering::Relaxed),
        }
    }
}
