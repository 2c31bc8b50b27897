use std::collections::HashMap;

/// Идентификатор ожидающего вызова внутри реестра.
///
/// Выдаётся координатором монотонно; именно он задаёт "идентичность"
/// ожидающего в множестве адреса.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WaiterId(pub(crate) u64);

impl WaiterId {
    /// Идентификатор вне координатора (реестр сам по себе, тесты).
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for WaiterId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// Реестр ожидающих: адрес → множество одноразовых точек передачи.
///
/// Используется симметрично для ожидающих публикаций и ожидающих подписок.
/// Собственной синхронизации нет: реестр принадлежит координатору движка и
/// изменяется только из него.
///
/// Инварианты:
/// - ключ адреса присутствует тогда и только тогда, когда его множество не
///   пусто (пустые множества удаляются сразу);
/// - один и тот же ожидающий встречается не более одного раза.
#[derive(Debug)]
pub struct WaiterRegistry<W> {
    waiters: HashMap<String, HashMap<WaiterId, W>>,
    total: usize,
}

impl<W> WaiterRegistry<W> {
    pub fn new() -> Self {
        Self {
            waiters: HashMap::new(),
            total: 0,
        }
    }

    /// Добавляет ожидающего к адресу, создавая множество при необходимости.
    ///
    /// Повторное добавление того же `id` идемпотентно по членству: в
    /// множестве остаётся одна запись (с последним значением).
    pub fn add(
        &mut self,
        address: &str,
        id: WaiterId,
        waiter: W,
    ) {
        let replaced = self
            .waiters
            .entry(address.to_owned())
            .or_default()
            .insert(id, waiter);
        if replaced.is_none() {
            self.total += 1;
        }
    }

    /// Снимок идентификаторов ожидающих для адреса.
    ///
    /// Порядок произвольный (FIFO не гарантируется). Реестр не изменяется.
    pub fn list(
        &self,
        address: &str,
    ) -> Vec<WaiterId> {
        self.waiters
            .get(address)
            .map(|set| set.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Удаляет ожидающего и возвращает его.
    ///
    /// Если множество адреса опустело: удаляет и ключ адреса. Для
    /// отсутствующего адреса или ожидающего ничего не делает.
    pub fn remove(
        &mut self,
        address: &str,
        id: WaiterId,
    ) -> Option<W> {
        let set = self.waiters.get_mut(address)?;
        let removed = set.remove(&id);
        if set.is_empty() {
            self.waiters.remove(address);
        }
        if removed.is_some() {
            self.total -= 1;
        }
        removed
    }

    /// Количество ожидающих на адресе.
    pub fn len(
        &self,
        address: &str,
    ) -> usize {
        self.waiters.get(address).map_or(0, HashMap::len)
    }

    pub fn contains_address(
        &self,
        address: &str,
    ) -> bool {
        self.waiters.contains_key(address)
    }

    /// Общее количество ожидающих по всем адресам.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }

    /// Забирает всех ожидающих, оставляя реестр пустым.
    pub fn drain(&mut self) -> impl Iterator<Item = (String, WaiterId, W)> + '_ {
        self.total = 0;
        self.waiters.drain().flat_map(|(address, set)| {
            set.into_iter()
                .map(move |(id, waiter)| (address.clone(), id, waiter))
        })
    }
}

impl<W> Default for WaiterRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
