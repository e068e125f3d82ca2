//! In-process [`PersonStore`] used by tests and `STORE_BACKEND=memory`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use super::{PersonStore, StoreError, StoreResult};
use crate::health::{PingError, Pinger};
use crate::models::{NewPerson, Person, PersonId};

/// Map-backed store with sequential identifiers starting at 1.
///
/// [`set_available`](Self::set_available) simulates an unreachable database:
/// while unavailable every operation, ping included, fails with
/// `StoreError::Connection`.
#[derive(Debug)]
pub struct MemoryStore {
    people: RwLock<BTreeMap<PersonId, Person>>,
    next_id: AtomicI32,
    available: AtomicBool,
    closed: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            people: RwLock::new(BTreeMap::new()),
            next_id: AtomicI32::new(1),
            available: AtomicBool::new(true),
            closed: AtomicBool::new(false),
        }
    }

    /// Toggle simulated availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of stored people.
    pub async fn len(&self) -> usize {
        self.people.read().await.len()
    }

    /// Whether the store holds nobody.
    pub async fn is_empty(&self) -> bool {
        self.people.read().await.is_empty()
    }

    /// Whether [`PersonStore::close`] has run.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn check(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::Closed);
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(StoreError::Connection(
                "memory store unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl PersonStore for MemoryStore {
    async fn create(&self, person: NewPerson) -> StoreResult<PersonId> {
        self.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.people.write().await.insert(id, person.with_id(id));
        Ok(id)
    }

    async fn get(&self, id: PersonId) -> StoreResult<Person> {
        self.check()?;
        self.people
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: PersonId) -> StoreResult<()> {
        self.check()?;
        self.people
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Memory store closed");
    }
}

#[async_trait]
impl Pinger for MemoryStore {
    async fn ping(&self) -> Result<(), PingError> {
        self.check().map_err(Into::into)
    }
}
