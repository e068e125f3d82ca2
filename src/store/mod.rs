//! Person persistence.
//!
//! Handlers only see the [`PersonStore`] trait. Two implementations exist:
//!
//! - [`PgStore`] - PostgreSQL through a pooled `diesel-async` connection
//! - [`MemoryStore`] - in-process map, used by tests and `STORE_BACKEND=memory`
//!
//! Every operation either completes, reports [`StoreError::NotFound`], or
//! fails with a dependency error. Nothing is retried here.

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::{NewPerson, Person, PersonId};

/// Errors produced by store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("not found")]
    NotFound,

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("store is closed")]
    Closed,
}

/// Convenience type alias for Results with StoreError.
pub type StoreResult<T> = Result<T, StoreError>;

/// Create, read and delete access to stored people.
///
/// Dropping a returned future cancels the operation.
#[async_trait]
pub trait PersonStore: Send + Sync {
    /// Store a new person and return the generated identifier.
    async fn create(&self, person: NewPerson) -> StoreResult<PersonId>;

    /// Fetch a person by identifier.
    async fn get(&self, id: PersonId) -> StoreResult<Person>;

    /// Delete a person by identifier.
    async fn delete(&self, id: PersonId) -> StoreResult<()>;

    /// Release every resource held by the store. Safe to call more than once;
    /// only the first call has an effect.
    async fn close(&self);
}
