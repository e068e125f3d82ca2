//! PostgreSQL-backed [`PersonStore`].
//!
//! The `person` table is provisioned outside this service:
//!
//! ```sql
//! CREATE TABLE person (
//!     id        SERIAL PRIMARY KEY,
//!     firstName TEXT NOT NULL,
//!     lastName  TEXT NOT NULL
//! );
//! ```
//!
//! Unquoted identifiers are folded to lower case by PostgreSQL, hence the
//! `firstname` / `lastname` column names below.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::pooled_connection::deadpool::{Object, Pool, PoolError};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use tracing::{debug, info, instrument, warn};

use super::{PersonStore, StoreError, StoreResult};
use crate::config::Config;
use crate::health::{PingError, Pinger};
use crate::models::{NewPerson, Person, PersonId};

mod schema {
    diesel::table! {
        person (id) {
            id -> Int4,
            #[sql_name = "firstname"]
            first_name -> Text,
            #[sql_name = "lastname"]
            last_name -> Text,
        }
    }
}

use schema::person;

#[derive(Queryable, Selectable)]
#[diesel(table_name = person)]
#[diesel(check_for_backend(diesel::pg::Pg))]
struct PersonRow {
    id: i32,
    first_name: String,
    last_name: String,
}

impl From<PersonRow> for Person {
    fn from(row: PersonRow) -> Self {
        Person {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

#[derive(Insertable)]
#[diesel(table_name = person)]
struct NewPersonRow<'a> {
    first_name: &'a str,
    last_name: &'a str,
}

impl From<PoolError> for StoreError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Closed => StoreError::Closed,
            other => StoreError::Connection(other.to_string()),
        }
    }
}

/// PostgreSQL store backed by a `deadpool` connection pool.
pub struct PgStore {
    pool: Pool<AsyncPgConnection>,
    operation_timeout: Duration,
    closed: AtomicBool,
}

impl PgStore {
    /// Build the connection pool without touching the database.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Connection` if the pool configuration is invalid.
    pub fn new(config: &Config) -> StoreResult<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(&config.database_url);

        let pool = Pool::builder(manager)
            .max_size(config.postgres_max_connections)
            .wait_timeout(Some(config.postgres_connect_timeout))
            .create_timeout(Some(config.postgres_connect_timeout))
            .runtime(deadpool::Runtime::Tokio1)
            .build()
            .map_err(|e| StoreError::Connection(format!("failed to build connection pool: {e}")))?;

        Ok(Self {
            pool,
            operation_timeout: config.operation_timeout,
            closed: AtomicBool::new(false),
        })
    }

    /// Whether [`PersonStore::close`] has run.
    pub fn is_closed(&self) -> bool {
        // `RunQueryDsl::load` would shadow the inherent method here.
        AtomicBool::load(&self.closed, Ordering::SeqCst)
    }

    /// Build the pool and verify the database answers a ping.
    ///
    /// The pool is closed again if the ping fails.
    ///
    /// # Errors
    ///
    /// Returns the pool construction or ping error.
    #[instrument(skip(config), fields(database_url = %config.database_url_masked()))]
    pub async fn connect(config: &Config) -> StoreResult<Self> {
        let store = Self::new(config)?;

        if let Err(e) = store.ping_database().await {
            store.pool.close();
            return Err(e);
        }

        info!(
            max_connections = config.postgres_max_connections,
            "Connected to PostgreSQL"
        );
        Ok(store)
    }

    async fn connection(&self) -> StoreResult<Object<AsyncPgConnection>> {
        Ok(self.pool.get().await?)
    }

    async fn ping_database(&self) -> StoreResult<()> {
        self.bounded("ping", async {
            let mut conn = self.connection().await?;
            diesel::sql_query("SELECT 1").execute(&mut *conn).await?;
            Ok(())
        })
        .await
    }

    /// Bound a store operation by the configured operation timeout.
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout = ?self.operation_timeout,
                    "Store operation timed out"
                );
                Err(StoreError::Timeout(self.operation_timeout))
            }
        }
    }
}

#[async_trait]
impl PersonStore for PgStore {
    #[instrument(skip(self, person))]
    async fn create(&self, person: NewPerson) -> StoreResult<PersonId> {
        self.bounded("create", async {
            let mut conn = self.connection().await?;
            let id = diesel::insert_into(person::table)
                .values(&NewPersonRow {
                    first_name: &person.first_name,
                    last_name: &person.last_name,
                })
                .returning(person::id)
                .get_result::<i32>(&mut *conn)
                .await?;
            debug!(id, "Inserted person");
            Ok(id)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn get(&self, id: PersonId) -> StoreResult<Person> {
        self.bounded("get", async {
            let mut conn = self.connection().await?;
            let row = person::table
                .find(id)
                .select(PersonRow::as_select())
                .first::<PersonRow>(&mut *conn)
                .await
                .optional()?;
            row.map(Person::from).ok_or(StoreError::NotFound)
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: PersonId) -> StoreResult<()> {
        self.bounded("delete", async {
            let mut conn = self.connection().await?;
            let affected = diesel::delete(person::table.find(id))
                .execute(&mut *conn)
                .await?;
            if affected == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.pool.close();
        info!("PostgreSQL connection pool closed");
    }
}

#[async_trait]
impl Pinger for PgStore {
    async fn ping(&self) -> Result<(), PingError> {
        self.ping_database().await.map_err(Into::into)
    }
}
