//! The `services` module is the record-store boundary. The API layer only sees the
//! [`HabitStore`] trait; which backend sits behind it is decided once at startup.
//!
//! Two backends are provided:
//! - [`SeaOrmHabitStore`] for SQL databases reachable through SeaORM (Postgres, SQLite).
//! - [`MemoryHabitStore`], an in-process table selected with a `memory://` URL.
//!
//! No capability here is transactional. Callers that chain several calls (bulk sync)
//! get whatever each individual call did, even if a later one fails.

use async_trait::async_trait;
use sea_orm::DbErr;

use crate::db::models::{ConnectionState, Habit, HabitFilter, HabitPatch, NewHabit};

pub mod habit_store;
pub mod memory_store;

pub use habit_store::{SeaOrmHabitStore, ensure_schema};
pub use memory_store::MemoryHabitStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Database(#[from] DbErr),
    #[error("Record store is disconnected")]
    Unavailable,
}

#[async_trait]
pub trait HabitStore: Send + Sync {
    /// Returns matching records in store order, at most `limit` of them when set.
    async fn find_many(
        &self,
        filter: &HabitFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Habit>, StoreError>;

    /// Applies `patch` to the first matching record and returns its updated form.
    async fn find_one_and_update(
        &self,
        filter: &HabitFilter,
        patch: HabitPatch,
    ) -> Result<Option<Habit>, StoreError>;

    /// Removes the first matching record, returning it if there was one.
    async fn find_one_and_delete(&self, filter: &HabitFilter) -> Result<Option<Habit>, StoreError>;

    async fn delete_many(&self, filter: &HabitFilter) -> Result<u64, StoreError>;

    async fn insert_many(&self, habits: Vec<NewHabit>) -> Result<u64, StoreError>;

    async fn insert_one(&self, habit: NewHabit) -> Result<Habit, StoreError>;

    /// Never fails; an unreachable store reports [`ConnectionState::Disconnected`].
    async fn connection_state(&self) -> ConnectionState;

    /// Logical databases visible to this connection. Diagnostic only.
    async fn list_databases(&self) -> Result<Vec<String>, StoreError>;
}
