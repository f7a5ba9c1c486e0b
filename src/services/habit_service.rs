use std::sync::Arc;

use tracing::{debug, error, info};

use crate::db::models::{ConnectionState, Habit, HabitFilter, HabitPatch, NewHabit};
use crate::db::services::{HabitStore, StoreError};

/// Upper bound on records returned by the "all habits" diagnostic listing.
pub const ALL_HABITS_CAP: u64 = 100;

/// The habit operations exposed over HTTP. Each call is independent; nothing is
/// remembered between calls except what the store holds.
#[derive(Clone)]
pub struct HabitService {
    store: Arc<dyn HabitStore>,
}

impl HabitService {
    pub fn new(store: Arc<dyn HabitStore>) -> Self {
        Self { store }
    }

    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<Habit>, StoreError> {
        self.store
            .find_many(&HabitFilter::by_user(user_id), None)
            .await
            .inspect_err(|e| error!(user_id, error = %e, "Failed to list habits."))
    }

    pub async fn create(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        let created = self
            .store
            .insert_one(habit)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to create habit."))?;
        debug!(user_id = %created.user_id, id = created.id, "Habit created.");
        Ok(created)
    }

    /// Updates the first record matching `(id, user_id)`. A missing record is `Ok(None)`.
    pub async fn update(
        &self,
        id: i64,
        user_id: &str,
        patch: HabitPatch,
    ) -> Result<Option<Habit>, StoreError> {
        self.store
            .find_one_and_update(&HabitFilter::by_key(id, user_id), patch)
            .await
            .inspect_err(|e| error!(user_id, id, error = %e, "Failed to update habit."))
    }

    /// Removes the first record matching `(id, user_id)`. Succeeds whether or not one existed.
    pub async fn delete(&self, id: i64, user_id: &str) -> Result<(), StoreError> {
        let removed = self
            .store
            .find_one_and_delete(&HabitFilter::by_key(id, user_id))
            .await
            .inspect_err(|e| error!(user_id, id, error = %e, "Failed to delete habit."))?;
        debug!(user_id, id, found = removed.is_some(), "Habit delete processed.");
        Ok(())
    }

    /// Replaces every record of `user_id` with `habits`.
    ///
    /// Not atomic: the delete is committed before the insert starts, so an insert
    /// failure leaves the user with no records at all. The returned count is the
    /// number of habits submitted, not a verified insert count.
    pub async fn sync(&self, user_id: &str, habits: Vec<NewHabit>) -> Result<usize, StoreError> {
        let submitted = habits.len();
        let habits: Vec<NewHabit> = habits
            .into_iter()
            .map(|mut h| {
                h.user_id = user_id.to_string();
                h
            })
            .collect();

        let removed = self
            .store
            .delete_many(&HabitFilter::by_user(user_id))
            .await
            .inspect_err(|e| error!(user_id, error = %e, "Sync failed while clearing habits."))?;

        if let Err(e) = self.store.insert_many(habits).await {
            error!(
                user_id,
                removed,
                submitted,
                error = %e,
                "Sync failed after clearing habits; user may be left with no records."
            );
            return Err(e);
        }

        info!(user_id, removed, submitted, "Habits synced.");
        Ok(submitted)
    }

    pub async fn list_all(&self) -> Result<Vec<Habit>, StoreError> {
        self.store
            .find_many(&HabitFilter::all(), Some(ALL_HABITS_CAP))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list all habits."))
    }

    pub async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        self.store
            .list_databases()
            .await
            .inspect_err(|e| error!(error = %e, "Failed to list databases."))
    }

    pub async fn store_state(&self) -> ConnectionState {
        self.store.connection_state().await
    }
}
