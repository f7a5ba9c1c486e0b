use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{HabitStore, StoreError};
use crate::db::models::{ConnectionState, Habit, HabitFilter, HabitPatch, NewHabit};

#[derive(Default)]
struct Table {
    next_pk: i32,
    rows: Vec<Habit>,
}

impl Table {
    fn push(&mut self, habit: NewHabit) -> Habit {
        self.next_pk += 1;
        let row = habit.into_habit(self.next_pk, Utc::now());
        self.rows.push(row.clone());
        row
    }
}

/// In-process habit table, selected with a `memory://` database URL.
///
/// Rows live in insertion order, which is the "store order" reported by
/// [`HabitStore::find_many`]. Data is gone when the process exits.
pub struct MemoryHabitStore {
    table: RwLock<Table>,
    connected: AtomicBool,
}

impl Default for MemoryHabitStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHabitStore {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table::default()),
            connected: AtomicBool::new(true),
        }
    }

    /// Simulates losing or regaining the store connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn check_connected(&self) -> Result<(), StoreError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

#[async_trait]
impl HabitStore for MemoryHabitStore {
    async fn find_many(
        &self,
        filter: &HabitFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Habit>, StoreError> {
        self.check_connected()?;
        let table = self.table.read().await;
        let limit = limit.map_or(usize::MAX, |l| l as usize);
        Ok(table
            .rows
            .iter()
            .filter(|h| filter.matches(h))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn find_one_and_update(
        &self,
        filter: &HabitFilter,
        patch: HabitPatch,
    ) -> Result<Option<Habit>, StoreError> {
        self.check_connected()?;
        let mut table = self.table.write().await;
        let Some(row) = table.rows.iter_mut().find(|h| filter.matches(h)) else {
            return Ok(None);
        };
        patch.apply_to(row);
        row.updated_at = Utc::now();
        Ok(Some(row.clone()))
    }

    async fn find_one_and_delete(&self, filter: &HabitFilter) -> Result<Option<Habit>, StoreError> {
        self.check_connected()?;
        let mut table = self.table.write().await;
        let position = table.rows.iter().position(|h| filter.matches(h));
        Ok(position.map(|idx| table.rows.remove(idx)))
    }

    async fn delete_many(&self, filter: &HabitFilter) -> Result<u64, StoreError> {
        self.check_connected()?;
        let mut table = self.table.write().await;
        let before = table.rows.len();
        table.rows.retain(|h| !filter.matches(h));
        Ok((before - table.rows.len()) as u64)
    }

    async fn insert_many(&self, habits: Vec<NewHabit>) -> Result<u64, StoreError> {
        self.check_connected()?;
        let mut table = self.table.write().await;
        let count = habits.len() as u64;
        for habit in habits {
            table.push(habit);
        }
        Ok(count)
    }

    async fn insert_one(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        self.check_connected()?;
        Ok(self.table.write().await.push(habit))
    }

    async fn connection_state(&self) -> ConnectionState {
        if self.connected.load(Ordering::SeqCst) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        self.check_connected()?;
        Ok(vec!["memory".to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CompletionHistory;

    fn new_habit(user_id: &str, id: i64, text: &str) -> NewHabit {
        NewHabit {
            user_id: user_id.to_string(),
            id,
            text: text.to_string(),
            completed: false,
            date_added: None,
            color_name: None,
            completion_history: CompletionHistory::default(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_increasing_record_ids() {
        let store = MemoryHabitStore::new();
        let first = store.insert_one(new_habit("u1", 1, "run")).await.unwrap();
        let second = store.insert_one(new_habit("u1", 2, "read")).await.unwrap();
        assert!(second.record_id > first.record_id);
    }

    #[tokio::test]
    async fn test_find_one_and_update_only_touches_first_match() {
        let store = MemoryHabitStore::new();
        store
            .insert_many(vec![new_habit("u1", 1, "a"), new_habit("u1", 1, "b")])
            .await
            .unwrap();

        let patch = HabitPatch {
            text: Some("changed".to_string()),
            ..Default::default()
        };
        let updated = store
            .find_one_and_update(&HabitFilter::by_key(1, "u1"), patch)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.text, "changed");

        let rows = store.find_many(&HabitFilter::by_user("u1"), None).await.unwrap();
        let texts: Vec<_> = rows.iter().map(|h| h.text.as_str()).collect();
        assert_eq!(texts, vec!["changed", "b"]);
    }

    #[tokio::test]
    async fn test_find_many_respects_limit() {
        let store = MemoryHabitStore::new();
        let batch = (0..5).map(|i| new_habit("u1", i, "x")).collect();
        store.insert_many(batch).await.unwrap();

        let rows = store.find_many(&HabitFilter::all(), Some(3)).await.unwrap();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_disconnected_store_fails_operations() {
        let store = MemoryHabitStore::new();
        store.set_connected(false);

        assert_eq!(store.connection_state().await, ConnectionState::Disconnected);
        let result = store.find_many(&HabitFilter::all(), None).await;
        assert!(matches!(result, Err(StoreError::Unavailable)));
    }
}
