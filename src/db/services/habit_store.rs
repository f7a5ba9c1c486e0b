use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseBackend,
    DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Schema, Set,
    Statement,
};
use tracing::{debug, warn};

use super::{HabitStore, StoreError};
use crate::db::entities::{habit, prelude::Habit as HabitEntity};
use crate::db::models::{ConnectionState, Habit, HabitFilter, HabitPatch, NewHabit};

/// Creates the `habits` table and its indexes when they do not exist yet.
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(HabitEntity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await?;

    for mut index in schema.create_index_from_entity(HabitEntity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    debug!("Habit schema is in place.");
    Ok(())
}

#[derive(Clone)]
pub struct SeaOrmHabitStore {
    db: DatabaseConnection,
}

impl SeaOrmHabitStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_first(&self, filter: &HabitFilter) -> Result<Option<habit::Model>, DbErr> {
        HabitEntity::find()
            .filter(condition(filter))
            .order_by_asc(habit::Column::Pk)
            .one(&self.db)
            .await
    }

    /// Writes `patch` over a previously read row. `None` when the row was
    /// deleted after it was read.
    async fn save_patch(
        &self,
        model: habit::Model,
        patch: HabitPatch,
    ) -> Result<Option<habit::Model>, DbErr> {
        let mut active: habit::ActiveModel = model.into();
        if let Some(text) = patch.text {
            active.text = Set(text);
        }
        if let Some(completed) = patch.completed {
            active.completed = Set(completed);
        }
        if let Some(date_added) = patch.date_added {
            active.date_added = Set(Some(date_added));
        }
        if let Some(color_name) = patch.color_name {
            active.color_name = Set(Some(color_name));
        }
        if let Some(history) = patch.completion_history {
            active.completion_history = Set(history);
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(updated) => Ok(Some(updated)),
            Err(DbErr::RecordNotUpdated) => {
                debug!("Habit row vanished before the update was written.");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn condition(filter: &HabitFilter) -> Condition {
    let mut cond = Condition::all();
    if let Some(user_id) = &filter.user_id {
        cond = cond.add(habit::Column::UserId.eq(user_id.as_str()));
    }
    if let Some(id) = filter.id {
        cond = cond.add(habit::Column::HabitId.eq(id));
    }
    cond
}

fn new_active_model(habit: NewHabit, now: DateTime<Utc>) -> habit::ActiveModel {
    habit::ActiveModel {
        user_id: Set(habit.user_id),
        habit_id: Set(habit.id),
        text: Set(habit.text),
        completed: Set(habit.completed),
        date_added: Set(habit.date_added),
        color_name: Set(habit.color_name),
        completion_history: Set(habit.completion_history),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
}

#[async_trait]
impl HabitStore for SeaOrmHabitStore {
    async fn find_many(
        &self,
        filter: &HabitFilter,
        limit: Option<u64>,
    ) -> Result<Vec<Habit>, StoreError> {
        let mut query = HabitEntity::find()
            .filter(condition(filter))
            .order_by_asc(habit::Column::Pk);
        if let Some(limit) = limit {
            query = query.limit(limit);
        }
        let models = query.all(&self.db).await?;
        Ok(models.into_iter().map(Habit::from).collect())
    }

    async fn find_one_and_update(
        &self,
        filter: &HabitFilter,
        patch: HabitPatch,
    ) -> Result<Option<Habit>, StoreError> {
        let Some(model) = self.find_first(filter).await? else {
            return Ok(None);
        };
        Ok(self.save_patch(model, patch).await?.map(Habit::from))
    }

    async fn find_one_and_delete(&self, filter: &HabitFilter) -> Result<Option<Habit>, StoreError> {
        let Some(model) = self.find_first(filter).await? else {
            return Ok(None);
        };
        HabitEntity::delete_by_id(model.pk).exec(&self.db).await?;
        Ok(Some(model.into()))
    }

    async fn delete_many(&self, filter: &HabitFilter) -> Result<u64, StoreError> {
        let result = HabitEntity::delete_many()
            .filter(condition(filter))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    async fn insert_many(&self, habits: Vec<NewHabit>) -> Result<u64, StoreError> {
        if habits.is_empty() {
            return Ok(0);
        }
        let now = Utc::now();
        let count = habits.len() as u64;
        let models: Vec<habit::ActiveModel> = habits
            .into_iter()
            .map(|h| new_active_model(h, now))
            .collect();
        HabitEntity::insert_many(models).exec(&self.db).await?;
        Ok(count)
    }

    async fn insert_one(&self, habit: NewHabit) -> Result<Habit, StoreError> {
        let model = new_active_model(habit, Utc::now()).insert(&self.db).await?;
        Ok(model.into())
    }

    async fn connection_state(&self) -> ConnectionState {
        match self.db.ping().await {
            Ok(()) => ConnectionState::Connected,
            Err(e) => {
                warn!(error = %e, "Record store ping failed.");
                ConnectionState::Disconnected
            }
        }
    }

    async fn list_databases(&self) -> Result<Vec<String>, StoreError> {
        let backend = self.db.get_database_backend();
        let (sql, column) = match backend {
            DatabaseBackend::Postgres => (
                "SELECT datname::text AS datname FROM pg_database WHERE datistemplate = false ORDER BY datname",
                "datname",
            ),
            DatabaseBackend::MySql => ("SHOW DATABASES", "Database"),
            _ => ("PRAGMA database_list", "name"),
        };

        let rows = self
            .db
            .query_all(Statement::from_string(backend, sql))
            .await?;
        let names = rows
            .iter()
            .map(|row| row.try_get::<String>("", column))
            .collect::<Result<Vec<_>, DbErr>>()?;
        Ok(names)
    }
}
