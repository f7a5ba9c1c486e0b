use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

use crate::db::entities::habit;

/// Sparse log of completions keyed by a caller-chosen date string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct CompletionHistory(pub BTreeMap<String, i64>);

impl From<BTreeMap<String, i64>> for CompletionHistory {
    fn from(entries: BTreeMap<String, i64>) -> Self {
        Self(entries)
    }
}

/// A habit record as returned to API callers.
/// Corresponds to a row of the `habits` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    #[serde(rename = "_id")]
    pub record_id: i32,
    pub user_id: String,
    pub id: i64,
    pub text: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_added: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_name: Option<String>,
    #[serde(default)]
    pub completion_history: CompletionHistory,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<habit::Model> for Habit {
    fn from(model: habit::Model) -> Self {
        Self {
            record_id: model.pk,
            user_id: model.user_id,
            id: model.habit_id,
            text: model.text,
            completed: model.completed,
            date_added: model.date_added,
            color_name: model.color_name,
            completion_history: model.completion_history,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// A validated record ready to be inserted. Required fields are already present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHabit {
    pub user_id: String,
    pub id: i64,
    pub text: String,
    pub completed: bool,
    pub date_added: Option<String>,
    pub color_name: Option<String>,
    pub completion_history: CompletionHistory,
}

impl NewHabit {
    pub fn into_habit(self, record_id: i32, now: DateTime<Utc>) -> Habit {
        Habit {
            record_id,
            user_id: self.user_id,
            id: self.id,
            text: self.text,
            completed: self.completed,
            date_added: self.date_added,
            color_name: self.color_name,
            completion_history: self.completion_history,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field changes applied by an update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitPatch {
    pub text: Option<String>,
    pub completed: Option<bool>,
    pub date_added: Option<String>,
    pub color_name: Option<String>,
    pub completion_history: Option<CompletionHistory>,
}

impl HabitPatch {
    pub fn apply_to(self, habit: &mut Habit) {
        if let Some(text) = self.text {
            habit.text = text;
        }
        if let Some(completed) = self.completed {
            habit.completed = completed;
        }
        if let Some(date_added) = self.date_added {
            habit.date_added = Some(date_added);
        }
        if let Some(color_name) = self.color_name {
            habit.color_name = Some(color_name);
        }
        if let Some(history) = self.completion_history {
            habit.completion_history = history;
        }
    }
}

/// Record selector. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HabitFilter {
    pub user_id: Option<String>,
    pub id: Option<i64>,
}

impl HabitFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            id: None,
        }
    }

    /// The logical `(id, userId)` key used by update and delete.
    pub fn by_key(id: i64, user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            id: Some(id),
        }
    }

    pub fn matches(&self, habit: &Habit) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == habit.user_id)
            && self.id.is_none_or(|id| id == habit.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}
