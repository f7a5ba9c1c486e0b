use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::models::{CompletionHistory, ConnectionState, Habit, HabitPatch, NewHabit};
use crate::web::error::AppError;

// --- Request Structs ---

/// Habit body as sent by clients. Every field is loosely typed so that values like
/// `"5"` or `"true"` are coerced instead of rejected.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPayload {
    pub user_id: Option<Value>,
    pub id: Option<Value>,
    pub text: Option<Value>,
    pub completed: Option<Value>,
    pub date_added: Option<Value>,
    pub color_name: Option<Value>,
    pub completion_history: Option<Value>,
}

impl HabitPayload {
    /// Checks required fields and coerces types for an insert.
    pub fn into_new_habit(self) -> Result<NewHabit, AppError> {
        let user_id = required(self.user_id, "userId", coerce_string)?;
        let id = required(self.id, "id", coerce_integer)?;
        let text = required(self.text, "text", coerce_string)?;

        Ok(NewHabit {
            user_id,
            id,
            text,
            completed: optional(self.completed, "completed", coerce_bool)?.unwrap_or(false),
            date_added: optional(self.date_added, "dateAdded", coerce_string)?,
            color_name: optional(self.color_name, "colorName", coerce_string)?,
            completion_history: optional(
                self.completion_history,
                "completionHistory",
                coerce_history,
            )?
            .unwrap_or_default(),
        })
    }

    /// Splits an update body into the owning `userId` and the fields to set.
    /// An `id` in the body is ignored; the path decides which record is targeted.
    pub fn into_patch(self) -> Result<(String, HabitPatch), AppError> {
        let user_id = required(self.user_id, "userId", coerce_string)?;
        let patch = HabitPatch {
            text: optional(self.text, "text", coerce_string)?,
            completed: optional(self.completed, "completed", coerce_bool)?,
            date_added: optional(self.date_added, "dateAdded", coerce_string)?,
            color_name: optional(self.color_name, "colorName", coerce_string)?,
            completion_history: optional(
                self.completion_history,
                "completionHistory",
                coerce_history,
            )?,
        };
        Ok((user_id, patch))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub user_id: Option<Value>,
    #[serde(default)]
    pub habits: Vec<HabitPayload>,
}

impl SyncRequest {
    /// Validates the whole batch up front and stamps `userId` onto every habit.
    pub fn into_parts(self) -> Result<(String, Vec<NewHabit>), AppError> {
        let user_id = required(self.user_id, "userId", coerce_string)?;
        let habits = self
            .habits
            .into_iter()
            .enumerate()
            .map(|(idx, mut payload)| {
                payload.user_id = Some(Value::String(user_id.clone()));
                payload
                    .into_new_habit()
                    .map_err(|e| match e {
                        AppError::Validation(msg) => {
                            AppError::Validation(format!("habits[{idx}]: {msg}"))
                        }
                        other => other,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((user_id, habits))
    }
}

/// Parses the `{id}` path segment the same way body ids are coerced.
pub fn parse_habit_id(raw: &str) -> Result<i64, AppError> {
    coerce_integer("id", &Value::String(raw.to_string()))
}

// --- Response Structs ---

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    // Key kept as `mongodb` for existing clients, whichever backend is configured.
    #[serde(rename = "mongodb")]
    pub store: ConnectionState,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct AllHabitsResponse {
    pub total: usize,
    pub habits: Vec<Habit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHabitsResponse {
    pub user_id: String,
    pub total: usize,
    pub habits: Vec<Habit>,
}

#[derive(Debug, Serialize)]
pub struct DatabasesResponse {
    pub databases: Vec<String>,
}

// --- Coercion ---

fn required<T>(
    value: Option<Value>,
    field: &str,
    coerce: fn(&str, &Value) -> Result<T, AppError>,
) -> Result<T, AppError> {
    match value {
        Some(v) => coerce(field, &v),
        None => Err(AppError::Validation(format!("{field} is required"))),
    }
}

fn optional<T>(
    value: Option<Value>,
    field: &str,
    coerce: fn(&str, &Value) -> Result<T, AppError>,
) -> Result<Option<T>, AppError> {
    value.map(|v| coerce(field, &v)).transpose()
}

fn coerce_string(field: &str, value: &Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(AppError::Validation(format!("{field} must be a string"))),
    }
}

fn coerce_integer(field: &str, value: &Value) -> Result<i64, AppError> {
    let invalid = || AppError::Validation(format!("{field} must be an integer"));
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral_f64))
            .ok_or_else(invalid),
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

// Casting would saturate, so anything outside the i64 range is rejected.
fn integral_f64(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (in_range && f.fract() == 0.0).then_some(f as i64)
}

fn coerce_bool(field: &str, value: &Value) -> Result<bool, AppError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.trim() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(AppError::Validation(format!("{field} must be a boolean"))),
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            _ => Err(AppError::Validation(format!("{field} must be a boolean"))),
        },
        _ => Err(AppError::Validation(format!("{field} must be a boolean"))),
    }
}

fn coerce_history(field: &str, value: &Value) -> Result<CompletionHistory, AppError> {
    let Value::Object(entries) = value else {
        return Err(AppError::Validation(format!("{field} must be an object")));
    };
    entries
        .iter()
        .map(|(date, count)| {
            coerce_integer(&format!("{field}.{date}"), count).map(|n| (date.clone(), n))
        })
        .collect::<Result<BTreeMap<_, _>, AppError>>()
        .map(CompletionHistory::from)
}
