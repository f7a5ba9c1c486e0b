use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{delete, get, post},
};
use std::sync::Arc;

use crate::db::models::Habit;
use crate::web::models::{HabitPayload, MessageResponse, SyncRequest, SyncResponse, parse_habit_id};
use crate::web::{AppError, AppState};

const SYNC_SEGMENT: &str = "sync";

// --- Route Handlers ---

async fn list_habits_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Habit>>, AppError> {
    let habits = app_state.habit_service.list_by_user(&user_id).await?;
    Ok(Json(habits))
}

// The static `/sync` route wins over `/{id}`, so GET on it lists the user named "sync".
async fn list_sync_user_habits_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<Habit>>, AppError> {
    list_habits_handler(State(app_state), Path(SYNC_SEGMENT.to_string())).await
}

async fn create_habit_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<HabitPayload>, JsonRejection>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let Json(payload) = payload?;
    let new_habit = payload.into_new_habit()?;
    let created = app_state.habit_service.create(new_habit).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Responds with `null` when no record matches `(id, userId)`.
async fn update_habit_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<HabitPayload>, JsonRejection>,
) -> Result<Json<Option<Habit>>, AppError> {
    let id = parse_habit_id(&id)?;
    let Json(payload) = payload?;
    let (user_id, patch) = payload.into_patch()?;
    let updated = app_state.habit_service.update(id, &user_id, patch).await?;
    Ok(Json(updated))
}

async fn delete_habit_handler(
    State(app_state): State<Arc<AppState>>,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_habit_id(&id)?;
    app_state.habit_service.delete(id, &user_id).await?;
    Ok(Json(MessageResponse {
        message: "Habit deleted".to_string(),
    }))
}

async fn sync_habits_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<Json<SyncResponse>, AppError> {
    let Json(payload) = payload?;
    let (user_id, habits) = payload.into_parts()?;
    let count = app_state.habit_service.sync(&user_id, habits).await?;
    Ok(Json(SyncResponse {
        message: "Habits synced successfully".to_string(),
        count,
    }))
}

// --- Router ---

pub fn create_habits_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", post(create_habit_handler))
        .route(
            "/sync",
            post(sync_habits_handler).get(list_sync_user_habits_handler),
        )
        // GET reads this segment as a userId, PUT as a habit id.
        .route("/{id}", get(list_habits_handler).put(update_habit_handler))
        .route("/{id}/{user_id}", delete(delete_habit_handler))
}
