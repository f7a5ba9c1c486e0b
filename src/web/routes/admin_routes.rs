//! Diagnostic listings. Unauthenticated, so they are only mounted when the
//! server configuration enables them.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use std::sync::Arc;

use crate::web::models::{AllHabitsResponse, DatabasesResponse, UserHabitsResponse};
use crate::web::{AppError, AppState};

async fn all_habits_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<AllHabitsResponse>, AppError> {
    let habits = app_state.habit_service.list_all().await?;
    Ok(Json(AllHabitsResponse {
        total: habits.len(),
        habits,
    }))
}

async fn user_habits_handler(
    State(app_state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserHabitsResponse>, AppError> {
    let habits = app_state.habit_service.list_by_user(&user_id).await?;
    Ok(Json(UserHabitsResponse {
        user_id,
        total: habits.len(),
        habits,
    }))
}

async fn databases_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<DatabasesResponse>, AppError> {
    let databases = app_state.habit_service.list_databases().await?;
    Ok(Json(DatabasesResponse { databases }))
}

pub fn create_admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/all-habits", get(all_habits_handler))
        .route("/user/{user_id}", get(user_habits_handler))
        .route("/databases", get(databases_handler))
}
