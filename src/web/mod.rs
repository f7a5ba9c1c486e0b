use axum::{
    Json, Router,
    extract::State,
    http::Method,
    routing::get,
};
use chrono::Utc;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::services::HabitStore;
use crate::services::HabitService;
use crate::web::models::HealthResponse;
use crate::web::routes::*;

pub use error::AppError;

pub mod error;
pub mod models;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub habit_service: HabitService,
}

impl AppState {
    pub fn new(store: Arc<dyn HabitStore>) -> Arc<Self> {
        Arc::new(Self {
            habit_service: HabitService::new(store),
        })
    }
}

/// Always answers 200; an unreachable store shows up as `"disconnected"`.
async fn health_check_handler(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: app_state.habit_service.store_state().await,
        timestamp: Utc::now(),
    })
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
}

/// Public API router. Admin listings are nested under `/api/admin` only when
/// `include_admin` is set.
pub fn create_axum_router(app_state: Arc<AppState>, include_admin: bool) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/habits", habit_routes::create_habits_router());

    if include_admin {
        router = router.nest("/api/admin", admin_routes::create_admin_router());
    }

    router
        .with_state(app_state)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

/// Router for a dedicated internal admin listener.
pub fn create_admin_axum_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest("/api/admin", admin_routes::create_admin_router())
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
