pub mod admin_routes;
pub mod habit_routes;
