pub mod habit_service;

pub use habit_service::{ALL_HABITS_CAP, HabitService};
