pub mod habit_models;

pub use habit_models::*;
