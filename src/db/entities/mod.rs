//! SeaORM entities that map to database tables.

pub mod habit;

pub mod prelude {
    pub use super::habit::ActiveModel as HabitActiveModel;
    pub use super::habit::Column as HabitColumn;
    pub use super::habit::Entity as Habit;
    pub use super::habit::Model as HabitModel;
}
