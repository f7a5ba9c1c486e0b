use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::models::CompletionHistory;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "habits")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub pk: i32,
    #[sea_orm(indexed)]
    pub user_id: String,
    // Caller-assigned; only meaningful together with user_id, never unique on its own.
    #[sea_orm(indexed)]
    pub habit_id: i64,
    #[sea_orm(column_type = "Text")]
    pub text: String,
    pub completed: bool,
    pub date_added: Option<String>,
    pub color_name: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub completion_history: CompletionHistory,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
