use sea_orm::entity::prelude::*;
use serde::Serialize;

/// Rollup snapshot for one user and one closed period.
///
/// `date` is the last calendar day of the closed period (`yyyy-MM-dd`).
/// At most one row exists per `(user_id, date, period)`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize)]
#[sea_orm(table_name = "goal_history")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub date: String,
    pub period: String,
    pub completed_count: i64,
    pub pending_count: i64,
    pub total_count: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
