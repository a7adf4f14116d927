use sea_orm::entity::prelude::*;

use super::{category, progress};
use crate::error::AppError;
use crate::model::{GoalPriority, GoalStatus, GoalType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "goals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: String,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub goal_type: String,
    pub status: String,
    pub priority: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl Model {
    pub fn goal_type(&self) -> Result<GoalType, AppError> {
        GoalType::parse(&self.goal_type)
    }

    pub fn status(&self) -> Result<GoalStatus, AppError> {
        GoalStatus::parse(&self.status)
    }

    pub fn priority(&self) -> Result<GoalPriority, AppError> {
        GoalPriority::parse(&self.priority)
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Category,
    Progress,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Category => Entity::belongs_to(category::Entity)
                .from(Column::CategoryId)
                .to(category::Column::Id)
                .into(),
            Self::Progress => Entity::has_many(progress::Entity).into(),
        }
    }
}

impl Related<category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Progress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
