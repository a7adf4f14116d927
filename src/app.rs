use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};

use crate::entities::{category, goal, history, progress};
use crate::error::AppError;
use crate::model::{
    CategoryChanges, CategoryInput, GoalChanges, GoalInput, GoalQuery, GoalStatus, GoalType,
    HistoryQuery, ProgressInput,
};
use crate::rollover::{GoalStore, HistoryStore, NewHistoryRecord, RollupStats};

const CATEGORY_NAME_MAX: usize = 50;
const GOAL_TITLE_MAX: usize = 100;
const PROGRESS_TITLE_MAX: usize = 200;

pub struct App {
    db: DatabaseConnection,
}

pub struct GoalDetail {
    pub goal: goal::Model,
    pub category: category::Model,
    pub progress: Vec<progress::Model>,
}

impl App {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn add_category(&self, input: CategoryInput) -> Result<category::Model, AppError> {
        ensure_non_empty("user id", &input.user_id)?;
        ensure_title("category name", &input.name, CATEGORY_NAME_MAX)?;
        ensure_non_empty("category color", &input.color)?;
        let name = input.name.trim().to_string();
        let now = Utc::now();
        let active = category::ActiveModel {
            user_id: Set(input.user_id),
            name: Set(name.clone()),
            color: Set(input.color),
            icon: Set(input.icon),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let insert = match category::Entity::insert(active).exec(&self.db).await {
            Ok(insert) => insert,
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(duplicate_category(&name));
            }
            Err(err) => return Err(err.into()),
        };
        category::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("category not found after insert".to_string()))
    }

    pub async fn get_category(&self, user_id: &str, id: i64) -> Result<category::Model, AppError> {
        category::Entity::find_by_id(id)
            .filter(category::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("category id {id}")))
    }

    pub async fn list_categories(&self, user_id: &str) -> Result<Vec<category::Model>, AppError> {
        Ok(category::Entity::find()
            .filter(category::Column::UserId.eq(user_id))
            .order_by_desc(category::Column::CreatedAt)
            .order_by_desc(category::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn update_category(
        &self,
        user_id: &str,
        id: i64,
        changes: CategoryChanges,
    ) -> Result<category::Model, AppError> {
        if let Some(name) = changes.name.as_deref() {
            ensure_title("category name", name, CATEGORY_NAME_MAX)?;
        }
        if let Some(color) = changes.color.as_deref() {
            ensure_non_empty("category color", color)?;
        }
        let existing = self.get_category(user_id, id).await?;
        let mut active: category::ActiveModel = existing.into();
        let mut renamed = None;
        if let Some(name) = changes.name {
            let name = name.trim().to_string();
            active.name = Set(name.clone());
            renamed = Some(name);
        }
        if let Some(color) = changes.color {
            active.color = Set(color);
        }
        if let Some(icon) = changes.icon {
            active.icon = Set(Some(icon));
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Err(duplicate_category(renamed.as_deref().unwrap_or_default()))
            }
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("category id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Removes the category, every goal filed under it, and their progress entries.
    /// Returns the number of goals removed.
    pub async fn delete_category(&self, user_id: &str, id: i64) -> Result<u64, AppError> {
        let category = self.get_category(user_id, id).await?;
        let txn = self.db.begin().await?;
        let result: Result<u64, AppError> = async {
            let goal_ids: Vec<i64> = goal::Entity::find()
                .select_only()
                .column(goal::Column::Id)
                .filter(goal::Column::CategoryId.eq(category.id))
                .filter(goal::Column::UserId.eq(user_id))
                .into_tuple()
                .all(&txn)
                .await?;
            if !goal_ids.is_empty() {
                progress::Entity::delete_many()
                    .filter(progress::Column::GoalId.is_in(goal_ids.clone()))
                    .exec(&txn)
                    .await?;
            }
            let removed = goal::Entity::delete_many()
                .filter(goal::Column::Id.is_in(goal_ids))
                .exec(&txn)
                .await?;
            category::Entity::delete_by_id(category.id).exec(&txn).await?;
            Ok(removed.rows_affected)
        }
        .await;

        finalize_transaction(txn, result).await
    }

    /// The goal's category must exist and belong to the same user.
    pub async fn add_goal(&self, input: GoalInput) -> Result<goal::Model, AppError> {
        ensure_non_empty("user id", &input.user_id)?;
        ensure_title("goal title", &input.title, GOAL_TITLE_MAX)?;
        let category = self.get_category(&input.user_id, input.category_id).await?;
        let now = Utc::now();
        let active = goal::ActiveModel {
            user_id: Set(input.user_id),
            category_id: Set(category.id),
            title: Set(input.title),
            description: Set(input.description),
            goal_type: Set(input.goal_type.as_str().to_string()),
            status: Set(GoalStatus::Pending.as_str().to_string()),
            priority: Set(input.priority.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let insert = goal::Entity::insert(active).exec(&self.db).await?;
        let created = goal::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?;
        created.ok_or_else(|| AppError::NotFound("goal not found after insert".to_string()))
    }

    /// Goals are only visible to the user that owns them.
    pub async fn get_goal(&self, user_id: &str, id: i64) -> Result<goal::Model, AppError> {
        goal::Entity::find_by_id(id)
            .filter(goal::Column::UserId.eq(user_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("goal id {id}")))
    }

    pub async fn get_goal_detail(&self, user_id: &str, id: i64) -> Result<GoalDetail, AppError> {
        let goal = self.get_goal(user_id, id).await?;
        let category = self.get_category(user_id, goal.category_id).await?;
        let progress = self.progress_for_goal(goal.id).await?;
        Ok(GoalDetail {
            goal,
            category,
            progress,
        })
    }

    pub async fn list_goals(
        &self,
        user_id: &str,
        query: &GoalQuery,
    ) -> Result<Vec<goal::Model>, AppError> {
        let mut select = goal::Entity::find().filter(goal::Column::UserId.eq(user_id));
        if let Some(category_id) = query.category_id {
            select = select.filter(goal::Column::CategoryId.eq(category_id));
        }
        if let Some(goal_type) = query.goal_type {
            select = select.filter(goal::Column::GoalType.eq(goal_type.as_str()));
        }
        if let Some(status) = query.status {
            select = select.filter(goal::Column::Status.eq(status.as_str()));
        }
        if let Some(priority) = query.priority {
            select = select.filter(goal::Column::Priority.eq(priority.as_str()));
        }
        if let Some(search) = query.search.as_deref() {
            let search = search.trim();
            if !search.is_empty() {
                select = select.filter(goal::Column::Title.contains(search));
            }
        }
        select = select
            .order_by_desc(goal::Column::CreatedAt)
            .order_by_desc(goal::Column::Id);
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        if let Some(offset) = query.offset {
            select = select.offset(offset);
        }
        Ok(select.all(&self.db).await?)
    }

    pub async fn update_goal(
        &self,
        user_id: &str,
        id: i64,
        changes: GoalChanges,
    ) -> Result<goal::Model, AppError> {
        if let Some(title) = changes.title.as_deref() {
            ensure_title("goal title", title, GOAL_TITLE_MAX)?;
        }
        let existing = self.get_goal(user_id, id).await?;
        let mut active: goal::ActiveModel = existing.into();
        if let Some(title) = changes.title {
            active.title = Set(title);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(status) = changes.status {
            active.status = Set(status.as_str().to_string());
        }
        if let Some(priority) = changes.priority {
            active.priority = Set(priority.as_str().to_string());
        }
        active.updated_at = Set(Utc::now());

        match active.update(&self.db).await {
            Ok(model) => Ok(model),
            Err(sea_orm::DbErr::RecordNotFound(_)) | Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(AppError::NotFound(format!("goal id {id}")))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn set_goal_status(
        &self,
        user_id: &str,
        id: i64,
        status: GoalStatus,
    ) -> Result<goal::Model, AppError> {
        let changes = GoalChanges {
            status: Some(status),
            ..Default::default()
        };
        self.update_goal(user_id, id, changes).await
    }

    /// Removes the goal together with its progress entries.
    pub async fn delete_goal(&self, user_id: &str, id: i64) -> Result<(), AppError> {
        let goal = self.get_goal(user_id, id).await?;
        let txn = self.db.begin().await?;
        let result: Result<(), AppError> = async {
            progress::Entity::delete_many()
                .filter(progress::Column::GoalId.eq(goal.id))
                .exec(&txn)
                .await?;
            goal::Entity::delete_by_id(goal.id).exec(&txn).await?;
            Ok(())
        }
        .await;

        finalize_transaction(txn, result).await
    }

    pub async fn add_progress(
        &self,
        user_id: &str,
        goal_id: i64,
        input: ProgressInput,
    ) -> Result<progress::Model, AppError> {
        ensure_title("progress title", &input.title, PROGRESS_TITLE_MAX)?;
        let goal = self.get_goal(user_id, goal_id).await?;
        let now = Utc::now();
        let active = progress::ActiveModel {
            goal_id: Set(goal.id),
            title: Set(input.title),
            description: Set(input.description),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let insert = progress::Entity::insert(active).exec(&self.db).await?;
        progress::Entity::find_by_id(insert.last_insert_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("progress not found after insert".to_string()))
    }

    pub async fn list_progress(
        &self,
        user_id: &str,
        goal_id: i64,
    ) -> Result<Vec<progress::Model>, AppError> {
        let goal = self.get_goal(user_id, goal_id).await?;
        self.progress_for_goal(goal.id).await
    }

    async fn progress_for_goal(&self, goal_id: i64) -> Result<Vec<progress::Model>, AppError> {
        Ok(progress::Entity::find()
            .filter(progress::Column::GoalId.eq(goal_id))
            .order_by_desc(progress::Column::CreatedAt)
            .order_by_desc(progress::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// History for one user, newest date first.
    pub async fn list_history(&self, query: &HistoryQuery) -> Result<Vec<history::Model>, AppError> {
        ensure_non_empty("user id", &query.user_id)?;
        let mut select =
            history::Entity::find().filter(history::Column::UserId.eq(query.user_id.as_str()));
        if let Some(period) = query.period {
            select = select.filter(history::Column::Period.eq(period.as_str()));
        }
        select = select
            .order_by_desc(history::Column::Date)
            .order_by_asc(history::Column::Period);
        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }
        Ok(select.all(&self.db).await?)
    }
}

impl GoalStore for App {
    async fn aggregate(&self, goal_type: GoalType) -> Result<Vec<RollupStats>, AppError> {
        let rows: Vec<(String, i64, i64)> = goal::Entity::find()
            .select_only()
            .column(goal::Column::UserId)
            .column_as(Expr::cust("COUNT(*)"), "total")
            .column_as(
                Expr::cust_with_values(
                    "COALESCE(SUM(CASE WHEN status = ? THEN 1 ELSE 0 END), 0)",
                    [GoalStatus::Done.as_str()],
                ),
                "completed",
            )
            .filter(goal::Column::GoalType.eq(goal_type.as_str()))
            .group_by(goal::Column::UserId)
            .order_by_asc(goal::Column::UserId)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(user_id, total, completed)| RollupStats::new(user_id, total, completed))
            .collect())
    }

    async fn reset_status_for_type(&self, goal_type: GoalType) -> Result<u64, AppError> {
        let result = goal::Entity::update_many()
            .col_expr(
                goal::Column::Status,
                Expr::value(GoalStatus::Pending.as_str()),
            )
            .col_expr(goal::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(goal::Column::GoalType.eq(goal_type.as_str()))
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

impl HistoryStore for App {
    async fn history_exists(
        &self,
        user_id: &str,
        date: &str,
        period: GoalType,
    ) -> Result<bool, AppError> {
        let count = history::Entity::find()
            .filter(history::Column::UserId.eq(user_id))
            .filter(history::Column::Date.eq(date))
            .filter(history::Column::Period.eq(period.as_str()))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn insert_history(&self, record: NewHistoryRecord) -> Result<bool, AppError> {
        let now = Utc::now();
        let active = history::ActiveModel {
            user_id: Set(record.user_id),
            date: Set(record.date),
            period: Set(record.period.as_str().to_string()),
            completed_count: Set(record.completed_count),
            pending_count: Set(record.pending_count),
            total_count: Set(record.total_count),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        match history::Entity::insert(active).exec(&self.db).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

async fn finalize_transaction<T>(
    txn: DatabaseTransaction,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    match result {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                return Err(rollback_err.into());
            }
            Err(err)
        }
    }
}

fn duplicate_category(name: &str) -> AppError {
    AppError::InvalidInput(format!("category name already exists: {name}"))
}

fn ensure_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn ensure_title(label: &str, value: &str, max: usize) -> Result<(), AppError> {
    ensure_non_empty(label, value)?;
    if value.chars().count() > max {
        return Err(AppError::InvalidInput(format!(
            "{label} cannot be more than {max} characters"
        )));
    }
    Ok(())
}
