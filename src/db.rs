use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Schema, Statement};
use url::Url;

use crate::entities::{category, goal, history, progress};
use crate::error::AppError;

pub const HOME_ENV: &str = "GOALROLL_HOME";
const DB_FILE: &str = "goalroll.db";

pub fn resolve_db_path(home: &Path) -> PathBuf {
    home.join(DB_FILE)
}

/// Data directory: `--home`, then `$GOALROLL_HOME`, then `$HOME/.goalroll`.
pub fn resolve_home(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(value) = std::env::var(HOME_ENV) {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".goalroll"));
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; pass --home or set {HOME_ENV}"
    )))
}

pub fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn open_lock(path: &Path) -> Result<fd_lock::RwLock<File>, AppError> {
    let lock_path = path.with_extension("lock");
    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path)?;
    Ok(fd_lock::RwLock::new(file))
}

pub async fn connect(path: &Path) -> Result<DatabaseConnection, AppError> {
    let mut url = Url::from_file_path(path)
        .map_err(|_| AppError::InvalidInput(format!("invalid sqlite path: {}", path.display())))?;
    url.set_query(Some("mode=rwc"));
    let sqlite_url = url.as_str().replacen("file://", "sqlite://", 1);
    tracing::debug!(url = %sqlite_url, "connecting to database");
    Ok(Database::connect(&sqlite_url).await?)
}

pub async fn ensure_schema(db: &DatabaseConnection) -> Result<(), AppError> {
    db.execute(Statement::from_string(
        DatabaseBackend::Sqlite,
        "PRAGMA foreign_keys = ON;",
    ))
    .await?;

    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut category_stmt = schema.create_table_from_entity(category::Entity);
    category_stmt.if_not_exists();
    db.execute(builder.build(&category_stmt)).await?;

    let mut goal_stmt = schema.create_table_from_entity(goal::Entity);
    goal_stmt.if_not_exists();
    db.execute(builder.build(&goal_stmt)).await?;

    let mut history_stmt = schema.create_table_from_entity(history::Entity);
    history_stmt.if_not_exists();
    db.execute(builder.build(&history_stmt)).await?;

    let mut progress_stmt = schema.create_table_from_entity(progress::Entity);
    progress_stmt.if_not_exists();
    db.execute(builder.build(&progress_stmt)).await?;

    let mut category_name_key = Index::create()
        .name("idx_categories_user_name")
        .table(category::Entity)
        .col(category::Column::UserId)
        .col(category::Column::Name)
        .unique()
        .to_owned();
    category_name_key.if_not_exists();
    db.execute(builder.build(&category_name_key)).await?;

    let mut goal_type_index = Index::create()
        .name("idx_goals_type_user")
        .table(goal::Entity)
        .col(goal::Column::GoalType)
        .col(goal::Column::UserId)
        .to_owned();
    goal_type_index.if_not_exists();
    db.execute(builder.build(&goal_type_index)).await?;

    let mut history_key = Index::create()
        .name("idx_goal_history_user_date_period")
        .table(history::Entity)
        .col(history::Column::UserId)
        .col(history::Column::Date)
        .col(history::Column::Period)
        .unique()
        .to_owned();
    history_key.if_not_exists();
    db.execute(builder.build(&history_key)).await?;

    let mut progress_index = Index::create()
        .name("idx_goal_progress_goal")
        .table(progress::Entity)
        .col(progress::Column::GoalId)
        .to_owned();
    progress_index.if_not_exists();
    db.execute(builder.build(&progress_index)).await?;

    Ok(())
}
