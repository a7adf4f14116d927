mod app;
mod cli;
mod db;
mod entities;
mod error;
mod model;
mod period;
mod rollover;
mod util;

use chrono::Local;
use clap::Parser;
use serde_json::json;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::cli::{
    CategoryAdd, CategoryCommand, CategoryList, CategoryRemove, CategoryUpdate, Cli, Command,
    GoalAdd, GoalCommand, GoalDone, GoalList, GoalPriorityArg, GoalRemove,
    GoalShow, GoalStatusArg, GoalTypeArg, GoalUpdate, HistoryCommand, HistoryList,
    ProgressAdd, ProgressCommand, ProgressList, RolloverArgs,
};
use crate::error::AppError;
use crate::entities::goal;
use crate::model::{
    CategoryChanges, CategoryInput, GoalChanges, GoalInput, GoalPriority, GoalQuery, GoalStatus,
    GoalType, HistoryQuery, ProgressInput,
};
use crate::util::{
    format_category_list, format_datetime, format_goal_detail, format_goal_list,
    format_history_list,
};

const LOG_ENV: &str = "GOALROLL_LOG";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("goalroll=info,warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli { home, command } = Cli::parse();

    let home = db::resolve_home(home)?;
    let db_path = db::resolve_db_path(&home);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let app = App::new(db);

    match command {
        Command::Rollover(args) => handle_rollover(&app, args).await,
        Command::Category(command) => handle_category(&app, command).await,
        Command::Goal(command) => handle_goal(&app, command).await,
        Command::Progress(command) => handle_progress(&app, command).await,
        Command::History(command) => handle_history(&app, command).await,
    }
}

async fn handle_rollover(app: &App, args: RolloverArgs) -> Result<(), AppError> {
    let today = match args.today.as_deref() {
        Some(value) => period::parse_date(value)?,
        None => Local::now().date_naive(),
    };
    let results = rollover::run_scheduled_tasks(app, today).await;
    let output = json!({
        "success": true,
        "message": "Scheduled tasks processed",
        "results": results,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn handle_category(app: &App, command: CategoryCommand) -> Result<(), AppError> {
    match command {
        CategoryCommand::Add(args) => handle_category_add(app, args).await,
        CategoryCommand::List(args) => handle_category_list(app, args).await,
        CategoryCommand::Update(args) => handle_category_update(app, args).await,
        CategoryCommand::Remove(args) => handle_category_remove(app, args).await,
    }
}

async fn handle_goal(app: &App, command: GoalCommand) -> Result<(), AppError> {
    match command {
        GoalCommand::Add(args) => handle_goal_add(app, args).await,
        GoalCommand::List(args) => handle_goal_list(app, args).await,
        GoalCommand::Show(args) => handle_goal_show(app, args).await,
        GoalCommand::Update(args) => handle_goal_update(app, args).await,
        GoalCommand::Done(args) => handle_goal_done(app, args).await,
        GoalCommand::Remove(args) => handle_goal_remove(app, args).await,
    }
}

async fn handle_progress(app: &App, command: ProgressCommand) -> Result<(), AppError> {
    match command {
        ProgressCommand::Add(args) => handle_progress_add(app, args).await,
        ProgressCommand::List(args) => handle_progress_list(app, args).await,
    }
}

async fn handle_history(app: &App, command: HistoryCommand) -> Result<(), AppError> {
    match command {
        HistoryCommand::List(args) => handle_history_list(app, args).await,
    }
}

async fn handle_category_add(app: &App, args: CategoryAdd) -> Result<(), AppError> {
    require_non_empty("user", &args.user)?;
    let category = app
        .add_category(CategoryInput {
            user_id: args.user,
            name: args.name,
            color: args.color,
            icon: args.icon,
        })
        .await?;
    println!("Created category ID: {}: {}", category.id, category.name);
    Ok(())
}

async fn handle_category_list(app: &App, args: CategoryList) -> Result<(), AppError> {
    require_non_empty("user", &args.user)?;
    let categories = app.list_categories(&args.user).await?;
    if args.json {
        let items: Vec<_> = categories
            .iter()
            .map(|category| {
                json!({
                    "id": category.id,
                    "userId": category.user_id,
                    "name": category.name,
                    "color": category.color,
                    "icon": category.icon,
                    "createdAt": category.created_at,
                    "updatedAt": category.updated_at,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if categories.is_empty() {
        println!("No categories found.");
        return Ok(());
    }
    println!("{}", format_category_list(&categories));
    Ok(())
}

async fn handle_category_update(app: &App, args: CategoryUpdate) -> Result<(), AppError> {
    if args.name.is_none() && args.color.is_none() && args.icon.is_none() {
        return Err(AppError::InvalidInput("no changes provided".to_string()));
    }
    let changes = CategoryChanges {
        name: args.name,
        color: args.color,
        icon: args.icon,
    };
    let category = app.update_category(&args.user, args.id, changes).await?;
    println!("Updated category ID: {}: {}", category.id, category.name);
    Ok(())
}

async fn handle_category_remove(app: &App, args: CategoryRemove) -> Result<(), AppError> {
    for id in args.ids {
        let removed = app.delete_category(&args.user, id).await?;
        println!("Category ID: {id} removed ({removed} goals).");
    }
    Ok(())
}

async fn handle_goal_add(app: &App, args: GoalAdd) -> Result<(), AppError> {
    require_non_empty("user", &args.user)?;
    let goal = app
        .add_goal(GoalInput {
            user_id: args.user,
            category_id: args.category,
            title: args.title,
            description: args.description,
            goal_type: goal_type_from_arg(args.goal_type),
            priority: args
                .priority
                .map(goal_priority_from_arg)
                .unwrap_or_default(),
        })
        .await?;

    println!(
        "Created goal ID: {}: {} ({})",
        goal.id, goal.title, goal.goal_type
    );
    Ok(())
}

async fn handle_goal_list(app: &App, args: GoalList) -> Result<(), AppError> {
    require_non_empty("user", &args.user)?;
    let query = GoalQuery {
        category_id: args.category,
        goal_type: args.goal_type.map(goal_type_from_arg),
        status: args.status.map(goal_status_from_arg),
        priority: args.priority.map(goal_priority_from_arg),
        search: args.search,
        limit: args.limit,
        offset: args.offset,
    };

    let goals = app.list_goals(&args.user, &query).await?;
    if args.json {
        let items = goals
            .iter()
            .map(goal_json)
            .collect::<Result<Vec<_>, AppError>>()?;
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }
    if goals.is_empty() {
        println!("No goals found.");
        return Ok(());
    }
    println!("{}", format_goal_list(&goals));
    Ok(())
}

async fn handle_goal_show(app: &App, args: GoalShow) -> Result<(), AppError> {
    let detail = app.get_goal_detail(&args.user, args.id).await?;
    println!(
        "{}",
        format_goal_detail(&detail.goal, &detail.category, &detail.progress)
    );
    Ok(())
}

async fn handle_goal_update(app: &App, args: GoalUpdate) -> Result<(), AppError> {
    if args.title.is_none()
        && args.description.is_none()
        && args.status.is_none()
        && args.priority.is_none()
    {
        return Err(AppError::InvalidInput("no changes provided".to_string()));
    }
    let changes = GoalChanges {
        title: args.title,
        description: args.description,
        status: args.status.map(goal_status_from_arg),
        priority: args.priority.map(goal_priority_from_arg),
    };
    let goal = app.update_goal(&args.user, args.id, changes).await?;
    println!("Updated goal ID: {}: {}", goal.id, goal.title);
    Ok(())
}

async fn handle_goal_done(app: &App, args: GoalDone) -> Result<(), AppError> {
    for id in args.ids {
        let goal = app.set_goal_status(&args.user, id, GoalStatus::Done).await?;
        println!("Goal ID: {} marked done.", goal.id);
    }
    Ok(())
}

async fn handle_goal_remove(app: &App, args: GoalRemove) -> Result<(), AppError> {
    for id in args.ids {
        app.delete_goal(&args.user, id).await?;
        println!("Goal ID: {id} removed.");
    }
    Ok(())
}

async fn handle_progress_add(app: &App, args: ProgressAdd) -> Result<(), AppError> {
    let entry = app
        .add_progress(
            &args.user,
            args.goal_id,
            ProgressInput {
                title: args.title,
                description: args.description,
            },
        )
        .await?;
    println!(
        "Created progress ID: {} for goal ID: {}",
        entry.id, entry.goal_id
    );
    Ok(())
}

async fn handle_progress_list(app: &App, args: ProgressList) -> Result<(), AppError> {
    let entries = app.list_progress(&args.user, args.goal_id).await?;
    if entries.is_empty() {
        println!("No progress found for goal ID: {}.", args.goal_id);
        return Ok(());
    }
    for entry in entries {
        println!(
            "{:<4} {} {}",
            entry.id,
            format_datetime(entry.created_at),
            entry.title
        );
    }
    Ok(())
}

async fn handle_history_list(app: &App, args: HistoryList) -> Result<(), AppError> {
    require_non_empty("user", &args.user)?;
    let query = HistoryQuery {
        user_id: args.user,
        period: args.period.map(goal_type_from_arg),
        limit: args.limit,
    };
    let rows = app.list_history(&query).await?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }
    if rows.is_empty() {
        println!("No history found.");
        return Ok(());
    }
    println!("{}", format_history_list(&rows));
    Ok(())
}

/// Stored enum columns are parsed back, so a row with an unknown value is an error.
fn goal_json(goal: &goal::Model) -> Result<serde_json::Value, AppError> {
    Ok(json!({
        "id": goal.id,
        "userId": goal.user_id,
        "categoryId": goal.category_id,
        "title": goal.title,
        "description": goal.description,
        "type": goal.goal_type()?,
        "status": goal.status()?,
        "priority": goal.priority()?,
        "createdAt": goal.created_at,
        "updatedAt": goal.updated_at,
    }))
}

fn require_non_empty(label: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidInput(format!("{label} cannot be empty")));
    }
    Ok(())
}

fn goal_type_from_arg(arg: GoalTypeArg) -> GoalType {
    match arg {
        GoalTypeArg::Daily => GoalType::Daily,
        GoalTypeArg::Weekly => GoalType::Weekly,
        GoalTypeArg::Monthly => GoalType::Monthly,
    }
}

fn goal_status_from_arg(arg: GoalStatusArg) -> GoalStatus {
    match arg {
        GoalStatusArg::Pending => GoalStatus::Pending,
        GoalStatusArg::Working => GoalStatus::Working,
        GoalStatusArg::Done => GoalStatus::Done,
    }
}

fn goal_priority_from_arg(arg: GoalPriorityArg) -> GoalPriority {
    match arg {
        GoalPriorityArg::Low => GoalPriority::Low,
        GoalPriorityArg::Medium => GoalPriority::Medium,
        GoalPriorityArg::High => GoalPriority::High,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn goal_row(status: &str) -> goal::Model {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap();
        goal::Model {
            id: 4,
            user_id: "user-a".to_string(),
            category_id: 2,
            title: "Walk".to_string(),
            description: String::new(),
            goal_type: "weekly".to_string(),
            status: status.to_string(),
            priority: "high".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn goal_json_uses_wire_names() {
        let value = goal_json(&goal_row("working")).expect("json");
        assert_eq!(value["type"], "weekly");
        assert_eq!(value["status"], "working");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["categoryId"], 2);
    }

    #[test]
    fn goal_json_rejects_unknown_status() {
        let err = goal_json(&goal_row("archived")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid input: unknown goal status: archived");
    }
}
