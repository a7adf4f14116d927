use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "goalroll",
    version,
    about = "Track recurring goals and roll them over into history"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Data directory (defaults to $GOALROLL_HOME, then ~/.goalroll)"
    )]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Close elapsed periods: record history and reset goal statuses
    Rollover(RolloverArgs),
    #[command(subcommand)]
    Category(CategoryCommand),
    #[command(subcommand)]
    Goal(GoalCommand),
    #[command(subcommand)]
    Progress(ProgressCommand),
    #[command(subcommand)]
    History(HistoryCommand),
}

#[derive(Args, Debug)]
pub struct RolloverArgs {
    #[arg(
        long,
        value_name = "YYYY-MM-DD",
        help = "Run as if invoked on this day (defaults to the local date)"
    )]
    pub today: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum CategoryCommand {
    Add(CategoryAdd),
    List(CategoryList),
    Update(CategoryUpdate),
    /// Remove categories together with every goal filed under them
    Remove(CategoryRemove),
}

#[derive(Subcommand, Debug)]
pub enum GoalCommand {
    Add(GoalAdd),
    List(GoalList),
    Show(GoalShow),
    Update(GoalUpdate),
    Done(GoalDone),
    Remove(GoalRemove),
}

#[derive(Subcommand, Debug)]
pub enum ProgressCommand {
    Add(ProgressAdd),
    List(ProgressList),
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    List(HistoryList),
}

#[derive(Args, Debug)]
pub struct CategoryAdd {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(long)]
    pub color: String,
    #[arg(long)]
    pub icon: Option<String>,
    pub name: String,
}

#[derive(Args, Debug)]
pub struct CategoryList {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CategoryUpdate {
    #[arg(long, value_name = "ID")]
    pub user: String,
    pub id: i64,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub icon: Option<String>,
}

#[derive(Args, Debug)]
pub struct CategoryRemove {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct GoalAdd {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(long, value_name = "ID")]
    pub category: i64,
    #[arg(long = "type", value_enum)]
    pub goal_type: GoalTypeArg,
    #[arg(long, value_enum)]
    pub priority: Option<GoalPriorityArg>,
    #[arg(long, default_value = "")]
    pub description: String,
    pub title: String,
}

#[derive(Args, Debug)]
pub struct GoalList {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(long, value_name = "ID")]
    pub category: Option<i64>,
    #[arg(long = "type", value_enum)]
    pub goal_type: Option<GoalTypeArg>,
    #[arg(long, value_enum)]
    pub status: Option<GoalStatusArg>,
    #[arg(long, value_enum)]
    pub priority: Option<GoalPriorityArg>,
    #[arg(long, value_name = "TERM")]
    pub search: Option<String>,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub offset: Option<u64>,
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct GoalShow {
    #[arg(long, value_name = "ID")]
    pub user: String,
    pub id: i64,
}

#[derive(Args, Debug)]
pub struct GoalUpdate {
    #[arg(long, value_name = "ID")]
    pub user: String,
    pub id: i64,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum)]
    pub status: Option<GoalStatusArg>,
    #[arg(long, value_enum)]
    pub priority: Option<GoalPriorityArg>,
}

#[derive(Args, Debug)]
pub struct GoalDone {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct GoalRemove {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(value_name = "ID", num_args = 1..)]
    pub ids: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct ProgressAdd {
    #[arg(long, value_name = "ID")]
    pub user: String,
    pub goal_id: i64,
    pub title: String,
    #[arg(long, default_value = "")]
    pub description: String,
}

#[derive(Args, Debug)]
pub struct ProgressList {
    #[arg(long, value_name = "ID")]
    pub user: String,
    pub goal_id: i64,
}

#[derive(Args, Debug)]
pub struct HistoryList {
    #[arg(long, value_name = "ID")]
    pub user: String,
    #[arg(long, value_enum)]
    pub period: Option<GoalTypeArg>,
    #[arg(long)]
    pub limit: Option<u64>,
    #[arg(long)]
    pub json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalTypeArg {
    Daily,
    Weekly,
    Monthly,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalStatusArg {
    Pending,
    Working,
    Done,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GoalPriorityArg {
    Low,
    Medium,
    High,
}
