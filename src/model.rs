use serde::Serialize;

use crate::error::AppError;

/// Recurrence cadence of a goal. Also used as the `period` of a history record.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Daily,
    Weekly,
    Monthly,
}

impl GoalType {
    /// Rollover order.
    pub const ALL: [GoalType; 3] = [GoalType::Daily, GoalType::Weekly, GoalType::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            other => Err(AppError::InvalidInput(format!("unknown goal type: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    Pending,
    Working,
    Done,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Working => "working",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "pending" => Ok(Self::Pending),
            "working" => Ok(Self::Working),
            "done" => Ok(Self::Done),
            other => Err(AppError::InvalidInput(format!("unknown goal status: {other}"))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl GoalPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Result<Self, AppError> {
        match value {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(AppError::InvalidInput(format!("unknown goal priority: {other}"))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct GoalInput {
    pub user_id: String,
    pub category_id: i64,
    pub title: String,
    pub description: String,
    pub goal_type: GoalType,
    pub priority: GoalPriority,
}

#[derive(Clone, Debug, Default)]
pub struct GoalChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<GoalStatus>,
    pub priority: Option<GoalPriority>,
}

#[derive(Clone, Debug, Default)]
pub struct GoalQuery {
    pub category_id: Option<i64>,
    pub goal_type: Option<GoalType>,
    pub status: Option<GoalStatus>,
    pub priority: Option<GoalPriority>,
    pub search: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct HistoryQuery {
    pub user_id: String,
    pub period: Option<GoalType>,
    pub limit: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct ProgressInput {
    pub title: String,
    pub description: String,
}

#[derive(Clone, Debug)]
pub struct CategoryInput {
    pub user_id: String,
    pub name: String,
    pub color: String,
    pub icon: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}
