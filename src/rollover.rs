//! Period rollover.
//!
//! For every period type that closed yesterday, the rollover snapshots each
//! user's completion counts into history and then resets every goal of that
//! type back to `pending`. The history write is skip-if-exists, so repeated
//! runs for the same day never duplicate rows. The reset is unconditional and
//! is not tied to the history write in a transaction.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::model::GoalType;
use crate::period;

/// Completion counters for one user across all goals of one type.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RollupStats {
    pub user_id: String,
    pub total: i64,
    pub completed: i64,
    pub pending: i64,
}

impl RollupStats {
    /// `pending` counts every status other than `done`.
    pub fn new(user_id: String, total: i64, completed: i64) -> Self {
        Self {
            user_id,
            total,
            completed,
            pending: total - completed,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewHistoryRecord {
    pub user_id: String,
    pub date: String,
    pub period: GoalType,
    pub completed_count: i64,
    pub pending_count: i64,
    pub total_count: i64,
}

impl NewHistoryRecord {
    fn from_stats(stats: &RollupStats, date: &str, period: GoalType) -> Self {
        Self {
            user_id: stats.user_id.clone(),
            date: date.to_string(),
            period,
            completed_count: stats.completed,
            pending_count: stats.pending,
            total_count: stats.total,
        }
    }
}

pub trait GoalStore {
    /// One entry per user owning at least one goal of `goal_type`, system-wide.
    async fn aggregate(&self, goal_type: GoalType) -> Result<Vec<RollupStats>, AppError>;

    /// Sets every goal of `goal_type` to `pending`. Returns the number of rows touched.
    async fn reset_status_for_type(&self, goal_type: GoalType) -> Result<u64, AppError>;
}

pub trait HistoryStore {
    async fn history_exists(
        &self,
        user_id: &str,
        date: &str,
        period: GoalType,
    ) -> Result<bool, AppError>;

    /// Returns `false` when a record with the same key was written concurrently.
    async fn insert_history(&self, record: NewHistoryRecord) -> Result<bool, AppError>;
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Skipped,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PeriodOutcome {
    pub processed: u64,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PeriodOutcome {
    pub fn skipped() -> Self {
        Self {
            processed: 0,
            status: OutcomeStatus::Skipped,
            error: None,
        }
    }

    pub fn success(processed: u64) -> Self {
        Self {
            processed,
            status: OutcomeStatus::Success,
            error: None,
        }
    }

    pub fn failed(err: &AppError) -> Self {
        Self {
            processed: 0,
            status: OutcomeStatus::Error,
            error: Some(err.to_string()),
        }
    }
}

impl Default for PeriodOutcome {
    fn default() -> Self {
        Self::skipped()
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct RolloverReport {
    pub daily: PeriodOutcome,
    pub weekly: PeriodOutcome,
    pub monthly: PeriodOutcome,
}

impl RolloverReport {
    fn outcome_mut(&mut self, goal_type: GoalType) -> &mut PeriodOutcome {
        match goal_type {
            GoalType::Daily => &mut self.daily,
            GoalType::Weekly => &mut self.weekly,
            GoalType::Monthly => &mut self.monthly,
        }
    }
}

/// Runs every period rollover due on `today`, in daily, weekly, monthly order.
///
/// A failure in one period type is recorded in its outcome and never stops
/// the remaining types.
pub async fn run_scheduled_tasks<S>(store: &S, today: NaiveDate) -> RolloverReport
where
    S: GoalStore + HistoryStore,
{
    let date = period::format_date(period::as_of_date(today));
    let elapsed = period::elapsed_periods(today);
    info!(%today, date = %date, ?elapsed, "running scheduled rollover");
    let mut report = RolloverReport::default();

    for goal_type in GoalType::ALL {
        if !elapsed.contains(&goal_type) {
            debug!(goal_type = goal_type.as_str(), %today, "period still open");
            continue;
        }
        let (start, end) = period::closed_span(goal_type, today);
        debug!(goal_type = goal_type.as_str(), %start, %end, "closing period");
        *report.outcome_mut(goal_type) = run_period(store, goal_type, &date).await;
    }

    report
}

pub async fn run_period<S>(store: &S, goal_type: GoalType, date: &str) -> PeriodOutcome
where
    S: GoalStore + HistoryStore,
{
    match process_period(store, goal_type, date).await {
        Ok(processed) => PeriodOutcome::success(processed),
        Err(err) => {
            error!(goal_type = goal_type.as_str(), date, error = %err, "rollover failed");
            PeriodOutcome::failed(&err)
        }
    }
}

async fn process_period<S>(store: &S, goal_type: GoalType, date: &str) -> Result<u64, AppError>
where
    S: GoalStore + HistoryStore,
{
    let stats = store.aggregate(goal_type).await?;
    let processed = write_history(store, &stats, date, goal_type).await?;
    let reset = store.reset_status_for_type(goal_type).await?;
    info!(
        goal_type = goal_type.as_str(),
        date,
        users = stats.len(),
        processed,
        reset,
        "period rolled over"
    );
    Ok(processed)
}

/// Writes one history record per entry unless the `(user, date, period)` key
/// already exists. Returns how many records were newly written.
pub async fn write_history<S>(
    store: &S,
    stats: &[RollupStats],
    date: &str,
    period: GoalType,
) -> Result<u64, AppError>
where
    S: HistoryStore,
{
    let mut processed = 0u64;
    let mut skipped = 0usize;
    for entry in stats {
        if store.history_exists(&entry.user_id, date, period).await? {
            skipped += 1;
            continue;
        }
        if store
            .insert_history(NewHistoryRecord::from_stats(entry, date, period))
            .await?
        {
            processed += 1;
        } else {
            skipped += 1;
        }
    }

    // The reset that follows still runs for these users, so any completion
    // made since the earlier snapshot is dropped without a record.
    if skipped > 0 {
        warn!(
            period = period.as_str(),
            date, skipped, "history already recorded for some users; statuses will still be reset"
        );
    }
    Ok(processed)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::*;
    use crate::model::GoalStatus;

    #[derive(Clone, Debug)]
    struct MemGoal {
        user_id: &'static str,
        goal_type: GoalType,
        status: GoalStatus,
    }

    #[derive(Default)]
    struct MemoryStore {
        goals: RefCell<Vec<MemGoal>>,
        history: RefCell<Vec<NewHistoryRecord>>,
        failing_aggregate: Option<GoalType>,
        resets: RefCell<Vec<GoalType>>,
    }

    impl MemoryStore {
        fn with_goals(goals: Vec<(&'static str, GoalType, GoalStatus)>) -> Self {
            let goals = goals
                .into_iter()
                .map(|(user_id, goal_type, status)| MemGoal {
                    user_id,
                    goal_type,
                    status,
                })
                .collect();
            Self {
                goals: RefCell::new(goals),
                ..Default::default()
            }
        }

        fn set_status(&self, goal_type: GoalType, status: GoalStatus) {
            for goal in self.goals.borrow_mut().iter_mut() {
                if goal.goal_type == goal_type {
                    goal.status = status;
                }
            }
        }

        fn statuses(&self, goal_type: GoalType) -> Vec<GoalStatus> {
            self.goals
                .borrow()
                .iter()
                .filter(|goal| goal.goal_type == goal_type)
                .map(|goal| goal.status)
                .collect()
        }
    }

    impl GoalStore for MemoryStore {
        async fn aggregate(&self, goal_type: GoalType) -> Result<Vec<RollupStats>, AppError> {
            if self.failing_aggregate == Some(goal_type) {
                return Err(AppError::InvalidInput("store unavailable".to_string()));
            }
            let mut by_user: BTreeMap<&str, (i64, i64)> = BTreeMap::new();
            for goal in self.goals.borrow().iter() {
                if goal.goal_type != goal_type {
                    continue;
                }
                let entry = by_user.entry(goal.user_id).or_default();
                entry.0 += 1;
                if goal.status == GoalStatus::Done {
                    entry.1 += 1;
                }
            }
            Ok(by_user
                .into_iter()
                .map(|(user, (total, completed))| RollupStats::new(user.to_string(), total, completed))
                .collect())
        }

        async fn reset_status_for_type(&self, goal_type: GoalType) -> Result<u64, AppError> {
            self.resets.borrow_mut().push(goal_type);
            let mut count = 0;
            for goal in self.goals.borrow_mut().iter_mut() {
                if goal.goal_type == goal_type {
                    goal.status = GoalStatus::Pending;
                    count += 1;
                }
            }
            Ok(count)
        }
    }

    impl HistoryStore for MemoryStore {
        async fn history_exists(
            &self,
            user_id: &str,
            date: &str,
            period: GoalType,
        ) -> Result<bool, AppError> {
            Ok(self
                .history
                .borrow()
                .iter()
                .any(|row| row.user_id == user_id && row.date == date && row.period == period))
        }

        async fn insert_history(&self, record: NewHistoryRecord) -> Result<bool, AppError> {
            self.history.borrow_mut().push(record);
            Ok(true)
        }
    }

    fn date(value: &str) -> NaiveDate {
        period::parse_date(value).expect("valid date")
    }

    fn two_user_store() -> MemoryStore {
        MemoryStore::with_goals(vec![
            ("user-a", GoalType::Daily, GoalStatus::Done),
            ("user-a", GoalType::Daily, GoalStatus::Done),
            ("user-a", GoalType::Daily, GoalStatus::Pending),
            ("user-b", GoalType::Daily, GoalStatus::Done),
        ])
    }

    #[tokio::test]
    async fn daily_rollover_snapshots_then_resets() {
        let store = two_user_store();

        let outcome = run_period(&store, GoalType::Daily, "2024-03-14").await;

        assert_eq!(outcome, PeriodOutcome::success(2));
        let history = store.history.borrow();
        assert_eq!(
            history[0],
            NewHistoryRecord {
                user_id: "user-a".to_string(),
                date: "2024-03-14".to_string(),
                period: GoalType::Daily,
                completed_count: 2,
                pending_count: 1,
                total_count: 3,
            }
        );
        assert_eq!(history[1].user_id, "user-b");
        assert_eq!(history[1].completed_count, 1);
        assert_eq!(history[1].pending_count, 0);
        assert_eq!(history[1].total_count, 1);
        assert!(store
            .statuses(GoalType::Daily)
            .iter()
            .all(|status| *status == GoalStatus::Pending));
    }

    #[tokio::test]
    async fn rerun_for_same_date_writes_nothing() {
        let store = two_user_store();
        run_period(&store, GoalType::Daily, "2024-03-14").await;
        store.set_status(GoalType::Daily, GoalStatus::Done);

        let outcome = run_period(&store, GoalType::Daily, "2024-03-14").await;

        assert_eq!(outcome, PeriodOutcome::success(0));
        let history = store.history.borrow();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].completed_count, 2);
        // reset is unconditional even when nothing was recorded
        assert!(store
            .statuses(GoalType::Daily)
            .iter()
            .all(|status| *status == GoalStatus::Pending));
    }

    #[tokio::test]
    async fn working_goals_count_as_pending() {
        let store = MemoryStore::with_goals(vec![
            ("user-a", GoalType::Weekly, GoalStatus::Working),
            ("user-a", GoalType::Weekly, GoalStatus::Done),
        ]);

        let stats = store.aggregate(GoalType::Weekly).await.unwrap();

        assert_eq!(stats, vec![RollupStats::new("user-a".to_string(), 2, 1)]);
        assert_eq!(stats[0].completed + stats[0].pending, stats[0].total);
    }

    #[tokio::test]
    async fn users_without_goals_of_type_get_no_record() {
        let store = MemoryStore::with_goals(vec![
            ("user-a", GoalType::Daily, GoalStatus::Done),
            ("user-b", GoalType::Weekly, GoalStatus::Done),
        ]);

        run_period(&store, GoalType::Daily, "2024-03-14").await;

        let history = store.history.borrow();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].user_id, "user-a");
        assert_eq!(store.statuses(GoalType::Weekly), vec![GoalStatus::Done]);
    }

    #[tokio::test]
    async fn tuesday_skips_weekly_and_monthly() {
        let store = MemoryStore::with_goals(vec![
            ("user-a", GoalType::Weekly, GoalStatus::Done),
            ("user-a", GoalType::Monthly, GoalStatus::Done),
        ]);

        let report = run_scheduled_tasks(&store, date("2024-03-12")).await;

        assert_eq!(report.daily, PeriodOutcome::success(0));
        assert_eq!(report.weekly, PeriodOutcome::skipped());
        assert_eq!(report.monthly, PeriodOutcome::skipped());
        assert_eq!(*store.resets.borrow(), vec![GoalType::Daily]);
        assert_eq!(store.statuses(GoalType::Weekly), vec![GoalStatus::Done]);
    }

    #[tokio::test]
    async fn first_of_month_runs_monthly_with_last_day_of_previous_month() {
        let store = MemoryStore::with_goals(vec![("user-a", GoalType::Monthly, GoalStatus::Done)]);

        let report = run_scheduled_tasks(&store, date("2024-03-01")).await;

        assert_eq!(report.monthly, PeriodOutcome::success(1));
        assert_eq!(report.weekly, PeriodOutcome::skipped());
        let history = store.history.borrow();
        assert_eq!(history[0].date, "2024-02-29");
        assert_eq!(history[0].period, GoalType::Monthly);
    }

    #[tokio::test]
    async fn failure_in_one_period_does_not_block_others() {
        let mut store = MemoryStore::with_goals(vec![
            ("user-a", GoalType::Daily, GoalStatus::Done),
            ("user-a", GoalType::Weekly, GoalStatus::Done),
        ]);
        store.failing_aggregate = Some(GoalType::Daily);

        // 2024-04-01 is a Monday and the first of the month
        let report = run_scheduled_tasks(&store, date("2024-04-01")).await;

        assert_eq!(report.daily.status, OutcomeStatus::Error);
        assert_eq!(report.daily.processed, 0);
        assert!(report
            .daily
            .error
            .as_deref()
            .is_some_and(|message| message.contains("store unavailable")));
        assert_eq!(report.weekly, PeriodOutcome::success(1));
        assert_eq!(report.monthly, PeriodOutcome::success(0));
        assert_eq!(store.statuses(GoalType::Daily), vec![GoalStatus::Done]);
    }

    #[test]
    fn report_serializes_per_period() {
        let report = RolloverReport {
            daily: PeriodOutcome::success(3),
            ..Default::default()
        };

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["daily"]["processed"], 3);
        assert_eq!(value["daily"]["status"], "success");
        assert_eq!(value["weekly"]["status"], "skipped");
        assert!(value["weekly"].get("error").is_none());
    }
}
