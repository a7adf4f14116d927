//! Decides which goal periods have just closed for a given calendar day.
//!
//! Weeks start on Monday. The scheduler is expected to run once per day at or
//! after local midnight, so the closed period always ends yesterday.

use chrono::{Datelike, Days, NaiveDate, Weekday};

use crate::error::AppError;
use crate::model::GoalType;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Last day of every period closed by a run on `today`.
pub fn as_of_date(today: NaiveDate) -> NaiveDate {
    today.pred_opt().unwrap_or(NaiveDate::MIN)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    Ok(NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)?)
}

pub fn is_elapsed(goal_type: GoalType, today: NaiveDate) -> bool {
    match goal_type {
        GoalType::Daily => true,
        GoalType::Weekly => today.weekday() == Weekday::Mon,
        GoalType::Monthly => today.day() == 1,
    }
}

pub fn elapsed_periods(today: NaiveDate) -> Vec<GoalType> {
    GoalType::ALL
        .into_iter()
        .filter(|goal_type| is_elapsed(*goal_type, today))
        .collect()
}

/// Inclusive `(start, end)` of the period of `goal_type` that ends yesterday.
pub fn closed_span(goal_type: GoalType, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let end = as_of_date(today);
    let start = match goal_type {
        GoalType::Daily => end,
        GoalType::Weekly => today.checked_sub_days(Days::new(7)).unwrap_or(end),
        GoalType::Monthly => end.with_day(1).unwrap_or(end),
    };
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(value: &str) -> NaiveDate {
        parse_date(value).expect("valid date")
    }

    #[test]
    fn as_of_is_yesterday_across_boundaries() {
        assert_eq!(format_date(as_of_date(date("2024-03-15"))), "2024-03-14");
        assert_eq!(format_date(as_of_date(date("2024-03-01"))), "2024-02-29");
        assert_eq!(format_date(as_of_date(date("2024-01-01"))), "2023-12-31");
    }

    #[test]
    fn tuesday_only_closes_daily() {
        let tuesday = date("2024-03-12");
        assert_eq!(elapsed_periods(tuesday), vec![GoalType::Daily]);
    }

    #[test]
    fn monday_closes_week() {
        let monday = date("2024-03-11");
        assert!(is_elapsed(GoalType::Weekly, monday));
        assert!(!is_elapsed(GoalType::Monthly, monday));
        assert_eq!(
            closed_span(GoalType::Weekly, monday),
            (date("2024-03-04"), date("2024-03-10"))
        );
    }

    #[test]
    fn first_of_month_closes_previous_month() {
        let first = date("2024-03-01");
        assert!(is_elapsed(GoalType::Monthly, first));
        assert_eq!(
            closed_span(GoalType::Monthly, first),
            (date("2024-02-01"), date("2024-02-29"))
        );
    }

    #[test]
    fn monday_first_closes_everything() {
        let both = date("2024-04-01");
        assert_eq!(elapsed_periods(both), GoalType::ALL.to_vec());
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(matches!(parse_date("2024-13-01"), Err(AppError::Date(_))));
    }
}
