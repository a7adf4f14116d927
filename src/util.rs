use chrono::{DateTime, Utc};

use crate::entities::{category, goal, history, progress};

fn has_text(value: &str) -> bool {
    !value.trim().is_empty()
}

pub fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M").to_string()
}

pub fn format_goal_detail(
    goal: &goal::Model,
    category: &category::Model,
    progress: &[progress::Model],
) -> String {
    let mut output = String::new();
    output.push_str(&format!("Goal ID: {}\n", goal.id));
    output.push_str(&format!("User: {}\n", goal.user_id));
    output.push_str(&format!("Category: {} (id {})\n", category.name, category.id));
    output.push_str(&format!("Type: {}\n", goal.goal_type));
    output.push_str(&format!("Status: {}\n", goal.status));
    output.push_str(&format!("Priority: {}\n", goal.priority));
    output.push_str(&format!("Title: {}\n", goal.title));
    if has_text(&goal.description) {
        output.push_str(&format!("Description: {}\n", goal.description));
    }
    output.push_str(&format!("Created: {}\n", format_datetime(goal.created_at)));
    output.push_str(&format!("Updated: {}\n", format_datetime(goal.updated_at)));
    output.push('\n');
    if progress.is_empty() {
        output.push_str("Progress: (none)");
        return output;
    }
    output.push_str("Progress:\n");
    for entry in progress {
        output.push_str(&format!(
            "- {} {} (progress id {})\n",
            format_datetime(entry.created_at),
            entry.title,
            entry.id
        ));
        if has_text(&entry.description) {
            output.push_str(&format!("  {}\n", entry.description));
        }
    }
    output.trim_end().to_string()
}

pub fn format_category_list(categories: &[category::Model]) -> String {
    let mut output = format!("{:<4} {:<9} {:<12} {}\n", "ID", "COLOR", "ICON", "NAME");
    for category in categories {
        output.push_str(&format!(
            "{:<4} {:<9} {:<12} {}\n",
            category.id,
            category.color,
            category.icon.as_deref().unwrap_or("-"),
            category.name
        ));
    }
    output.trim_end().to_string()
}

pub fn format_goal_list(goals: &[goal::Model]) -> String {
    let mut output = format!(
        "{:<4} {:<8} {:<8} {:<7} {}\n",
        "ID", "TYPE", "STATUS", "PRIO", "TITLE"
    );
    for goal in goals {
        output.push_str(&format!(
            "{:<4} {:<8} {:<8} {:<7} {}\n",
            goal.id, goal.goal_type, goal.status, goal.priority, goal.title
        ));
    }
    output.trim_end().to_string()
}

pub fn format_history_list(rows: &[history::Model]) -> String {
    let mut output = format!(
        "{:<10} {:<8} {:>5} {:>7} {:>5}  {}\n",
        "DATE", "PERIOD", "DONE", "PENDING", "TOTAL", "RATE"
    );
    for row in rows {
        output.push_str(&format!(
            "{:<10} {:<8} {:>5} {:>7} {:>5}  {}\n",
            row.date,
            row.period,
            row.completed_count,
            row.pending_count,
            row.total_count,
            completion_rate(row.completed_count, row.total_count)
        ));
    }
    output.trim_end().to_string()
}

fn completion_rate(completed: i64, total: i64) -> String {
    if total <= 0 {
        return "-".to_string();
    }
    format!("{}%", completed * 100 / total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn history_row(date: &str, completed: i64, total: i64) -> history::Model {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        history::Model {
            id: 1,
            user_id: "user-a".to_string(),
            date: date.to_string(),
            period: "daily".to_string(),
            completed_count: completed,
            pending_count: total - completed,
            total_count: total,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn history_list_shows_completion_rate() {
        let output = format_history_list(&[history_row("2024-03-14", 2, 3)]);
        let line = output.lines().nth(1).expect("row");
        assert!(line.starts_with("2024-03-14 daily"));
        assert!(line.ends_with("66%"));
    }

    #[test]
    fn empty_period_has_no_rate() {
        assert_eq!(completion_rate(0, 0), "-");
    }

    #[test]
    fn category_list_marks_missing_icon() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let category = category::Model {
            id: 2,
            user_id: "user-a".to_string(),
            name: "Reading".to_string(),
            color: "#3b82f6".to_string(),
            icon: None,
            created_at: at,
            updated_at: at,
        };
        let output = format_category_list(&[category]);
        let line = output.lines().nth(1).expect("row");
        assert_eq!(line, "2    #3b82f6   -            Reading");
    }

    #[test]
    fn goal_detail_without_progress() {
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 8, 30, 0).unwrap();
        let category = category::Model {
            id: 7,
            user_id: "user-a".to_string(),
            name: "Health".to_string(),
            color: "#22c55e".to_string(),
            icon: None,
            created_at: at,
            updated_at: at,
        };
        let goal = goal::Model {
            id: 3,
            user_id: "user-a".to_string(),
            category_id: category.id,
            title: "Walk".to_string(),
            description: String::new(),
            goal_type: "daily".to_string(),
            status: "pending".to_string(),
            priority: "medium".to_string(),
            created_at: at,
            updated_at: at,
        };
        let output = format_goal_detail(&goal, &category, &[]);
        assert!(output.contains("Goal ID: 3\n"));
        assert!(output.contains("Category: Health (id 7)\n"));
        assert!(output.contains("Created: 2024-03-15 08:30"));
        assert!(!output.contains("Description:"));
        assert!(output.ends_with("Progress: (none)"));
    }
}
