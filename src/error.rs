use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid date: {0}")]
    Date(#[from] chrono::ParseError),
    #[error("{}", multiline("Not found", .0))]
    NotFound(String),
    #[error("{}", multiline("Invalid input", .0))]
    InvalidInput(String),
}

fn multiline(label: &str, message: &str) -> String {
    if message.contains('\n') {
        format!("{label}:\n{message}")
    } else {
        format!("{label}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_messages_stay_inline() {
        let err = AppError::NotFound("goal id 7".to_string());
        assert_eq!(err.to_string(), "Not found: goal id 7");
    }

    #[test]
    fn multiline_messages_start_on_next_line() {
        let err = AppError::InvalidInput("first\nsecond".to_string());
        assert_eq!(err.to_string(), "Invalid input:\nfirst\nsecond");
    }
}
