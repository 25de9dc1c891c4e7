use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("invalid interval: end {end} is before start {start}")]
    InvalidInterval { start: i64, end: i64 },

    #[error("time {time} is outside the calendar window [{window_start}, {window_end}]")]
    OutOfWindow {
        time: i64,
        window_start: i64,
        window_end: i64,
    },

    #[error("duplicate entry: {message}")]
    DuplicateEntry { message: String },

    #[error("unknown tag: {0}")]
    UnknownTag(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "planet::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "planet::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn invalid_interval(start: i64, end: i64) -> Self {
        warn!(target: "planet::validation", start, end, "end cannot be before start");
        AppError::InvalidInterval { start, end }
    }

    pub fn out_of_window(time: i64, window_start: i64, window_end: i64) -> Self {
        warn!(
            target: "planet::calendar",
            time,
            window_start,
            window_end,
            "time outside calendar window"
        );
        AppError::OutOfWindow {
            time,
            window_start,
            window_end,
        }
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "planet::calendar", %message, "duplicate entry");
        AppError::DuplicateEntry { message }
    }

    pub fn unknown_tag(name: impl Into<String>) -> Self {
        let name = name.into();
        error!(target: "planet::solver", tag = %name, "tag is not registered in the calendar");
        AppError::UnknownTag(name)
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "planet::calendar", %message, "unsupported operation");
        AppError::Unsupported(message)
    }

    pub fn details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }
}
