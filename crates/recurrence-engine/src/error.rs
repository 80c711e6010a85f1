//! Error types for recurrence-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Invalid template {id}: {reason}")]
    InvalidTemplate { id: String, reason: String },

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
