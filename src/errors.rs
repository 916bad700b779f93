use thiserror::Error;

/// Error type for rejected budget operations.
///
/// None of these are fatal: a rejected operation leaves the tree untouched.
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Line not found: {0}")]
    LineNotFound(String),
    #[error("Invalid index path: {0}")]
    InvalidIndex(String),
    #[error("Line {index} is at the maximum level ({max_level}) and cannot have children")]
    MaxLevelReached { index: String, max_level: usize },
    #[error("Line {index} under {target} would exceed the maximum level ({max_level})")]
    DepthExceeded {
        index: String,
        target: String,
        max_level: usize,
    },
    #[error("Line {target} is a descendant of line {index}")]
    CycleDetected { index: String, target: String },
    #[error("The root line cannot be {0}")]
    RootLine(&'static str),
    #[error("Line {0} cannot be its own target")]
    SelfTarget(String),
    #[error("Invalid currency: {0}")]
    InvalidCurrency(String),
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error("Line {0} has children; its cost inputs are derived")]
    NotALeaf(String),
    #[error("Line {index} has no overhead at position {position}")]
    OverheadNotFound { index: String, position: usize },
}

pub type BudgetResult<T> = Result<T, BudgetError>;
