// ⚠️ Error Types - what can stop a scholarship run
// Validation rejects a record set, Configuration halts allocation,
// Precondition guards the assignment join. Empty results are NOT errors.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// FIELD ERROR
// ============================================================================

/// One malformed field on one input record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Student id, or a row locator when the id itself is unusable
    pub record: String,
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(record: &str, field: &str, message: impl Into<String>) -> Self {
        FieldError {
            record: record.to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.record, self.field, self.message)
    }
}

// ============================================================================
// SCHOLARSHIP ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum ScholarshipError {
    /// Malformed or missing required fields; the whole record set is rejected
    #[error("{} invalid field(s) in student records: {}", .0.len(), summarize(.0))]
    Validation(Vec<FieldError>),

    /// Budget parameters cannot produce an allocation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A stage was invoked before the results it joins on existed
    #[error("Precondition failed: {0}")]
    Precondition(String),
}

impl ScholarshipError {
    pub fn configuration(message: impl Into<String>) -> Self {
        ScholarshipError::Configuration(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        ScholarshipError::Precondition(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ScholarshipError::Validation(_))
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, ScholarshipError::Configuration(_))
    }

    pub fn is_precondition(&self) -> bool {
        matches!(self, ScholarshipError::Precondition(_))
    }
}

fn summarize(errors: &[FieldError]) -> String {
    const SHOWN: usize = 3;

    let mut parts: Vec<String> = errors.iter().take(SHOWN).map(|e| e.to_string()).collect();
    if errors.len() > SHOWN {
        parts.push(format!("... and {} more", errors.len() - SHOWN));
    }
    parts.join("; ")
}

// ============================================================================
// EMPTY RESULT WARNING
// ============================================================================

/// Pipeline stage that produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Ranking,
    Allocation,
    Assignment,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Filter => "filter",
            Stage::Ranking => "ranking",
            Stage::Allocation => "allocation",
            Stage::Assignment => "assignment",
        }
    }
}

/// Non-fatal "no results" outcome; callers use it to skip later stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmptyResultWarning {
    pub stage: Stage,
    pub message: String,
}

impl EmptyResultWarning {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        EmptyResultWarning {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for EmptyResultWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} produced no results: {}", self.stage.as_str(), self.message)
    }
}

pub type Result<T> = std::result::Result<T, ScholarshipError>;
