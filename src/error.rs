//! Error types for the side quest companion.
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (unknown quest, bad arguments, missing content)
//! - 4: Operation failed (I/O, serialization, link opener)

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the `sq` binary.
pub mod exit_codes {
    pub const USER_ERROR: i32 = 2;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type.
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Content file not found: {0}")]
    ContentNotFound(PathBuf),

    #[error("No quest found matching '{0}'")]
    QuestNotFound(String),

    #[error("Multiple quests match '{identifier}': {candidates}. Please use the quest ID instead.")]
    AmbiguousQuest {
        identifier: String,
        candidates: String,
    },

    #[error("Quest {quest} has no step matching '{step}'")]
    StepNotFound { quest: u32, step: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Operation failures (exit code 4)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Failed to open link {url}: {reason}")]
    Opener { url: String, reason: String },
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ContentNotFound(_)
            | Error::QuestNotFound(_)
            | Error::AmbiguousQuest { .. }
            | Error::StepNotFound { .. }
            | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::Io(_) | Error::Json(_) | Error::TomlParse(_) | Error::Opener { .. } => {
                exit_codes::OPERATION_FAILED
            }
        }
    }
}

/// Result type alias for side quest operations
pub type Result<T> = std::result::Result<T, Error>;
