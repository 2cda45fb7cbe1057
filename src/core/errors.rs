//! Shared error types for the engine.
//!
//! Only contract violations surface as errors: mismatched parallel slices,
//! a student missing from a snapshot that claims to enroll them, or invalid
//! configuration. Missing grades are data, not errors, and travel as `None`
//! through every layer.

use thiserror::Error;

use crate::core::{SemesterId, StudentId};

/// Main error type for grademap operations
#[derive(Debug, Error)]
pub enum Error {
    /// Parallel score/weight slices of different lengths
    #[error("mismatched slice lengths: {expected} scores but {actual} weights")]
    MismatchedLengths { expected: usize, actual: usize },

    /// Snapshot contract breach: an enrolled student has no entry
    #[error("student {student} missing from snapshot of semester {semester}")]
    StudentNotInSnapshot {
        student: StudentId,
        semester: SemesterId,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wrapped external errors
    #[error(transparent)]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Create a length-mismatch error from the two slice lengths
    pub fn lengths(expected: usize, actual: usize) -> Self {
        Self::MismatchedLengths { expected, actual }
    }

    /// Create a missing-student error
    pub fn student_not_in_snapshot(student: &StudentId, semester: &SemesterId) -> Self {
        Self::StudentNotInSnapshot {
            student: student.clone(),
            semester: semester.clone(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, Error>;
