// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Contagion Engine - Error Types

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Fatal failures of a contagion run or of a special-function call.
///
/// Numeric degeneracies (NaN/Inf in a distress ratio) never show up here:
/// they are sanitized where they occur. Non-convergence is reported through
/// [`crate::Termination`] on the run outcome.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("unknown valuation model '{0}' (expected Distress, Merton or Black)")]
    Configuration(String),

    #[error("incomplete beta argument {x} outside [0, 1]")]
    Domain { x: f64 },

    #[error("{field} has length {actual}, expected {expected}")]
    Shape {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid liability L[{row}][{col}] = {value}: {reason}")]
    InvalidNetwork {
        row: usize,
        col: usize,
        value: f64,
        reason: &'static str,
    },

    #[error("dispatch failed: {0}")]
    Dispatch(String),

    #[error("malformed scenario: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}
