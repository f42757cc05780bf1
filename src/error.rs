//! Error types for plan validation and simulation setup
//!
//! Pre-run problems are fatal and abort before the engine starts. In-run
//! conditions (insolvency, exhausted accounts) are never errors; they are
//! recorded on the results instead.

use thiserror::Error;

/// A single validation failure, with the JSON path of the offending field
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// JSON path into the plan document, e.g. `accounts[2].cost_basis`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("  {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fatal pre-run errors
#[derive(Debug, Error)]
pub enum PlanError {
    /// Structural or cross-reference problems in the plan input
    #[error("plan validation failed:\n{}", format_issues(.0))]
    Validation(Vec<ValidationIssue>),

    /// Invalid simulation mode parameters
    #[error("invalid simulation parameter `{parameter}`: {message}")]
    ModeParam { parameter: String, message: String },

    /// The caller raised the cancel signal; partial results are discarded
    #[error("simulation cancelled")]
    Cancelled,
}

impl PlanError {
    pub fn mode_param(parameter: &str, message: impl Into<String>) -> Self {
        PlanError::ModeParam {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }
}
