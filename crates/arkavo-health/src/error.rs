use crate::diagnostics::FailureContext;
use std::time::Duration;
use thiserror::Error;

/// Why the application was not in the state a flow expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppStateMismatch {
    /// The foreground application is not the one the flow drives.
    NotTargetApplication { expected: String, actual: String },
    /// The current screen is not the page the flow assumed it starts on.
    NotOnExpectedPage { expected: String },
    /// The time picker had neither the 24-hour nor the 12-hour wheel layout.
    UnsupportedPickerLayout { wheels: usize },
    /// The date picker's month button did not show a readable month and year.
    UnreadableDatePicker { shown: String },
}

impl std::fmt::Display for AppStateMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppStateMismatch::NotTargetApplication { expected, actual } => write!(
                f,
                "foreground application is '{}', expected '{}'",
                actual, expected
            ),
            AppStateMismatch::NotOnExpectedPage { expected } => {
                write!(f, "not on the expected page '{}'", expected)
            }
            AppStateMismatch::UnsupportedPickerLayout { wheels } => {
                write!(f, "time picker has {} wheels, expected 2 or 3", wheels)
            }
            AppStateMismatch::UnreadableDatePicker { shown } => {
                write!(f, "date picker shows '{}', expected a month and year", shown)
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum HealthError {
    #[error("Element not found: {description} (waited {timeout:?})")]
    ElementNotFound {
        description: String,
        timeout: Duration,
        context: FailureContext,
    },

    #[error("Element not reachable: {description} (after {scroll_attempts} scroll attempts)")]
    ElementUnreachable {
        description: String,
        scroll_attempts: u32,
        context: FailureContext,
    },

    #[error("Unexpected application state: {mismatch}")]
    UnexpectedAppState {
        mismatch: AppStateMismatch,
        context: FailureContext,
    },

    #[error("Navigation to '{target}' failed: {reason}")]
    NavigationFailure {
        target: String,
        reason: String,
        context: FailureContext,
    },

    #[error("Onboarding did not advance after {attempts} attempts")]
    OnboardingStuck {
        attempts: u32,
        context: FailureContext,
    },

    #[error("System alert '{title}' was not handled: {reason}")]
    AlertNotHandled { title: String, reason: String },

    #[error("Custom value entry failed: {0}")]
    CustomEntry(#[source] anyhow::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HealthError {
    /// True when the caller may treat the failure as "skip this test" rather
    /// than a hard failure. Only a page mismatch before data entry qualifies.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            HealthError::UnexpectedAppState {
                mismatch: AppStateMismatch::NotOnExpectedPage { .. },
                ..
            }
        )
    }

    /// Diagnostic snapshot captured where the failure happened, if any.
    pub fn context(&self) -> Option<&FailureContext> {
        match self {
            HealthError::ElementNotFound { context, .. }
            | HealthError::ElementUnreachable { context, .. }
            | HealthError::UnexpectedAppState { context, .. }
            | HealthError::NavigationFailure { context, .. }
            | HealthError::OnboardingStuck { context, .. } => Some(context),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HealthError>;
