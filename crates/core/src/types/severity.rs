//! Notification severity levels.

use serde::{Deserialize, Serialize};

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Background style suffix used by the toast markup.
    ///
    /// Errors use the `danger` palette.
    #[must_use]
    pub const fn style(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "danger",
        }
    }

    /// Icon name shown next to the message.
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::Info => "info-circle",
            Self::Success => "check-circle",
            Self::Warning => "exclamation-triangle",
            Self::Error => "exclamation-circle",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}
