//! User-facing log lines.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ServiceKind;

/// Severity of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine progress and process output.
    Info,
    /// A command line being executed.
    Cmd,
    /// A milestone was reached (service ready, node connected).
    Success,
    /// Something failed and the user should know.
    Error,
    /// Low-level detail (exit codes, wait progress).
    Debug,
}

impl Severity {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Cmd => "CMD",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One immutable log line destined for the consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    /// Service whose output or lifecycle produced this line, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<ServiceKind>,
    pub text: String,
}

impl LogEvent {
    /// Create a log event stamped with the current time.
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            severity,
            service: None,
            text: text.into(),
        }
    }

    /// Attribute the event to a service.
    #[must_use]
    pub fn with_service(mut self, kind: ServiceKind) -> Self {
        self.service = Some(kind);
        self
    }
}
