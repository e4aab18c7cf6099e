//! Toast notifications.

use std::fmt;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    /// Something worked
    Success,
    /// Something failed
    Error,
    /// Neutral information
    Info,
}

impl fmt::Display for ToastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "ok",
            Self::Error => "error",
            Self::Info => "info",
        };
        f.write_str(label)
    }
}

/// A short-lived message for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Severity
    pub level: ToastLevel,
    /// Text shown to the operator
    pub message: String,
}

impl Toast {
    /// Success toast
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    /// Error toast
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }

    /// Info toast
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }
}

/// Delivers toasts; how they reach the operator is up to the implementation
pub trait Notifier: Send + Sync {
    /// Show a toast
    fn notify(&self, toast: Toast);
}

/// Prints toasts to stdout and logs them
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        tracing::debug!(level = %toast.level, message = %toast.message, "Toast");
        println!("[{}] {}", toast.level, toast.message);
    }
}
