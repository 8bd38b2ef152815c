use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    pub life: Duration,
}

impl Toast {
    pub fn success(detail: impl Into<String>, life: Duration) -> Self {
        Self {
            severity: Severity::Success,
            summary: "Success".to_string(),
            detail: detail.into(),
            life,
        }
    }

    pub fn error(detail: impl Into<String>, life: Duration) -> Self {
        Self {
            severity: Severity::Error,
            summary: "Error".to_string(),
            detail: detail.into(),
            life,
        }
    }
}

/// Port to whatever shows toasts
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Sends toasts to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        match toast.severity {
            Severity::Success => tracing::info!(summary = %toast.summary, detail = %toast.detail, "Toast"),
            Severity::Error => tracing::warn!(summary = %toast.summary, detail = %toast.detail, "Toast"),
        }
    }
}
