// User-facing notifications raised by engine operations

use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Receives transient messages meant for the user (toasts, status lines)
pub trait NotificationSink: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// Default sink: writes notifications to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info | NoticeLevel::Success => info!("[notify] {}", message),
            NoticeLevel::Warning => warn!("[notify] {}", message),
            NoticeLevel::Error => error!("[notify] {}", message),
        }
    }
}
