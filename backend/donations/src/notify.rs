//! Outcome notifications handed to the presentation layer.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

const HISTORY_LEN: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub description: String,
    pub at: DateTime<Utc>,
}

impl Notification {
    pub fn donated() -> Self {
        Self {
            kind: NotificationKind::Success,
            title: "Successfully donated.".to_string(),
            description: "There was no problem with your request.".to_string(),
            at: Utc::now(),
        }
    }

    /// Deliberately generic; the cause is only written to the log.
    pub fn donation_failed() -> Self {
        Self {
            kind: NotificationKind::Failure,
            title: "Error".to_string(),
            description: "There was a problem with your donation. Please try again.".to_string(),
            at: Utc::now(),
        }
    }
}

/// Bounded history of recent notifications, newest last.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    history: Mutex<VecDeque<Notification>>,
}

impl NotificationCenter {
    pub fn push(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => info!("Notify: {}", notification.title),
            NotificationKind::Failure => warn!("Notify: {}", notification.title),
        }
        if let Ok(mut history) = self.history.lock() {
            if history.len() == HISTORY_LEN {
                history.pop_front();
            }
            history.push_back(notification);
        }
    }

    pub fn recent(&self) -> Vec<Notification> {
        self.history
            .lock()
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }
}
