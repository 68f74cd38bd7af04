use chrono::Utc;
use tracing::debug;

use super::{OfflineCacheManager, WorkerState};
use crate::error::WorkerError;
use crate::models::{Notification, NotificationAction, NotificationData, NotificationOptions};

pub const NOTIFICATION_TITLE: &str = "Wanderlust";
pub const DEFAULT_PUSH_BODY: &str = "New notification from Wanderlust!";

const NOTIFICATION_ICON: &str = "/icons/icon-192x192.png";
const NOTIFICATION_BADGE: &str = "/icons/icon-72x72.png";
const ACTION_ICON: &str = "/icons/icon-72x72.png";
const VIBRATION_PATTERN: [u32; 3] = [100, 50, 100];
const PRIMARY_KEY: u32 = 1;

/// A push message as delivered by the push service.
#[derive(Debug, Clone, Default)]
pub struct PushMessage {
    pub data: Option<Vec<u8>>,
}

impl PushMessage {
    pub fn text(payload: &str) -> Self {
        Self {
            data: Some(payload.as_bytes().to_vec()),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Payload decoded as UTF-8 (lossy), if any
    pub fn payload_text(&self) -> Option<String> {
        self.data
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

pub fn build_notification(body: Option<String>) -> Notification {
    let action = |action: &str, title: &str| NotificationAction {
        action: action.to_string(),
        title: title.to_string(),
        icon: ACTION_ICON.to_string(),
    };

    Notification {
        title: NOTIFICATION_TITLE.to_string(),
        options: NotificationOptions {
            body: body.unwrap_or_else(|| DEFAULT_PUSH_BODY.to_string()),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_BADGE.to_string(),
            vibrate: VIBRATION_PATTERN.to_vec(),
            data: NotificationData {
                date_of_arrival: Utc::now().timestamp_millis(),
                primary_key: PRIMARY_KEY,
            },
            actions: vec![action("explore", "Explore"), action("close", "Close")],
        },
    }
}

impl OfflineCacheManager {
    /// Show the notification for a push message. Completes once the
    /// notification substrate has accepted it.
    pub async fn handle_push(&self, message: &PushMessage) -> Result<(), WorkerError> {
        let state = self.state();
        if state == WorkerState::Terminated {
            return Err(WorkerError::InvalidState {
                signal: "push",
                actual: state,
            });
        }

        let notification = build_notification(message.payload_text());
        debug!(body = %notification.options.body, "Push received");
        self.host
            .notifier
            .show_notification(&notification)
            .await
            .map_err(|e| WorkerError::Notification(e.to_string()))
    }
}
