//! Page-control and notification substrates provided by the host.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::models::Notification;

#[async_trait]
pub trait ClientControl: Send + Sync {
    /// Take control of every open page now instead of at its next navigation
    async fn claim(&self) -> Result<()>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn show_notification(&self, notification: &Notification) -> Result<()>;
}

/// Tracks the pages a worker controls.
#[derive(Debug, Default)]
pub struct PageClients {
    open_pages: AtomicUsize,
    claimed: AtomicBool,
}

impl PageClients {
    pub fn new(open_pages: usize) -> Self {
        Self {
            open_pages: AtomicUsize::new(open_pages),
            claimed: AtomicBool::new(false),
        }
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::SeqCst)
    }

    pub fn open_pages(&self) -> usize {
        self.open_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClientControl for PageClients {
    async fn claim(&self) -> Result<()> {
        self.claimed.store(true, Ordering::SeqCst);
        info!(pages = self.open_pages(), "Claimed open pages");
        Ok(())
    }
}

/// Renders notifications to the log and stdout.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn show_notification(&self, notification: &Notification) -> Result<()> {
        info!(title = %notification.title, body = %notification.options.body, "Showing notification");
        println!("{}", serde_json::to_string_pretty(notification)?);
        Ok(())
    }
}
