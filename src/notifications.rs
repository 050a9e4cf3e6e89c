// Unread-notification badge and the notification list behind it

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::blassa_api::{ApiError, BlassaClient};
use crate::models::Notification;

/// Badge count shared by every screen. Explicitly constructed and reset;
/// watchers see every change.
pub struct NotificationCounter {
    tx: watch::Sender<u32>,
}

impl Default for NotificationCounter {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }
}

impl NotificationCounter {
    pub fn get(&self) -> u32 {
        *self.tx.borrow()
    }

    pub fn set(&self, count: u32) {
        self.tx.send_replace(count);
    }

    pub fn decrement(&self) {
        self.tx.send_modify(|count| *count = count.saturating_sub(1));
    }

    pub fn reset(&self) {
        self.set(0);
    }
}

pub struct NotificationCenter {
    api: BlassaClient,
    counter: Arc<NotificationCounter>,
    notifications: RwLock<Vec<Notification>>,
}

impl NotificationCenter {
    pub fn new(api: BlassaClient, counter: Arc<NotificationCounter>) -> Self {
        Self {
            api,
            counter,
            notifications: RwLock::new(Vec::new()),
        }
    }

    pub fn unread_count(&self) -> u32 {
        self.counter.get()
    }

    pub async fn load(&self, token: &str) -> Result<Vec<Notification>, ApiError> {
        let notifications = self.api.get_notifications(token).await?;

        let mut seen = HashSet::new();
        let duplicates: Vec<&str> = notifications
            .iter()
            .filter(|n| !seen.insert(n.id.as_str()))
            .map(|n| n.id.as_str())
            .collect();
        if !duplicates.is_empty() {
            tracing::warn!(?duplicates, "Backend returned duplicate notification ids");
        }

        let unread = notifications.iter().filter(|n| !n.is_read).count();
        self.counter.set(u32::try_from(unread).unwrap_or(u32::MAX));
        tracing::debug!(total = notifications.len(), unread, "Loaded notifications");

        *self.notifications.write().await = notifications.clone();
        Ok(notifications)
    }

    /// Marks one notification read. The badge only moves if it is still
    /// unread in the loaded list once the backend has accepted the change.
    pub async fn mark_read(&self, token: &str, id: &str) -> Result<(), ApiError> {
        tracing::debug!(id, count = self.counter.get(), "Marking notification read");

        self.api.mark_notification_read(token, id).await?;

        // Flip and decrement under one write lock
        let mut notifications = self.notifications.write().await;
        let mut flipped = false;
        for notification in notifications.iter_mut().filter(|n| n.id == id && !n.is_read) {
            notification.is_read = true;
            flipped = true;
        }
        if flipped {
            self.counter.decrement();
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, token: &str) -> Result<Vec<Notification>, ApiError> {
        self.api.mark_all_notifications_read(token).await?;
        self.counter.reset();
        self.load(token).await
    }
}
