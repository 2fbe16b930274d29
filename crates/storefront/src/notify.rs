//! Toast notification queue.
//!
//! Notifications stack in a fixed-position overlay that is created the first
//! time anything is shown. Each one owns its own dismissal timer, so closing
//! or expiring one never affects its siblings.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::AbortHandle;
use unibites_core::Severity;

use crate::view;

/// Identifier of a shown notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
    /// Wrap a raw id (as found in `data-notification-id`).
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// Queue of visible notifications with auto-dismiss.
#[derive(Clone)]
pub struct NotificationQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    display_for: Duration,
    next_id: AtomicU64,
    /// `None` until the overlay container is first needed.
    container: Mutex<Option<Vec<Entry>>>,
}

struct Entry {
    notification: Notification,
    timer: Option<AbortHandle>,
}

impl NotificationQueue {
    /// Create a queue whose notifications stay visible for `display_for`.
    #[must_use]
    pub fn new(display_for: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                display_for,
                next_id: AtomicU64::new(1),
                container: Mutex::new(None),
            }),
        }
    }

    /// Show a notification and schedule its dismissal.
    ///
    /// Outside a tokio runtime the notification stays until dismissed.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let notification = Notification {
            id,
            message: message.into(),
            severity,
            created_at: Utc::now(),
        };

        match severity {
            Severity::Error => tracing::warn!(id = id.0, message = %notification.message, "notification"),
            _ => tracing::info!(id = id.0, %severity, message = %notification.message, "notification"),
        }

        let mut container = self.inner.container.lock();
        let entries = container.get_or_insert_with(|| {
            tracing::debug!("creating toast container");
            Vec::new()
        });

        // Spawned under the lock: the timer task needs the same lock to
        // expire, so it cannot run before its entry exists.
        let timer = tokio::runtime::Handle::try_current().ok().map(|handle| {
            let queue = self.clone();
            let display_for = self.inner.display_for;
            handle
                .spawn(async move {
                    tokio::time::sleep(display_for).await;
                    queue.expire(id);
                })
                .abort_handle()
        });

        entries.push(Entry {
            notification,
            timer,
        });
        id
    }

    /// Close a notification early. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let removed = self.take(id);
        if let Some(entry) = &removed
            && let Some(timer) = &entry.timer
        {
            timer.abort();
        }
        removed.is_some()
    }

    /// Snapshot of visible notifications, oldest first (stacking order).
    #[must_use]
    pub fn visible(&self) -> Vec<Notification> {
        self.inner
            .container
            .lock()
            .as_ref()
            .map(|entries| entries.iter().map(|e| e.notification.clone()).collect())
            .unwrap_or_default()
    }

    /// Number of visible notifications.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.container.lock().as_ref().map_or(0, Vec::len)
    }

    /// Whether no notification is visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the overlay container exists yet.
    #[must_use]
    pub fn has_container(&self) -> bool {
        self.inner.container.lock().is_some()
    }

    /// Render the overlay container, or `None` before first use.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render(&self) -> askama::Result<Option<String>> {
        if !self.has_container() {
            return Ok(None);
        }
        view::render_toast_container(&self.visible()).map(Some)
    }

    fn expire(&self, id: NotificationId) {
        if self.take(id).is_some() {
            tracing::trace!(id = id.0, "notification expired");
        }
    }

    fn take(&self, id: NotificationId) -> Option<Entry> {
        let mut container = self.inner.container.lock();
        let entries = container.as_mut()?;
        let index = entries.iter().position(|e| e.notification.id == id)?;
        Some(entries.remove(index))
    }
}
