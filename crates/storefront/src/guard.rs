//! Global loading indicator (`#page-loader`).
//!
//! Every remote call brackets itself with [`LoadingGuard::acquire`]. The
//! guard counts in-flight operations and the indicator is visible iff the
//! count is above zero, so one call settling never hides the indicator
//! while a sibling call is still pending.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

/// Shared busy-state for the page.
///
/// Cheaply cloneable; all clones drive the same indicator.
#[derive(Clone)]
pub struct LoadingGuard {
    inner: Arc<GuardInner>,
}

struct GuardInner {
    in_flight: Mutex<usize>,
    /// `None` when the page has no loader element.
    indicator: Option<watch::Sender<bool>>,
}

impl LoadingGuard {
    /// Guard for a page that renders the loader element.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self::with_indicator(Some(tx))
    }

    /// Guard for a page without a loader element; `show`/`hide` only count.
    #[must_use]
    pub fn detached() -> Self {
        Self::with_indicator(None)
    }

    fn with_indicator(indicator: Option<watch::Sender<bool>>) -> Self {
        Self {
            inner: Arc::new(GuardInner {
                in_flight: Mutex::new(0),
                indicator,
            }),
        }
    }

    /// Mark one more operation as in flight.
    pub fn show(&self) {
        let mut count = self.inner.in_flight.lock();
        *count += 1;
        if *count == 1 {
            self.publish(true);
        }
    }

    /// Mark one operation as settled. Extra calls are ignored.
    pub fn hide(&self) {
        let mut count = self.inner.in_flight.lock();
        if *count == 0 {
            return;
        }
        *count -= 1;
        if *count == 0 {
            self.publish(false);
        }
    }

    /// `show()` now and `hide()` when the returned token drops.
    #[must_use = "the indicator hides as soon as the token is dropped"]
    pub fn acquire(&self) -> BusyToken {
        self.show();
        BusyToken {
            guard: self.clone(),
        }
    }

    /// Whether the loader element is currently shown.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.inner
            .indicator
            .as_ref()
            .is_some_and(|tx| *tx.borrow())
    }

    /// Number of operations currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        *self.inner.in_flight.lock()
    }

    /// Observe visibility changes. `None` if the page has no loader.
    #[must_use]
    pub fn subscribe(&self) -> Option<watch::Receiver<bool>> {
        self.inner.indicator.as_ref().map(watch::Sender::subscribe)
    }

    // Called with the counter locked so visibility never lags the count.
    fn publish(&self, visible: bool) {
        if let Some(tx) = &self.inner.indicator {
            tx.send_replace(visible);
            tracing::trace!(visible, "loading indicator toggled");
        }
    }
}

impl Default for LoadingGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// Releases one in-flight slot on drop.
pub struct BusyToken {
    guard: LoadingGuard,
}

impl Drop for BusyToken {
    fn drop(&mut self) {
        self.guard.hide();
    }
}
