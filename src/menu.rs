//! Hover menu show/hide with a grace delay
//!
//! Leaving the trigger does not hide the menu immediately; a pending-hide
//! timer gives the pointer a grace window to travel from the trigger into
//! the menu. Re-entering either the trigger or the menu cancels the pending
//! hide; leaving the menu itself hides at once. At most one pending-hide
//! timer exists at a time, and it is owned here rather than floating free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::config::MenuConfig;

/// Hover-driven visibility state of a navigation menu
///
/// Cloneable; all clones share the same visibility flag and pending timer.
/// Methods must be called from within a tokio runtime.
#[derive(Clone)]
pub struct HoverMenu {
    config: MenuConfig,
    visible: Arc<AtomicBool>,
    pending_hide: Arc<Mutex<Option<CancellationToken>>>,
}

impl HoverMenu {
    /// Create a hidden menu
    pub fn new(config: MenuConfig) -> Self {
        Self {
            config,
            visible: Arc::new(AtomicBool::new(false)),
            pending_hide: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the menu is currently shown
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::SeqCst)
    }

    /// Pointer entered the trigger: cancel any pending hide and show the menu
    pub fn pointer_enter_trigger(&self) {
        self.cancel_pending_hide();
        self.visible.store(true, Ordering::SeqCst);
    }

    /// Pointer left the trigger: schedule a hide after the grace delay
    ///
    /// A re-entry into the trigger or the menu within the window cancels the
    /// hide. Scheduling replaces any previously pending hide.
    pub fn pointer_leave_trigger(&self) {
        let token = CancellationToken::new();
        {
            let mut pending = self.lock_pending();
            if let Some(previous) = pending.replace(token.clone()) {
                previous.cancel();
            }
        }

        let visible = self.visible.clone();
        let pending_hide = self.pending_hide.clone();
        let delay = self.config.hide_delay;

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    visible.store(false, Ordering::SeqCst);
                    pending_hide
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .take();
                }
            }
        });
    }

    /// Pointer entered the menu itself: cancel the pending hide
    pub fn pointer_enter_menu(&self) {
        self.cancel_pending_hide();
    }

    /// Pointer left the menu: hide immediately
    pub fn pointer_leave_menu(&self) {
        // No grace window on this edge; also drop any stale pending timer
        self.cancel_pending_hide();
        self.visible.store(false, Ordering::SeqCst);
    }

    fn cancel_pending_hide(&self) {
        if let Some(token) = self.lock_pending().take() {
            token.cancel();
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.pending_hide
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn menu_with_delay(delay_ms: u64) -> HoverMenu {
        HoverMenu::new(MenuConfig {
            hide_delay: Duration::from_millis(delay_ms),
        })
    }

    #[tokio::test]
    async fn starts_hidden_and_shows_on_trigger_hover() {
        let menu = menu_with_delay(300);
        assert!(!menu.is_visible());

        menu.pointer_enter_trigger();
        assert!(menu.is_visible());
    }

    #[tokio::test]
    async fn hides_after_the_grace_delay_without_reentry() {
        let menu = menu_with_delay(60);
        menu.pointer_enter_trigger();
        menu.pointer_leave_trigger();

        // Still inside the grace window
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(menu.is_visible());

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!menu.is_visible());
    }

    #[tokio::test]
    async fn reentering_the_trigger_cancels_the_pending_hide() {
        let menu = menu_with_delay(60);
        menu.pointer_enter_trigger();
        menu.pointer_leave_trigger();

        tokio::time::sleep(Duration::from_millis(20)).await;
        menu.pointer_enter_trigger();

        // The original hide window has long passed
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(menu.is_visible());
    }

    #[tokio::test]
    async fn moving_into_the_menu_keeps_it_visible() {
        let menu = menu_with_delay(60);
        menu.pointer_enter_trigger();
        menu.pointer_leave_trigger();

        tokio::time::sleep(Duration::from_millis(20)).await;
        menu.pointer_enter_menu();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(menu.is_visible());
    }

    #[tokio::test]
    async fn leaving_the_menu_hides_immediately() {
        let menu = menu_with_delay(300);
        menu.pointer_enter_trigger();
        assert!(menu.is_visible());

        menu.pointer_leave_menu();
        assert!(!menu.is_visible());
    }

    #[tokio::test]
    async fn repeated_leaves_keep_a_single_pending_hide() {
        let menu = menu_with_delay(60);
        menu.pointer_enter_trigger();
        menu.pointer_leave_trigger();
        menu.pointer_leave_trigger();
        menu.pointer_enter_menu();

        // Both scheduled hides were replaced/cancelled
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(menu.is_visible());
    }

    #[tokio::test]
    async fn clones_share_visibility_state() {
        let menu = menu_with_delay(300);
        let clone = menu.clone();

        menu.pointer_enter_trigger();
        assert!(clone.is_visible());
    }
}
