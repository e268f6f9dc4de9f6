//! Foreground/background signal for the host application.
//!
//! A browser tab reports this through the page visibility API; a native
//! client might map it to window focus or app suspension. Connections
//! stop reconnecting while hidden and reconnect as soon as they become
//! visible again.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// Whether the host application is in the foreground.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Visible => f.write_str("visible"),
            Self::Hidden => f.write_str("hidden"),
        }
    }
}

/// Publishes visibility transitions to every subscribed connection.
///
/// Cheap to clone; all clones drive the same signal. Subscribers only
/// see transitions, so setting the current value again is a no-op.
///
/// If every observer is dropped, subscribers keep the last value.
#[derive(Debug, Clone)]
pub struct VisibilityObserver {
    sender: Arc<watch::Sender<Visibility>>,
}

impl VisibilityObserver {
    pub fn new(initial: Visibility) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Records a new visibility. Returns `true` if it was a transition.
    pub fn set(&self, visibility: Visibility) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == visibility {
                false
            } else {
                *current = visibility;
                true
            }
        });
        if changed {
            tracing::debug!(%visibility, "visibility changed");
        }
        changed
    }

    pub fn current(&self) -> Visibility {
        *self.sender.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Visibility> {
        self.sender.subscribe()
    }
}

impl Default for VisibilityObserver {
    fn default() -> Self {
        Self::new(Visibility::Visible)
    }
}
