//! Tracked animations: diagnostic labels and the per-animation watcher.
//!
//! Each registered animation gets a watcher task that races the animation's
//! own completion against its fail-safe deadline. Whichever fires first
//! removes the animation from the barrier; the other path only logs.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::{Barrier, Finish};
use crate::id::AnimationId;

/// Descriptive metadata for an animation, used only in log output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationLabel {
    /// Identity of the animated element
    pub target: Option<String>,
    /// Animated property
    pub property: Option<String>,
    /// Value the property is animating towards
    pub value: Option<String>,
}

impl AnimationLabel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.property.is_none() && self.value.is_none()
    }
}

impl From<&str> for AnimationLabel {
    fn from(target: &str) -> Self {
        Self::new().target(target)
    }
}

impl From<String> for AnimationLabel {
    fn from(target: String) -> Self {
        Self::new().target(target)
    }
}

impl fmt::Display for AnimationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<unlabelled>");
        }
        write!(f, "{}", self.target.as_deref().unwrap_or("?"))?;
        if let Some(property) = &self.property {
            write!(f, ".{}", property)?;
        }
        if let Some(value) = &self.value {
            write!(f, " -> {}", value)?;
        }
        Ok(())
    }
}

/// Watch one animation until it settles or its deadline passes.
///
/// After a forced expiry the watcher keeps observing the signal only to log
/// its late settlement; the barrier is released before that so it is not
/// kept alive by a signal that may never settle.
pub(crate) async fn watch_animation<F>(
    barrier: Barrier,
    id: AnimationId,
    label: AnimationLabel,
    mut signal: Pin<Box<F>>,
    deadline: Instant,
    expiry: Duration,
) where
    F: Future + Send + 'static,
{
    tokio::select! {
        biased;
        _ = signal.as_mut() => {
            barrier.finish_animation(id, Finish::Settled);
            return;
        }
        _ = tokio::time::sleep_until(deadline) => {}
    }

    tracing::warn!(
        animation_id = %id,
        label = %label,
        expiry_ms = expiry.as_millis() as u64,
        "Animation stalled past its expiry, forcing it off the barrier"
    );
    barrier.finish_animation(id, Finish::Expired);
    drop(barrier);

    signal.await;
    tracing::warn!(
        animation_id = %id,
        label = %label,
        "Animation settled after forced expiry, ignoring"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display_full() {
        let label = AnimationLabel::new().target("#sidebar").property("left").value("-240px");
        assert_eq!(label.to_string(), "#sidebar.left -> -240px");
    }

    #[test]
    fn test_label_display_target_only() {
        let label = AnimationLabel::from("carousel");
        assert_eq!(label.to_string(), "carousel");
    }

    #[test]
    fn test_label_display_missing_target() {
        let label = AnimationLabel::new().property("opacity");
        assert_eq!(label.to_string(), "?.opacity");
    }

    #[test]
    fn test_label_display_empty() {
        let label = AnimationLabel::default();
        assert!(label.is_empty());
        assert_eq!(label.to_string(), "<unlabelled>");
    }

    #[test]
    fn test_label_from_string() {
        let label: AnimationLabel = String::from("flyout").into();
        assert_eq!(label.target.as_deref(), Some("flyout"));
        assert!(label.property.is_none());
    }
}
