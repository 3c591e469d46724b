//! Transient notification banner.
//!
//! A banner sits above the status bar until its duration elapses or the
//! user dismisses it.  Only one is shown at a time; a new one replaces the
//! old.

use std::time::{Duration, Instant};

pub const DEFAULT_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone)]
pub struct Banner {
    pub message: String,
    pub kind: BannerKind,
    /// Title and formatted price of the product the banner is about.
    pub product: Option<(String, String)>,
    shown_at: Instant,
    duration: Duration,
}

impl Banner {
    pub fn new(kind: BannerKind, message: impl Into<String>, duration: Duration) -> Self {
        Self {
            message: message.into(),
            kind,
            product: None,
            shown_at: Instant::now(),
            duration,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= self.duration
    }
}

/// The single banner slot owned by the app.
#[derive(Debug)]
pub struct BannerSlot {
    current: Option<Banner>,
    duration: Duration,
}

impl BannerSlot {
    pub fn new(duration: Duration) -> Self {
        Self {
            current: None,
            duration,
        }
    }

    pub fn current(&self) -> Option<&Banner> {
        self.current.as_ref()
    }

    pub fn show(&mut self, kind: BannerKind, message: impl Into<String>) -> &mut Banner {
        self.current.insert(Banner::new(kind, message, self.duration))
    }

    pub fn dismiss(&mut self) {
        self.current = None;
    }

    /// Drop the banner once it has been visible for its whole duration.
    pub fn tick(&mut self, now: Instant) {
        if self.current.as_ref().is_some_and(|b| b.is_expired(now)) {
            self.current = None;
        }
    }
}

impl Default for BannerSlot {
    fn default() -> Self {
        Self::new(DEFAULT_DURATION)
    }
}
