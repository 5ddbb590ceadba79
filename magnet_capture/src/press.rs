//! Shutter button: tap for a photo, hold for a clip.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Press {
    /// Released before the long-press threshold.
    Tap,
    /// Held past the threshold; fired once while still down.
    LongStart,
    /// Released after a [`Press::LongStart`].
    LongEnd,
}

#[derive(Clone, Debug)]
pub struct PressTracker {
    threshold: Duration,
    down_at:   Option<Instant>,
    long:      bool,
}

impl PressTracker {
    pub fn new(threshold: Duration) -> Self {
        PressTracker { threshold, down_at: None, long: false }
    }

    pub fn is_down(&self) -> bool {
        self.down_at.is_some()
    }

    /// Button went down.  Repeated calls while held are ignored.
    pub fn press(&mut self, now: Instant) {
        if self.down_at.is_none() {
            self.down_at = Some(now);
            self.long = false;
        }
    }

    /// Call every tick while the button may be held.
    pub fn poll(&mut self, now: Instant) -> Option<Press> {
        let down_at = self.down_at?;
        if !self.long && now.duration_since(down_at) >= self.threshold {
            self.long = true;
            return Some(Press::LongStart);
        }
        None
    }

    /// Button came up.  A hold only counts once [`poll`](Self::poll) has
    /// reported it, so every `LongEnd` follows a `LongStart`.
    pub fn release(&mut self) -> Option<Press> {
        self.down_at.take()?;
        if self.long {
            self.long = false;
            Some(Press::LongEnd)
        } else {
            Some(Press::Tap)
        }
    }

    /// Forget a press in progress without reporting it.
    pub fn cancel(&mut self) {
        self.down_at = None;
        self.long = false;
    }
}
