//! Rotating carousel state machine.
//!
//! A controller is either `Empty` or `Active(index)`. Every index it receives
//! is reduced modulo the item count, so navigation wraps in both directions
//! and can never fail. Time is supplied by the caller, which keeps autoplay
//! deterministic under test.

use std::time::{Duration, Instant};

use crate::scan::ImageAsset;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarouselState {
    Empty,
    Active(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CarouselSettings {
    /// Autoplay advances once this much time has passed since the last advance.
    pub interval: Duration,
    /// Whether next/prev/jump restart the autoplay countdown.
    pub reset_timer_on_manual_nav: bool,
}

impl Default for CarouselSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            reset_timer_on_manual_nav: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CarouselController {
    items: Vec<ImageAsset>,
    index: usize,
    last_advance: Instant,
    settings: CarouselSettings,
}

impl CarouselController {
    pub fn new(items: Vec<ImageAsset>, settings: CarouselSettings, now: Instant) -> Self {
        Self {
            items,
            index: 0,
            last_advance: now,
            settings,
        }
    }

    #[must_use]
    pub fn state(&self) -> CarouselState {
        if self.items.is_empty() {
            CarouselState::Empty
        } else {
            CarouselState::Active(self.index)
        }
    }

    #[must_use]
    pub fn current_index(&self) -> Option<usize> {
        match self.state() {
            CarouselState::Active(i) => Some(i),
            CarouselState::Empty => None,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&ImageAsset> {
        self.items.get(self.index)
    }

    /// Asset at `i` reduced modulo the item count.
    #[must_use]
    pub fn get_wrapped(&self, i: i64) -> Option<&ImageAsset> {
        self.wrap(i).and_then(|idx| self.items.get(idx))
    }

    pub fn items(&self) -> &[ImageAsset] {
        &self.items
    }

    pub const fn len(&self) -> usize {
        self.items.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn last_advance(&self) -> Instant {
        self.last_advance
    }

    pub const fn settings(&self) -> &CarouselSettings {
        &self.settings
    }

    pub fn next(&mut self, now: Instant) {
        if self.is_empty() {
            return;
        }
        self.index = (self.index + 1) % self.items.len();
        self.touch_manual(now);
    }

    pub fn prev(&mut self, now: Instant) {
        if self.is_empty() {
            return;
        }
        let len = self.items.len();
        self.index = (self.index + len - 1) % len;
        self.touch_manual(now);
    }

    /// Select `i` modulo the item count; negative values count from the end.
    pub fn jump_to(&mut self, i: i64, now: Instant) {
        let Some(idx) = self.wrap(i) else {
            return;
        };
        self.index = idx;
        self.touch_manual(now);
    }

    /// [`Self::jump_to`] driven by untrusted text such as a URL parameter.
    /// Input that is not an integer is ignored.
    pub fn jump_to_param(&mut self, raw: &str, now: Instant) {
        if let Ok(i) = raw.trim().parse::<i64>() {
            self.jump_to(i, now);
        }
    }

    /// Autoplay check. Advances once and returns `true` when the interval has
    /// elapsed since the last advance; otherwise leaves all state untouched.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.is_empty() {
            return false;
        }
        if now.saturating_duration_since(self.last_advance) < self.settings.interval {
            return false;
        }
        self.index = (self.index + 1) % self.items.len();
        self.last_advance = now;
        true
    }

    /// Time left before [`Self::tick`] would advance; `None` when empty.
    #[must_use]
    pub fn until_due(&self, now: Instant) -> Option<Duration> {
        if self.is_empty() {
            return None;
        }
        let elapsed = now.saturating_duration_since(self.last_advance);
        Some(self.settings.interval.saturating_sub(elapsed))
    }

    fn wrap(&self, i: i64) -> Option<usize> {
        if self.items.is_empty() {
            return None;
        }
        let len = i64::try_from(self.items.len()).ok()?;
        usize::try_from(i.rem_euclid(len)).ok()
    }

    fn touch_manual(&mut self, now: Instant) {
        if self.settings.reset_timer_on_manual_nav {
            self.last_advance = now;
        }
    }
}
