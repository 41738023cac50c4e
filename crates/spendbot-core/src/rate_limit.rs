use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use crate::domain::TelegramId;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(1000);

// ============== Rate Limiter (Fixed Window) ==============

/// Per-chat fixed-window throttle: at most one accepted message per window per key.
///
/// State is process-local and grows with the number of distinct keys; several bot
/// instances would each enforce their own limit.
#[derive(Clone, Debug)]
pub struct ChatRateLimiter {
    window: Duration,
    last_accepted: HashMap<TelegramId, Instant>,
}

impl Default for ChatRateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ChatRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn allow(&mut self, key: &TelegramId) -> bool {
        self.allow_at(key, Instant::now())
    }

    /// Accept iff `key` has no accepted message yet or the window has fully elapsed
    /// since the last accepted one. Rejections leave the stored timestamp untouched.
    pub fn allow_at(&mut self, key: &TelegramId, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(key) {
            if now.saturating_duration_since(*last) < self.window {
                return false;
            }
        }
        self.last_accepted.insert(key.clone(), now);
        true
    }

    /// Time left until `key` would be accepted again (zero if it would be accepted now).
    pub fn retry_after_at(&self, key: &TelegramId, now: Instant) -> Duration {
        self.last_accepted
            .get(key)
            .map(|last| self.window.saturating_sub(now.saturating_duration_since(*last)))
            .unwrap_or_default()
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_accepted.len()
    }
}
