//! Per-identity send and verify throttling.
//!
//! Send and verify budgets are tracked in separate maps so flooding one never
//! spends the other. Each window is anchored at its first attempt and resets
//! once its duration has elapsed.

use dashmap::DashMap;
use std::time::{Duration, Instant};

const DEFAULT_SEND_LIMIT: u32 = 3;
const DEFAULT_SEND_WINDOW: Duration = Duration::from_secs(10 * 60);
const DEFAULT_VERIFY_LIMIT: u32 = 5;
const DEFAULT_VERIFY_WINDOW: Duration = Duration::from_secs(5 * 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LimiterConfig {
    pub send_limit: u32,
    pub send_window: Duration,
    pub verify_limit: u32,
    /// Lifetime of a verify budget; matches the OTP TTL.
    pub verify_window: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            send_limit: DEFAULT_SEND_LIMIT,
            send_window: DEFAULT_SEND_WINDOW,
            verify_limit: DEFAULT_VERIFY_LIMIT,
            verify_window: DEFAULT_VERIFY_WINDOW,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LimitDecision {
    /// Attempt recorded; `remaining` attempts are left in the window.
    Allowed { remaining: u32 },
    Denied { retry_after: Duration },
}

impl LimitDecision {
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

#[derive(Clone, Copy, Debug)]
struct AttemptWindow {
    count: u32,
    started_at: Instant,
}

impl AttemptWindow {
    const fn open(now: Instant) -> Self {
        Self {
            count: 0,
            started_at: now,
        }
    }

    fn has_elapsed(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.started_at) >= window
    }

    fn retry_after(&self, now: Instant, window: Duration) -> Duration {
        (self.started_at + window).saturating_duration_since(now)
    }
}

#[derive(Debug)]
pub struct AttemptLimiter {
    config: LimiterConfig,
    send_windows: DashMap<String, AttemptWindow>,
    verify_windows: DashMap<String, AttemptWindow>,
}

impl AttemptLimiter {
    #[must_use]
    pub fn new(config: LimiterConfig) -> Self {
        Self {
            config,
            send_windows: DashMap::new(),
            verify_windows: DashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn check_send(&self, identity: &str, now: Instant) -> LimitDecision {
        check(
            &self.send_windows,
            identity,
            self.config.send_limit,
            self.config.send_window,
            now,
        )
    }

    pub fn check_verify(&self, identity: &str, now: Instant) -> LimitDecision {
        check(
            &self.verify_windows,
            identity,
            self.config.verify_limit,
            self.config.verify_window,
            now,
        )
    }

    /// Start a fresh verify budget, called whenever a new code is issued.
    pub fn reset_verify(&self, identity: &str) {
        self.verify_windows.remove(identity);
    }

    /// Drop windows whose duration has elapsed. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.window_count();
        let send_window = self.config.send_window;
        let verify_window = self.config.verify_window;
        self.send_windows
            .retain(|_, window| !window.has_elapsed(now, send_window));
        self.verify_windows
            .retain(|_, window| !window.has_elapsed(now, verify_window));
        before.saturating_sub(self.window_count())
    }

    #[must_use]
    pub fn window_count(&self) -> usize {
        self.send_windows.len() + self.verify_windows.len()
    }
}

fn check(
    windows: &DashMap<String, AttemptWindow>,
    identity: &str,
    limit: u32,
    window: Duration,
    now: Instant,
) -> LimitDecision {
    // The entry guard holds the shard lock, so check-and-increment is atomic
    // for this identity.
    let mut entry = windows
        .entry(identity.to_string())
        .or_insert_with(|| AttemptWindow::open(now));

    if entry.has_elapsed(now, window) {
        *entry = AttemptWindow::open(now);
    }

    if entry.count >= limit {
        return LimitDecision::Denied {
            retry_after: entry.retry_after(now, window),
        };
    }

    entry.count += 1;
    LimitDecision::Allowed {
        remaining: limit - entry.count,
    }
}
