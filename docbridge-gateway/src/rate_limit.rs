use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Outcome of one [`RateLimiter::check`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request counter keyed by client.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Mutex<HashMap<String, Window>>>,
    limit: u32,
    window: Duration,
    max_keys: usize,
}

impl RateLimiter {
    /// A `limit` of zero disables limiting.
    pub fn new(limit: u32, window: Duration, max_keys: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
            max_keys,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        if !self.is_enabled() {
            return RateDecision {
                allowed: true,
                limit: 0,
                remaining: 0,
                reset_after: Duration::ZERO,
            };
        }

        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let window = *inner
            .entry(key.to_string())
            .and_modify(|window| {
                if now.duration_since(window.started) >= self.window {
                    *window = Window { started: now, count: 0 };
                }
                if window.count < self.limit {
                    window.count += 1;
                } else {
                    window.count = self.limit.saturating_add(1);
                }
            })
            .or_insert(Window { started: now, count: 1 });

        if inner.len() > self.max_keys {
            inner.retain(|_, w| now.duration_since(w.started) < self.window);

            let mut overflow = inner.len().saturating_sub(self.max_keys);
            let keys = inner
                .keys()
                .filter(|k| k.as_str() != key)
                .cloned()
                .collect::<Vec<_>>();
            for stale in keys {
                if overflow == 0 {
                    break;
                }
                if inner.remove(&stale).is_some() {
                    overflow -= 1;
                }
            }
        }

        let reset_after = self
            .window
            .saturating_sub(now.duration_since(window.started));

        RateDecision {
            allowed: window.count <= self.limit,
            limit: self.limit,
            remaining: self.limit.saturating_sub(window.count),
            reset_after,
        }
    }
}
