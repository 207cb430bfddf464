//! Sliding-window rate limiting and per-command cooldowns.
//!
//! Every (command, user) pair owns an independent bucket. A check prunes, decides and records in
//! one critical section under a synchronous mutex, so no await point can separate reading the
//! count from appending the new timestamp.

use crate::config;
use serenity::all::UserId;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use tokio::time::Instant;

/// Cooldowns are capped so the deadline always fits in an `Instant`.
const LONGEST_COOLDOWN: Duration = Duration::from_secs(366 * 86_400);

#[derive(Clone, Debug)]
pub struct Settings {
    pub enabled: bool,
    pub window: Duration,
    pub max_per_window: usize,
}

impl From<&config::RateLimit> for Settings {
    fn from(cfg: &config::RateLimit) -> Self {
        Self {
            enabled: cfg.enabled,
            window: cfg.window(),
            max_per_window: cfg.max_per_window,
        }
    }
}

/// Verdict for one dispatch attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Throttle {
    Allowed,
    /// Too many invocations in the trailing window.
    Limited { retry_after: Duration },
    /// Invoked again before the command's cooldown elapsed.
    Cooling { remaining: Duration },
}

#[cfg(test)]
impl Throttle {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Throttle::Allowed)
    }
}

#[derive(Default)]
struct Bucket {
    /// Allowed invocations inside the window, oldest first.
    hits: VecDeque<Instant>,
    cooling_until: Option<Instant>,
}

impl Bucket {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.hits.front() {
            if now.saturating_duration_since(*oldest) < window {
                break;
            }
            self.hits.pop_front();
        }
        if matches!(self.cooling_until, Some(until) if until <= now) {
            self.cooling_until = None;
        }
    }

    fn is_idle(&self) -> bool {
        self.hits.is_empty() && self.cooling_until.is_none()
    }
}

type BucketKey = (String, UserId);

pub struct RateLimiter {
    settings: Settings,
    buckets: Mutex<HashMap<BucketKey, Bucket>>,
}

impl RateLimiter {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // Every mutation is a complete statement under the lock, so a poisoned map is still
    // consistent.
    fn buckets(&self) -> MutexGuard<'_, HashMap<BucketKey, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check(&self, user_id: UserId, command: &str, cooldown: Option<Duration>) -> Throttle {
        self.check_at(user_id, command, cooldown, Instant::now())
    }

    /// Decide and, when allowed, record an invocation at `now`.
    ///
    /// A denied attempt is never recorded. A disabled limiter allows everything, cooldowns
    /// included.
    pub fn check_at(
        &self,
        user_id: UserId,
        command: &str,
        cooldown: Option<Duration>,
        now: Instant,
    ) -> Throttle {
        if !self.settings.enabled {
            return Throttle::Allowed;
        }
        let cooldown = cooldown.filter(|c| !c.is_zero());

        let mut buckets = self.buckets();
        let bucket = buckets
            .entry((command.to_owned(), user_id))
            .or_default();
        bucket.prune(now, self.settings.window);

        if let Some(until) = bucket.cooling_until {
            return Throttle::Cooling {
                remaining: until - now,
            };
        }

        if bucket.hits.len() >= self.settings.max_per_window {
            let retry_after = bucket
                .hits
                .front()
                .and_then(|oldest| oldest.checked_add(self.settings.window))
                .map_or(self.settings.window, |free| free.saturating_duration_since(now));
            return Throttle::Limited { retry_after };
        }
        bucket.hits.push_back(now);

        if let Some(cooldown) = cooldown {
            bucket.cooling_until = Some(now + cooldown.min(LONGEST_COOLDOWN));
        }

        Throttle::Allowed
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    /// Drop expired timestamps and forget buckets with nothing left in them.
    ///
    /// Runs under the same lock as [`check_at`](Self::check_at), so it only ever sees buckets
    /// between two checks and cannot discard a timestamp a check still relies on.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets();
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            bucket.prune(now, self.settings.window);
            !bucket.is_idle()
        });
        before - buckets.len()
    }

    /// Number of live buckets.
    pub fn tracked(&self) -> usize {
        self.buckets().len()
    }
}
