//! Activity counters.
//!
//! Append-only bookkeeping for the `stats` command and the debug log. Nothing here feeds back
//! into dispatch decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serenity::all::UserId;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
};
use tokio::time::Instant;

#[derive(Clone, Debug, Serialize)]
pub struct UserStats {
    pub messages: u64,
    pub commands: u64,
    pub last_active: DateTime<Utc>,
}

impl UserStats {
    fn new() -> Self {
        Self {
            messages: 0,
            commands: 0,
            last_active: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub messages: u64,
    pub commands: u64,
    pub users: usize,
    pub uptime_secs: u64,
}

pub struct Stats {
    started: Instant,
    messages: AtomicU64,
    commands: AtomicU64,
    users: Mutex<HashMap<UserId, UserStats>>,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            messages: AtomicU64::new(0),
            commands: AtomicU64::new(0),
            users: Mutex::new(HashMap::new()),
        }
    }

    fn users(&self) -> MutexGuard<'_, HashMap<UserId, UserStats>> {
        self.users.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record_message(&self, user_id: UserId) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        let mut users = self.users();
        let user = users.entry(user_id).or_insert_with(UserStats::new);
        user.messages += 1;
        user.last_active = Utc::now();
    }

    pub fn record_command(&self, user_id: UserId) {
        self.commands.fetch_add(1, Ordering::Relaxed);
        let mut users = self.users();
        let user = users.entry(user_id).or_insert_with(UserStats::new);
        user.commands += 1;
        user.last_active = Utc::now();
    }

    pub fn user(&self, user_id: UserId) -> Option<UserStats> {
        self.users().get(&user_id).cloned()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            messages: self.messages.load(Ordering::Relaxed),
            commands: self.commands.load(Ordering::Relaxed),
            users: self.users().len(),
            uptime_secs: self.started.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_user_and_overall() {
        let stats = Stats::new();
        stats.record_message(UserId::new(1));
        stats.record_message(UserId::new(1));
        stats.record_command(UserId::new(1));
        stats.record_command(UserId::new(2));

        let one = stats.user(UserId::new(1)).unwrap();
        assert_eq!((one.messages, one.commands), (2, 1));
        let two = stats.user(UserId::new(2)).unwrap();
        assert_eq!((two.messages, two.commands), (0, 1));
        assert!(stats.user(UserId::new(3)).is_none());

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.messages, 2);
        assert_eq!(snapshot.commands, 2);
        assert_eq!(snapshot.users, 2);
    }

    #[test]
    fn snapshot_serializes() {
        let stats = Stats::new();
        stats.record_command(UserId::new(1));
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["commands"], 1);
        assert_eq!(json["users"], 1);
    }
}
