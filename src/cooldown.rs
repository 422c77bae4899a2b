use std::{collections::HashMap, time::Duration};

use parking_lot::Mutex;
use serenity::all::UserId;

/// Result of a cooldown check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CooldownCheck {
    Allowed,
    Rejected { remaining: Duration },
}

/// Per-command, per-user cooldown expiry times.
///
/// Expired entries are overwritten on the next allowed use and never swept,
/// so memory is bounded by the users seen within the longest cooldown window.
#[derive(Default)]
pub struct CooldownTracker {
    expiries: Mutex<HashMap<String, HashMap<UserId, Duration>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `user` against `command` and, if allowed, starts a new window.
    ///
    /// `now` is the time since the Unix epoch. The check and the update happen
    /// under one lock, so two triggers racing for the same pair cannot both pass.
    pub fn check_and_consume(
        &self,
        command: &str,
        user: UserId,
        now: Duration,
        cooldown: Duration,
    ) -> CooldownCheck {
        if cooldown.is_zero() {
            return CooldownCheck::Allowed;
        }

        let mut expiries = self.expiries.lock();
        let users = expiries.entry(command.to_string()).or_default();
        if let Some(&expires_at) = users.get(&user)
            && now < expires_at
        {
            return CooldownCheck::Rejected {
                remaining: expires_at - now,
            };
        }

        users.insert(user, now.saturating_add(cooldown));
        CooldownCheck::Allowed
    }

    /// Number of (command, user) entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.expiries.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
