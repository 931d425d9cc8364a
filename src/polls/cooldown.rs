//! Cooldown Tracker
//!
//! Remembers, per voter, the instant after which another vote is accepted.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default wait between two accepted votes from the same voter
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Longest cooldown a tracker will apply
pub const MAX_COOLDOWN: Duration = Duration::from_secs(86_400);

/// Cooldown record for one voter
#[derive(Debug, Clone, Copy)]
struct CooldownEntry {
    cooldown_until: Instant,
}

/// Cooldown state reported to a voter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownStatus {
    pub on_cooldown: bool,
    /// Whole seconds left, rounded up. Zero when not on cooldown.
    pub remaining_secs: u64,
}

/// Per-voter cooldown map.
///
/// Not synchronized on its own; the engine guards it together with the poll
/// so the check and the write happen in one critical section.
#[derive(Debug)]
pub struct CooldownTracker {
    cooldown: Duration,
    entries: HashMap<String, CooldownEntry>,
}

impl Default for CooldownTracker {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl CooldownTracker {
    /// Create a tracker. Windows longer than `MAX_COOLDOWN` are clamped.
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown: cooldown.min(MAX_COOLDOWN),
            entries: HashMap::new(),
        }
    }

    /// Length of the window applied on each accepted vote
    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Remaining wait for `voter_id` at `now`, or `None` if free to vote.
    pub fn remaining(&self, voter_id: &str, now: Instant) -> Option<Duration> {
        let entry = self.entries.get(voter_id)?;
        if now < entry.cooldown_until {
            Some(entry.cooldown_until - now)
        } else {
            None
        }
    }

    /// Status for `voter_id`. Never creates an entry.
    pub fn status(&self, voter_id: &str, now: Instant) -> CooldownStatus {
        match self.remaining(voter_id, now) {
            Some(left) => CooldownStatus {
                on_cooldown: true,
                remaining_secs: ceil_secs(left),
            },
            None => CooldownStatus {
                on_cooldown: false,
                remaining_secs: 0,
            },
        }
    }

    /// Start (or restart) the window for `voter_id`.
    pub fn record(&mut self, voter_id: &str, now: Instant) {
        let cooldown_until = now
            .checked_add(self.cooldown)
            .unwrap_or_else(|| far_future(now));
        self.entries
            .insert(voter_id.to_string(), CooldownEntry { cooldown_until });
    }

    /// Drop entries whose window has passed. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.cooldown_until);
        before - self.entries.len()
    }

    /// Number of tracked voters
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

}

/// Latest instant reachable from `now` in whole days, capped at a year.
fn far_future(now: Instant) -> Instant {
    (0..=365u64)
        .rev()
        .find_map(|days| now.checked_add(Duration::from_secs(days * 86_400)))
        .unwrap_or(now)
}

/// Round a duration up to whole seconds.
pub fn ceil_secs(d: Duration) -> u64 {
    let secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        secs.saturating_add(1)
    } else {
        secs
    }
}
