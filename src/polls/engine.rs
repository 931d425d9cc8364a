//! Poll Engine
//!
//! Owns the poll and the cooldown tracker behind one lock and exposes the
//! operations used by the control, result and vote endpoints.

use super::cooldown::{ceil_secs, CooldownStatus, CooldownTracker, DEFAULT_COOLDOWN};
use super::error::PollError;
use super::poll::{Poll, PollSnapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// State guarded by the engine lock
#[derive(Debug, Default)]
struct EngineState {
    poll: Poll,
    cooldowns: CooldownTracker,
}

/// Outcome of an accepted vote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReceipt {
    /// Option that received the vote
    pub option: String,
    /// Seconds before this voter may vote again
    pub cooldown_secs: u64,
}

/// Poll engine shared by every listener
#[derive(Debug)]
pub struct PollEngine {
    state: RwLock<EngineState>,
}

impl Default for PollEngine {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN)
    }
}

impl PollEngine {
    /// Create an engine with no poll and the given per-vote cooldown
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: RwLock::new(EngineState {
                poll: Poll::new(),
                cooldowns: CooldownTracker::new(cooldown),
            }),
        }
    }

    /// Cooldown applied after each accepted vote
    pub fn cooldown(&self) -> Duration {
        self.state.read().cooldowns.cooldown()
    }

    /// Start a new poll, replacing whatever was there.
    pub fn start_poll(
        &self,
        question: &str,
        options: &[String],
    ) -> Result<PollSnapshot, PollError> {
        let mut state = self.state.write();
        state.poll.start(question, options)?;
        let snapshot = state.poll.snapshot();
        drop(state);

        tracing::info!(
            question = %snapshot.question,
            options = snapshot.options.len(),
            "poll started"
        );
        Ok(snapshot)
    }

    /// Stop accepting votes
    pub fn stop_poll(&self) {
        self.state.write().poll.stop();
        tracing::info!("poll stopped");
    }

    /// Zero all tallies of the current poll
    pub fn reset_poll(&self) {
        self.state.write().poll.reset();
        tracing::info!("poll tallies reset");
    }

    /// Consistent copy of the current poll
    pub fn snapshot(&self) -> PollSnapshot {
        self.state.read().poll.snapshot()
    }

    /// Validate and record a vote from `voter_id`.
    pub fn cast_vote(&self, voter_id: &str, option: &str) -> Result<VoteReceipt, PollError> {
        self.cast_vote_at(voter_id, option, Instant::now())
    }

    /// Validate and record a vote as of `now`.
    ///
    /// The poll check, the cooldown check, the increment and the cooldown
    /// write all happen under a single write lock, so two racing votes from
    /// one voter can never both be accepted.
    pub fn cast_vote_at(
        &self,
        voter_id: &str,
        option: &str,
        now: Instant,
    ) -> Result<VoteReceipt, PollError> {
        let mut guard = self.state.write();
        let state = &mut *guard;

        state.poll.check_vote(option)?;

        if let Some(left) = state.cooldowns.remaining(voter_id, now) {
            return Err(PollError::OnCooldown {
                remaining_secs: ceil_secs(left),
            });
        }

        state.poll.record_vote(option)?;
        state.cooldowns.record(voter_id, now);
        let cooldown_secs = ceil_secs(state.cooldowns.cooldown());
        drop(guard);

        tracing::debug!(voter = %voter_id, option = %option, "vote accepted");
        Ok(VoteReceipt {
            option: option.to_string(),
            cooldown_secs,
        })
    }

    /// Cooldown state for `voter_id`
    pub fn cooldown_status(&self, voter_id: &str) -> CooldownStatus {
        self.cooldown_status_at(voter_id, Instant::now())
    }

    pub fn cooldown_status_at(&self, voter_id: &str, now: Instant) -> CooldownStatus {
        self.state.read().cooldowns.status(voter_id, now)
    }

    /// Evict expired cooldown entries
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Instant::now())
    }

    pub fn sweep_expired_at(&self, now: Instant) -> usize {
        self.state.write().cooldowns.sweep_expired(now)
    }

    /// Get engine statistics
    pub fn get_stats(&self) -> PollEngineStats {
        let state = self.state.read();
        PollEngineStats {
            active: state.poll.is_active(),
            options: state.poll.options().len(),
            total_votes: state.poll.total_votes(),
            tracked_voters: state.cooldowns.len(),
        }
    }
}

/// Statistics for the poll engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollEngineStats {
    /// Whether the poll accepts votes
    pub active: bool,
    /// Number of options in the current poll
    pub options: usize,
    /// Sum of all tallies
    pub total_votes: u64,
    /// Voters with a cooldown entry (expired or not)
    pub tracked_voters: usize,
}

/// Create a shared poll engine
pub fn create_engine(cooldown: Duration) -> Arc<PollEngine> {
    Arc::new(PollEngine::new(cooldown))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::MAX_COOLDOWN;
    use std::sync::Barrier;
    use std::thread;

    fn ab() -> Vec<String> {
        vec!["A".to_string(), "B".to_string()]
    }

    fn started_engine() -> PollEngine {
        let engine = PollEngine::default();
        engine.start_poll("Favorite letter?", &ab()).unwrap();
        engine
    }

    #[test]
    fn test_start_poll_snapshot() {
        let engine = PollEngine::default();
        let snap = engine.start_poll("Q", &ab()).unwrap();
        assert!(snap.active);
        assert_eq!(snap.options, ab());
        assert_eq!(snap.votes_for("A"), Some(0));
        assert_eq!(snap.votes_for("B"), Some(0));
        assert_eq!(engine.snapshot(), snap);
    }

    #[test]
    fn test_vote_without_poll() {
        let engine = PollEngine::default();
        assert_eq!(engine.cast_vote("v1", "A"), Err(PollError::NoActivePoll));
    }

    #[test]
    fn test_vote_after_stop() {
        let engine = started_engine();
        engine.stop_poll();
        assert_eq!(engine.cast_vote("v1", "A"), Err(PollError::NoActivePoll));
        assert_eq!(engine.get_stats().tracked_voters, 0);
    }

    #[test]
    fn test_invalid_option_leaves_no_cooldown() {
        let engine = started_engine();
        assert_eq!(
            engine.cast_vote("v1", "C"),
            Err(PollError::InvalidOption("C".to_string()))
        );
        assert!(!engine.cooldown_status("v1").on_cooldown);
        assert!(engine.cast_vote("v1", "A").is_ok());
    }

    #[test]
    fn test_no_active_poll_wins_over_invalid_option() {
        let engine = PollEngine::default();
        assert_eq!(engine.cast_vote("v1", "nope"), Err(PollError::NoActivePoll));
    }

    #[test]
    fn test_accepted_vote_sets_cooldown() {
        let engine = started_engine();
        let now = Instant::now();
        let receipt = engine.cast_vote_at("v1", "A", now).unwrap();
        assert_eq!(receipt.cooldown_secs, 30);
        assert_eq!(receipt.option, "A");
        assert_eq!(engine.snapshot().votes_for("A"), Some(1));

        let err = engine
            .cast_vote_at("v1", "B", now + Duration::from_millis(2500))
            .unwrap_err();
        assert_eq!(err, PollError::OnCooldown { remaining_secs: 28 });
        assert_eq!(engine.snapshot().votes_for("B"), Some(0));
    }

    #[test]
    fn test_vote_accepted_again_after_window() {
        let engine = started_engine();
        let now = Instant::now();
        engine.cast_vote_at("v1", "A", now).unwrap();
        assert!(engine
            .cast_vote_at("v1", "A", now + Duration::from_secs(30))
            .is_ok());
        assert_eq!(engine.snapshot().votes_for("A"), Some(2));
    }

    #[test]
    fn test_cooldown_survives_new_poll() {
        let engine = started_engine();
        let now = Instant::now();
        engine.cast_vote_at("v1", "A", now).unwrap();
        engine
            .start_poll("Next", &["X".to_string(), "Y".to_string()])
            .unwrap();

        let err = engine
            .cast_vote_at("v1", "X", now + Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, PollError::OnCooldown { .. }));
    }

    #[test]
    fn test_reset_then_vote_uses_same_options() {
        let engine = started_engine();
        engine.cast_vote("v1", "A").unwrap();
        engine.reset_poll();

        let snap = engine.snapshot();
        assert!(snap.active);
        assert_eq!(snap.total_votes(), 0);
        assert!(engine.cast_vote("v2", "B").is_ok());
        assert!(matches!(
            engine.cast_vote("v3", "Z"),
            Err(PollError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_stop_keeps_final_tallies() {
        let engine = started_engine();
        engine.cast_vote("v1", "B").unwrap();
        engine.cast_vote("v2", "B").unwrap();
        engine.stop_poll();

        let snap = engine.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.votes_for("B"), Some(2));
    }

    #[test]
    fn test_cooldown_status_decreases() {
        let engine = started_engine();
        let now = Instant::now();
        engine.cast_vote_at("v1", "A", now).unwrap();

        let a = engine.cooldown_status_at("v1", now + Duration::from_secs(1));
        let b = engine.cooldown_status_at("v1", now + Duration::from_secs(20));
        let c = engine.cooldown_status_at("v1", now + Duration::from_secs(31));
        assert!(a.remaining_secs > b.remaining_secs);
        assert!(b.on_cooldown);
        assert!(!c.on_cooldown);
        assert_eq!(c.remaining_secs, 0);
    }

    #[test]
    fn test_custom_cooldown_length() {
        let engine = PollEngine::new(Duration::from_secs(5));
        engine.start_poll("Q", &ab()).unwrap();
        let receipt = engine.cast_vote("v1", "A").unwrap();
        assert_eq!(receipt.cooldown_secs, 5);
        assert_eq!(engine.cooldown(), Duration::from_secs(5));
    }

    #[test]
    fn test_sweep_expired() {
        let engine = started_engine();
        let now = Instant::now();
        engine.cast_vote_at("v1", "A", now).unwrap();
        engine.cast_vote_at("v2", "A", now + Duration::from_secs(20)).unwrap();

        assert_eq!(engine.sweep_expired_at(now + Duration::from_secs(40)), 1);
        assert_eq!(engine.get_stats().tracked_voters, 1);
    }

    #[test]
    fn test_oversized_cooldown_does_not_panic_on_vote() {
        let engine = PollEngine::new(Duration::from_secs(u64::MAX));
        engine.start_poll("Q", &ab()).unwrap();

        let receipt = engine.cast_vote("v", "A").unwrap();
        assert_eq!(receipt.cooldown_secs, MAX_COOLDOWN.as_secs());
        assert!(matches!(
            engine.cast_vote("v", "B"),
            Err(PollError::OnCooldown { .. })
        ));
        assert_eq!(engine.snapshot().votes_for("A"), Some(1));
    }

    #[test]
    fn test_concurrent_distinct_voters_lose_nothing() {
        let engine = Arc::new(started_engine());
        let threads = 16;
        let per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let mut accepted = 0u64;
                    for i in 0..per_thread {
                        let voter = format!("10.{}.0.{}", t, i);
                        let option = if i % 2 == 0 { "A" } else { "B" };
                        if engine.cast_vote(&voter, option).is_ok() {
                            accepted += 1;
                        }
                    }
                    accepted
                })
            })
            .collect();

        let accepted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(accepted, (threads * per_thread) as u64);
        assert_eq!(engine.snapshot().total_votes(), accepted);
    }

    #[test]
    fn test_concurrent_same_voter_accepts_once() {
        let engine = Arc::new(started_engine());
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let engine = Arc::clone(&engine);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    engine.cast_vote("192.168.1.7", "A")
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let accepted = results.iter().filter(|r| r.is_ok()).count();
        let throttled = results
            .iter()
            .filter(|r| matches!(r, Err(PollError::OnCooldown { .. })))
            .count();

        assert_eq!(accepted, 1);
        assert_eq!(throttled, threads - 1);
        assert_eq!(engine.snapshot().votes_for("A"), Some(1));
    }
}
