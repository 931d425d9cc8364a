//! Polling Module
//!
//! A single live poll with per-voter cooldowns, shared by the display,
//! dashboard and voting listeners.

pub mod cooldown;
pub mod engine;
pub mod error;
pub mod poll;

pub use cooldown::{CooldownStatus, CooldownTracker, DEFAULT_COOLDOWN, MAX_COOLDOWN};
pub use engine::{create_engine, PollEngine, PollEngineStats, VoteReceipt};
pub use error::PollError;
pub use poll::{Poll, PollSnapshot, Tallies, MIN_OPTIONS};
