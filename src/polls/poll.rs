//! Poll State
//!
//! The single current poll and the read-only snapshot handed to clients.

use super::error::PollError;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;

/// Minimum number of options a poll must have to be started
pub const MIN_OPTIONS: usize = 2;

/// The current poll.
///
/// Tallies are stored index-aligned with `options`, so every option always
/// has exactly one counter and there are never counters for unknown labels.
#[derive(Debug, Clone, Default)]
pub struct Poll {
    active: bool,
    question: String,
    options: Vec<String>,
    tallies: Vec<u64>,
    /// When the poll was last started (Unix ms)
    start_time: Option<i64>,
}

impl Poll {
    /// Create an inactive poll with no options
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether votes are currently accepted
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn start_time(&self) -> Option<i64> {
        self.start_time
    }

    /// Replace the poll with a fresh, active one.
    ///
    /// Options are trimmed and empty labels dropped; the question is kept
    /// as given. The previous poll is left untouched if validation fails.
    pub fn start(&mut self, question: &str, options: &[String]) -> Result<(), PollError> {
        let options = normalize_options(options)?;

        self.active = true;
        self.question = question.to_string();
        self.tallies = vec![0; options.len()];
        self.options = options;
        self.start_time = Some(now_millis());
        Ok(())
    }

    /// Stop accepting votes. Question, options and tallies are kept.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Zero every tally, keeping the options and the active flag.
    pub fn reset(&mut self) {
        self.tallies.iter_mut().for_each(|t| *t = 0);
    }

    /// Check that a vote for `option` would be accepted right now.
    pub fn check_vote(&self, option: &str) -> Result<usize, PollError> {
        if !self.active {
            return Err(PollError::NoActivePoll);
        }
        self.options
            .iter()
            .position(|o| o == option)
            .ok_or_else(|| PollError::InvalidOption(option.to_string()))
    }

    /// Add one vote to `option`.
    pub fn record_vote(&mut self, option: &str) -> Result<(), PollError> {
        let index = self.check_vote(option)?;
        self.tallies[index] += 1;
        Ok(())
    }

    /// Tally for a single option
    pub fn votes_for(&self, option: &str) -> Option<u64> {
        let index = self.options.iter().position(|o| o == option)?;
        Some(self.tallies[index])
    }

    /// Sum of all tallies
    pub fn total_votes(&self) -> u64 {
        self.tallies.iter().sum()
    }

    /// Owned point-in-time copy of the poll
    pub fn snapshot(&self) -> PollSnapshot {
        PollSnapshot {
            active: self.active,
            question: self.question.clone(),
            options: self.options.clone(),
            votes: Tallies(
                self.options
                    .iter()
                    .cloned()
                    .zip(self.tallies.iter().copied())
                    .collect(),
            ),
            start_time: self.start_time,
        }
    }
}

/// Trim labels, drop empty ones, and reject short or duplicated lists.
fn normalize_options(options: &[String]) -> Result<Vec<String>, PollError> {
    let cleaned: Vec<String> = options
        .iter()
        .map(|o| o.trim())
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();

    if cleaned.len() < MIN_OPTIONS {
        return Err(PollError::NotEnoughOptions {
            found: cleaned.len(),
        });
    }

    let mut seen = HashSet::new();
    for option in &cleaned {
        if !seen.insert(option.as_str()) {
            return Err(PollError::DuplicateOption(option.clone()));
        }
    }

    Ok(cleaned)
}

/// Read-only view of the poll as served by `GET /api/poll`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub active: bool,
    pub question: String,
    pub options: Vec<String>,
    pub votes: Tallies,
    /// Unix ms of the last start, `null` if no poll was ever started
    pub start_time: Option<i64>,
}

impl PollSnapshot {
    pub fn votes_for(&self, option: &str) -> Option<u64> {
        self.votes.get(option)
    }

    pub fn total_votes(&self) -> u64 {
        self.votes.total()
    }
}

/// Per-option counts in display order, serialized as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tallies(Vec<(String, u64)>);

impl Tallies {
    pub fn get(&self, option: &str) -> Option<u64> {
        self.0.iter().find(|(o, _)| o == option).map(|(_, n)| *n)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|(_, n)| n).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Tallies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (option, count) in &self.0 {
            map.serialize_entry(option, count)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Tallies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TalliesVisitor;

        impl<'de> Visitor<'de> for TalliesVisitor {
            type Value = Tallies;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of option label to vote count")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Tallies, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((option, count)) = access.next_entry::<String, u64>()? {
                    entries.push((option, count));
                }
                Ok(Tallies(entries))
            }
        }

        deserializer.deserialize_map(TalliesVisitor)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
