//! The match store: every match that currently exists.
//!
//! Matches are handed out as clones and written back whole. Two
//! concurrent read-modify-write sequences on the same match can still
//! lose an update (last write wins); the store only guarantees that each
//! single call is atomic.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gridmatch_protocol::{Match, MatchId, PlayerId};
use rand::Rng;

use crate::{MatchError, RuleEngine};

/// Storage for [`Match`] records.
pub trait MatchStore: Send + Sync + 'static {
    /// Creates an `Open` match with `owner` as its only player and returns
    /// the new id.
    fn create(&self, owner: &PlayerId) -> MatchId;

    /// Returns a copy of the match, or `None` if it doesn't exist.
    fn get(&self, id: &MatchId) -> Option<Match>;

    /// Replaces the stored match with the same id.
    ///
    /// # Errors
    /// `NotFound` if no match with that id exists. Nothing is inserted.
    fn update(&self, game: Match) -> Result<(), MatchError>;

    /// Deletes the match. Removing a match that doesn't exist succeeds.
    fn remove(&self, id: &MatchId) -> Result<(), MatchError>;

    /// Every match that can still take a player: `Open` and fewer than
    /// two seated. Order is unspecified.
    fn list_open(&self) -> Vec<Match>;

    /// Every match `player` is seated in, regardless of status.
    fn list_by_player(&self, player: &PlayerId) -> Vec<Match>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`MatchStore`] backed by a mutex-guarded `HashMap`.
#[derive(Default)]
pub struct InMemoryMatchStore {
    matches: Mutex<HashMap<MatchId, Match>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<MatchId, Match>> {
        self.matches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MatchStore for InMemoryMatchStore {
    fn create(&self, owner: &PlayerId) -> MatchId {
        let mut matches = self.lock();
        let id = loop {
            let candidate = MatchId(generate_match_id());
            if !matches.contains_key(&candidate) {
                break candidate;
            }
        };
        matches.insert(id.clone(), Match::new(id.clone(), owner.clone()));
        tracing::info!(match_id = %id, player_id = %owner, "match created");
        id
    }

    fn get(&self, id: &MatchId) -> Option<Match> {
        self.lock().get(id).cloned()
    }

    fn update(&self, game: Match) -> Result<(), MatchError> {
        let mut matches = self.lock();
        match matches.get_mut(&game.id) {
            Some(slot) => {
                *slot = game;
                Ok(())
            }
            None => Err(MatchError::not_found(format!("match {} not found", game.id))
                .with_detail("update: match was removed before the write")),
        }
    }

    fn remove(&self, id: &MatchId) -> Result<(), MatchError> {
        if self.lock().remove(id).is_some() {
            tracing::info!(match_id = %id, "match removed");
        }
        Ok(())
    }

    fn list_open(&self) -> Vec<Match> {
        self.lock()
            .values()
            .filter(|m| RuleEngine::is_open(m))
            .cloned()
            .collect()
    }

    fn list_by_player(&self, player: &PlayerId) -> Vec<Match> {
        self.lock()
            .values()
            .filter(|m| m.has_player(player))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}

/// 128 random bits as 32 lowercase hex characters.
fn generate_match_id() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
