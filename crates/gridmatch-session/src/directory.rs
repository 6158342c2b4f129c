//! The player directory: every player the server currently knows about.
//!
//! A player record is created when a connection opens and removed when it
//! closes. Records are never mutated in between.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gridmatch_protocol::{Player, PlayerId};

use crate::SessionError;

/// Storage for [`Player`] records.
///
/// A trait so the coordinator can be tested against an isolated
/// directory per test, or a fake one.
pub trait PlayerDirectory: Send + Sync + 'static {
    /// Creates a player with a fresh unique id.
    fn create(&self, name: &str) -> Player;

    /// Returns a copy of the player, or `None` if unknown.
    fn get(&self, id: &PlayerId) -> Option<Player>;

    /// Deletes the player.
    ///
    /// # Errors
    /// [`SessionError::PlayerNotFound`] if no such player exists.
    fn remove(&self, id: &PlayerId) -> Result<(), SessionError>;

    /// Number of known players.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`PlayerDirectory`] backed by a mutex-guarded `HashMap`.
///
/// Ids come from a counter under the same lock, rendered as decimal
/// strings ("1", "2", ...). Ids are never reused, even after removal.
#[derive(Default)]
pub struct InMemoryPlayerDirectory {
    inner: Mutex<DirectoryInner>,
}

#[derive(Default)]
struct DirectoryInner {
    players: HashMap<PlayerId, Player>,
    last_id: u64,
}

impl InMemoryPlayerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    // Every critical section leaves the map consistent, so a panic on
    // another thread doesn't invalidate it.
    fn lock(&self) -> MutexGuard<'_, DirectoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PlayerDirectory for InMemoryPlayerDirectory {
    fn create(&self, name: &str) -> Player {
        let mut inner = self.lock();
        inner.last_id += 1;
        let player = Player {
            id: PlayerId(inner.last_id.to_string()),
            name: name.to_string(),
        };
        inner.players.insert(player.id.clone(), player.clone());
        tracing::info!(player_id = %player.id, name, "player created");
        player
    }

    fn get(&self, id: &PlayerId) -> Option<Player> {
        self.lock().players.get(id).cloned()
    }

    fn remove(&self, id: &PlayerId) -> Result<(), SessionError> {
        match self.lock().players.remove(id) {
            Some(_) => {
                tracing::info!(player_id = %id, "player removed");
                Ok(())
            }
            None => Err(SessionError::PlayerNotFound(id.clone())),
        }
    }

    fn len(&self) -> usize {
        self.lock().players.len()
    }
}
