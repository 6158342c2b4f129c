//! The match coordinator: one method per player-visible operation.
//!
//! Every operation follows the same shape:
//!
//! 1. read copies from the directory and the store
//! 2. validate, deriving the next match value through the [`RuleEngine`]
//! 3. write the whole record back
//! 4. run the collected [`Effect`]s (publishes and broadcasts)
//!
//! Nothing is written if step 2 fails, and nobody is notified before the
//! write in step 3 succeeds. The directory and the store are locked in
//! separate critical sections, so an operation is atomic per repository
//! but not across them.

use gridmatch_protocol::{EventType, FieldError, Match, MatchId, MatchStatus, Player, PlayerId, Turn};
use gridmatch_session::{
    ChannelNotifier, InMemoryPlayerDirectory, Notifier, PlayerDirectory, PlayerSender, SessionError,
};

use crate::{InMemoryMatchStore, MatchConfig, MatchError, MatchStore, RuleEngine};

/// Message published with `UserGameChanged` when a match is torn down.
const GAME_ENDED_MESSAGE: &str = "Game was ended";

/// A notification to send once state has been persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Effect {
    Publish {
        to: PlayerId,
        event: EventType,
        message: String,
    },
    Broadcast(EventType),
}

impl Effect {
    fn publish(to: &PlayerId, event: EventType, message: &str) -> Self {
        Self::Publish {
            to: to.clone(),
            event,
            message: message.to_string(),
        }
    }
}

/// How to treat a single-recipient publish that fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// Try every recipient, then report the first failure as `Internal`.
    Required,
    /// Skip players without a channel, log write failures, never fail.
    BestEffort,
}

/// Orchestrates the match store, the player directory and the notifier.
///
/// Generic over all three so tests can run against isolated in-memory
/// instances (or fakes). All methods take `&self`; share it behind an
/// `Arc`.
pub struct MatchCoordinator<S, D, N> {
    store: S,
    directory: D,
    notifier: N,
    rules: RuleEngine,
}

/// The coordinator wired to the in-memory repositories and the channel
/// notifier.
pub type InMemoryCoordinator =
    MatchCoordinator<InMemoryMatchStore, InMemoryPlayerDirectory, ChannelNotifier>;

impl InMemoryCoordinator {
    pub fn in_memory(config: &MatchConfig) -> Self {
        Self::new(
            InMemoryMatchStore::new(),
            InMemoryPlayerDirectory::new(),
            ChannelNotifier::new(),
            config,
        )
    }
}

impl<S, D, N> MatchCoordinator<S, D, N>
where
    S: MatchStore,
    D: PlayerDirectory,
    N: Notifier,
{
    pub fn new(store: S, directory: D, notifier: N, config: &MatchConfig) -> Self {
        Self {
            store,
            directory,
            notifier,
            rules: RuleEngine::new(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn rules(&self) -> &RuleEngine {
        &self.rules
    }

    // =====================================================================
    // Connection lifecycle
    // =====================================================================

    /// Creates a player, registers its notification channel and sends it
    /// a `PlayerIdAssigned` event carrying the new id.
    ///
    /// If that first event can't be delivered the player is removed again
    /// and the error is returned. Nobody else is notified: the player
    /// never sat in a match.
    pub fn connect_player(&self, name: &str, sender: PlayerSender) -> Result<Player, MatchError> {
        if name.trim().is_empty() {
            return Err(MatchError::validation(
                "invalid player name",
                vec![FieldError::new("name", "must not be empty")],
            ));
        }

        let player = self.directory.create(name);
        self.notifier.register(player.id.clone(), sender);
        tracing::info!(player_id = %player.id, name, "player connected");

        let assigned = Effect::publish(&player.id, EventType::PlayerIdAssigned, player.id.as_str());
        if let Err(err) = self.run_effects(vec![assigned], Delivery::Required) {
            self.notifier.unregister(&player.id);
            self.directory.remove(&player.id)?;
            tracing::info!(player_id = %player.id, "player connect rolled back");
            return Err(err);
        }
        Ok(player)
    }

    /// Drops the player's channel, then runs [`remove_user`](Self::remove_user).
    pub fn disconnect_player(&self, player_id: &PlayerId) -> Result<(), MatchError> {
        self.notifier.unregister(player_id);
        self.remove_user(player_id)
    }

    /// Looks up a player.
    ///
    /// # Errors
    /// `BadRequest` if the id is unknown.
    pub fn get_player(&self, player_id: &PlayerId) -> Result<Player, MatchError> {
        self.directory
            .get(player_id)
            .ok_or_else(|| {
                MatchError::bad_request(format!("player {player_id} not found"))
                    .with_detail("get_player: no directory entry")
            })
    }

    // =====================================================================
    // Match operations
    // =====================================================================

    /// Opens a new match with `player_id` as its only player and tells
    /// everyone the list of open matches changed.
    ///
    /// # Errors
    /// - `NotFound`: unknown player
    /// - `Conflict`: the player already sits in an open match
    pub fn start_game(&self, player_id: &PlayerId) -> Result<MatchId, MatchError> {
        self.require_player(player_id)?;
        self.require_no_open_match(player_id)?;

        let match_id = self.store.create(player_id);
        self.run_effects(vec![Effect::Broadcast(EventType::GamesChanged)], Delivery::Required)?;
        Ok(match_id)
    }

    /// Seats `player_id` in `match_id`.
    ///
    /// # Errors
    /// - `NotFound`: unknown player or match
    /// - `Conflict`: the player already sits in an open match, or the
    ///   match is finished or full
    pub fn join_game(&self, player_id: &PlayerId, match_id: &MatchId) -> Result<(), MatchError> {
        self.require_player(player_id)?;
        self.require_no_open_match(player_id)?;

        let mut game = self
            .store
            .get(match_id)
            .ok_or_else(|| {
                MatchError::not_found(format!("match {match_id} not found"))
                    .with_detail(format!("join_game: player {player_id} asked for a missing match"))
            })?;
        if game.is_finished() {
            return Err(
                MatchError::conflict("cannot join this game, it has already ended")
                    .with_detail(format!("join_game: match {match_id} is finished")),
            );
        }
        if !RuleEngine::is_open(&game) {
            return Err(MatchError::conflict("cannot join game, already full").with_detail(
                format!("join_game: match {match_id} has {} players", game.players.len()),
            ));
        }

        game.players.push(player_id.clone());
        self.store.update(game.clone())?;
        tracing::info!(%match_id, %player_id, "player joined match");

        let effects = game
            .players
            .iter()
            .map(|p| Effect::publish(p, EventType::UserGameChanged, ""))
            .collect();
        self.run_effects(effects, Delivery::Required)
    }

    /// Claims cell (`x`, `y`) for `player_id` and checks for a win.
    ///
    /// Returns the match as persisted. Turn order is not enforced.
    ///
    /// # Errors
    /// - `BadRequest`: unknown match, fewer than two players, match
    ///   finished, cell taken, player not seated
    /// - `Validation`: cell off the board
    pub fn send_turn(
        &self,
        match_id: &MatchId,
        player_id: &PlayerId,
        x: i32,
        y: i32,
    ) -> Result<Match, MatchError> {
        let game = self
            .store
            .get(match_id)
            .ok_or_else(|| {
                MatchError::bad_request(format!("match {match_id} not found"))
                    .with_detail(format!("send_turn: player {player_id} played into a missing match"))
            })?;

        let (first, second) = match game.players.as_slice() {
            [first, second] if !game.is_finished() => (first.clone(), second.clone()),
            _ => {
                return Err(MatchError::bad_request("game is not playable").with_detail(
                    format!(
                        "send_turn: {} players seated, status {}",
                        game.players.len(),
                        game.status
                    ),
                ));
            }
        };

        let turn = Turn {
            player: player_id.clone(),
            x,
            y,
        };
        let mut next = self.rules.apply_turn(&game, turn)?;

        let check = self.rules.check_win_condition(&next, &first, &second);
        if check.has_win {
            next.status = MatchStatus::Finished;
            next.winner = check.winner;
        }

        self.store.update(next.clone())?;
        match &next.winner {
            Some(winner) if next.is_finished() => {
                tracing::info!(%match_id, %winner, "match finished");
            }
            _ => tracing::debug!(%match_id, %player_id, x, y, "turn applied"),
        }

        let effects = [first, second]
            .iter()
            .map(|p| Effect::publish(p, EventType::UserGameChanged, ""))
            .collect();
        self.run_effects(effects, Delivery::Required)?;
        Ok(next)
    }

    /// Takes `player_id` out of `match_id`.
    ///
    /// An `Open` match is deleted outright, and so is a match left with
    /// nobody in it. Only a finished match keeps its remaining player.
    /// Remaining players get `UserGameChanged`; when the match was
    /// deleted everyone also gets `GamesChanged`.
    ///
    /// # Errors
    /// - `NotFound`: unknown match
    /// - `BadRequest`: the player isn't seated in it
    pub fn end_game(&self, match_id: &MatchId, player_id: &PlayerId) -> Result<(), MatchError> {
        let mut game = self
            .store
            .get(match_id)
            .ok_or_else(|| {
                MatchError::not_found(format!("match {match_id} not found"))
                    .with_detail(format!("end_game: player {player_id} ended a missing match"))
            })?;
        if !game.has_player(player_id) {
            return Err(MatchError::bad_request(format!(
                "player {player_id} is not in match {match_id}"
            ))
            .with_detail(format!("end_game: seated players are {:?}", game.players)));
        }

        game.players.retain(|p| p != player_id);
        let removed = game.status == MatchStatus::Open || game.players.is_empty();
        if removed {
            self.store.remove(match_id)?;
        } else {
            self.store.update(game.clone())?;
        }
        tracing::info!(%match_id, %player_id, removed, "player left match");

        let message = if removed { GAME_ENDED_MESSAGE } else { "" };
        let mut effects: Vec<Effect> = game
            .players
            .iter()
            .map(|p| Effect::publish(p, EventType::UserGameChanged, message))
            .collect();
        if removed {
            effects.push(Effect::Broadcast(EventType::GamesChanged));
        }
        self.run_effects(effects, Delivery::Required)
    }

    /// The disconnect cascade.
    ///
    /// Deletes every match the player sits in, whatever its phase, tells
    /// each co-player with `UserGameRemoved`, broadcasts `GamesChanged`
    /// once, and finally deletes the player record. Unknown players are a
    /// no-op. Delivery is best effort throughout.
    pub fn remove_user(&self, player_id: &PlayerId) -> Result<(), MatchError> {
        if self.directory.get(player_id).is_none() {
            tracing::debug!(%player_id, "remove_user: unknown player, nothing to do");
            return Ok(());
        }

        let mut effects = Vec::new();
        for game in self.store.list_by_player(player_id) {
            self.store.remove(&game.id)?;
            effects.extend(
                game.players
                    .iter()
                    .filter(|p| *p != player_id)
                    .map(|p| Effect::publish(p, EventType::UserGameRemoved, "")),
            );
        }
        effects.push(Effect::Broadcast(EventType::GamesChanged));
        self.run_effects(effects, Delivery::BestEffort)?;

        self.directory.remove(player_id)?;
        tracing::info!(%player_id, "player disconnected");
        Ok(())
    }

    // =====================================================================
    // Queries
    // =====================================================================

    /// Every match that can still take a second player.
    pub fn query_available_games(&self) -> Vec<Match> {
        self.store.list_open()
    }

    /// The player's match, if any.
    ///
    /// With several matches (a finished one plus a new one, say) this is
    /// the last one in store iteration order, which is not necessarily
    /// the newest.
    pub fn query_user_game(&self, player_id: &PlayerId) -> Option<Match> {
        self.store.list_by_player(player_id).pop()
    }

    // =====================================================================
    // Helpers
    // =====================================================================

    fn require_player(&self, player_id: &PlayerId) -> Result<Player, MatchError> {
        self.directory
            .get(player_id)
            .ok_or_else(|| {
                MatchError::not_found(format!("player {player_id} does not exist"))
                    .with_detail("no directory entry; the connection may already be gone")
            })
    }

    fn require_no_open_match(&self, player_id: &PlayerId) -> Result<(), MatchError> {
        let open = self
            .store
            .list_by_player(player_id)
            .iter()
            .any(RuleEngine::is_open);
        if open {
            return Err(MatchError::conflict("user already has a game in progress")
                .with_detail(format!("player {player_id} already sits in an open match")));
        }
        Ok(())
    }

    /// Runs effects in order. Every effect is attempted even after a
    /// failure.
    fn run_effects(&self, effects: Vec<Effect>, delivery: Delivery) -> Result<(), MatchError> {
        let mut first_failure: Option<SessionError> = None;

        for effect in effects {
            match effect {
                Effect::Publish { to, event, message } => {
                    let Err(err) = self.notifier.publish(&to, event, &message) else {
                        continue;
                    };
                    match (delivery, &err) {
                        (Delivery::BestEffort, SessionError::NotRegistered(_)) => {
                            tracing::debug!(player_id = %to, %event, "skipping player without channel");
                        }
                        (Delivery::BestEffort, _) => {
                            tracing::warn!(player_id = %to, %event, error = %err, "notification dropped");
                        }
                        (Delivery::Required, _) => {
                            tracing::warn!(player_id = %to, %event, error = %err, "notification failed");
                            if first_failure.is_none() {
                                first_failure = Some(err);
                            }
                        }
                    }
                }
                Effect::Broadcast(event) => {
                    // The notifier logs each failed recipient itself.
                    self.notifier.broadcast(event);
                }
            }
        }

        match first_failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}
