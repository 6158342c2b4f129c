//! Notification fan-out: player id → outbound channel.
//!
//! The connection handler registers an unbounded channel when a player
//! connects and drains the receiving end into the socket. Everything
//! above only ever says "deliver this to player U" or "deliver this to
//! everyone"; it never sees a socket.
//!
//! Delivery is synchronous from the caller's point of view: `publish`
//! returns once the notification is queued on the player's channel.
//! Failures are per recipient. One dead channel never stops a broadcast.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use gridmatch_protocol::{EventType, Notification, PlayerId};
use tokio::sync::mpsc;

use crate::SessionError;

/// Channel sender for delivering notifications to one player's connection.
pub type PlayerSender = mpsc::UnboundedSender<Notification>;

/// Pushes [`Notification`]s to connected players.
pub trait Notifier: Send + Sync + 'static {
    /// Registers (or replaces) the delivery channel for `player_id`.
    fn register(&self, player_id: PlayerId, sender: PlayerSender);

    /// Drops the delivery channel. Returns `false` if none was registered.
    fn unregister(&self, player_id: &PlayerId) -> bool;

    /// Delivers one notification to one player.
    ///
    /// # Errors
    /// - [`SessionError::NotRegistered`]: no channel for this player
    /// - [`SessionError::DeliveryFailed`]: the channel is closed
    fn publish(
        &self,
        player_id: &PlayerId,
        event: EventType,
        message: &str,
    ) -> Result<(), SessionError>;

    /// Delivers an event with an empty message to every registered player.
    ///
    /// Returns the recipients that could not be reached; the rest still
    /// got the event.
    fn broadcast(&self, event: EventType) -> Vec<(PlayerId, SessionError)>;

    /// Returns `true` if `player_id` currently has a channel.
    fn is_registered(&self, player_id: &PlayerId) -> bool;
}

/// [`Notifier`] over tokio unbounded mpsc channels.
#[derive(Default)]
pub struct ChannelNotifier {
    channels: Mutex<HashMap<PlayerId, PlayerSender>>,
}

impl ChannelNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PlayerId, PlayerSender>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn registered_count(&self) -> usize {
        self.lock().len()
    }
}

fn deliver(
    player_id: &PlayerId,
    sender: &PlayerSender,
    notification: Notification,
) -> Result<(), SessionError> {
    sender
        .send(notification)
        .map_err(|_| SessionError::DeliveryFailed(player_id.clone()))
}

impl Notifier for ChannelNotifier {
    fn register(&self, player_id: PlayerId, sender: PlayerSender) {
        tracing::debug!(%player_id, "notification channel registered");
        self.lock().insert(player_id, sender);
    }

    fn unregister(&self, player_id: &PlayerId) -> bool {
        let removed = self.lock().remove(player_id).is_some();
        if removed {
            tracing::debug!(%player_id, "notification channel unregistered");
        }
        removed
    }

    fn publish(
        &self,
        player_id: &PlayerId,
        event: EventType,
        message: &str,
    ) -> Result<(), SessionError> {
        // Clone the sender out so the map lock isn't held during delivery.
        let sender = self
            .lock()
            .get(player_id)
            .cloned()
            .ok_or_else(|| SessionError::NotRegistered(player_id.clone()))?;

        deliver(player_id, &sender, Notification::new(event, message))
    }

    fn broadcast(&self, event: EventType) -> Vec<(PlayerId, SessionError)> {
        let recipients: Vec<(PlayerId, PlayerSender)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (id.clone(), tx.clone()))
            .collect();

        let mut failed = Vec::new();
        for (player_id, sender) in &recipients {
            if let Err(e) = deliver(player_id, sender, Notification::new(event, "")) {
                tracing::warn!(%player_id, %event, "broadcast delivery failed");
                failed.push((player_id.clone(), e));
            }
        }

        tracing::debug!(
            %event,
            recipients = recipients.len(),
            failed = failed.len(),
            "broadcast sent"
        );
        failed
    }

    fn is_registered(&self, player_id: &PlayerId) -> bool {
        self.lock().contains_key(player_id)
    }
}
