//! Core records and wire types.
//!
//! Records ([`Player`], [`Match`], [`Turn`]) are the server's state. They
//! are plain values: repositories hand out clones and take whole records
//! back, so every type here is `Clone` and serializable.
//!
//! Wire types ([`Envelope`], [`Payload`], [`Request`], [`Reply`],
//! [`Notification`]) are what a client and the server exchange.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ErrorKind, FieldError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Opaque to clients: the server allocates it on connect and sends it back
/// in a `PlayerIdAssigned` event. `#[serde(transparent)]` keeps it a plain
/// JSON string rather than `{ "0": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for a match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A connected player. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

/// A single cell claim. `x` is the column, `y` the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub player: PlayerId,
    pub x: i32,
    pub y: i32,
}

/// Whether a match is still being played.
///
/// Only two states exist in the data. "Waiting for an opponent" and
/// "in progress" are both `Open`; they differ only in how many players
/// are seated.
///
/// ```text
/// Open ──(win detected)──→ Finished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MatchStatus {
    #[default]
    Open,
    Finished,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "Open"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}

/// One game session between up to two players.
///
/// Invariants (kept by the coordinator, not by this type):
/// - `players` holds 0–2 unique ids; a match with 0 players is deleted.
/// - only a seated player's turns are appended to `moves`.
/// - `status` only ever moves `Open → Finished`.
/// - `winner`, once set, stays set even if that player later leaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub players: Vec<PlayerId>,
    pub moves: Vec<Turn>,
    pub status: MatchStatus,
    pub winner: Option<PlayerId>,
}

impl Match {
    /// A fresh open match with `owner` as the only seated player.
    pub fn new(id: MatchId, owner: PlayerId) -> Self {
        Self {
            id,
            players: vec![owner],
            moves: Vec::new(),
            status: MatchStatus::Open,
            winner: None,
        }
    }

    /// Returns `true` if `player` is seated in this match.
    pub fn has_player(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// The closed set of server-pushed event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum EventType {
    /// Sent once on connect; the message is the new player's id.
    PlayerIdAssigned,
    /// Something about the recipient's own match changed. Clients refetch.
    UserGameChanged,
    /// The recipient's match was torn down because a co-player left.
    UserGameRemoved,
    /// The list of joinable matches changed. Sent to everyone.
    GamesChanged,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PlayerIdAssigned => write!(f, "PlayerIdAssigned"),
            Self::UserGameChanged => write!(f, "UserGameChanged"),
            Self::UserGameRemoved => write!(f, "UserGameRemoved"),
            Self::GamesChanged => write!(f, "GamesChanged"),
        }
    }
}

/// A pushed event: a type tag plus a short human-readable message.
///
/// The message is informational only ("Game was ended", a player id);
/// clients react to `event` and refetch what they need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: EventType,
    pub message: String,
}

impl Notification {
    pub fn new(event: EventType, message: impl Into<String>) -> Self {
        Self {
            event,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and replies
// ---------------------------------------------------------------------------

/// Client → Server: one player-visible operation.
///
/// The acting player is never part of the request; the server knows who
/// is on the other end of the connection.
///
/// `#[serde(tag = "type")]` gives internally tagged JSON:
/// `{ "type": "SendTurn", "match_id": "...", "x": 0, "y": 2 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Open a new match and wait for an opponent.
    StartGame,
    /// Take the free seat in an open match.
    JoinGame { match_id: MatchId },
    /// Claim cell (`x`, `y`).
    SendTurn { match_id: MatchId, x: i32, y: i32 },
    /// Leave a match.
    EndGame { match_id: MatchId },
    /// List joinable matches.
    ListGames,
    /// Fetch the caller's current match.
    MyGame,
    /// Look up a player by id.
    GetPlayer { player_id: PlayerId },
    /// "I'm leaving." Closes the connection.
    Disconnect { reason: String },
}

/// Server → Client: the answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Reply {
    /// The operation succeeded and has nothing to return.
    Ack,
    /// `StartGame` succeeded.
    MatchCreated { match_id: MatchId },
    /// Answer to `ListGames`.
    Matches { matches: Vec<Match> },
    /// Answer to `MyGame` and `SendTurn`. `None` if the player has no match.
    Game { game: Option<Match> },
    /// Answer to `GetPlayer`.
    Player { player: Player },
    /// The operation failed. Nothing was changed unless `kind` is
    /// `Internal`: a notification that couldn't be delivered is reported
    /// after the state change was persisted.
    Error {
        kind: ErrorKind,
        code: u16,
        message: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        fields: Vec<FieldError>,
    },
}

// ---------------------------------------------------------------------------
// Payload and Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged: `{ "type": "Event", "data": { ... } }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    /// Client → Server.
    Request(Request),
    /// Server → Client, answering the request sent with `request_seq`.
    Reply { request_seq: u64, reply: Reply },
    /// Server → Client, unsolicited.
    Event(Notification),
}

/// The top-level message wrapper. Every frame on the wire is an Envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-sender sequence number. Replies echo the request's number in
    /// [`Payload::Reply::request_seq`].
    pub seq: u64,

    /// Milliseconds since the connection was accepted (server side) or
    /// any client clock (client side). Informational.
    #[serde(default)]
    pub timestamp: u64,

    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
