//! Error types for the protocol layer.
//!
//! Two different things live here:
//!
//! - [`ProtocolError`] is what goes wrong while turning messages into bytes
//!   and back. It never leaves the server.
//! - [`ErrorKind`] and [`FieldError`] describe failures of player-visible
//!   operations. They are part of the wire format because every error reply
//!   carries a kind tag the client can branch on.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, a request type the server doesn't
    /// know, or coordinates that aren't integers.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but breaks a protocol rule, e.g. a
    /// client sending a `Reply` payload.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// The closed set of failure kinds an operation can report.
///
/// Serialized in SCREAMING_SNAKE_CASE (`"BAD_REQUEST"`, `"NOT_FOUND"`, ...)
/// so clients can match on stable strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// The request doesn't make sense in the current state: missing match
    /// on a turn, illegal cell, wrong game phase.
    BadRequest,
    /// A field failed validation (empty name, coordinates off the board).
    Validation,
    /// A referenced player or match doesn't exist.
    NotFound,
    /// Business-rule contention: already in a game, game full, game over.
    Conflict,
    /// Something failed on the server side, e.g. notification delivery.
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code used in wire error replies.
    pub fn status_code(self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::Validation => 422,
            Self::Internal => 500,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadRequest => write!(f, "BAD_REQUEST"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// A validation failure attached to one named input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub name: String,
    pub error: String,
}

impl FieldError {
    pub fn new(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_status_codes() {
        assert_eq!(ErrorKind::BadRequest.status_code(), 400);
        assert_eq!(ErrorKind::NotFound.status_code(), 404);
        assert_eq!(ErrorKind::Conflict.status_code(), 409);
        assert_eq!(ErrorKind::Validation.status_code(), 422);
        assert_eq!(ErrorKind::Internal.status_code(), 500);
    }

    #[test]
    fn test_error_kind_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorKind::BadRequest).unwrap();
        assert_eq!(json, "\"BAD_REQUEST\"");

        let kind: ErrorKind = serde_json::from_str("\"NOT_FOUND\"").unwrap();
        assert_eq!(kind, ErrorKind::NotFound);
    }

    #[test]
    fn test_error_kind_display_matches_wire_name() {
        for kind in [
            ErrorKind::BadRequest,
            ErrorKind::Validation,
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::Internal,
        ] {
            let wire = serde_json::to_string(&kind).unwrap();
            assert_eq!(wire.trim_matches('"'), kind.to_string());
        }
    }
}
