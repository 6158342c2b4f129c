//! The error every coordinator operation reports.

use gridmatch_protocol::{ErrorKind, FieldError, Reply};
use gridmatch_session::SessionError;

use crate::RuleError;

/// A failed operation: a [`ErrorKind`], a human-readable message, and
/// optionally a detail string and per-field validation errors.
///
/// Operations that return this have changed nothing, with one exception:
/// an `Internal` error from notification delivery is reported after the
/// state change was already persisted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MatchError {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub fields: Vec<FieldError>,
}

impl MatchError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            fields: Vec::new(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn validation(message: impl Into<String>, fields: Vec<FieldError>) -> Self {
        Self {
            fields,
            ..Self::new(ErrorKind::Validation, message)
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Attaches a diagnostic for logs. It never reaches the client.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The wire form of this error. Carries the message only; the detail
    /// stays server-side.
    pub fn to_reply(&self) -> Reply {
        Reply::Error {
            kind: self.kind,
            code: self.kind.status_code(),
            message: self.message.clone(),
            fields: self.fields.clone(),
        }
    }
}

impl From<SessionError> for MatchError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::PlayerNotFound(_) => Self::not_found(err.to_string()),
            SessionError::NotRegistered(_) | SessionError::DeliveryFailed(_) => {
                Self::internal("failed to notify player").with_detail(err.to_string())
            }
        }
    }
}

impl From<RuleError> for MatchError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::OutOfBounds { x, y, size } => {
                let mut fields = Vec::new();
                let max = size.saturating_sub(1);
                if !usize::try_from(x).is_ok_and(|x| x < size) {
                    fields.push(FieldError::new("x", format!("must be between 0 and {max}")));
                }
                if !usize::try_from(y).is_ok_and(|y| y < size) {
                    fields.push(FieldError::new("y", format!("must be between 0 and {max}")));
                }
                Self::validation(err.to_string(), fields)
            }
            RuleError::CellOccupied { .. } | RuleError::NotSeated(_) => {
                Self::bad_request(err.to_string())
            }
        }
    }
}
