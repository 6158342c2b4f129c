//! Match lifecycle for Gridmatch.
//!
//! Everything with real invariants lives here:
//!
//! - [`RuleEngine`]: pure rules: joinability, turn legality, win lines
//! - [`MatchStore`]: the concurrent collection of [`Match`](gridmatch_protocol::Match) records
//! - [`MatchCoordinator`]: one method per player-visible operation,
//!   orchestrating the store, the player directory, and the notifier
//! - [`MatchError`]: the closed error taxonomy every operation reports
//! - [`MatchConfig`]: board settings
//!
//! The coordinator never edits a stored match in place. It takes a copy
//! from the store, derives the next value through the rule engine, writes
//! the whole record back, and only then notifies players.

mod config;
mod coordinator;
mod error;
mod rules;
mod store;

pub use config::MatchConfig;
pub use coordinator::{InMemoryCoordinator, MatchCoordinator};
pub use error::MatchError;
pub use rules::{RuleEngine, RuleError, WinCheck};
pub use store::{InMemoryMatchStore, MatchStore};
