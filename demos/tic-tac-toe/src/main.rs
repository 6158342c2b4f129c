//! Runs a Gridmatch server for classic 3×3 tic-tac-toe.
//!
//! Environment:
//! - `GRIDMATCH_BIND`: listen address, default `0.0.0.0:8000`
//! - `GRIDMATCH_BOARD_SIZE`: board side length, default 3
//! - `RUST_LOG`: log filter, default `info`

use gridmatch::prelude::*;

const DEFAULT_BIND: &str = "0.0.0.0:8000";

/// Settings read from the environment.
#[derive(Debug, PartialEq, Eq)]
struct Settings {
    bind: String,
    match_config: MatchConfig,
}

impl Settings {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind = lookup("GRIDMATCH_BIND")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());

        let mut match_config = MatchConfig::default();
        if let Some(raw) = lookup("GRIDMATCH_BOARD_SIZE") {
            match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => match_config.board_size = size,
                _ => tracing::warn!(value = %raw, "ignoring invalid GRIDMATCH_BOARD_SIZE"),
            }
        }

        Self { bind, match_config }
    }
}

#[tokio::main]
async fn main() -> Result<(), GridmatchError> {
    gridmatch::init_tracing("info");

    let settings = Settings::from_env();
    tracing::info!(
        bind = %settings.bind,
        board_size = settings.match_config.board_size,
        "starting tic-tac-toe server"
    );

    let server = GridmatchServer::builder()
        .bind(&settings.bind)
        .match_config(settings.match_config)
        .build()
        .await?;

    server.run().await
}
