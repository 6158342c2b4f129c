//! Per-connection handler: naming, request dispatch, notification pump.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Take the display name from the upgrade path (`/ws/<name>`)
//!   2. Connect the player. The coordinator queues `PlayerIdAssigned`
//!   3. Spawn a writer task draining notifications into `Event` envelopes
//!   4. Loop: receive request envelopes, call the coordinator, send replies
//!   5. On close or `Disconnect`, run the disconnect cascade

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use gridmatch_game::{InMemoryCoordinator, MatchError};
use gridmatch_protocol::{Codec, Envelope, Payload, PlayerId, Reply, Request};
use gridmatch_transport::{Connection, WebSocketConnection};
use percent_encoding::percent_decode_str;
use tokio::sync::mpsc;

use crate::GridmatchError;
use crate::server::ServerState;

/// Route prefix that carries the player's display name.
const NAME_ROUTE: &str = "/ws/";

/// Runs the disconnect cascade when the handler exits.
///
/// Fires on every exit path, including an early `?` return or a panic.
/// The coordinator is synchronous, so the cleanup runs inline in `drop`.
struct PlayerGuard<C: Codec> {
    player_id: PlayerId,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for PlayerGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.state.coordinator.disconnect_player(&self.player_id) {
            tracing::warn!(player_id = %self.player_id, error = %e, "disconnect cleanup failed");
        }
    }
}

/// The sending half of a connection: stamps envelopes with a sequence
/// number and a timestamp, encodes them, and writes them out.
///
/// Shared between the request loop and the writer task, so the sequence
/// counter is atomic.
struct Outbound<C: Codec> {
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C>>,
    seq: AtomicU64,
    start: Instant,
}

impl<C: Codec> Outbound<C> {
    async fn send(&self, payload: Payload) -> Result<(), GridmatchError> {
        let envelope = Envelope {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            timestamp: self.start.elapsed().as_millis() as u64,
            payload,
        };
        let bytes = self.state.codec.encode(&envelope)?;
        self.conn.send(&bytes).await?;
        Ok(())
    }

    async fn reply(&self, request_seq: u64, reply: Reply) -> Result<(), GridmatchError> {
        self.send(Payload::Reply { request_seq, reply }).await
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), GridmatchError> {
    let conn_id = conn.id();
    let name = player_name(conn.path()).unwrap_or_default();
    tracing::debug!(%conn_id, %name, "handling new connection");

    let conn = Arc::new(conn);
    let out = Arc::new(Outbound {
        conn: Arc::clone(&conn),
        state: Arc::clone(&state),
        seq: AtomicU64::new(1),
        start: Instant::now(),
    });

    // --- Step 1: Connect ---
    let (tx, mut rx) = mpsc::unbounded_channel();
    let player = match state.coordinator.connect_player(&name, tx) {
        Ok(player) => player,
        Err(e) => {
            tracing::debug!(%conn_id, error = %e, "connect rejected");
            out.reply(0, e.to_reply()).await?;
            conn.close().await?;
            return Ok(());
        }
    };
    let player_id = player.id.clone();
    let guard = PlayerGuard {
        player_id: player_id.clone(),
        state: Arc::clone(&state),
    };

    // --- Step 2: Notification pump ---
    // Ends on its own once the disconnect cascade unregisters the channel.
    let writer = {
        let out = Arc::clone(&out);
        let player_id = player_id.clone();
        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                if let Err(e) = out.send(Payload::Event(notification)).await {
                    tracing::debug!(%player_id, error = %e, "notification write failed");
                    break;
                }
            }
        })
    };

    // --- Step 3: Request loop ---
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%player_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "recv error");
                break;
            }
        };

        let envelope: Envelope = match state.codec.decode(&data) {
            Ok(env) => env,
            Err(e) => {
                tracing::debug!(%player_id, error = %e, "failed to decode envelope");
                out.reply(0, decode_error()).await?;
                continue;
            }
        };

        let request = match envelope.payload {
            Payload::Request(request) => request,
            _ => {
                let err = MatchError::bad_request("expected a Request payload");
                out.reply(envelope.seq, err.to_reply()).await?;
                continue;
            }
        };

        if let Request::Disconnect { reason } = &request {
            tracing::info!(%player_id, %reason, "client disconnected");
            out.reply(envelope.seq, Reply::Ack).await?;
            break;
        }

        let reply = dispatch(&state.coordinator, &player_id, request);
        out.reply(envelope.seq, reply).await?;
    }

    // Runs the cascade now rather than at scope end, so the writer sees
    // its channel close before we wait on it.
    drop(guard);
    if let Err(e) = writer.await {
        tracing::debug!(%player_id, error = %e, "writer task ended abnormally");
    }
    let _ = conn.close().await;
    Ok(())
}

/// Calls the coordinator operation named by `request` on behalf of
/// `player_id` and turns the outcome into a reply.
fn dispatch(coordinator: &InMemoryCoordinator, player_id: &PlayerId, request: Request) -> Reply {
    let result = match request {
        Request::StartGame => coordinator
            .start_game(player_id)
            .map(|match_id| Reply::MatchCreated { match_id }),
        Request::JoinGame { match_id } => coordinator
            .join_game(player_id, &match_id)
            .map(|()| Reply::Ack),
        Request::SendTurn { match_id, x, y } => coordinator
            .send_turn(&match_id, player_id, x, y)
            .map(|game| Reply::Game { game: Some(game) }),
        Request::EndGame { match_id } => coordinator
            .end_game(&match_id, player_id)
            .map(|()| Reply::Ack),
        Request::ListGames => Ok(Reply::Matches {
            matches: coordinator.query_available_games(),
        }),
        Request::MyGame => Ok(Reply::Game {
            game: coordinator.query_user_game(player_id),
        }),
        Request::GetPlayer { player_id: target } => coordinator
            .get_player(&target)
            .map(|player| Reply::Player { player }),
        // Handled by the request loop before dispatch.
        Request::Disconnect { .. } => Ok(Reply::Ack),
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(
            %player_id,
            kind = %e.kind(),
            error = %e,
            detail = e.detail.as_deref().unwrap_or(""),
            "request rejected"
        );
        e.to_reply()
    })
}

/// Extracts the display name from an upgrade path like `/ws/alice`.
///
/// Returns `None` for any other route. The name itself may be empty;
/// rejecting that is the coordinator's call.
fn player_name(path: &str) -> Option<String> {
    let rest = path.strip_prefix(NAME_ROUTE)?;
    let name = rest.trim_end_matches('/');
    if name.contains('/') {
        return None;
    }
    // Malformed escapes are kept verbatim.
    let decoded = percent_decode_str(name).decode_utf8_lossy();
    Some(decoded.into_owned())
}

/// Error reply for a frame that didn't decode.
fn decode_error() -> Reply {
    MatchError::bad_request("malformed message").to_reply()
}
