//! End-to-end tests: a real server on a random port and real WebSocket
//! clients speaking the JSON envelope protocol.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gridmatch::prelude::*;
use tokio_tungstenite::tungstenite::Message;

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const TIMEOUT: Duration = Duration::from_secs(5);

// =========================================================================
// Helpers
// =========================================================================

async fn start_server() -> String {
    let server = GridmatchServer::builder()
        .bind("127.0.0.1:0")
        .build()
        .await
        .expect("server should bind");
    let addr = server.local_addr().unwrap().to_string();
    tokio::spawn(server.run());
    addr
}

/// A test client that keeps unsolicited events aside while it waits for
/// replies.
struct Client {
    ws: ClientWs,
    seq: u64,
    events: VecDeque<Notification>,
}

impl Client {
    async fn connect(addr: &str, name: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws/{name}"))
            .await
            .expect("client should connect");
        Self {
            ws,
            seq: 0,
            events: VecDeque::new(),
        }
    }

    /// Connects and returns the assigned player id.
    async fn join(addr: &str, name: &str) -> (Self, PlayerId) {
        let mut client = Self::connect(addr, name).await;
        let assigned = client.expect_event(EventType::PlayerIdAssigned).await;
        (client, PlayerId::new(assigned.message))
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("send should succeed");
    }

    async fn next_envelope(&mut self) -> Option<Envelope> {
        loop {
            let msg = tokio::time::timeout(TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for server")?;
            match msg {
                Ok(Message::Text(text)) => {
                    return Some(serde_json::from_str(text.as_str()).expect("valid envelope"));
                }
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Sends a request and waits for the reply to it.
    async fn request(&mut self, request: Request) -> Reply {
        self.seq += 1;
        let seq = self.seq;
        let envelope = Envelope {
            seq,
            timestamp: 0,
            payload: Payload::Request(request),
        };
        let text = serde_json::to_string(&envelope).unwrap();
        self.send_raw(&text).await;
        self.reply_to(seq).await
    }

    async fn reply_to(&mut self, seq: u64) -> Reply {
        loop {
            let envelope = self.next_envelope().await.expect("connection open");
            match envelope.payload {
                Payload::Reply { request_seq, reply } if request_seq == seq => return reply,
                Payload::Event(n) => self.events.push_back(n),
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }

    /// Waits for the next event of type `event`, keeping any others.
    async fn expect_event(&mut self, event: EventType) -> Notification {
        if let Some(pos) = self.events.iter().position(|n| n.event == event) {
            return self.events.remove(pos).unwrap();
        }
        loop {
            let envelope = self.next_envelope().await.expect("connection open");
            match envelope.payload {
                Payload::Event(n) if n.event == event => return n,
                Payload::Event(n) => self.events.push_back(n),
                other => panic!("unexpected payload: {other:?}"),
            }
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_connect_assigns_player_id() {
    let addr = start_server().await;

    let (mut alice, id) = Client::join(&addr, "alice").await;

    let reply = alice.request(Request::GetPlayer { player_id: id.clone() }).await;
    assert_eq!(
        reply,
        Reply::Player {
            player: Player {
                id,
                name: "alice".into(),
            },
        }
    );
}

#[tokio::test]
async fn test_empty_name_is_rejected_and_closed() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr, "").await;

    let envelope = client.next_envelope().await.expect("error reply");
    match envelope.payload {
        Payload::Reply {
            reply: Reply::Error { kind, code, fields, .. },
            ..
        } => {
            assert_eq!(kind, ErrorKind::Validation);
            assert_eq!(code, 422);
            assert_eq!(fields, vec![FieldError::new("name", "must not be empty")]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert!(client.next_envelope().await.is_none());
}

#[tokio::test]
async fn test_malformed_frame_gets_error_and_connection_survives() {
    let addr = start_server().await;
    let (mut alice, _) = Client::join(&addr, "alice").await;

    alice.send_raw("{ not json").await;
    let reply = alice.reply_to(0).await;
    assert!(matches!(
        reply,
        Reply::Error {
            kind: ErrorKind::BadRequest,
            code: 400,
            ..
        }
    ));

    let reply = alice.request(Request::ListGames).await;
    assert_eq!(reply, Reply::Matches { matches: vec![] });
}

#[tokio::test]
async fn test_full_game_over_websocket() {
    let addr = start_server().await;
    let (mut alice, alice_id) = Client::join(&addr, "alice").await;
    let (mut bob, bob_id) = Client::join(&addr, "bob").await;

    let Reply::MatchCreated { match_id } = alice.request(Request::StartGame).await else {
        panic!("expected MatchCreated");
    };
    bob.expect_event(EventType::GamesChanged).await;

    let Reply::Matches { matches } = bob.request(Request::ListGames).await else {
        panic!("expected Matches");
    };
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].players, vec![alice_id.clone()]);

    let reply = bob
        .request(Request::JoinGame {
            match_id: match_id.clone(),
        })
        .await;
    assert_eq!(reply, Reply::Ack);
    alice.expect_event(EventType::UserGameChanged).await;

    let turns = [(0, 0, true), (1, 0, false), (0, 1, true), (1, 1, false)];
    for (x, y, alices) in turns {
        let client = if alices { &mut alice } else { &mut bob };
        let reply = client
            .request(Request::SendTurn {
                match_id: match_id.clone(),
                x,
                y,
            })
            .await;
        assert!(matches!(reply, Reply::Game { game: Some(_) }), "{reply:?}");
    }

    let reply = alice
        .request(Request::SendTurn {
            match_id: match_id.clone(),
            x: 0,
            y: 2,
        })
        .await;
    let Reply::Game { game: Some(game) } = reply else {
        panic!("expected the finished game");
    };
    assert_eq!(game.status, MatchStatus::Finished);
    assert_eq!(game.winner, Some(alice_id.clone()));
    assert_eq!(game.players, vec![alice_id, bob_id]);

    let Reply::Game { game: Some(seen) } = bob.request(Request::MyGame).await else {
        panic!("bob should see his game");
    };
    assert_eq!(seen, game);
}

#[tokio::test]
async fn test_occupied_cell_is_bad_request_over_wire() {
    let addr = start_server().await;
    let (mut alice, _) = Client::join(&addr, "alice").await;
    let (mut bob, _) = Client::join(&addr, "bob").await;
    let Reply::MatchCreated { match_id } = alice.request(Request::StartGame).await else {
        panic!("expected MatchCreated");
    };
    bob.request(Request::JoinGame {
        match_id: match_id.clone(),
    })
    .await;
    alice
        .request(Request::SendTurn {
            match_id: match_id.clone(),
            x: 1,
            y: 1,
        })
        .await;

    let reply = bob
        .request(Request::SendTurn {
            match_id,
            x: 1,
            y: 1,
        })
        .await;

    assert!(matches!(
        reply,
        Reply::Error {
            kind: ErrorKind::BadRequest,
            code: 400,
            ..
        }
    ));
}

#[tokio::test]
async fn test_disconnect_tears_down_match_and_notifies_co_player() {
    let addr = start_server().await;
    let (mut alice, _) = Client::join(&addr, "alice").await;
    let (mut bob, _) = Client::join(&addr, "bob").await;
    let Reply::MatchCreated { match_id } = alice.request(Request::StartGame).await else {
        panic!("expected MatchCreated");
    };
    bob.expect_event(EventType::GamesChanged).await;
    bob.request(Request::JoinGame { match_id }).await;
    bob.expect_event(EventType::UserGameChanged).await;

    let reply = alice
        .request(Request::Disconnect {
            reason: "bye".into(),
        })
        .await;
    assert_eq!(reply, Reply::Ack);

    let removed = bob.expect_event(EventType::UserGameRemoved).await;
    assert_eq!(removed.message, "");
    bob.expect_event(EventType::GamesChanged).await;

    let reply = bob.request(Request::MyGame).await;
    assert_eq!(reply, Reply::Game { game: None });
}

#[tokio::test]
async fn test_socket_close_runs_disconnect_cascade() {
    let addr = start_server().await;
    let (mut alice, _) = Client::join(&addr, "alice").await;
    let (mut bob, _) = Client::join(&addr, "bob").await;
    alice.request(Request::StartGame).await;
    bob.expect_event(EventType::GamesChanged).await;

    alice.ws.close(None).await.unwrap();

    bob.expect_event(EventType::GamesChanged).await;
    let reply = bob.request(Request::ListGames).await;
    assert_eq!(reply, Reply::Matches { matches: vec![] });
}
