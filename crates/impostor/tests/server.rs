//! Integration tests for the server, handler, and full connection flow.
//!
//! Clients here speak raw JSON over a real WebSocket, like a browser would.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use impostor::prelude::*;
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::Message;

// =========================================================================
// Test verifier
// =========================================================================

/// Accepts "email|name" credentials.
struct PipeVerifier;

impl IdentityVerifier for PipeVerifier {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, SessionError> {
        let (email, name) = credential
            .split_once('|')
            .ok_or_else(|| SessionError::VerificationFailed("expected email|name".into()))?;
        Ok(VerifiedIdentity::new(email, name))
    }
}

// =========================================================================
// Helpers
// =========================================================================

type ClientWs =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

const WAIT: Duration = Duration::from_secs(2);

/// Starts a server on a random port and returns the address.
async fn start_server() -> String {
    start_server_with(RoomConfig::default(), NoVerifier).await
}

async fn start_server_with<V: IdentityVerifier>(config: RoomConfig, verifier: V) -> String {
    let server = ImpostorServer::builder()
        .bind("127.0.0.1:0")
        .room_config(config)
        .build(verifier)
        .await
        .expect("server should build");

    let addr = server
        .local_addr()
        .expect("should have local addr")
        .to_string();

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    addr
}

/// A browser-like client: sends intents with increasing refs and keeps
/// notifications that arrive while it waits for an ack.
struct Client {
    ws: ClientWs,
    next_ref: u64,
    events: VecDeque<Value>,
}

impl Client {
    async fn connect(addr: &str) -> Self {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .expect("should connect");
        Self {
            ws,
            next_ref: 1,
            events: VecDeque::new(),
        }
    }

    async fn send_raw(&mut self, text: &str) {
        self.ws
            .send(Message::text(text.to_string()))
            .await
            .expect("send");
    }

    async fn read_frame(&mut self) -> Value {
        let msg = tokio::time::timeout(WAIT, self.ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("read failed");
        serde_json::from_slice(&msg.into_data()).expect("server sent invalid JSON")
    }

    /// Sends an intent and returns its ack.
    async fn request(&mut self, intent: Value) -> Value {
        let reference = self.next_ref;
        self.next_ref += 1;
        let frame = json!({ "ref": reference, "intent": intent });
        self.send_raw(&frame.to_string()).await;
        self.ack_for(Some(reference)).await
    }

    async fn ack_for(&mut self, reference: Option<u64>) -> Value {
        loop {
            let frame = self.read_frame().await;
            if frame.get("ok").is_some() {
                assert_eq!(frame.get("ref").and_then(Value::as_u64), reference);
                return frame;
            }
            self.events.push_back(frame);
        }
    }

    /// Waits for the next notification called `event` and returns its data.
    /// Earlier notifications of other kinds are discarded.
    async fn event(&mut self, event: &str) -> Value {
        while let Some(frame) = self.events.pop_front() {
            if frame["event"] == event {
                return frame["data"].clone();
            }
        }
        loop {
            let frame = self.read_frame().await;
            if frame["event"] == event {
                return frame["data"].clone();
            }
        }
    }

    async fn create(&mut self, host_name: &str, word: &str) -> String {
        let ack = self
            .request(json!({ "type": "create_room", "hostName": host_name, "word": word }))
            .await;
        assert_eq!(ack["ok"], true, "create failed: {ack}");
        assert_eq!(ack["isHost"], true);
        ack["code"].as_str().expect("code").to_string()
    }

    async fn join(&mut self, code: &str, name: &str) -> String {
        let ack = self
            .request(json!({ "type": "join_room", "code": code, "name": name }))
            .await;
        assert_eq!(ack["ok"], true, "join failed: {ack}");
        assert_eq!(ack["isHost"], false);
        ack["token"].as_str().expect("token").to_string()
    }
}

fn assert_rejected(ack: &Value, kind: &str) {
    assert_eq!(ack["ok"], false, "expected rejection: {ack}");
    assert_eq!(ack["errorKind"], kind, "{ack}");
    assert!(ack["error"].as_str().is_some_and(|e| !e.is_empty()));
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_create_room_returns_code_and_greets_host() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;

    let code = host.create("Ms. Rivera", "banana").await;
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

    let update = host.event("room_update").await;
    assert_eq!(update["code"], code.as_str());
    assert_eq!(update["hostName"], "Ms. Rivera");
    assert_eq!(update["phase"], "lobby");
    assert_eq!(update["started"], false);
    assert_eq!(update["playerCount"], 0);
}

#[tokio::test]
async fn test_create_room_requires_word() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;

    let ack = host
        .request(json!({ "type": "create_room", "hostName": "Host", "word": "   " }))
        .await;
    assert_rejected(&ack, "validation");
}

#[tokio::test]
async fn test_malformed_frames_get_validation_acks() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    client
        .send_raw(r#"{"ref":7,"intent":{"type":"dance"}}"#)
        .await;
    let ack = client.ack_for(Some(7)).await;
    assert_rejected(&ack, "validation");

    client.send_raw("not json at all").await;
    let ack = client.ack_for(None).await;
    assert_rejected(&ack, "validation");

    // The connection survives bad input.
    let ack = client
        .request(json!({ "type": "leave_room", "code": "ABCDEF" }))
        .await;
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_join_unknown_room_is_not_found() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let ack = client
        .request(json!({ "type": "join_room", "code": "zzzzzz", "name": "Ana" }))
        .await;
    assert_rejected(&ack, "not_found");
}

#[tokio::test]
async fn test_banana_round_end_to_end() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let mut players = Vec::new();
    let mut tokens = Vec::new();
    for name in ["Ana", "Ben", "Cleo"] {
        let mut p = Client::connect(&addr).await;
        // Lowercase codes are accepted.
        tokens.push(p.join(&code.to_lowercase(), name).await);
        players.push(p);
    }

    let ack = host.request(json!({ "type": "start_game", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");
    let started = host.event("host_started").await;
    assert_eq!(started["playerCount"], 3);

    let mut impostor = None;
    for (i, p) in players.iter_mut().enumerate() {
        let reveal = p.event("reveal").await;
        match reveal["shown"].as_str() {
            Some("IMPOSTOR") => {
                assert_eq!(reveal["role"], "impostor");
                assert!(impostor.replace(i).is_none(), "two impostors");
            }
            Some("banana") => assert_eq!(reveal["role"], "crew"),
            other => panic!("unexpected reveal {other:?}"),
        }
    }
    let impostor = impostor.expect("nobody was dealt the impostor");
    let crew: Vec<usize> = (0..3).filter(|i| *i != impostor).collect();

    let ack = host.request(json!({ "type": "open_vote", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");
    let opened = players[0].event("vote_open").await;
    assert_eq!(opened["totalVotes"], 0);

    for voter in &crew {
        let ack = players[*voter]
            .request(json!({
                "type": "cast_vote",
                "code": code,
                "targetToken": tokens[impostor],
            }))
            .await;
        assert_eq!(ack["ok"], true, "{ack}");
    }

    let ack = host.request(json!({ "type": "close_vote", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");

    let result = players[crew[0]].event("vote_closed").await;
    assert_eq!(result["caught"], true);
    assert_eq!(result["maxVotes"], 2);
    assert_eq!(result["impostorToken"], tokens[impostor].as_str());
    assert_eq!(result["topTokens"], json!([tokens[impostor]]));

    let leaderboard = result["leaderboard"].as_array().expect("leaderboard");
    assert_eq!(leaderboard.len(), 3);
    assert_eq!(leaderboard[0]["accuserWins"], 1);
    assert_eq!(leaderboard[1]["accuserWins"], 1);
    assert_eq!(leaderboard[2]["totalWins"], 0);

    let host_view = host.event("vote_closed").await;
    assert_eq!(host_view["caught"], true);
}

#[tokio::test]
async fn test_banana_round_impostor_escapes_end_to_end() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let seats = [
        ("Ana", "ana@school.edu"),
        ("Ben", "ben@school.edu"),
        ("Cleo", "cleo@school.edu"),
        ("Dev", "dev@school.edu"),
    ];
    let mut players = Vec::new();
    let mut tokens = Vec::new();
    for (name, identity) in seats {
        let mut p = Client::connect(&addr).await;
        let ack = p
            .request(json!({
                "type": "join_room",
                "code": code,
                "name": name,
                "identity": identity,
            }))
            .await;
        assert_eq!(ack["ok"], true, "{ack}");
        tokens.push(ack["token"].as_str().expect("token").to_string());
        players.push(p);
    }

    let ack = host.request(json!({ "type": "start_game", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");

    let mut impostor = None;
    let mut banana = 0;
    for (i, p) in players.iter_mut().enumerate() {
        match p.event("reveal").await["shown"].as_str() {
            Some("IMPOSTOR") => assert!(impostor.replace(i).is_none(), "two impostors"),
            Some("banana") => banana += 1,
            other => panic!("unexpected reveal {other:?}"),
        }
    }
    assert_eq!(banana, 3);
    let impostor = impostor.expect("nobody was dealt the impostor");
    let crew: Vec<usize> = (0..4).filter(|i| *i != impostor).collect();
    let (x, y) = (crew[0], crew[1]);

    let ack = host.request(json!({ "type": "open_vote", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");

    // Everyone accuses crewmate X; X can't self-vote and picks Y.
    for voter in 0..4 {
        let target = if voter == x { y } else { x };
        let ack = players[voter]
            .request(json!({ "type": "cast_vote", "code": code, "targetToken": tokens[target] }))
            .await;
        assert_eq!(ack["ok"], true, "{ack}");
    }

    let ack = host.request(json!({ "type": "close_vote", "code": code })).await;
    assert_eq!(ack["ok"], true, "{ack}");

    let result = host.event("vote_closed").await;
    assert_eq!(result["caught"], false);
    assert_eq!(result["maxVotes"], 3);
    assert_eq!(result["topTokens"], json!([tokens[x]]));
    assert_eq!(result["impostorName"], seats[impostor].0);

    let leaderboard = result["leaderboard"].as_array().expect("leaderboard");
    assert_eq!(leaderboard.len(), 4);
    assert_eq!(leaderboard[0]["name"], seats[impostor].0);
    assert_eq!(leaderboard[0]["impostorWins"], 1);
    assert_eq!(leaderboard[0]["totalWins"], 1);
    assert!(leaderboard[1..].iter().all(|row| row["totalWins"] == 0));
}

#[tokio::test]
async fn test_join_identity_is_unique_without_provider() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let mut first = Client::connect(&addr).await;
    let ack = first
        .request(json!({ "type": "join_room", "code": code, "name": "Ana", "identity": "ana@school.edu" }))
        .await;
    assert_eq!(ack["ok"], true, "{ack}");

    let mut second = Client::connect(&addr).await;
    let ack = second
        .request(json!({ "type": "join_room", "code": code, "name": "Anna", "identity": "ANA@school.edu" }))
        .await;
    assert_rejected(&ack, "conflict");
}

#[tokio::test]
async fn test_player_cannot_start_game() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;
    let mut ana = Client::connect(&addr).await;
    ana.join(&code, "Ana").await;

    let ack = ana.request(json!({ "type": "start_game", "code": code })).await;
    assert_rejected(&ack, "authorization");
}

#[tokio::test]
async fn test_start_with_too_few_players_is_precondition() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let ack = host.request(json!({ "type": "start_game", "code": code })).await;
    assert_rejected(&ack, "precondition");
}

#[tokio::test]
async fn test_host_disconnect_closes_room() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;
    let mut ana = Client::connect(&addr).await;
    ana.join(&code, "Ana").await;

    host.ws.close(None).await.expect("close");

    let closed = ana.event("room_closed").await;
    assert_eq!(closed["code"], code.as_str());
    assert_eq!(closed["reason"], "host_left");

    let mut late = Client::connect(&addr).await;
    let ack = late
        .request(json!({ "type": "join_room", "code": code, "name": "Late" }))
        .await;
    assert_rejected(&ack, "not_found");
}

#[tokio::test]
async fn test_player_disconnect_updates_room() {
    let addr = start_server().await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;
    let mut ana = Client::connect(&addr).await;
    ana.join(&code, "Ana").await;

    loop {
        let update = host.event("room_update").await;
        if update["playerCount"] == 1 {
            break;
        }
    }

    ana.ws.close(None).await.expect("close");
    loop {
        let update = host.event("room_update").await;
        if update["playerCount"] == 0 {
            break;
        }
    }
}

#[tokio::test]
async fn test_leave_room_always_acks_ok() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let ack = client
        .request(json!({ "type": "leave_room", "code": "NOPE42" }))
        .await;
    assert_eq!(ack["ok"], true);
    let ack = client.request(json!({ "type": "leave_room" })).await;
    assert_eq!(ack["ok"], true);
}

#[tokio::test]
async fn test_verify_identity_without_provider() {
    let addr = start_server().await;
    let mut client = Client::connect(&addr).await;

    let ack = client
        .request(json!({ "type": "verify_identity", "credential": "ana@school.edu|Ana" }))
        .await;
    assert_rejected(&ack, "external_verification");
}

#[tokio::test]
async fn test_verified_identity_is_unique_per_room() {
    let addr = start_server_with(RoomConfig::default(), PipeVerifier).await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let mut first = Client::connect(&addr).await;
    let ack = first
        .request(json!({ "type": "verify_identity", "credential": "ana@school.edu|Ana R." }))
        .await;
    assert_eq!(ack["ok"], true, "{ack}");
    assert_eq!(ack["email"], "ana@school.edu");
    assert_eq!(ack["name"], "Ana R.");
    first.join(&code, "Ana").await;

    // Same email under a different display name, verified at join time.
    let mut second = Client::connect(&addr).await;
    let ack = second
        .request(json!({
            "type": "join_room",
            "code": code,
            "name": "Someone Else",
            "credential": "ANA@school.edu|Ana",
        }))
        .await;
    assert_rejected(&ack, "conflict");

    let ack = second
        .request(json!({ "type": "verify_identity", "credential": "no-separator" }))
        .await;
    assert_rejected(&ack, "external_verification");
}

#[tokio::test]
async fn test_idle_room_is_reaped() {
    let config = RoomConfig {
        idle_ttl: Duration::ZERO,
        sweep_interval: Duration::from_millis(20),
        ..RoomConfig::default()
    };
    let addr = start_server_with(config, NoVerifier).await;
    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;

    let closed = host.event("room_closed").await;
    assert_eq!(closed["code"], code.as_str());
    assert_eq!(closed["reason"], "idle");
}

#[tokio::test]
async fn test_shutdown_closes_every_room() {
    let server = ImpostorServer::builder()
        .bind("127.0.0.1:0")
        .build(NoVerifier)
        .await
        .expect("server should build");
    let addr = server.local_addr().expect("should have local addr").to_string();
    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let running = tokio::spawn(server.run_until(async move {
        let _ = stopped.await;
    }));

    let mut host = Client::connect(&addr).await;
    let code = host.create("Rivera", "banana").await;
    let mut ana = Client::connect(&addr).await;
    ana.join(&code, "Ana").await;

    stop.send(()).expect("server should be running");

    for client in [&mut host, &mut ana] {
        let closed = client.event("room_closed").await;
        assert_eq!(closed["code"], code.as_str());
        assert_eq!(closed["reason"], "shutdown");
    }
    let result = tokio::time::timeout(WAIT, running)
        .await
        .expect("server should stop")
        .expect("server task panicked");
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_build_rejects_unplayable_room_config() {
    let result = ImpostorServer::builder()
        .bind("127.0.0.1:0")
        .room_config(RoomConfig {
            min_players: 0,
            ..RoomConfig::default()
        })
        .build(NoVerifier)
        .await;
    let err = match result {
        Ok(_) => panic!("a zero-player room config should be refused"),
        Err(e) => e,
    };
    assert!(matches!(err, ImpostorError::Config(_)));
    assert!(err.to_string().contains("min_players"));
}
