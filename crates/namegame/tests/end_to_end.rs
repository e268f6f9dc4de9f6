//! End-to-end tests: a resilient connection against a real WebSocket
//! server, speaking both channels.
//!
//! The "server" here is a bare tokio-tungstenite acceptor that encodes and
//! decodes frames with the same `FrameCodec` the client uses.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use namegame::prelude::*;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

// =========================================================================
// Helpers
// =========================================================================

async fn bind(path: &str) -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("should bind");
    let addr = listener.local_addr().unwrap();
    let endpoint = Endpoint::parse(&format!("ws://{addr}{path}")).unwrap();
    (listener, endpoint)
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

/// Reads the next binary frame, skipping control frames.
async fn next_frame(ws: &mut WebSocketStream<TcpStream>) -> Vec<u8> {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Binary(data))) => return data.to_vec(),
            Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_))) => continue,
            other => panic!("expected binary frame, got {other:?}"),
        }
    }
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("should arrive in time")
        .expect("channel should be open")
}

async fn wait_open<M: Message>(conn: &ResilientConnection<M>) {
    let mut state = conn.watch_state();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ConnectionState::Open),
    )
    .await
    .expect("should open in time")
    .expect("connection task should be alive");
}

/// Counts WARN events.
#[derive(Clone, Default)]
struct WarnCount(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCount {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

// =========================================================================
// Game channel
// =========================================================================

#[tokio::test]
async fn test_game_channel_round_trip() {
    let (listener, endpoint) = bind("/ws/player").await;
    let id = Identifier::from_text("6a0d2d4c-1b7e-4c8e-9f3a-2b5c7d9e1f00").unwrap();

    let server = tokio::spawn(async move {
        let codec = FrameCodec::new();
        let mut ws = accept_ws(&listener).await;

        // --- Server pushes state ---
        let state = GameMessage::Names {
            names: names(&["Ann", "Bo"]),
            guessed: vec![true, false],
        };
        ws.send(WsMessage::Binary(codec.encode(&state).unwrap().into()))
            .await
            .unwrap();

        // --- Client submits, server confirms ---
        let frame = next_frame(&mut ws).await;
        let submitted: GameMessage = codec.decode(&frame).unwrap();
        assert_eq!(submitted, GameMessage::SubmitName("Cy".into()));

        let reply = GameMessage::NameSubmitted("Cy".into(), id);
        ws.send(WsMessage::Binary(codec.encode(&reply).unwrap().into()))
            .await
            .unwrap();

        // Hold the socket until the client goes away.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ResilientConnection::<GameMessage>::builder(endpoint)
        .on_message(move |msg| {
            let _ = tx.send(msg);
        })
        .spawn();

    assert_eq!(
        recv(&mut rx).await,
        GameMessage::Names {
            names: names(&["Ann", "Bo"]),
            guessed: vec![true, false],
        }
    );

    wait_open(&conn).await;
    conn.send(&GameMessage::SubmitName("Cy".into())).unwrap();

    assert_eq!(
        recv(&mut rx).await,
        GameMessage::NameSubmitted("Cy".into(), id)
    );

    conn.shutdown().unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should see the client leave")
        .unwrap();
}

#[tokio::test]
async fn test_reconnects_after_server_drops_connection() {
    let (listener, endpoint) = bind("/ws/player").await;

    let server = tokio::spawn(async move {
        let codec = FrameCodec::new();

        // First connection: drop it straight away.
        let mut first = accept_ws(&listener).await;
        first.close(None).await.unwrap();
        drop(first);

        // Second connection: the client came back on its own.
        let mut second = accept_ws(&listener).await;
        second
            .send(WsMessage::Binary(
                codec.encode(&GameMessage::NumNames(2)).unwrap().into(),
            ))
            .await
            .unwrap();
        while let Some(Ok(_)) = second.next().await {}
    });

    let opens = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let conn = ResilientConnection::<GameMessage>::builder(endpoint)
        .on_open({
            let opens = Arc::clone(&opens);
            move || {
                opens.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_close({
            let closes = Arc::clone(&closes);
            move || {
                closes.fetch_add(1, Ordering::SeqCst);
            }
        })
        .on_message(move |msg| {
            let _ = tx.send(msg);
        })
        .spawn();

    assert_eq!(recv(&mut rx).await, GameMessage::NumNames(2));
    assert_eq!(opens.load(Ordering::SeqCst), 2);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
    assert_eq!(conn.attempts(), 0);

    conn.shutdown().unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn test_send_before_open_is_dropped() {
    let (listener, endpoint) = bind("/ws/player").await;

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        // The first frame the server sees is the one sent after open.
        let frame = next_frame(&mut ws).await;
        assert_eq!(frame, vec![0, 0, 0, 12]);
    });

    let conn = ResilientConnection::<GameMessage>::builder(endpoint).spawn();

    let warnings = WarnCount::default();
    let subscriber = tracing_subscriber::registry().with(warnings.clone());
    tracing::subscriber::with_default(subscriber, || {
        assert!(matches!(
            conn.send(&GameMessage::RequestPlayingState),
            Err(ConnectionError::NotOpen)
        ));
    });
    assert_eq!(warnings.0.load(Ordering::SeqCst), 1);

    wait_open(&conn).await;
    conn.send(&GameMessage::RequestSubmittingState).unwrap();

    server.await.unwrap();
}

// =========================================================================
// Submission channel
// =========================================================================

#[tokio::test]
async fn test_submission_channel_uses_explicit_length() {
    let (listener, endpoint) = bind("/ws/display").await;

    let server = tokio::spawn(async move {
        let codec = FrameCodec::new();
        let mut ws = accept_ws(&listener).await;

        let frame = codec.encode(&SubmissionMessage::Submitting).unwrap();
        assert_eq!(frame, vec![0, 0, 0, 0, 0, 0, 0, 0]);
        ws.send(WsMessage::Binary(frame.into())).await.unwrap();

        let frame = codec
            .encode(&SubmissionMessage::Names(names(&["Ann"])))
            .unwrap();
        ws.send(WsMessage::Binary(frame.into())).await.unwrap();

        let frame = next_frame(&mut ws).await;
        let msg: SubmissionMessage = codec.decode(&frame).unwrap();
        assert_eq!(msg, SubmissionMessage::Name("Bo".into()));
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ResilientConnection::<SubmissionMessage>::builder(endpoint)
        .on_message(move |msg| {
            let _ = tx.send(msg);
        })
        .spawn();

    assert_eq!(recv(&mut rx).await, SubmissionMessage::Submitting);
    assert_eq!(
        recv(&mut rx).await,
        SubmissionMessage::Names(names(&["Ann"]))
    );

    wait_open(&conn).await;
    conn.send(&SubmissionMessage::Name("Bo".into())).unwrap();
    server.await.unwrap();
}

// =========================================================================
// Session cache alongside the connection
// =========================================================================

#[tokio::test]
async fn test_submitted_names_survive_within_a_round() {
    let (listener, endpoint) = bind("/ws/player").await;
    let id = Identifier::from_bytes([7; 16]);

    let server = tokio::spawn(async move {
        let codec = FrameCodec::new();
        let mut ws = accept_ws(&listener).await;
        for msg in [
            GameMessage::StateSubmitting(5),
            GameMessage::NameSubmitted("Ann".into(), id),
        ] {
            ws.send(WsMessage::Binary(codec.encode(&msg).unwrap().into()))
                .await
                .unwrap();
        }
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let conn = ResilientConnection::<GameMessage>::builder(endpoint)
        .on_message(move |msg| {
            let _ = tx.send(msg);
        })
        .spawn();

    let mut cache = NameCache::new(MemoryStorage::new());

    let GameMessage::StateSubmitting(epoch) = recv(&mut rx).await else {
        panic!("expected StateSubmitting first");
    };
    let mut mine = cache.get_names(epoch).unwrap();
    assert!(mine.is_empty());

    if let GameMessage::NameSubmitted(name, id) = recv(&mut rx).await {
        mine.push(SubmittedName::new(name, id));
        cache.set_names(epoch, &mine).unwrap();
    }

    assert_eq!(cache.get_names(5).unwrap(), vec![SubmittedName::new("Ann", id)]);
    // Next round: the old submissions are gone.
    assert!(cache.get_names(6).unwrap().is_empty());

    conn.shutdown().unwrap();
    server.await.unwrap();
}
