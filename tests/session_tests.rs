// Chat session tests against a local websocket server standing in for EVI
//
// Capture is disabled, so no audio device is needed.

use anyhow::Result;
use futures::{SinkExt, StreamExt};
use hume_voice_chat::audio::NullSink;
use hume_voice_chat::config::Credentials;
use hume_voice_chat::session::{ChatSession, SessionConfig};
use hume_voice_chat::state::{LogCategory, Role, StateSnapshot};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

fn session_config(addr: SocketAddr) -> SessionConfig {
    SessionConfig {
        credentials: Credentials {
            api_key: "test-key".to_string(),
            secret_key: String::new(),
            config_id: "cfg-1".to_string(),
        },
        evi_url: format!("ws://{}/v0/evi/chat", addr),
        capture_audio: false,
        shutdown_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    }
}

/// Accept one client, reporting the request URI
async fn accept_one(
    listener: TcpListener,
    uri_tx: oneshot::Sender<String>,
) -> Result<WebSocketStream<TcpStream>> {
    let (stream, _) = listener.accept().await?;
    let callback = move |req: &Request, resp: Response| {
        let _ = uri_tx.send(req.uri().to_string());
        Ok::<_, ErrorResponse>(resp)
    };
    Ok(tokio_tungstenite::accept_hdr_async(stream, callback).await?)
}

/// First text frame from the client
async fn first_text(ws: &mut WebSocketStream<TcpStream>) -> Result<serde_json::Value> {
    while let Some(frame) = ws.next().await {
        if let Message::Text(text) = frame? {
            return Ok(serde_json::from_str(&text)?);
        }
    }
    anyhow::bail!("client went away before sending anything")
}

async fn wait_until(session: &ChatSession, mut done: impl FnMut(&StateSnapshot) -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if done(&session.state().snapshot()) {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("timed out, state: {:?}", session.state().snapshot());
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

async fn wait_for_driver_exit(session: &ChatSession) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while session.is_running() {
        if tokio::time::Instant::now() > deadline {
            panic!("driver still running");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn log_texts(snapshot: &StateSnapshot) -> Vec<&str> {
    snapshot.logs.iter().map(|l| l.text.as_str()).collect()
}

#[tokio::test]
async fn test_events_flow_into_state() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (uri_tx, uri_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener, uri_tx).await?;
        let settings = first_text(&mut ws).await?;

        ws.send(Message::Text(
            r#"{"type":"chat_metadata","chat_id":"abc","chat_group_id":"g1"}"#.to_string(),
        ))
        .await?;
        ws.send(Message::Text(
            r#"{"type":"user_message","message":{"role":"user","content":"hello"},
                "models":{"prosody":{"scores":{"joy":0.9,"sad":0.3}}}}"#
                .to_string(),
        ))
        .await?;
        ws.send(Message::Text(
            r#"{"type":"assistant_message","message":{"role":"assistant","content":"hi there"}}"#
                .to_string(),
        ))
        .await?;
        ws.close(None).await?;
        while ws.next().await.is_some() {}

        Ok::<_, anyhow::Error>(settings)
    });

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;

    wait_for_driver_exit(&session).await;

    let settings = server.await??;
    assert_eq!(settings["type"], "session_settings");
    assert_eq!(settings["audio"]["encoding"], "linear16");
    assert_eq!(settings["audio"]["sample_rate"], 16000);

    let uri = uri_rx.await?;
    assert!(uri.starts_with("/v0/evi/chat?"), "uri {}", uri);
    assert!(uri.contains("config_id=cfg-1"));
    assert!(uri.contains("api_key=test-key"));

    let snapshot = session.state().snapshot();
    assert_eq!(snapshot.chat_metadata.as_ref().unwrap().chat_id, "abc");
    assert_eq!(snapshot.messages.len(), 2);
    assert_eq!(snapshot.messages[0].role, Role::User);
    assert_eq!(
        snapshot.messages[0].emotions.as_ref().unwrap().caption(),
        "joy: 0.90 | sad: 0.30"
    );
    assert_eq!(snapshot.messages[1].content, "hi there");
    assert!(!snapshot.connection.connected);
    assert!(snapshot.connection.last_error.is_none());
    assert_eq!(
        log_texts(&snapshot),
        vec![
            "WebSocket connection opened.",
            "Chat ID: abc",
            "WebSocket connection closed.",
        ]
    );

    let stats = session.get_stats();
    assert!(!stats.is_running);
    assert_eq!(stats.events_received, 3);
    assert_eq!(stats.message_count, 2);
    assert_eq!(stats.audio_frames_sent, 0);

    Ok(())
}

#[tokio::test]
async fn test_stop_closes_remote_connection() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (uri_tx, _uri_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener, uri_tx).await?;
        first_text(&mut ws).await?;
        ws.send(Message::Text(
            r#"{"type":"chat_metadata","chat_id":"abc","chat_group_id":"g1"}"#.to_string(),
        ))
        .await?;

        let mut saw_close = false;
        while let Some(frame) = ws.next().await {
            if matches!(frame, Ok(Message::Close(_))) {
                saw_close = true;
            }
        }
        Ok::<_, anyhow::Error>(saw_close)
    });

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;

    wait_until(&session, |s| s.chat_metadata.is_some()).await;
    assert!(session.is_running());
    assert!(session.state().snapshot().connection.connected);

    let stats = session.stop().await?;
    assert!(!stats.is_running);
    assert!(!stats.is_connected);

    let saw_close = tokio::time::timeout(Duration::from_secs(5), server).await???;
    assert!(saw_close, "server never received a close frame");

    let snapshot = session.state().snapshot();
    assert_eq!(snapshot.logs.last().unwrap().text, "WebSocket connection closed.");

    Ok(())
}

#[tokio::test]
async fn test_malformed_frame_does_not_end_session() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (uri_tx, _uri_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener, uri_tx).await?;
        first_text(&mut ws).await?;
        ws.send(Message::Text("not json".to_string())).await?;
        ws.send(Message::Text(
            r#"{"type":"assistant_message","message":{"role":"assistant","content":"still here"}}"#
                .to_string(),
        ))
        .await?;
        ws.close(None).await?;
        while ws.next().await.is_some() {}
        Ok::<_, anyhow::Error>(())
    });

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;
    wait_for_driver_exit(&session).await;
    server.await??;

    let snapshot = session.state().snapshot();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, "still here");

    let error = snapshot.connection.last_error.unwrap();
    assert!(
        error.starts_with("WebSocket error: Failed to decode EVI event"),
        "got {}",
        error
    );
    assert!(snapshot
        .logs
        .iter()
        .any(|l| l.category == LogCategory::Error));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_endpoint_is_recorded() -> Result<()> {
    // Grab a free port, then release it so nothing is listening
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;
    wait_for_driver_exit(&session).await;

    let snapshot = session.state().snapshot();
    let error = snapshot.connection.last_error.unwrap();
    assert!(error.starts_with("Chat loop error"), "got {}", error);
    assert!(!snapshot.connection.connected);
    assert!(snapshot.messages.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_stopped_session_cannot_restart() -> Result<()> {
    let session = ChatSession::new(SessionConfig::default(), Arc::new(NullSink::new()));

    let stats = session.stop().await?;
    assert!(!stats.is_running);
    assert!(session.start().await.is_err());
    assert!(!session.is_running());

    Ok(())
}

#[tokio::test]
async fn test_session_cannot_restart_after_driver_exits() -> Result<()> {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?
    };

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;
    wait_for_driver_exit(&session).await;

    // no driver is subscribed to the stop signal any more
    session.stop().await?;

    assert!(session.start().await.is_err());
    assert!(!session.is_running());

    Ok(())
}

#[tokio::test]
async fn test_concurrent_stops_both_wait_for_driver() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let (uri_tx, _uri_rx) = oneshot::channel();

    let server = tokio::spawn(async move {
        let mut ws = accept_one(listener, uri_tx).await?;
        first_text(&mut ws).await?;
        ws.send(Message::Text(
            r#"{"type":"chat_metadata","chat_id":"abc","chat_group_id":"g1"}"#.to_string(),
        ))
        .await?;
        while ws.next().await.is_some() {}
        Ok::<_, anyhow::Error>(())
    });

    let session = ChatSession::new(session_config(addr), Arc::new(NullSink::new()));
    session.start().await?;
    wait_until(&session, |s| s.chat_metadata.is_some()).await;

    let (first, second) = tokio::join!(session.stop(), session.stop());
    let (first, second) = (first?, second?);

    assert!(!first.is_running);
    assert!(!second.is_running);
    assert!(!second.is_connected);

    tokio::time::timeout(Duration::from_secs(5), server).await???;

    Ok(())
}

#[test]
fn test_session_ids_are_unique() {
    let a = SessionConfig::default();
    let b = SessionConfig::default();
    assert!(a.session_id.starts_with("chat-"));
    assert_ne!(a.session_id, b.session_id);
}
