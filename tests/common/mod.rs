// Local stand-ins for the Hume token endpoint and the EVI chat socket
#![allow(dead_code)]

use anyhow::{bail, Result};
use axum::extract::{Form, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::post;
use axum::Router;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response as WsResponse};
use tokio_tungstenite::tungstenite::Message;

pub const ACCESS_TOKEN: &str = "tok-123";

/// One request received by the token stub
#[derive(Debug, Clone)]
pub struct TokenRequest {
    pub authorization: Option<String>,
    pub form: HashMap<String, String>,
}

type TokenRequests = Arc<Mutex<Vec<TokenRequest>>>;

pub struct TokenStub {
    pub url: String,
    pub requests: TokenRequests,
}

/// Serve `POST /token`, answering with `status` (a token body when 200)
pub async fn spawn_token_stub(status: StatusCode) -> Result<TokenStub> {
    let requests: TokenRequests = Arc::new(Mutex::new(Vec::new()));

    let app = Router::new()
        .route("/token", post(issue_token))
        .with_state((Arc::clone(&requests), status));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(TokenStub {
        url: format!("http://{}/token", addr),
        requests,
    })
}

async fn issue_token(
    State((requests, status)): State<(TokenRequests, StatusCode)>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    requests.lock().push(TokenRequest {
        authorization: headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        form,
    });

    if status != StatusCode::OK {
        return (status, "invalid client").into_response();
    }

    Json(serde_json::json!({
        "access_token": ACCESS_TOKEN,
        "token_type": "Bearer",
        "expires_in": 1800,
    }))
    .into_response()
}

/// What the EVI stub saw from its one client
#[derive(Debug)]
pub struct EviVisit {
    pub uri: String,
    pub first_message: serde_json::Value,
    pub saw_close: bool,
}

pub struct EviStub {
    pub url: String,
    pub visit: JoinHandle<Result<EviVisit>>,
}

/// Accept one chat socket, send `events` after the client's first message,
/// then read until the client goes away
pub async fn spawn_evi_stub(events: Vec<String>) -> Result<EviStub> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    Ok(EviStub {
        url: format!("ws://{}/v0/evi/chat", addr),
        visit: tokio::spawn(serve_one(listener, events)),
    })
}

async fn serve_one(listener: TcpListener, events: Vec<String>) -> Result<EviVisit> {
    let (stream, _) = listener.accept().await?;

    let (uri_tx, uri_rx) = oneshot::channel();
    let callback = move |req: &Request, resp: WsResponse| {
        let _ = uri_tx.send(req.uri().to_string());
        Ok::<_, ErrorResponse>(resp)
    };
    let mut ws = tokio_tungstenite::accept_hdr_async(stream, callback).await?;
    let uri = uri_rx.await?;

    let first_message: serde_json::Value = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => break serde_json::from_str(&text)?,
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => bail!("client went away before sending anything"),
        }
    };

    for event in events {
        ws.send(Message::Text(event)).await?;
    }

    let mut saw_close = false;
    while let Some(frame) = ws.next().await {
        if matches!(frame, Ok(Message::Close(_))) {
            saw_close = true;
        }
    }

    Ok(EviVisit {
        uri,
        first_message,
        saw_close,
    })
}

pub fn chat_metadata(chat_id: &str) -> String {
    format!(
        r#"{{"type":"chat_metadata","chat_id":"{}","chat_group_id":"g1"}}"#,
        chat_id
    )
}
