//! WebSocket adapter for a live exam session.
//!
//! The socket is split into a reader task that parses [`ClientEvent`]s and a
//! writer task that serializes [`OutboundFrame`]s; the session itself only
//! sees the two channels.

use axum::extract::ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mentora_core::ids::SessionId;
use mentora_core::protocol::{ClientEvent, CloseReason, OutboundFrame};
use mentora_core::voice::Voice;
use mentora_engine::{admit, ExamMode, ExamSession, SessionConfig};

use crate::server::AppState;

/// Candidate utterances arrive one at a time; a few may queue while the
/// examiner is replying.
const INBOUND_QUEUE: usize = 16;

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub token: Option<String>,
    pub mode: Option<String>,
    pub speaker: Option<String>,
}

pub async fn session_socket(
    ws: WebSocketUpgrade,
    Path(session_id): Path<String>,
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_socket(socket, state, SessionId::from_raw(session_id), query))
}

async fn run_socket(mut socket: WebSocket, state: AppState, session_id: SessionId, query: SessionQuery) {
    let owned = match admit(
        state.verifier.as_ref(),
        &state.repo,
        query.token.as_deref(),
        &session_id,
    ) {
        Ok(owned) => owned,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, code = e.close_code(), "session refused");
            let _ = socket.send(close_message(&e.close_reason())).await;
            return;
        }
    };

    let settings = &state.settings;
    let mode = ExamMode::from_query(query.mode.as_deref());
    let voice = Voice::select(query.speaker.as_deref(), settings.session.default_voice);
    let config = SessionConfig::from_settings(&settings.session, mode, voice);

    let (conn_id, cancel) = state.live.register(&owned.id, &owned.user_id);
    info!(connection = %conn_id, session_id = %owned.id, "WebSocket session connected");

    let (out_tx, out_rx) = mpsc::channel(settings.server.max_send_queue.max(1));
    let (in_tx, in_rx) = mpsc::channel(INBOUND_QUEUE);
    let session = ExamSession::new(
        owned,
        config,
        state.collaborators.clone(),
        state.clock.clone(),
        out_tx,
    );

    let (ws_tx, ws_rx) = socket.split();
    let writer = tokio::spawn(write_frames(ws_tx, out_rx));
    let reader = tokio::spawn(read_events(ws_rx, in_tx));

    let reason = session.run(in_rx, cancel).await;

    reader.abort();
    let _ = writer.await;
    state.live.unregister(&conn_id);
    info!(connection = %conn_id, ?reason, "WebSocket session disconnected");
}

async fn read_events(mut ws_rx: SplitStream<WebSocket>, events: mpsc::Sender<ClientEvent>) {
    while let Some(Ok(msg)) = ws_rx.next().await {
        match msg {
            Message::Text(text) => match ClientEvent::parse(text.as_str()) {
                Ok(event) => {
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Err(e) => warn!(error = %e, "skipping invalid client event"),
            },
            Message::Close(_) => break,
            Message::Binary(_) => debug!("ignoring binary frame from client"),
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}

async fn write_frames(mut ws_tx: SplitSink<WebSocket, Message>, mut frames: mpsc::Receiver<OutboundFrame>) {
    while let Some(frame) = frames.recv().await {
        let (msg, last) = match frame {
            OutboundFrame::Event(event) => match serde_json::to_string(&event) {
                Ok(json) => (Message::Text(json.into()), false),
                Err(e) => {
                    warn!(error = %e, "failed to serialize server event");
                    continue;
                }
            },
            OutboundFrame::Audio(audio) => (Message::Binary(audio), false),
            OutboundFrame::Close(reason) => (close_message(&reason), true),
        };
        if ws_tx.send(msg).await.is_err() || last {
            break;
        }
    }
}

fn close_message(reason: &CloseReason) -> Message {
    Message::Close(Some(CloseFrame {
        code: reason.code,
        reason: reason.reason.clone().into(),
    }))
}
