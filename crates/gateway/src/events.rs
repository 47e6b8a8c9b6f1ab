//! Run event streams: a WebSocket relay and an SSE feed of the same
//! [`RunEvent`]s the sequencer publishes.

use axum::{
    extract::State,
    extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
    response::IntoResponse,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
};
use kitsmith_core::RunEvent;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

use crate::SharedState;

/// Event name used on both streams (`sequence-completed`, `item-processed`, ...).
pub fn event_name(event: &RunEvent) -> &'static str {
    match event {
        RunEvent::StageStarted { .. } => "stage-started",
        RunEvent::StageFinished { .. } => "stage-finished",
        RunEvent::StateChanged { .. } => "state-changed",
        RunEvent::ItemProcessed { .. } => "item-processed",
        RunEvent::SequenceCompleted { .. } => "sequence-completed",
        RunEvent::SequenceError { .. } => "sequence-error",
    }
}

/// `GET /api/events`: push every run event to the client as a JSON text
/// frame. Client frames are ignored apart from close.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| relay_events(socket, state))
}

async fn relay_events(mut socket: WebSocket, state: SharedState) {
    info!("Event stream connected");
    let mut rx = state.controller.events().subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = match serde_json::to_string(event.as_ref()) {
                        Ok(json) => json,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialise run event");
                            continue;
                        }
                    };
                    if socket.send(WsMessage::Text(json.into())).await.is_err() {
                        break; // client disconnected
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            msg = socket.recv() => match msg {
                Some(Ok(WsMessage::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => debug!("Ignoring client frame on event stream"),
            },
        }
    }

    info!("Event stream disconnected");
}

/// `GET /api/logs`: the same events as server-sent events.
pub async fn sse_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.controller.events().subscribe();
    let stream = BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event_name(&event)).data(data))
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kitsmith_core::{Stage, Status};

    #[test]
    fn event_names_match_serialised_tags() {
        let events = [
            RunEvent::StageStarted {
                stage: Stage::Scan,
                timestamp: Utc::now(),
            },
            RunEvent::ItemProcessed {
                run_id: "r".into(),
                item: "arrow".into(),
                status: Status::Success,
                message: "ok".into(),
                timestamp: Utc::now(),
            },
            RunEvent::SequenceError {
                run_id: "r".into(),
                error: "Run cancelled".into(),
                timestamp: Utc::now(),
            },
        ];
        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event_name(&event));
        }
    }
}
