//! Per-socket pump between a WebSocket and a session worker.

use axum::extract::ws::{Message, WebSocket};
use chat_telemetry::{
    metric_inc, time_histogram, COMMANDS_RECEIVED, CONNECTIONS_OPEN, CONNECTIONS_TOTAL,
    EVENTS_SENT, FRAMES_RECEIVED, FRAME_ENQUEUE_DURATION,
};
use futures::{SinkExt, StreamExt};
use mc_03_command_interpreter::parse_command;
use mc_04_dispatcher::Dispatcher;
use shared_types::{InboundEvent, OutboundEvent};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::container::{ChatContainer, ChatWorker};
use crate::transport::frames::{decode_frame, encode_event};

/// Run one client connection until either side goes away.
///
/// The reader feeds the session worker; the writer drains the outbox. When
/// the dispatcher drops a slow client's outbox the writer ends, which ends
/// the connection too.
pub async fn serve_socket(socket: WebSocket, container: Arc<ChatContainer>, worker: Arc<ChatWorker>) {
    let mut handle = worker.spawn();
    let conn = handle.connection_id();
    let Some(mut outbox) = handle.take_outbox() else {
        return;
    };

    metric_inc!(CONNECTIONS_TOTAL);
    CONNECTIONS_OPEN.inc();
    info!(connection_id = %conn, "WebSocket connected");

    let (mut sink, mut stream) = socket.split();

    let writer = async {
        while let Some(event) = outbox.recv().await {
            let text = match encode_event(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(connection_id = %conn, error = %e, "Dropping unencodable event");
                    continue;
                }
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
            metric_inc!(EVENTS_SENT, &[event.label()]);
        }
        let _ = sink.close().await;
    };

    let reader = async {
        while let Some(message) = stream.next().await {
            let raw = match message {
                Ok(Message::Text(raw)) => raw,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    debug!(connection_id = %conn, error = %e, "WebSocket read failed");
                    break;
                }
            };

            let frame = match decode_frame(&raw) {
                Ok(frame) => frame,
                Err(e) => {
                    metric_inc!(FRAMES_RECEIVED, &["invalid"]);
                    container
                        .dispatcher
                        .reply_to(&conn, OutboundEvent::result(e.to_string()));
                    continue;
                }
            };
            metric_inc!(FRAMES_RECEIVED, &[frame.kind()]);

            let event = InboundEvent::from(frame);
            if let InboundEvent::Message { text } = &event {
                if let Some(command) = parse_command(text.trim()) {
                    metric_inc!(COMMANDS_RECEIVED, &[command.kind.name()]);
                }
            }

            let _timer = time_histogram!(FRAME_ENQUEUE_DURATION);
            if !handle.send(event).await {
                break;
            }
        }
    };

    tokio::select! {
        _ = writer => {}
        _ = reader => {}
    }

    handle.close().await;
    CONNECTIONS_OPEN.dec();
    info!(connection_id = %conn, "WebSocket disconnected");
}
