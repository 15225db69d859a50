//! Server-Sent Events support

use crate::session::OutboundMessage;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde_json::json;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Transcript first as an `init` event, then every broadcast message
pub fn sse_stream(
    transcript: Vec<OutboundMessage>,
    broadcast_rx: broadcast::Receiver<OutboundMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let init = futures::stream::once(async move { Ok(init_event(&transcript)) });

    let broadcasts = BroadcastStream::new(broadcast_rx).filter_map(|result| match result {
        Ok(message) => Some(Ok(message_event(&message))),
        Err(_) => None, // Skip lagged messages
    });

    Sse::new(init.chain(broadcasts)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

fn init_event(transcript: &[OutboundMessage]) -> Event {
    let data = json!({
        "type": "init",
        "messages": transcript,
    });
    Event::default().event("init").data(data.to_string())
}

fn message_event(message: &OutboundMessage) -> Event {
    let data = json!({
        "type": "message",
        "message": message,
    });
    Event::default().event("message").data(data.to_string())
}
