//! HTTP chat host
//!
//! Serves the browser UI and routes its session-start and message events
//! into `ChatSession`. Outbound messages reach the browser over SSE.

mod assets;
mod handlers;
mod sse;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::config::Config;
use crate::llm::ModelRegistry;
use crate::session::{ChatSession, ChatSink, MessageKind, OutboundMessage, SinkError};
use crate::tools::ToolRegistry;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 64;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionHub>,
    pub chat: ChatSession,
    pub tools: Arc<ToolRegistry>,
    pub models: Arc<ModelRegistry>,
    pub enable_exec_endpoint: bool,
}

impl AppState {
    pub fn new(config: &Config, models: Arc<ModelRegistry>, chat: ChatSession) -> Self {
        Self {
            sessions: Arc::new(SessionHub::default()),
            chat,
            tools: Arc::new(ToolRegistry::standard(&config.python)),
            models,
            enable_exec_endpoint: config.enable_exec_endpoint,
        }
    }
}

/// Outbound channel for one browser session.
///
/// Keeps the replies sent so far so a stream that connects late still sees
/// the welcome banner.
pub struct SessionChannel {
    tx: broadcast::Sender<OutboundMessage>,
    transcript: Mutex<Vec<OutboundMessage>>,
    closed: AtomicBool,
    last_active: Mutex<Instant>,
}

impl SessionChannel {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            transcript: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            last_active: Mutex::new(Instant::now()),
        }
    }

    fn touch(&self) {
        *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    /// No stream attached and nothing sent for at least `ttl`
    fn is_idle(&self, ttl: Duration) -> bool {
        let last_active = *self
            .last_active
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.tx.receiver_count() == 0 && last_active.elapsed() >= ttl
    }

    /// Snapshot the transcript and subscribe to later messages atomically
    pub fn subscribe(&self) -> (Vec<OutboundMessage>, broadcast::Receiver<OutboundMessage>) {
        self.touch();
        let transcript = self
            .transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        (transcript.clone(), self.tx.subscribe())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatSink for SessionChannel {
    async fn send(&self, message: OutboundMessage) -> Result<(), SinkError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SinkError::Closed);
        }
        self.touch();

        let mut transcript = self
            .transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if message.kind == MessageKind::Reply {
            transcript.push(message.clone());
        }
        // No subscribers yet is fine; the transcript covers replies
        let _ = self.tx.send(message);
        Ok(())
    }
}

/// Live browser sessions by ID
#[derive(Default)]
pub struct SessionHub {
    sessions: RwLock<HashMap<String, Arc<SessionChannel>>>,
}

impl SessionHub {
    pub async fn create(&self) -> (String, Arc<SessionChannel>) {
        let id = uuid::Uuid::new_v4().to_string();
        let channel = Arc::new(SessionChannel::new());
        self.sessions
            .write()
            .await
            .insert(id.clone(), channel.clone());
        (id, channel)
    }

    pub async fn get(&self, id: &str) -> Option<Arc<SessionChannel>> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Close and forget a session. In-flight handlers see a closed sink.
    pub async fn remove(&self, id: &str) -> bool {
        match self.sessions.write().await.remove(id) {
            Some(channel) => {
                channel.close();
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close and forget every idle session. Returns how many were dropped.
    pub async fn evict_idle(&self, ttl: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, channel| {
            if channel.is_idle(ttl) {
                channel.close();
                false
            } else {
                true
            }
        });
        before - sessions.len()
    }
}

/// Periodically evict sessions whose browser went away without a DELETE.
pub fn spawn_idle_sweeper(hub: Arc<SessionHub>, ttl: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let evicted = hub.evict_idle(ttl).await;
            if evicted > 0 {
                let remaining = hub.len().await;
                tracing::info!(evicted, remaining, "Evicted idle chat sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_transcript_keeps_replies_only() {
        let channel = SessionChannel::new();
        channel.send(OutboundMessage::reply("welcome")).await.unwrap();

        let (transcript, mut rx) = channel.subscribe();
        assert_eq!(transcript, vec![OutboundMessage::reply("welcome")]);

        channel.send(OutboundMessage::thinking()).await.unwrap();
        channel.send(OutboundMessage::reply("answer")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), OutboundMessage::thinking());
        assert_eq!(rx.recv().await.unwrap(), OutboundMessage::reply("answer"));
        assert_eq!(channel.subscribe().0.len(), 2);
    }

    #[tokio::test]
    async fn test_hub_remove_closes_channel() {
        let hub = SessionHub::default();
        let (id, channel) = hub.create().await;
        assert_eq!(hub.len().await, 1);
        assert!(hub.get(&id).await.is_some());

        assert!(hub.remove(&id).await);
        assert!(!hub.remove(&id).await);
        assert!(hub.get(&id).await.is_none());
        assert!(matches!(
            channel.send(OutboundMessage::reply("late")).await,
            Err(SinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_evict_idle_drops_unwatched_sessions() {
        let hub = SessionHub::default();
        let (abandoned, abandoned_channel) = hub.create().await;
        let (watched, watched_channel) = hub.create().await;
        let (_transcript, _rx) = watched_channel.subscribe();

        assert_eq!(hub.evict_idle(Duration::ZERO).await, 1);
        assert!(hub.get(&abandoned).await.is_none());
        assert!(hub.get(&watched).await.is_some());
        assert!(matches!(
            abandoned_channel.send(OutboundMessage::reply("late")).await,
            Err(SinkError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_evict_idle_keeps_recent_sessions() {
        let hub = SessionHub::default();
        let (id, _channel) = hub.create().await;

        assert_eq!(hub.evict_idle(Duration::from_secs(3600)).await, 0);
        assert!(hub.get(&id).await.is_some());
    }
}
