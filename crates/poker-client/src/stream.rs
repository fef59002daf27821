//! Resilient server-push event channel.
//!
//! One [`EventStream`] owns at most one live SSE connection to its endpoint.
//! Dropped connections are re-established forever under the configured
//! backoff policy; consumers observe the raw named events through a
//! broadcast subscription, in transport arrival order, with no
//! de-duplication (replayed events after a reconnect are the consumer's
//! problem, typically absorbed by an idempotent reducer).

use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reqwest_eventsource::{Event, EventSource};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ReconnectConfig;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection lifecycle of an [`EventStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A raw named event as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEvent {
    pub name: String,
    pub data: String,
}

pub struct EventStream {
    url: Url,
    http: reqwest::Client,
    config: ReconnectConfig,
    events: broadcast::Sender<StreamEvent>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    state_rx: watch::Receiver<ConnectionState>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventStream {
    pub fn new(http: reqwest::Client, url: Url, config: ReconnectConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            url,
            http,
            config,
            events,
            state_tx: Arc::new(state_tx),
            state_rx,
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    /// Starts the connection loop. A second call while the loop is running
    /// is a no-op, so at most one connection is ever live per endpoint.
    pub fn connect(&self) {
        let mut task = self.task.lock();
        if let Some(handle) = task.as_ref() {
            if !handle.is_finished() {
                debug!(target: "poker.stream", url = %self.url, "stream already connected");
                return;
            }
        }
        let _ = self.shutdown_tx.send(false);
        *task = Some(tokio::spawn(run(
            self.http.clone(),
            self.url.clone(),
            self.config.clone(),
            self.events.clone(),
            self.state_tx.clone(),
            self.shutdown_tx.subscribe(),
        )));
    }

    /// Subscribes to the raw event feed. Events are delivered in transport
    /// order; a receiver that falls more than the channel capacity behind
    /// observes a lag error instead of reordered events.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Tears the connection down and waits for the loop to stop. After this
    /// returns no further events are delivered, and `connect` may be called
    /// again.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run(
    http: reqwest::Client,
    url: Url,
    config: ReconnectConfig,
    events: broadcast::Sender<StreamEvent>,
    state: Arc<watch::Sender<ConnectionState>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut rng = StdRng::from_entropy();
    let mut attempt = 0u32;

    loop {
        let _ = state.send(ConnectionState::Connecting);
        let mut source = match EventSource::new(http.get(url.clone())) {
            Ok(source) => source,
            Err(err) => {
                // Only reachable with a non-cloneable request body; a plain
                // GET never hits this.
                warn!(target: "poker.stream", url = %url, error = %err, "cannot build event source");
                break;
            }
        };

        loop {
            tokio::select! {
                _ = shutdown_signalled(&mut shutdown) => {
                    source.close();
                    let _ = state.send(ConnectionState::Disconnected);
                    return;
                }
                event = source.next() => match event {
                    Some(Ok(Event::Open)) => {
                        info!(target: "poker.stream", url = %url, "stream connected");
                        attempt = 0;
                        let _ = state.send(ConnectionState::Connected);
                    }
                    Some(Ok(Event::Message(message))) => {
                        let _ = events.send(StreamEvent {
                            name: message.event,
                            data: message.data,
                        });
                    }
                    Some(Err(err)) => {
                        warn!(target: "poker.stream", url = %url, error = %err, "stream error");
                        source.close();
                        break;
                    }
                    None => break,
                }
            }
        }

        let _ = state.send(ConnectionState::Disconnected);
        let delay = config.delay(attempt, &mut rng);
        attempt = attempt.saturating_add(1);
        debug!(
            target: "poker.stream",
            url = %url,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnecting after delay"
        );
        tokio::select! {
            _ = shutdown_signalled(&mut shutdown) => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    let _ = state.send(ConnectionState::Disconnected);
}

/// Completes once shutdown is requested or the owning stream is gone.
async fn shutdown_signalled(rx: &mut watch::Receiver<bool>) {
    if *rx.borrow() {
        return;
    }
    while rx.changed().await.is_ok() {
        if *rx.borrow() {
            return;
        }
    }
}
