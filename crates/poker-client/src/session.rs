//! Live sessions: one consumer task per stream, reconciling events into
//! snapshots that concurrent readers observe through `watch` channels.
//!
//! Handlers run to completion on the single consumer task, so applying an
//! event is atomic and no locking guards the room state. Nothing in an
//! event-handling path is allowed to escape as a panic; malformed traffic
//! is logged and skipped, preserving the last good snapshot.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::warn;
use url::Url;

use poker_wire::{RoomEvent, RoomSnapshot, Vote};

use crate::commands::{ApiClient, RoomApi};
use crate::config::ReconnectConfig;
use crate::error::ClientResult;
use crate::lobby::LobbyState;
use crate::room::RoomState;
use crate::stream::{ConnectionState, EventStream, StreamEvent};
use crate::vote::VoteTracker;

/// A joined room: reconciled shared state plus the local optimistic vote.
pub struct RoomSession {
    api: RoomApi,
    stream: Arc<EventStream>,
    state_rx: watch::Receiver<RoomState>,
    my_vote: Arc<watch::Sender<VoteTracker>>,
    my_vote_rx: watch::Receiver<VoteTracker>,
    task: JoinHandle<()>,
}

impl RoomSession {
    /// Opens the room's event stream (which also joins the room on the
    /// server side) and starts reconciling it into snapshots.
    ///
    /// The `http` client must carry a cookie store: the session cookie is
    /// what ties the stream and the commands to the same user.
    pub fn join(
        http: reqwest::Client,
        base: Url,
        room_id: &str,
        config: ReconnectConfig,
    ) -> ClientResult<Self> {
        let api = ApiClient::new(http.clone(), base).room(room_id);
        let stream = Arc::new(EventStream::new(http, api.stream_url()?, config));
        stream.connect();

        let (state_tx, state_rx) = watch::channel(RoomState::default());
        let (my_vote_tx, my_vote_rx) = watch::channel(VoteTracker::new());
        let my_vote = Arc::new(my_vote_tx);
        let task = tokio::spawn(run_room(
            stream.subscribe(),
            state_tx,
            my_vote.clone(),
            api.clone(),
        ));

        Ok(Self {
            api,
            stream,
            state_rx,
            my_vote,
            my_vote_rx,
            task,
        })
    }

    pub fn room_id(&self) -> &str {
        self.api.room_id()
    }

    /// Snapshots of the reconciled room state.
    pub fn state(&self) -> watch::Receiver<RoomState> {
        self.state_rx.clone()
    }

    /// The local user's pending vote choice.
    pub fn my_vote(&self) -> watch::Receiver<VoteTracker> {
        self.my_vote_rx.clone()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.stream.watch_state()
    }

    /// Records the choice locally before the command round-trip. A failed
    /// POST leaves the optimistic choice in place; only a later stream
    /// event can correct it.
    pub async fn cast_vote(&self, value: f64) -> ClientResult<()> {
        let vote = Vote::new(value);
        self.my_vote.send_modify(|tracker| tracker.cast(vote));
        self.api.cast_vote(&vote).await
    }

    pub async fn reveal(&self) -> ClientResult<()> {
        self.api.reveal().await
    }

    pub async fn reset(&self) -> ClientResult<()> {
        self.api.reset().await
    }

    /// Stops the stream and the reconcile task. Once this returns, no
    /// further snapshot is published.
    pub async fn close(self) {
        let Self { stream, task, .. } = self;
        stream.close().await;
        // Dropping our handle releases the event sender so the task drains
        // whatever already arrived and exits.
        drop(stream);
        let _ = task.await;
    }
}

async fn run_room(
    mut events: broadcast::Receiver<StreamEvent>,
    state_tx: watch::Sender<RoomState>,
    my_vote: Arc<watch::Sender<VoteTracker>>,
    api: RoomApi,
) {
    let mut state = RoomState::default();
    loop {
        let raw = match events.recv().await {
            Ok(raw) => raw,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(
                    target: "poker.session",
                    room = api.room_id(),
                    skipped,
                    "event feed lagged; waiting for fresher events"
                );
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        let event = match RoomEvent::decode(&raw.name, &raw.data) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    target: "poker.session",
                    room = api.room_id(),
                    error = %err,
                    "ignoring undecodable stream event"
                );
                continue;
            }
        };

        match &event {
            RoomEvent::Ping { payload } => {
                // Liveness probe: acknowledge so the server keeps our seat.
                let api = api.clone();
                let payload = payload.clone();
                tokio::spawn(async move {
                    if let Err(err) = api.keepalive(&payload).await {
                        warn!(
                            target: "poker.session",
                            room = api.room_id(),
                            error = %err,
                            "keepalive ack failed"
                        );
                    }
                });
                continue;
            }
            RoomEvent::Revealed { revealed } => {
                // Cross-component effect: a round reset clears our pending
                // choice regardless of any in-flight vote command.
                my_vote.send_modify(|tracker| tracker.observe_revealed(*revealed));
            }
            _ => {}
        }

        state = state.apply(&event);
        let _ = state_tx.send(state.clone());
    }
}

/// The room directory, reconciled from the lobby-wide stream.
pub struct LobbySession {
    stream: Arc<EventStream>,
    state_rx: watch::Receiver<LobbyState>,
    task: JoinHandle<()>,
}

impl LobbySession {
    pub fn connect(http: reqwest::Client, base: Url, config: ReconnectConfig) -> ClientResult<Self> {
        let api = ApiClient::new(http.clone(), base);
        let stream = Arc::new(EventStream::new(http, api.lobby_stream_url()?, config));
        stream.connect();

        let (state_tx, state_rx) = watch::channel(LobbyState::default());
        let task = tokio::spawn(run_lobby(stream.subscribe(), state_tx));

        Ok(Self {
            stream,
            state_rx,
            task,
        })
    }

    pub fn state(&self) -> watch::Receiver<LobbyState> {
        self.state_rx.clone()
    }

    pub fn connection(&self) -> watch::Receiver<ConnectionState> {
        self.stream.watch_state()
    }

    /// A room code guaranteed to miss the directory as of this snapshot.
    pub fn suggest_room_id(&self) -> String {
        self.state_rx
            .borrow()
            .generate_unused_id(&mut rand::thread_rng())
    }

    pub async fn close(self) {
        let Self { stream, task, .. } = self;
        stream.close().await;
        drop(stream);
        let _ = task.await;
    }
}

async fn run_lobby(
    mut events: broadcast::Receiver<StreamEvent>,
    state_tx: watch::Sender<LobbyState>,
) {
    let mut state = LobbyState::default();
    loop {
        let raw = match events.recv().await {
            Ok(raw) => raw,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(target: "poker.session", skipped, "lobby feed lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => break,
        };

        match RoomSnapshot::decode(&raw.name, &raw.data) {
            Ok(snapshot) => {
                state = state.apply(&snapshot);
                let _ = state_tx.send(state.clone());
            }
            Err(err) => {
                warn!(
                    target: "poker.session",
                    error = %err,
                    "ignoring undecodable lobby event"
                );
            }
        }
    }
}
