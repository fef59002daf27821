//! Client-side state synchronization for the planning-poker service.
//!
//! Responsibilities:
//! - keeping one resilient SSE channel open per endpoint, with automatic
//!   reconnect under an explicit backoff policy
//! - reducing the per-room event stream into immutable room snapshots
//! - tracking the local user's optimistic vote until the round resets
//! - mirroring the lobby's room directory and minting unused room codes
//! - issuing the command POSTs (vote, reveal, reset, keepalive, name)
//!
//! The presentation layer renders from the `watch` snapshots published by
//! [`RoomSession`] and [`LobbySession`]; it never mutates state directly.

pub mod commands;
pub mod config;
pub mod error;
pub mod lobby;
pub mod room;
pub mod session;
pub mod stream;
pub mod vote;

pub use commands::ApiClient;
pub use config::ReconnectConfig;
pub use error::{ClientError, ClientResult};
pub use lobby::LobbyState;
pub use room::{Participant, RoomState};
pub use session::{LobbySession, RoomSession};
pub use stream::{ConnectionState, EventStream, StreamEvent};
pub use vote::VoteTracker;
