//! Wire types for the planning-poker event stream.
//!
//! Responsibilities:
//! - the `Vote` value as it travels over the wire
//! - payloads for the per-room events (`join`, `part`, `name`, `vote`,
//!   `revealed`, `ping`) and the lobby-wide `room` snapshot
//! - decoding a named SSE event plus its JSON data into a typed event

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const EVENT_JOIN: &str = "join";
pub const EVENT_PART: &str = "part";
pub const EVENT_NAME: &str = "name";
pub const EVENT_VOTE: &str = "vote";
pub const EVENT_REVEALED: &str = "revealed";
pub const EVENT_PING: &str = "ping";
pub const EVENT_ROOM: &str = "room";

/// The full set of card values a participant can play.
pub const VOTE_VALUES: [f64; 10] = [0.0, 0.5, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 10.0, 11.0];

/// Card meaning "unsure / ?".
pub const VOTE_UNSURE: f64 = 0.0;

/// Card meaning "greater than 10".
pub const VOTE_BEYOND: f64 = 11.0;

/// A single cast vote as carried by the `vote` event and the vote POST.
///
/// `star` is part of the wire shape but carries no value semantics yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub value: f64,
    #[serde(default)]
    pub star: bool,
}

impl Vote {
    pub fn new(value: f64) -> Self {
        Self { value, star: false }
    }

    /// Whether `value` is one of the playable cards.
    pub fn is_valid_value(value: f64) -> bool {
        VOTE_VALUES.contains(&value)
    }

    /// A `0` vote means "unsure" and is excluded from numeric aggregates.
    pub fn is_positive(&self) -> bool {
        self.value > 0.0
    }

    /// Display label for a card value.
    pub fn label(&self) -> String {
        label_for_value(Some(self.value))
    }
}

/// Display label for an optional card value; `None` renders as "-".
pub fn label_for_value(value: Option<f64>) -> String {
    match value {
        None => "-".to_string(),
        Some(v) if v == VOTE_UNSURE => "?".to_string(),
        Some(v) if v == VOTE_BEYOND => ">10".to_string(),
        Some(v) if v == 0.5 => "\u{00bd}".to_string(),
        Some(v) => {
            if v.fract() == 0.0 {
                format!("{}", v as i64)
            } else {
                format!("{v}")
            }
        }
    }
}

/// A typed per-room stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    Join { user: String, name: String },
    Part { user: String },
    Name { user: String, name: String },
    Vote { user: String, vote: Option<Vote> },
    Revealed { revealed: bool },
    /// Liveness probe; the payload must be echoed back on the keepalive
    /// endpoint verbatim.
    Ping { payload: serde_json::Value },
}

#[derive(Debug, Deserialize)]
struct UserNamePayload {
    user: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    user: String,
}

#[derive(Debug, Deserialize)]
struct VotePayload {
    user: String,
    #[serde(default)]
    vote: Option<Vote>,
}

#[derive(Debug, Deserialize)]
struct RevealedPayload {
    revealed: bool,
}

impl RoomEvent {
    /// Decodes a named SSE event and its JSON data.
    pub fn decode(event: &str, data: &str) -> Result<Self, DecodeError> {
        let map_err = |source| DecodeError::Payload {
            event: event.to_string(),
            source,
        };
        match event {
            EVENT_JOIN => {
                let p: UserNamePayload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Join {
                    user: p.user,
                    name: p.name,
                })
            }
            EVENT_PART => {
                let p: UserPayload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Part { user: p.user })
            }
            EVENT_NAME => {
                let p: UserNamePayload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Name {
                    user: p.user,
                    name: p.name,
                })
            }
            EVENT_VOTE => {
                let p: VotePayload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Vote {
                    user: p.user,
                    vote: p.vote,
                })
            }
            EVENT_REVEALED => {
                let p: RevealedPayload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Revealed {
                    revealed: p.revealed,
                })
            }
            EVENT_PING => {
                let payload = serde_json::from_str(data).map_err(map_err)?;
                Ok(RoomEvent::Ping { payload })
            }
            other => Err(DecodeError::UnknownEvent {
                name: other.to_string(),
            }),
        }
    }
}

/// Full snapshot of one room as broadcast on the lobby stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: String,
    pub users: Vec<String>,
}

impl RoomSnapshot {
    /// Decodes a lobby stream event; only `room` events are defined there.
    pub fn decode(event: &str, data: &str) -> Result<Self, DecodeError> {
        if event != EVENT_ROOM {
            return Err(DecodeError::UnknownEvent {
                name: event.to_string(),
            });
        }
        serde_json::from_str(data).map_err(|source| DecodeError::Payload {
            event: event.to_string(),
            source,
        })
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown stream event '{name}'")]
    UnknownEvent { name: String },
    #[error("invalid payload for '{event}' event: {source}")]
    Payload {
        event: String,
        source: serde_json::Error,
    },
}
