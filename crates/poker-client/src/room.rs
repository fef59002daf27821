//! Canonical shared view of one room.
//!
//! `RoomState` is an immutable value: applying an event produces a new
//! snapshot and never touches the old one, so concurrent readers can keep
//! rendering from whatever they last cloned out of the `watch` channel.

use std::collections::HashMap;

use poker_wire::{RoomEvent, Vote};
use tracing::{debug, warn};

/// A participant as seen by everyone in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct Participant {
    pub name: String,
    pub current_vote: Option<Vote>,
    /// Join order, used to break display-name ties stably.
    seat: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomState {
    revealed: bool,
    participants: HashMap<String, Participant>,
    next_seat: u64,
}

impl RoomState {
    /// Pure transition function: returns the room after `event`.
    ///
    /// Events referencing a participant that never joined are dropped with a
    /// log line rather than invented or crashed on.
    pub fn apply(&self, event: &RoomEvent) -> RoomState {
        let mut next = self.clone();
        match event {
            RoomEvent::Join { user, name } => {
                let seat = match next.participants.get(user) {
                    Some(existing) => existing.seat,
                    None => {
                        let seat = next.next_seat;
                        next.next_seat += 1;
                        seat
                    }
                };
                next.participants.insert(
                    user.clone(),
                    Participant {
                        name: name.clone(),
                        current_vote: None,
                        seat,
                    },
                );
            }
            RoomEvent::Part { user } => {
                if next.participants.remove(user).is_none() {
                    debug!(target: "poker.room", user = %user, "part for absent participant");
                }
            }
            RoomEvent::Name { user, name } => match next.participants.get_mut(user) {
                Some(participant) => participant.name = name.clone(),
                None => {
                    warn!(target: "poker.room", user = %user, "dropping name event for unknown participant");
                }
            },
            RoomEvent::Vote { user, vote } => match next.participants.get_mut(user) {
                Some(participant) => participant.current_vote = *vote,
                None => {
                    warn!(target: "poker.room", user = %user, "dropping vote event for unknown participant");
                }
            },
            RoomEvent::Revealed { revealed } => next.revealed = *revealed,
            // Liveness probe, answered by the session; not a state change.
            RoomEvent::Ping { .. } => {}
        }
        next
    }

    pub fn revealed(&self) -> bool {
        self.revealed
    }

    pub fn participant(&self, user: &str) -> Option<&Participant> {
        self.participants.get(user)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants sorted by display name, join order breaking ties.
    pub fn roster(&self) -> Vec<(&str, &Participant)> {
        let mut roster: Vec<(&str, &Participant)> = self
            .participants
            .iter()
            .map(|(id, participant)| (id.as_str(), participant))
            .collect();
        roster.sort_by(|a, b| a.1.name.cmp(&b.1.name).then(a.1.seat.cmp(&b.1.seat)));
        roster
    }

    /// Whether every participant has a vote on the table. An empty room is
    /// vacuously all-voted, matching the reveal-button affordance.
    pub fn all_voted(&self) -> bool {
        self.participants
            .values()
            .all(|participant| participant.current_vote.is_some())
    }

    pub fn voted_count(&self) -> usize {
        self.participants
            .values()
            .filter(|participant| participant.current_vote.is_some())
            .count()
    }

    /// Vote values above zero. A "?" card (value 0) and an absent vote are
    /// deliberately indistinguishable here: both are excluded from the
    /// numeric aggregates.
    pub fn positive_votes(&self) -> Vec<f64> {
        self.participants
            .values()
            .filter_map(|participant| participant.current_vote)
            .filter(Vote::is_positive)
            .map(|vote| vote.value)
            .collect()
    }

    /// Minimum and maximum over the positive votes, if any exist.
    pub fn extremes(&self) -> Option<(f64, f64)> {
        let votes = self.positive_votes();
        let mut iter = votes.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), value| {
            (min.min(value), max.max(value))
        });
        Some((min, max))
    }

    /// The celebratory condition: votes are on display, at least two
    /// participants played a card, and every positive value agrees.
    pub fn unanimous(&self) -> bool {
        if !self.revealed || self.voted_count() < 2 {
            return false;
        }
        matches!(self.extremes(), Some((min, max)) if min == max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poker_wire::Vote;

    fn join(user: &str, name: &str) -> RoomEvent {
        RoomEvent::Join {
            user: user.into(),
            name: name.into(),
        }
    }

    fn vote(user: &str, value: f64) -> RoomEvent {
        RoomEvent::Vote {
            user: user.into(),
            vote: Some(Vote::new(value)),
        }
    }

    fn apply_all(events: &[RoomEvent]) -> RoomState {
        events
            .iter()
            .fold(RoomState::default(), |state, event| state.apply(event))
    }

    #[test]
    fn participants_are_joins_minus_parts() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            RoomEvent::Revealed { revealed: true },
            vote("u1", 3.0),
            join("u3", "Cy"),
            RoomEvent::Part { user: "u2".into() },
            RoomEvent::Ping {
                payload: serde_json::json!({"x": 1}),
            },
            RoomEvent::Part { user: "u1".into() },
        ]);
        assert_eq!(state.len(), 1);
        assert!(state.participant("u3").is_some());
        assert!(state.participant("u1").is_none());
        assert!(state.participant("u2").is_none());
    }

    #[test]
    fn rejoining_is_idempotent() {
        let once = apply_all(&[join("u1", "Ann")]);
        let twice = once.apply(&join("u1", "Ann"));
        assert_eq!(once, twice);
    }

    #[test]
    fn rejoin_clears_the_stored_vote() {
        let state = apply_all(&[join("u1", "Ann"), vote("u1", 5.0), join("u1", "Ann")]);
        assert_eq!(state.participant("u1").unwrap().current_vote, None);
    }

    #[test]
    fn part_removes_the_vote_with_the_participant() {
        let state = apply_all(&[
            join("u1", "Ann"),
            vote("u1", 5.0),
            RoomEvent::Part { user: "u1".into() },
        ]);
        assert!(state.is_empty());
        assert_eq!(state.positive_votes(), Vec::<f64>::new());
    }

    #[test]
    fn events_for_unknown_participants_are_dropped() {
        let state = apply_all(&[
            vote("ghost", 5.0),
            RoomEvent::Name {
                user: "ghost".into(),
                name: "Boo".into(),
            },
            RoomEvent::Part {
                user: "ghost".into(),
            },
        ]);
        assert_eq!(state, RoomState::default());
    }

    #[test]
    fn apply_leaves_the_input_untouched() {
        let before = apply_all(&[join("u1", "Ann")]);
        let copy = before.clone();
        let _after = before.apply(&vote("u1", 5.0));
        assert_eq!(before, copy);
    }

    #[test]
    fn null_vote_clears_the_stored_vote() {
        let state = apply_all(&[
            join("u1", "Ann"),
            vote("u1", 5.0),
            RoomEvent::Vote {
                user: "u1".into(),
                vote: None,
            },
        ]);
        assert_eq!(state.participant("u1").unwrap().current_vote, None);
        assert!(!state.all_voted());
    }

    #[test]
    fn roster_sorts_by_name_then_join_order() {
        let state = apply_all(&[
            join("u1", "Cy"),
            join("u2", "Ann"),
            join("u3", "Ann"),
            join("u4", "Bo"),
        ]);
        let order: Vec<&str> = state.roster().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["u2", "u3", "u4", "u1"]);
    }

    #[test]
    fn renames_affect_roster_order() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            RoomEvent::Name {
                user: "u1".into(),
                name: "Zed".into(),
            },
        ]);
        let order: Vec<&str> = state.roster().iter().map(|(id, _)| *id).collect();
        assert_eq!(order, vec!["u2", "u1"]);
    }

    #[test]
    fn two_equal_positive_votes_are_unanimous() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            vote("u1", 5.0),
            vote("u2", 5.0),
            RoomEvent::Revealed { revealed: true },
        ]);
        assert!(state.all_voted());
        assert_eq!(state.extremes(), Some((5.0, 5.0)));
        assert!(state.unanimous());
    }

    #[test]
    fn unsure_votes_are_excluded_from_extremes_but_count_as_voted() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            vote("u1", 5.0),
            vote("u2", 0.0),
            RoomEvent::Revealed { revealed: true },
        ]);
        assert!(state.all_voted());
        assert_eq!(state.extremes(), Some((5.0, 5.0)));
        assert!(state.unanimous());
    }

    #[test]
    fn a_single_voter_is_not_unanimous() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            vote("u1", 5.0),
            RoomEvent::Revealed { revealed: true },
        ]);
        assert!(!state.all_voted());
        assert!(!state.unanimous());
    }

    #[test]
    fn split_votes_are_not_unanimous() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            vote("u1", 3.0),
            vote("u2", 8.0),
            RoomEvent::Revealed { revealed: true },
        ]);
        assert_eq!(state.extremes(), Some((3.0, 8.0)));
        assert!(!state.unanimous());
    }

    #[test]
    fn concealed_rooms_are_never_unanimous() {
        let state = apply_all(&[
            join("u1", "Ann"),
            join("u2", "Bo"),
            vote("u1", 5.0),
            vote("u2", 5.0),
        ]);
        assert!(!state.unanimous());
    }

    #[test]
    fn revealing_does_not_alter_stored_votes() {
        let voted = apply_all(&[join("u1", "Ann"), vote("u1", 8.0)]);
        let revealed = voted.apply(&RoomEvent::Revealed { revealed: true });
        let concealed = revealed.apply(&RoomEvent::Revealed { revealed: false });
        assert_eq!(
            revealed.participant("u1").unwrap().current_vote,
            Some(Vote::new(8.0))
        );
        assert_eq!(
            concealed.participant("u1").unwrap().current_vote,
            Some(Vote::new(8.0))
        );
        assert!(!concealed.revealed());
    }
}
