//! The local user's in-flight vote.
//!
//! The choice is applied here the instant the user acts, before the command
//! round-trip; everyone else sees it only once the authoritative `vote`
//! event comes back through the reducer. A round reset (`revealed:false`)
//! clears the choice no matter where the command currently is.

use poker_wire::Vote;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoteTracker {
    current: Option<Vote>,
}

impl VoteTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast(&mut self, vote: Vote) {
        self.current = Some(vote);
    }

    pub fn current(&self) -> Option<Vote> {
        self.current
    }

    /// Feed every observed reveal transition through here; concealing the
    /// room resets the pending choice.
    pub fn observe_revealed(&mut self, revealed: bool) {
        if !revealed {
            self.current = None;
        }
    }
}
