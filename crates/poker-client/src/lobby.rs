//! Directory of active rooms, driven by full-snapshot `room` events.

use std::collections::BTreeMap;

use poker_wire::RoomSnapshot;
use rand::Rng;

/// Room codes are four letters drawn from the uppercase alphabet.
pub const ROOM_ID_LEN: usize = 4;

const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Immutable registry of occupied rooms, keyed by room code.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LobbyState {
    rooms: BTreeMap<String, Vec<String>>,
}

impl LobbyState {
    /// Applies one snapshot: an empty occupant list deletes the entry, a
    /// non-empty one upserts it.
    pub fn apply(&self, snapshot: &RoomSnapshot) -> LobbyState {
        let mut next = self.clone();
        if snapshot.users.is_empty() {
            next.rooms.remove(&snapshot.id);
        } else {
            next.rooms
                .insert(snapshot.id.clone(), snapshot.users.clone());
        }
        next
    }

    pub fn contains(&self, room_id: &str) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Rooms with their occupant names, in code order.
    pub fn rooms(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.rooms
            .iter()
            .map(|(id, users)| (id.as_str(), users.as_slice()))
    }

    /// Draws random room codes until one misses the registry. The id space
    /// dwarfs any realistic registry, so collisions only cost another draw.
    pub fn generate_unused_id(&self, rng: &mut impl Rng) -> String {
        loop {
            let id = random_room_id(rng);
            if !self.rooms.contains_key(&id) {
                return id;
            }
        }
    }
}

fn random_room_id(rng: &mut impl Rng) -> String {
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(id: &str, users: &[&str]) -> RoomSnapshot {
        RoomSnapshot {
            id: id.into(),
            users: users.iter().map(|u| u.to_string()).collect(),
        }
    }

    #[test]
    fn non_empty_snapshot_upserts() {
        let lobby = LobbyState::default()
            .apply(&snapshot("ABCD", &["Ann"]))
            .apply(&snapshot("ABCD", &["Ann", "Bo"]));
        assert_eq!(lobby.len(), 1);
        let (_, users) = lobby.rooms().next().unwrap();
        assert_eq!(users, ["Ann".to_string(), "Bo".to_string()]);
    }

    #[test]
    fn empty_snapshot_removes_the_entry() {
        let lobby = LobbyState::default()
            .apply(&snapshot("ABCD", &["Ann"]))
            .apply(&snapshot("EFGH", &["Bo"]))
            .apply(&snapshot("ABCD", &[]));
        assert!(!lobby.contains("ABCD"));
        assert!(lobby.contains("EFGH"));
        assert_eq!(lobby.len(), 1);
    }

    #[test]
    fn removing_an_absent_room_is_a_no_op() {
        let lobby = LobbyState::default().apply(&snapshot("ABCD", &[]));
        assert!(lobby.is_empty());
    }

    #[test]
    fn generated_ids_are_well_formed() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = LobbyState::default().generate_unused_id(&mut rng);
        assert_eq!(id.len(), ROOM_ID_LEN);
        assert!(id.bytes().all(|b| b.is_ascii_uppercase()));
    }

    #[test]
    fn generated_id_never_collides_with_the_registry() {
        // Pre-fill the registry with exactly the codes a fresh copy of the
        // rng would draw first, forcing the generator through collisions.
        let seed = 99;
        let mut peek = StdRng::seed_from_u64(seed);
        let mut lobby = LobbyState::default();
        let mut taken = Vec::new();
        for _ in 0..5 {
            let id = random_room_id(&mut peek);
            lobby = lobby.apply(&snapshot(&id, &["squatter"]));
            taken.push(id);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let id = lobby.generate_unused_id(&mut rng);
        assert!(!lobby.contains(&id));
        assert!(!taken.contains(&id));
    }
}
