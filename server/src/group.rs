//! Adventuring groups. Ephemeral: they live in the world registry and are
//! never persisted.

use ashenmoor_core::constants::MAX_GROUP_SIZE;

use crate::{CharacterId, GroupId};

#[derive(Debug)]
pub struct Group {
    pub id: GroupId,
    pub leader: CharacterId,
    pub members: Vec<CharacterId>,
}

impl Group {
    pub fn new(id: GroupId, leader: CharacterId) -> Group {
        Group { id, leader, members: vec![leader] }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= MAX_GROUP_SIZE
    }

    pub fn contains(&self, character: CharacterId) -> bool {
        self.members.contains(&character)
    }

    pub fn add_member(&mut self, character: CharacterId) -> bool {
        if self.is_full() || self.contains(character) {
            return false;
        }
        self.members.push(character);
        true
    }

    /// Remove a member; promotes the next member when the leader leaves.
    /// Returns true when the group should disband (one or zero left).
    pub fn remove_member(&mut self, character: CharacterId) -> bool {
        self.members.retain(|&m| m != character);
        if self.leader == character {
            if let Some(&next) = self.members.first() {
                self.leader = next;
            }
        }
        self.members.len() <= 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_cap_is_enforced() {
        let mut group = Group::new(1, 10);
        assert!(group.add_member(11));
        assert!(group.add_member(12));
        assert!(group.add_member(13));
        assert!(group.is_full());
        assert!(!group.add_member(14));
        assert!(!group.add_member(11), "duplicates rejected");
    }

    #[test]
    fn leader_leaving_promotes_next() {
        let mut group = Group::new(1, 10);
        group.add_member(11);
        group.add_member(12);

        let disband = group.remove_member(10);
        assert!(!disband);
        assert_eq!(group.leader, 11);

        assert!(group.remove_member(12), "two members minus one disbands");
    }
}
