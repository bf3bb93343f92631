//! Adventuring groups: form, join, prune, dissolve.

use crate::world::World;
use crate::CharacterId;

pub async fn cmd_group(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let target_name = args.trim();
    if target_name.is_empty() {
        // Bare `group` reports the roster.
        let Some(c) = world.character(cn) else { return true };
        let Some(group_id) = c.group_id else {
            world.send_to_char(cn, "You are not in a group. (group <player> to form one)");
            return true;
        };
        let Some(group) = world.groups.get(&group_id) else { return true };
        let mut lines = vec!["{W--- Your Group ---{x".to_string()];
        for &member in &group.members {
            if let Some(m) = world.character(member) {
                let tag = if member == group.leader { " (leader)" } else { "" };
                lines.push(format!(
                    "  {} - {}/{} hp{tag}",
                    m.name, m.hp as i64, m.max_hp as i64
                ));
            }
        }
        world.send_to_char(cn, &lines.join("\r\n"));
        return true;
    }

    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let Some(target_id) = world.find_character_in_room(room_id, target_name) else {
        world.send_to_char(cn, &format!("You see no '{target_name}' here."));
        return true;
    };
    if target_id == cn {
        world.send_to_char(cn, "You are already your own best company.");
        return true;
    }
    if world.character(target_id).map_or(false, |c| c.group_id.is_some()) {
        world.send_to_char(cn, "They are already in a group.");
        return true;
    }

    let group_id = match world.character(cn).and_then(|c| c.group_id) {
        Some(id) => {
            // Only the leader extends the roster.
            if world.groups.get(&id).map_or(false, |g| g.leader != cn) {
                world.send_to_char(cn, "Only the group leader can bring in new members.");
                return true;
            }
            id
        }
        None => world.create_group(cn),
    };

    let added = world
        .groups
        .get_mut(&group_id)
        .map_or(false, |g| g.add_member(target_id));
    if !added {
        world.send_to_char(cn, "Your group is full.");
        return true;
    }
    if let Some(t) = world.character_mut(target_id) {
        t.group_id = Some(group_id);
    }

    let target_display = world
        .character(target_id)
        .map(|c| c.name.clone())
        .unwrap_or_default();
    world.broadcast_group(group_id, &format!("{{y{target_display} joins the group.{{x"), &[]);
    true
}

/// Shared removal path; disbands when one member would remain.
fn remove_from_group(world: &mut World, member: CharacterId) {
    let Some(group_id) = world.character(member).and_then(|c| c.group_id) else { return };
    if let Some(c) = world.character_mut(member) {
        c.group_id = None;
    }
    let disband = world
        .groups
        .get_mut(&group_id)
        .map_or(false, |g| g.remove_member(member));
    if disband {
        if let Some(group) = world.groups.remove(&group_id) {
            for remaining in group.members {
                if let Some(c) = world.character_mut(remaining) {
                    c.group_id = None;
                }
                world.send_to_char(remaining, "{yThe group has been disbanded.{x");
            }
        }
    }
}

pub async fn cmd_disband(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(group_id) = world.character(cn).and_then(|c| c.group_id) else {
        world.send_to_char(cn, "You are not in a group.");
        return true;
    };
    if world.groups.get(&group_id).map_or(true, |g| g.leader != cn) {
        world.send_to_char(cn, "Only the leader can disband the group.");
        return true;
    }
    if let Some(group) = world.groups.remove(&group_id) {
        for member in group.members {
            if let Some(c) = world.character_mut(member) {
                c.group_id = None;
            }
            world.send_to_char(member, "{yThe group has been disbanded.{x");
        }
    }
    true
}

pub async fn cmd_kick(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let target_name = args.trim();
    if target_name.is_empty() {
        world.send_to_char(cn, "Kick whom from the group?");
        return true;
    }
    let Some(group_id) = world.character(cn).and_then(|c| c.group_id) else {
        world.send_to_char(cn, "You are not in a group.");
        return true;
    };
    if world.groups.get(&group_id).map_or(true, |g| g.leader != cn) {
        world.send_to_char(cn, "Only the leader can kick members.");
        return true;
    }
    let Some(target_id) = world.find_online_by_name(target_name) else {
        world.send_to_char(cn, &format!("No one named '{target_name}' is connected."));
        return true;
    };
    if !world.groups.get(&group_id).map_or(false, |g| g.contains(target_id)) {
        world.send_to_char(cn, "They are not in your group.");
        return true;
    }
    if target_id == cn {
        world.send_to_char(cn, "Use 'disband' or 'leave' instead.");
        return true;
    }

    world.send_to_char(target_id, "{yYou have been removed from the group.{x");
    remove_from_group(world, target_id);
    world.send_to_char(cn, "Done.");
    true
}

pub async fn cmd_leave(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(group_id) = world.character(cn).and_then(|c| c.group_id) else {
        world.send_to_char(cn, "You are not in a group.");
        return true;
    };
    let name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    world.broadcast_group(group_id, &format!("{{y{name} leaves the group.{{x"), &[cn]);
    world.send_to_char(cn, "You leave the group.");
    remove_from_group(world, cn);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;

    #[tokio::test]
    async fn group_forms_caps_and_disbands() {
        let mut world = build_world().await;
        for id in 1..=6 {
            add_test_character(&mut world, id, 1);
        }

        cmd_group(&mut world, 1, "test2").await;
        cmd_group(&mut world, 1, "test3").await;
        cmd_group(&mut world, 1, "test4").await;
        let group_id = world.character(1).unwrap().group_id.unwrap();
        assert_eq!(world.groups[&group_id].members.len(), 4);

        // Fifth member bounces off the cap.
        cmd_group(&mut world, 1, "test5").await;
        assert_eq!(world.groups[&group_id].members.len(), 4);
        assert!(world.character(5).unwrap().group_id.is_none());

        cmd_disband(&mut world, 1, "").await;
        assert!(world.groups.is_empty());
        for id in 1..=4 {
            assert!(world.character(id).unwrap().group_id.is_none());
        }
    }

    #[tokio::test]
    async fn leaving_a_pair_dissolves_the_group() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_test_character(&mut world, 2, 1);

        cmd_group(&mut world, 1, "test2").await;
        assert!(world.character(2).unwrap().group_id.is_some());

        cmd_leave(&mut world, 2, "").await;
        assert!(world.groups.is_empty());
        assert!(world.character(1).unwrap().group_id.is_none());
    }

    #[tokio::test]
    async fn only_leaders_recruit() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_test_character(&mut world, 2, 1);
        add_test_character(&mut world, 3, 1);

        cmd_group(&mut world, 1, "test2").await;
        cmd_group(&mut world, 2, "test3").await;
        assert!(world.character(3).unwrap().group_id.is_none());
    }
}
