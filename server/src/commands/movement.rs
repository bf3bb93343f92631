//! Movement: the closed directional verbs and `go <named exit>`.

use ashenmoor_core::dice;
use ashenmoor_core::direction::{departure_phrase, Direction};
use ashenmoor_core::types::{Stance, Status};

use crate::combat::outcome::handle_defeat;
use crate::room::SkillCheck;
use crate::world::{Actor, World};
use crate::{CharacterId, RoomId};

/// Roundtime charged for fumbling a skill-check exit.
const FAILED_CHECK_ROUNDTIME: f64 = 10.0;

pub async fn cmd_move(world: &mut World, cn: CharacterId, direction: Direction) -> bool {
    try_exit(world, cn, direction.key()).await
}

pub async fn cmd_go(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let exit_name = args.trim().to_ascii_lowercase();
    if exit_name.is_empty() {
        world.send_to_char(cn, "Go where? (e.g. go portal)");
        return true;
    }
    try_exit(world, cn, &exit_name).await
}

async fn try_exit(world: &mut World, cn: CharacterId, exit_name: &str) -> bool {
    let Some(character) = world.character(cn) else { return true };
    if character.stance != Stance::Standing {
        world.send_to_char(cn, "You must be standing to move.");
        return true;
    }
    let origin_id = character.location_id;

    let Some(origin) = world.room(origin_id) else {
        world.send_to_char(cn, "You cannot seem to move from the void.");
        return true;
    };
    let Some(exit) = origin.exits.get(exit_name) else {
        world.send_to_char(cn, "You can't go that way.");
        return true;
    };
    let destination_id = exit.to;
    let skill_check = exit.skill_check.clone();
    let lock = exit.lock.clone();
    let trap = exit.trap.clone();

    // Template-integrity failures make the exit impassable, never delete it.
    if !world.rooms.contains_key(&destination_id) {
        log::error!(
            "Exit {exit_name:?} in room {origin_id} points to missing room {destination_id}"
        );
        world.send_to_char(
            cn,
            "You try to move that way, but the path seems to crumble into nothingness.",
        );
        return true;
    }

    // A locked exit opens only for the matching key.
    if let Some(lock) = lock {
        if lock.locked && !holds_key_for(world, cn, lock.key_id) {
            world.send_to_char(cn, "The way is locked fast.");
            return true;
        }
    }

    if let Some(check) = skill_check {
        if !attempt_skill_check(world, cn, &check).await {
            return true;
        }
    }

    // An armed trap on the passage fires once, then is spent.
    if let Some(trap) = trap {
        if trap.active {
            spring_exit_trap(world, cn, origin_id, exit_name, trap.damage).await;
            if world.character(cn).map_or(true, |c| !c.is_alive()) {
                return true;
            }
        }
    }

    perform_move(world, cn, origin_id, destination_id, exit_name).await;
    true
}

fn holds_key_for(world: &World, cn: CharacterId, key_id: Option<i64>) -> bool {
    let Some(lock_id) = key_id else { return false };
    let Some(c) = world.character(cn) else { return false };
    c.inventory.iter().any(|&item| {
        world
            .template_of(item)
            .map_or(false, |t| t.stats.unlocks.contains(&lock_id))
    })
}

/// Fire a passage trap through the magical-direct mitigation path and
/// disarm it for the rest of this boot.
async fn spring_exit_trap(
    world: &mut World,
    cn: CharacterId,
    room_id: RoomId,
    exit_name: &str,
    damage: i64,
) {
    if let Some(room) = world.room_mut(room_id) {
        if let Some(exit) = room.exits.get_mut(exit_name) {
            if let Some(trap) = exit.trap.as_mut() {
                trap.active = false;
            }
        }
    }

    world.send_to_char(cn, "{rSomething clicks underfoot!{x");
    let info = crate::combat::damage::DamageInfo {
        pre_mitigation: damage,
        damage_type: ashenmoor_core::types::DamageType::Pierce,
        is_crit: false,
        attack_name: "the trap".into(),
    };
    let final_damage =
        crate::combat::damage::mitigate_magical(world, Actor::Char(cn), &info);
    let hp = crate::combat::outcome::apply_damage(world, Actor::Char(cn), final_damage);
    world.send_to_char(cn, &format!("{{rThe trap tears into you for {final_damage} damage!{{x"));
    if hp <= 0.0 && world.character(cn).map_or(false, |c| c.status == Status::Alive) {
        handle_defeat(world, None, Actor::Char(cn)).await;
    }
}

/// Roll the gate on a checked exit. Returns false when movement must stop
/// (the failure path also charges roundtime and may hurt).
async fn attempt_skill_check(world: &mut World, cn: CharacterId, check: &SkillCheck) -> bool {
    let skill_value = world
        .character(cn)
        .map(|c| c.skill_modifier(world, &check.skill))
        .unwrap_or(0);
    let roll = dice::d20(&mut world.rng);
    let total = roll + skill_value;
    let success = total >= check.dc;

    world.send_to_char(
        cn,
        &format!(
            "You attempt {}... {{c[Roll: {roll} + Skill: {skill_value} = {total} vs DC: {}]{{x {}",
            check.skill,
            check.dc,
            if success { "{gSuccess!{x" } else { "{rFailure!{x" }
        ),
    );

    if success {
        if let Some(msg) = &check.success_msg {
            world.send_to_char(cn, msg);
        }
        return true;
    }

    let fail_msg = check
        .fail_msg
        .clone()
        .unwrap_or_else(|| format!("You fail the {} attempt.", check.skill));
    world.send_to_char(cn, &fail_msg);

    if check.fail_damage > 0 {
        let (hp, max_hp) = {
            let Some(c) = world.character_mut(cn) else { return false };
            c.hp = (c.hp - check.fail_damage as f64).max(0.0);
            c.dirty = true;
            (c.hp, c.max_hp)
        };
        world.send_to_char(
            cn,
            &format!(
                "{{rYou take {} damage from the failure! ({}/{} HP){{x",
                check.fail_damage, hp as i64, max_hp as i64
            ),
        );

        // A failed climb drops you prone.
        if check.skill.eq_ignore_ascii_case("climbing") {
            let fell = world
                .character_mut(cn)
                .map(|c| {
                    let was_standing = c.stance != Stance::Lying;
                    c.stance = Stance::Lying;
                    was_standing
                })
                .unwrap_or(false);
            if fell {
                world.send_to_char(cn, "You fall prone!");
            }
        }

        if hp <= 0.0 {
            if world.character(cn).map_or(false, |c| c.status == Status::Alive) {
                handle_defeat(world, None, Actor::Char(cn)).await;
            }
            if let Some(c) = world.character_mut(cn) {
                c.roundtime = 0.0;
            }
            return false;
        }
    }

    if let Some(c) = world.character_mut(cn) {
        c.roundtime = FAILED_CHECK_ROUNDTIME;
    }
    false
}

/// The actual transit: announcements, occupancy, look output, armor-scaled
/// roundtime.
async fn perform_move(
    world: &mut World,
    cn: CharacterId,
    origin_id: RoomId,
    destination_id: RoomId,
    exit_name: &str,
) {
    let (name, was_meditating) = {
        let Some(c) = world.character_mut(cn) else { return };
        let was_meditating = c.status == Status::Meditating;
        if was_meditating {
            c.status = Status::Alive;
        }
        (c.name.clone(), was_meditating)
    };
    if was_meditating {
        world.send_to_char(cn, "You stop meditating as you move.");
    }

    world.broadcast_room(
        origin_id,
        &format!("\r\n{name} {}.", departure_phrase(exit_name)),
        &[cn],
    );
    if let Some(room) = world.room_mut(origin_id) {
        room.characters.remove(&cn);
    }

    if let Some(c) = world.character_mut(cn) {
        c.location_id = destination_id;
        c.is_fighting = false;
        c.target = None;
        c.dirty = true;
    }
    if let Some(room) = world.room_mut(destination_id) {
        room.characters.insert(cn);
    }
    world.broadcast_room(destination_id, &format!("\r\n{name} arrives."), &[cn]);

    let (look, ground) = {
        let Some(room) = world.room(destination_id) else { return };
        (room.look_string(world, cn), room.ground_contents_line(world))
    };
    world.send_to_char(cn, &look);
    if let Some(ground) = ground {
        world.send_to_char(cn, &ground);
    }

    // Movement roundtime scales with armor load.
    let total_av = world.character(cn).map_or(0, |c| c.total_av(world));
    let rt_penalty = (total_av / 20) as f64;
    if let Some(c) = world.character_mut(cn) {
        c.roundtime = 1.0 + rt_penalty;
    }
    if rt_penalty > 0.0 {
        world.send_to_char(cn, &format!("Your armor slows your movement (+{rt_penalty:.1}s)."));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use crate::room::Room;
    use crate::db::world::RoomRow;

    fn add_room(world: &mut World, id: RoomId, exits: &str) {
        let room = Room::from_row(&RoomRow {
            id,
            area_id: 1,
            name: format!("Room {id}"),
            description: "Test".into(),
            exits: exits.into(),
            flags: "[]".into(),
            spawners: "{}".into(),
            coinage: 0,
            shop_buy_filter: None,
            shop_sell_modifier: 0.5,
        });
        world.rooms.insert(id, room);
    }

    #[tokio::test]
    async fn move_there_and_back_restores_occupancy() {
        let mut world = build_world().await;
        add_room(&mut world, 2, r#"{"south": 3}"#);
        add_room(&mut world, 3, r#"{"north": 2}"#);
        add_test_character(&mut world, 1, 2);

        cmd_move(&mut world, 1, Direction::South).await;
        assert_eq!(world.character(1).unwrap().location_id, 3);
        assert!(world.room(3).unwrap().characters.contains(&1));
        assert!(!world.room(2).unwrap().characters.contains(&1));

        world.character_mut(1).unwrap().roundtime = 0.0;
        cmd_move(&mut world, 1, Direction::North).await;
        assert_eq!(world.character(1).unwrap().location_id, 2);
        assert!(world.room(2).unwrap().characters.contains(&1));
        assert!(!world.room(3).unwrap().characters.contains(&1));
    }

    #[tokio::test]
    async fn broken_exit_is_impassable_but_kept() {
        let mut world = build_world().await;
        add_room(&mut world, 2, r#"{"east": 999}"#);
        add_test_character(&mut world, 1, 2);

        cmd_move(&mut world, 1, Direction::East).await;
        assert_eq!(world.character(1).unwrap().location_id, 2);
        assert!(world.room(2).unwrap().exits.contains_key("east"), "exit not deleted");
    }

    #[tokio::test]
    async fn movement_requires_standing() {
        let mut world = build_world().await;
        add_room(&mut world, 2, r#"{"south": 3}"#);
        add_room(&mut world, 3, "{}");
        add_test_character(&mut world, 1, 2);
        world.character_mut(1).unwrap().stance = Stance::Sitting;

        cmd_move(&mut world, 1, Direction::South).await;
        assert_eq!(world.character(1).unwrap().location_id, 2);
    }

    #[tokio::test]
    async fn movement_sets_base_roundtime() {
        let mut world = build_world().await;
        add_room(&mut world, 2, r#"{"south": 3}"#);
        add_room(&mut world, 3, "{}");
        add_test_character(&mut world, 1, 2);

        cmd_move(&mut world, 1, Direction::South).await;
        let rt = world.character(1).unwrap().roundtime;
        assert!((rt - 1.0).abs() < 1e-9, "unarmored base move roundtime, got {rt}");
    }

    #[tokio::test]
    async fn failed_skill_check_exit_blocks_and_charges_roundtime() {
        let mut world = build_world().await;
        add_room(
            &mut world,
            2,
            r#"{"up": {"target": 3,
                       "skill_check": {"skill": "climbing", "dc": 99,
                                        "fail_msg": "The wall defeats you.",
                                        "fail_damage": 2}}}"#,
        );
        add_room(&mut world, 3, "{}");
        add_test_character(&mut world, 1, 2);

        cmd_move(&mut world, 1, Direction::Up).await;
        let c = world.character(1).unwrap();
        assert_eq!(c.location_id, 2, "dc 99 cannot be passed at rank 0");
        assert_eq!(c.roundtime, FAILED_CHECK_ROUNDTIME);
        assert!(c.hp < c.max_hp, "fail damage applied");
        assert_eq!(c.stance, Stance::Lying, "failed climb drops prone");
    }
}
