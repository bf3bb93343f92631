//! Skulduggery: hiding, spotting traps, disarming them.

use ashenmoor_core::dice;
use ashenmoor_core::types::ItemType;

use crate::world::World;
use crate::CharacterId;

/// Base difficulty to slip out of sight with no one particular watching.
const HIDE_BASE_DC: i64 = 10;

pub async fn cmd_hide(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    if c.hidden {
        world.send_to_char(cn, "You are already hidden.");
        return true;
    }
    if c.is_fighting {
        world.send_to_char(cn, "You can't slip away in the middle of a fight!");
        return true;
    }
    let room_id = c.location_id;

    // Contested against the sharpest pair of eyes in the room.
    let stealth = c.skill_modifier(world, "stealth");
    let best_perception = world
        .room(room_id)
        .map(|room| {
            room.characters
                .iter()
                .filter(|&&id| id != cn)
                .filter_map(|&id| world.character(id))
                .map(|other| other.skill_modifier(world, "perception"))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    let dc = HIDE_BASE_DC + best_perception;

    let roll = dice::d20(&mut world.rng);
    if roll + stealth >= dc {
        if let Some(c) = world.character_mut(cn) {
            c.hidden = true;
        }
        world.send_to_char(cn, "{KYou melt into the shadows.{x");
    } else {
        let name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
        world.send_to_char(cn, "You try to hide, but fail to find cover.");
        world.broadcast_room(
            room_id,
            &format!("\r\n{name} ducks behind cover, rather unconvincingly."),
            &[cn],
        );
    }
    if let Some(c) = world.character_mut(cn) {
        c.roundtime = 2.0;
    }
    true
}

/// Perception sweep over containers in reach; found traps go into the
/// character's detected set (runtime only, forgotten at logout).
pub async fn cmd_search(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let room_id = c.location_id;
    let perception = c.skill_modifier(world, "perception");

    let candidates: Vec<crate::ItemId> = {
        let Some(room) = world.room(room_id) else { return true };
        let held = world
            .character(cn)
            .map(|c| c.inventory.clone())
            .unwrap_or_default();
        room.items
            .iter()
            .copied()
            .chain(held)
            .filter(|&id| {
                world
                    .template_of(id)
                    .map_or(false, |t| matches!(t.item_type, ItemType::Container | ItemType::Quiver))
            })
            .collect()
    };

    let mut found = Vec::new();
    for item_id in candidates {
        let Some(trap) = world.item(item_id).and_then(|i| i.stats.trap.clone()) else {
            continue;
        };
        if !trap.active {
            continue;
        }
        if world
            .character(cn)
            .map_or(false, |c| c.detected_traps.contains(&item_id))
        {
            continue;
        }
        let roll = dice::d20(&mut world.rng);
        if roll + perception >= trap.perception_dc {
            if let Some(c) = world.character_mut(cn) {
                c.detected_traps.insert(item_id);
            }
            found.push(world.item_name(item_id));
        }
    }

    if found.is_empty() {
        world.send_to_char(cn, "You search carefully but find nothing amiss.");
    } else {
        for name in found {
            world.send_to_char(cn, &format!("{{rYou spot a trap on {name}!{{x"));
        }
    }
    if let Some(c) = world.character_mut(cn) {
        c.roundtime = 3.0;
    }
    true
}

pub async fn cmd_disarm(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        world.send_to_char(cn, "Disarm what?");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    let found = world
        .find_item_in_inventory(cn, args.trim())
        .or_else(|| world.find_item_in_room(room_id, args.trim()));
    let Some(item_id) = found else {
        world.send_to_char(cn, &format!("You see no '{}' here.", args.trim()));
        return true;
    };

    // Only a spotted trap can be worked on.
    if !world
        .character(cn)
        .map_or(false, |c| c.detected_traps.contains(&item_id))
    {
        world.send_to_char(cn, "You aren't aware of any trap on that.");
        return true;
    }
    let Some(trap) = world.item(item_id).and_then(|i| i.stats.trap.clone()) else {
        world.send_to_char(cn, "The mechanism seems to be gone.");
        return true;
    };
    if !trap.active {
        world.send_to_char(cn, "That trap is already dead.");
        return true;
    }

    let skill = world
        .character(cn)
        .map(|c| c.skill_modifier(world, "disable device"))
        .unwrap_or(0);
    let roll = dice::d20(&mut world.rng);
    let name = world.item_name(item_id);

    if roll + skill >= trap.disarm_dc {
        if let Some(i) = world.item_mut(item_id) {
            if let Some(t) = i.stats.trap.as_mut() {
                t.active = false;
            }
        }
        let json = world.item(item_id).map(|i| i.stats_json()).unwrap_or_default();
        if let Err(e) = world.db.update_instance_stats(item_id, &json).await {
            log::error!("Persisting disarmed trap on item {item_id} failed: {e}");
        }
        world.send_to_char(cn, &format!("{{gClick. The trap on {name} goes still.{{x"));
    } else {
        // Fumbling the mechanism sets it off in your hands.
        world.send_to_char(cn, "{rYour pick slips and the mechanism fires!{x");
        if let Some(i) = world.item_mut(item_id) {
            if let Some(t) = i.stats.trap.as_mut() {
                t.active = false;
            }
        }
        let json = world.item(item_id).map(|i| i.stats_json()).unwrap_or_default();
        if let Err(e) = world.db.update_instance_stats(item_id, &json).await {
            log::error!("Persisting sprung trap on item {item_id} failed: {e}");
        }
        let info = crate::combat::damage::DamageInfo {
            pre_mitigation: trap.damage,
            damage_type: ashenmoor_core::types::DamageType::Pierce,
            is_crit: false,
            attack_name: "the trap".into(),
        };
        let final_damage =
            crate::combat::damage::mitigate_magical(world, crate::world::Actor::Char(cn), &info);
        let hp =
            crate::combat::outcome::apply_damage(world, crate::world::Actor::Char(cn), final_damage);
        world.send_to_char(cn, &format!("{{rThe trap tears into you for {final_damage} damage!{{x"));
        if hp <= 0.0 {
            crate::combat::outcome::handle_defeat(world, None, crate::world::Actor::Char(cn)).await;
        }
    }
    if let Some(c) = world.character_mut(cn) {
        c.detected_traps.remove(&item_id);
        c.roundtime = 3.0;
    }
    true
}
