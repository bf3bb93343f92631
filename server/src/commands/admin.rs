//! Admin verbs. These bypass roundtime and never reach non-admins (the
//! dispatcher reports them as unknown commands instead).

use ashenmoor_core::stats::Stat;
use ashenmoor_core::text;

use crate::world::{Actor, World};
use crate::CharacterId;

pub async fn cmd_teleport(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Ok(room_id) = args.trim().parse::<i64>() else {
        world.send_to_char(cn, "Usage: @teleport <room id>");
        return true;
    };
    if !world.rooms.contains_key(&room_id) {
        world.send_to_char(cn, &format!("No room with id {room_id}."));
        return true;
    }
    let Some(c) = world.character(cn) else { return true };
    let origin = c.location_id;
    let name = c.name.clone();

    if let Some(room) = world.room_mut(origin) {
        room.characters.remove(&cn);
    }
    world.broadcast_room(origin, &format!("\r\n{name} vanishes in a wink of light."), &[cn]);

    if let Some(c) = world.character_mut(cn) {
        c.location_id = room_id;
        c.dirty = true;
    }
    if let Some(room) = world.room_mut(room_id) {
        room.characters.insert(cn);
    }
    world.broadcast_room(room_id, &format!("\r\n{name} appears in a wink of light."), &[cn]);

    let look = world.room(room_id).map(|r| r.look_string(world, cn));
    if let Some(look) = look {
        world.send_to_char(cn, &look);
    }
    true
}

pub async fn cmd_examine(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let target = args.trim();
    if target.is_empty() {
        world.send_to_char(cn, "Usage: @examine <character|mob name>");
        return true;
    }
    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();

    if let Some(other_id) = world
        .find_character_in_room(room_id, target)
        .or_else(|| world.find_online_by_name(target))
    {
        let Some(c) = world.character(other_id) else { return true };
        let lines = vec![
            format!("{{W--- Character #{} ---{{x", c.id),
            format!("{} | {} {} lvl {}", c.name, world.race_name(c.race_id), world.class_name(c.class_id), c.level),
            format!("Status {} / {} | Room {}", c.status.as_str(), c.stance.as_str(), c.location_id),
            format!(
                "HP {:.1}/{:.1}  Ess {:.1}/{:.1}  RT {:.1}",
                c.hp, c.max_hp, c.essence, c.max_essence, c.roundtime
            ),
            format!(
                "XP pool {:.0} / total {:.0}  Coin {}  Tether {}",
                c.xp_pool,
                c.xp_total,
                text::format_coinage(c.coinage),
                c.spiritual_tether
            ),
            format!("Effects: {:?}", c.effects.keys().collect::<Vec<_>>()),
            format!("Inventory: {:?}  Equipment: {:?}", c.inventory, c.equipment),
        ];
        world.send_to_char(cn, &lines.join("\r\n"));
        return true;
    }

    if let Some(mob_id) = world.find_mob_in_room(room_id, target) {
        if let Some(m) = world.mob(mob_id) {
            let lines = vec![
                format!("{{W--- Mob #{} (template {}) ---{{x", m.id, m.template_id),
                format!("{} lvl {} | Room {}", m.name, m.level, m.room_id),
                format!("HP {:.1}/{:.1}  RT {:.1}", m.hp, m.max_hp, m.roundtime),
                format!(
                    "Fighting: {}  Target: {:?}  Died at: {:?}",
                    m.is_fighting, m.target, m.time_of_death
                ),
            ];
            world.send_to_char(cn, &lines.join("\r\n"));
        }
        return true;
    }

    world.send_to_char(cn, &format!("Nothing called '{target}' here."));
    true
}

pub async fn cmd_setstat(world: &mut World, cn: CharacterId, args: &str) -> bool {
    // @setstat <name> <stat> <value>
    let parts: Vec<&str> = args.split_whitespace().collect();
    let [name, stat_name, value] = parts.as_slice() else {
        world.send_to_char(cn, "Usage: @setstat <character> <stat> <value>");
        return true;
    };
    let Some(stat) = Stat::parse(stat_name) else {
        world.send_to_char(cn, &format!("Unknown stat '{stat_name}'."));
        return true;
    };
    let Ok(value) = value.parse::<i64>() else {
        world.send_to_char(cn, "The value must be a number.");
        return true;
    };
    let Some(target_id) = world.find_online_by_name(name) else {
        world.send_to_char(cn, &format!("No one named '{name}' is connected."));
        return true;
    };

    let clamped = value.max(1);
    if let Some(c) = world.character_mut(target_id) {
        c.stats.set(stat, clamped);
        c.dirty = true;
    }
    let target_name = world.actor_name(Actor::Char(target_id));
    log::info!("Admin set {} of {target_name} to {clamped}", stat.key());
    world.send_to_char(cn, &format!("Set {} of {target_name} to {clamped}.", stat.key()));

    if let Some(c) = world.character(target_id) {
        if let Err(e) = world.db.save_character(c).await {
            log::error!("Persisting @setstat on {target_name} failed: {e}");
        }
    }
    true
}

pub async fn cmd_roomstat(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let room_id = match args.trim().parse::<i64>() {
        Ok(id) => id,
        Err(_) => world.character(cn).map(|c| c.location_id).unwrap_or_default(),
    };
    let Some(room) = world.room(room_id) else {
        world.send_to_char(cn, &format!("No room with id {room_id}."));
        return true;
    };

    let mut exits: Vec<String> = room
        .exits
        .iter()
        .map(|(token, exit)| format!("{token}->{}", exit.to))
        .collect();
    exits.sort_unstable();

    let lines = vec![
        format!("{{W--- Room #{} ({}) ---{{x", room.id, room.name),
        format!("Area {} | Flags {:?} | Weather {:?}", room.area_id, room.flags, room.weather),
        format!("Exits: {}", if exits.is_empty() { "none".into() } else { exits.join(", ") }),
        format!(
            "Occupants: {} characters, {} mobs | Ground: {} items, {}",
            room.characters.len(),
            room.mobs.len(),
            room.items.len(),
            text::format_coinage(room.coinage)
        ),
        format!("Spawners: {:?}", room.spawners.keys().collect::<Vec<_>>()),
    ];
    world.send_to_char(cn, &lines.join("\r\n"));
    true
}
