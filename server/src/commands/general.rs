//! General commands: observation, communication, posture, and leaving.

use ashenmoor_core::constants::RESPAWN_ROOM_ID;
use ashenmoor_core::progression;
use ashenmoor_core::stats::Stat;
use ashenmoor_core::text;
use ashenmoor_core::types::{Stance, Status};

use crate::world::World;
use crate::CharacterId;

pub async fn cmd_look(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some(character) = world.character(cn) else { return true };
    let room_id = character.location_id;
    let Some(room) = world.room(room_id) else {
        world.send_to_char(cn, "You float in a formless void.");
        return true;
    };

    if args.is_empty() {
        let look = room.look_string(world, cn);
        world.send_to_char(cn, &look);
        if let Some(ground) = room.ground_contents_line(world) {
            world.send_to_char(cn, &ground);
        }
        return true;
    }

    let target = args.trim();

    // Characters first, then mobs, then items in hand/worn/on the ground,
    // then room scenery.
    if let Some(other_id) = world.find_character_in_room(room_id, target) {
        let Some(other) = world.character(other_id) else { return true };
        let percent = if other.max_hp > 0.0 { other.hp / other.max_hp * 100.0 } else { 0.0 };
        let mut lines = vec![other.description.clone()];
        lines.push(format!("{} {}.", other.first_name, text::health_phrase(percent)));
        world.send_to_char(cn, &lines.join("\r\n"));
        if other_id != cn {
            world.send_to_char(other_id, &format!("{} looks you over.", world.character(cn).map(|c| c.name.clone()).unwrap_or_default()));
        }
        return true;
    }

    if let Some(mob_id) = world.find_mob_in_room(room_id, target) {
        if let Some(mob) = world.mob(mob_id) {
            let description = world
                .mob_template(mob.template_id)
                .map(|t| t.description.clone())
                .unwrap_or_default();
            let percent = if mob.max_hp > 0.0 { mob.hp / mob.max_hp * 100.0 } else { 0.0 };
            let name = text::capitalize(&mob.name);
            world.send_to_char(
                cn,
                &format!("{description}\r\n{name} {}.", text::health_phrase(percent)),
            );
        }
        return true;
    }

    let found_item = world
        .find_item_in_inventory(cn, target)
        .or_else(|| world.find_item_in_equipment(cn, target).map(|(_, id)| id))
        .or_else(|| world.find_item_in_room(room_id, target));
    if let Some(item_id) = found_item {
        if let (Some(template), Some(instance)) = (world.template_of(item_id), world.item(item_id)) {
            world.send_to_char(
                cn,
                &format!("{}\r\n{}", template.description, text::condition_desc(instance.condition)),
            );
        }
        return true;
    }

    if let Some(object) = world.room(room_id).and_then(|r| r.object_by_keyword(target)) {
        let description = object.description.clone();
        world.send_to_char(cn, &description);
        return true;
    }

    world.send_to_char(cn, &format!("You see no '{target}' here."));
    true
}

pub async fn cmd_say(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.is_empty() {
        world.send_to_char(cn, "Say what?");
        return true;
    }
    let Some(character) = world.character(cn) else { return true };
    let name = character.name.clone();
    let room_id = character.location_id;
    world.send_to_char(cn, &format!("You say, \"{args}\""));
    world.broadcast_room(room_id, &format!("\r\n{name} says, \"{args}\""), &[cn]);
    true
}

pub async fn cmd_tell(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some((target_name, message)) = args.split_once(' ') else {
        world.send_to_char(cn, "Tell whom what? (e.g. tell gimli hello)");
        return true;
    };
    let message = message.trim();
    if message.is_empty() {
        world.send_to_char(cn, "Tell them what?");
        return true;
    }
    let Some(target_id) = world.find_online_by_name(target_name) else {
        world.send_to_char(cn, &format!("No one named '{target_name}' is connected."));
        return true;
    };
    if target_id == cn {
        world.send_to_char(cn, "You mutter to yourself.");
        return true;
    }
    let sender = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    let receiver = world.character(target_id).map(|c| c.first_name.clone()).unwrap_or_default();
    world.send_to_char(cn, &format!("{{cYou tell {receiver}, \"{message}\"{{x"));
    world.send_to_char(target_id, &format!("{{c{sender} tells you, \"{message}\"{{x"));
    true
}

pub async fn cmd_emote(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.is_empty() {
        world.send_to_char(cn, "Emote what?");
        return true;
    }
    let Some(character) = world.character(cn) else { return true };
    let name = character.name.clone();
    let room_id = character.location_id;
    world.send_to_char(cn, &format!("{name} {args}"));
    world.broadcast_room(room_id, &format!("\r\n{name} {args}"), &[cn]);
    true
}

pub async fn cmd_who(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let mut entries: Vec<String> = world
        .characters
        .values()
        .map(|c| {
            format!(
                " {} ({} {} {})",
                c.name,
                world.race_name(c.race_id),
                world.class_name(c.class_id),
                c.level
            )
        })
        .collect();
    entries.sort_unstable();
    let mut output = vec!["{W--- Souls Abroad ---{x".to_string()];
    output.extend(entries);
    output.push(format!("{} connected.", world.characters.len()));
    world.send_to_char(cn, &output.join("\r\n"));
    true
}

pub async fn cmd_help(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    world.send_to_char(
        cn,
        "{W--- Commands ---{x\r\n\
         Movement: north/south/east/west/up/down (n/s/e/w/u/d), ne/nw/se/sw, go <exit>\r\n\
         Observation: look [target], examine <item>, who, score, skills\r\n\
         Speech: say <text>, tell <player> <text>, emote <text>\r\n\
         Combat: attack <target>, cast <spell> [target], use <ability> [target]\r\n\
         Items: get/drop/put/wear/remove/open/close/lock/unlock/eat/drink\r\n\
         Trade: list, buy, sell, give/accept/decline, balance, deposit, withdraw, repair\r\n\
         Group: group <player>, leave, kick <player>, disband\r\n\
         Progression: advance, spend <skill> [points], improve <stat>\r\n\
         Rest: sit, lie, stand, meditate. Leave with quit.",
    );
    true
}

pub async fn cmd_score(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let race = world.race_name(c.race_id);
    let class = world.class_name(c.class_id);
    let next_level = progression::xp_needed_for_level(c.level)
        .map(|xp| format!("{}", xp as i64))
        .unwrap_or_else(|| "--".into());
    let pool_cap = progression::xp_pool_cap(c.stat_value(world, Stat::Intellect));
    let session_seconds = c
        .login_at
        .map(|at| (world.now() - at) as i64)
        .unwrap_or(0);
    let playtime = text::format_playtime(c.total_playtime_seconds + session_seconds);

    let mut lines = vec![
        format!("{{W--- {} ---{{x", c.name),
        format!("{race} {class}, level {}.", c.level),
        format!("Status: {} ({}).", c.status.as_str(), c.stance.as_str()),
        format!(
            "HP {}/{}  Essence {}/{}",
            c.hp as i64, c.max_hp as i64, c.essence as i64, c.max_essence as i64
        ),
        format!(
            "Might {}  Vitality {}  Agility {}  Intellect {}  Aura {}  Persona {}",
            c.stat_value(world, Stat::Might),
            c.stat_value(world, Stat::Vitality),
            c.stat_value(world, Stat::Agility),
            c.stat_value(world, Stat::Intellect),
            c.stat_value(world, Stat::Aura),
            c.stat_value(world, Stat::Persona),
        ),
        format!(
            "MAR {}  RAR {}  APR {}  DPR {}  DV {}  AV {}  BV {}",
            c.mar(world),
            c.rar(world),
            c.apr(world),
            c.dpr(world),
            c.dv(world),
            c.total_av(world),
            c.barrier_value(world),
        ),
        format!(
            "XP pool {}/{}  XP total {}  (next level at {next_level})",
            c.xp_pool as i64, pool_cap as i64, c.xp_total as i64
        ),
        format!(
            "Coinage: {}.  Spiritual tether: {}/10.",
            text::format_coinage(c.coinage),
            c.spiritual_tether
        ),
        format!("Playtime: {playtime}."),
    ];

    if !c.effects.is_empty() {
        let now = world.now();
        let mut names: Vec<String> = c
            .effects
            .values()
            .filter(|e| !e.is_expired(now))
            .map(|e| {
                if e.ends_at.is_infinite() {
                    e.name.clone()
                } else {
                    format!("{} ({}s)", e.name, (e.ends_at - now).max(0.0) as i64)
                }
            })
            .collect();
        names.sort_unstable();
        lines.push(format!("Active effects: {}.", names.join(", ")));
    }

    let equipped: Vec<String> = ashenmoor_core::slots::WearSlot::ALL
        .iter()
        .filter_map(|slot| {
            c.equipment
                .get(slot)
                .map(|&item| format!("  {:<13} {}", format!("{}:", slot.label()), world.item_name(item)))
        })
        .collect();
    if !equipped.is_empty() {
        lines.push("Worn and wielded:".to_string());
        lines.extend(equipped);
    }

    world.send_to_char(cn, &lines.join("\r\n"));
    true
}

pub async fn cmd_skills(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    let mut lines = vec!["{W--- Skills ---{x".to_string()];
    for skill in crate::skills::INITIAL_SKILLS {
        let rank = c.skill_rank(skill);
        if rank > 0 {
            lines.push(format!("  {skill:<20} {rank}"));
        }
    }
    if lines.len() == 1 {
        lines.push("  (no trained skills)".to_string());
    }
    lines.push(format!("Unspent skill points: {}.", c.unspent_skill_points));
    lines.push(format!("Unspent attribute points: {}.", c.unspent_attribute_points));
    world.send_to_char(cn, &lines.join("\r\n"));
    true
}

pub async fn cmd_quit(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    world.send_to_char(cn, "Farewell, until the vale calls you back.");
    false
}

pub async fn cmd_meditate(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    if c.status == Status::Meditating {
        world.send_to_char(cn, "You are already deep in meditation.");
        return true;
    }
    if c.is_fighting {
        world.send_to_char(cn, "You cannot find the calm for meditation mid-fight!");
        return true;
    }
    if c.stance == Stance::Standing {
        world.send_to_char(cn, "You must sit or lie down to meditate.");
        return true;
    }
    let name = c.name.clone();
    let room_id = c.location_id;
    if let Some(c) = world.character_mut(cn) {
        c.status = Status::Meditating;
    }
    world.send_to_char(cn, "{cYou close your eyes and turn your focus inward.{x");
    world.broadcast_room(room_id, &format!("\r\n{name} settles into a meditative trance."), &[cn]);
    true
}

async fn change_stance(world: &mut World, cn: CharacterId, stance: Stance) -> bool {
    let Some(c) = world.character(cn) else { return true };
    if c.stance == stance {
        world.send_to_char(cn, &format!("You are already {}.", stance.as_str().to_ascii_lowercase()));
        return true;
    }
    // A stance-locking effect pins the body where the magic put it.
    if c.effects.values().any(|e| e.locked_stance.is_some() && !e.is_expired(world.now())) {
        world.send_to_char(cn, "Your body refuses to obey!");
        return true;
    }
    let name = c.name.clone();
    let room_id = c.location_id;
    if let Some(c) = world.character_mut(cn) {
        c.stance = stance;
    }
    let (self_msg, room_msg) = match stance {
        Stance::Standing => ("You climb to your feet.", format!("\r\n{name} stands up.")),
        Stance::Sitting => ("You sit down.", format!("\r\n{name} sits down.")),
        Stance::Lying => ("You lie down.", format!("\r\n{name} lies down.")),
    };
    world.send_to_char(cn, self_msg);
    world.broadcast_room(room_id, &room_msg, &[cn]);
    true
}

pub async fn cmd_sit(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    change_stance(world, cn, Stance::Sitting).await
}

pub async fn cmd_stand(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    change_stance(world, cn, Stance::Standing).await
}

pub async fn cmd_lie(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    change_stance(world, cn, Stance::Lying).await
}

/// Let go of a dead body: respawn at the waystone, at the cost of another
/// tether point.
pub async fn cmd_release(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    if c.status != Status::Dead {
        world.send_to_char(cn, "You cling to life yet; there is nothing to release.");
        return true;
    }
    let old_room = c.location_id;
    let name = c.name.clone();

    if !world.rooms.contains_key(&RESPAWN_ROOM_ID) {
        log::error!("Respawn room {RESPAWN_ROOM_ID} missing; cannot release {name}");
        world.send_to_char(cn, "Your soul cannot find its way back...");
        return true;
    }

    if let Some(room) = world.room_mut(old_room) {
        room.characters.remove(&cn);
    }
    world.broadcast_room(old_room, &format!("\r\n{name}'s body dissolves into motes of light."), &[cn]);

    if let Some(c) = world.character_mut(cn) {
        c.spiritual_tether = (c.spiritual_tether - 1).max(0);
        c.location_id = RESPAWN_ROOM_ID;
        c.respawn();
    }
    if let Some(room) = world.room_mut(RESPAWN_ROOM_ID) {
        room.characters.insert(cn);
    }

    let tether = world.character(cn).map(|c| c.spiritual_tether).unwrap_or(0);
    world.send_to_char(cn, "\r\n{WYou release your hold and are drawn back to the mortal plane...{x");
    if tether <= 0 {
        world.send_to_char(cn, "{r*** Your soul feels irrevocably severed! ***{x");
    }
    world.broadcast_room(RESPAWN_ROOM_ID, &format!("\r\n{name} coalesces beside the waystone."), &[cn]);

    let look = world
        .room(RESPAWN_ROOM_ID)
        .map(|r| r.look_string(world, cn));
    if let Some(look) = look {
        world.send_to_char(cn, &look);
    }

    if let Some(c) = world.character(cn) {
        if let Err(e) = world.db.save_character(c).await {
            log::error!("Saving released character {name} failed: {e}");
        }
    }
    true
}
