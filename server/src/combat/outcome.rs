//! Post-damage consequences: applying HP loss, concentration and meditation
//! breaks, durability decay, and defeat with its XP, loot and death-timer
//! rules.

use rand::Rng;

use ashenmoor_core::constants::{
    DEATH_COINAGE_DROP_RATE, DEATH_XP_PENALTY_RATE, DURABILITY_LOSS_CHANCE, GROUP_XP_MULTIPLIER,
};
use ashenmoor_core::dice;
use ashenmoor_core::progression;
use ashenmoor_core::stats::Stat;
use ashenmoor_core::text;
use ashenmoor_core::types::{ItemType, Stance, Status};

use crate::db::items::ItemOwner;
use crate::world::{Actor, World};
use crate::{CharacterId, ItemId};

use super::hit::HitResult;
use super::damage::DamageInfo;
use super::AttackSource;

/// XP a mob kill is worth before group math.
const XP_PER_MOB_LEVEL: i64 = 50;

/// Floor HP at zero. Returns the HP remaining.
pub fn apply_damage(world: &mut World, target: Actor, damage: i64) -> f64 {
    match target {
        Actor::Char(id) => {
            if let Some(c) = world.character_mut(id) {
                c.hp = (c.hp - damage as f64).max(0.0);
                c.dirty = true;
                c.hp
            } else {
                0.0
            }
        }
        Actor::Mob(id) => {
            if let Some(m) = world.mob_mut(id) {
                m.hp = (m.hp - damage as f64).max(0.0);
                m.hp
            } else {
                0.0
            }
        }
    }
}

/// A caster who takes damage rolls Spellcraft against `max(10, damage/2)`
/// or loses the spell (and the casting roundtime).
pub fn check_concentration(world: &mut World, target: Actor, damage: i64) {
    let Actor::Char(id) = target else { return };
    if damage <= 0 {
        return;
    }
    let Some(character) = world.character(id) else { return };
    let Some(casting) = character.casting.clone() else { return };

    let dc = (damage / 2).max(10);
    let skill = character.skill_modifier(world, "spellcraft");
    let roll = dice::d20(&mut world.rng);
    if roll + skill >= dc {
        return;
    }

    if let Some(c) = world.character_mut(id) {
        c.casting = None;
        c.roundtime = 0.0;
    }
    world.send_to_char(
        id,
        &format!(
            "{{RThe pain of the blow causes you to lose concentration on {}!{{x",
            casting.display_name
        ),
    );
}

/// Any real damage snaps a meditating character back to the waking world.
pub fn break_meditation(world: &mut World, target: Actor, damage: i64) {
    let Actor::Char(id) = target else { return };
    if damage <= 0 {
        return;
    }
    let Some(character) = world.character_mut(id) else { return };
    if character.status != Status::Meditating {
        return;
    }
    character.status = Status::Alive;
    let name = character.name.clone();
    let room = character.location_id;
    world.send_to_char(id, "{RThe force of the blow shatters your concentration!{x");
    world.broadcast_room(
        room,
        &format!("\r\n{name} is snapped out of their meditative trance by the attack!"),
        &[id],
    );
}

/// On a landed hit: the attacker's weapon and one random armor piece of a
/// character defender each independently risk a condition point. Reaching
/// zero destroys the item on the spot.
pub async fn handle_durability(
    world: &mut World,
    attacker: Actor,
    target: Actor,
    source: &AttackSource,
) {
    if let (Actor::Char(attacker_id), AttackSource::Weapon(weapon_id)) = (attacker, source) {
        let chance: f64 = world.rng.gen_range(0.0..1.0);
        if chance < DURABILITY_LOSS_CHANCE {
            decay_item(world, attacker_id, *weapon_id).await;
        }
    }

    if let Actor::Char(defender_id) = target {
        let armor_pieces: Vec<ItemId> = world
            .character(defender_id)
            .map(|c| {
                c.unique_equipped()
                    .into_iter()
                    .filter(|&id| {
                        world
                            .template_of(id)
                            .map_or(false, |t| t.item_type == ItemType::Armor)
                    })
                    .collect()
            })
            .unwrap_or_default();
        if armor_pieces.is_empty() {
            return;
        }
        let chance: f64 = world.rng.gen_range(0.0..1.0);
        if chance < DURABILITY_LOSS_CHANCE {
            let pick = world.rng.gen_range(0..armor_pieces.len());
            decay_item(world, defender_id, armor_pieces[pick]).await;
        }
    }
}

/// Knock one condition point off an item an owner is wearing or wielding;
/// destroy it at zero. Persists immediately.
async fn decay_item(world: &mut World, owner: CharacterId, item_id: ItemId) {
    let Some(instance) = world.item_mut(item_id) else { return };
    instance.condition = (instance.condition - 1).max(0);
    let condition = instance.condition;
    let name = world.item_name(item_id);

    if condition > 0 {
        if let Err(e) = world.db.update_item_condition(item_id, condition).await {
            log::error!("Persisting condition of item {item_id} failed: {e}");
        }
        if condition <= 10 {
            world.send_to_char(owner, &format!("{{yYour {} is badly damaged.{{x", text::strip_article(&name)));
        }
        return;
    }

    // Destroyed: unequip every slot holding it (both hands for two-handers),
    // drop from hands, forget the instance, delete the row.
    if let Some(character) = world.character_mut(owner) {
        character.equipment.retain(|_, &mut held| held != item_id);
        character.inventory.retain(|&held| held != item_id);
        character.dirty = true;
    }
    world.items.remove(&item_id);
    if let Err(e) = world.db.delete_item_instance(item_id).await {
        log::error!("Deleting destroyed item {item_id} failed: {e}");
    }
    world.send_to_char(
        owner,
        &format!("{{RYour {} shatters into pieces!{{x", text::strip_article(&name)),
    );
}

/// Pour XP into a character's pool, with the "pool is full" whisper for
/// solo hunters. The cap is exactly effective intellect times 100.
pub fn award_xp(world: &mut World, character_id: CharacterId, amount: f64, quiet_when_full: bool) {
    if amount <= 0.0 {
        return;
    }
    let Some(character) = world.character(character_id) else { return };
    let in_group = character.group_id.is_some();
    let cap = progression::xp_pool_cap(character.stat_value(world, Stat::Intellect));

    let added = world
        .character_mut(character_id)
        .map(|c| c.add_xp_to_pool(cap, amount))
        .unwrap_or(0.0);

    if added > 0.0 {
        world.send_to_char(
            character_id,
            &format!("You gain {} experience points into your pool.", added as i64),
        );
    } else if !in_group && !quiet_when_full {
        world.send_to_char(
            character_id,
            "Your mind cannot hold any more raw experience right now.",
        );
    }
}

/// Roll a mob's loot table: a coin amount and the item templates that came
/// up.
fn determine_loot(world: &mut World, mob_template_id: i64) -> (i64, Vec<i64>) {
    let Some(template) = world.mob_templates.get(&mob_template_id) else {
        return (0, Vec::new());
    };
    let loot = template.loot.clone();

    let coins = if loot.coinage_max > 0 {
        world.rng.gen_range(0..=loot.coinage_max)
    } else {
        0
    };

    let mut items = Vec::new();
    for rule in &loot.items {
        let roll: f64 = world.rng.gen_range(0.0..1.0);
        if roll < rule.chance {
            items.push(rule.template_id);
        }
    }
    (coins, items)
}

/// Defeat resolution once HP hits zero. `attacker` is `None` for unowned
/// deaths (DoTs, traps) which award nothing to anyone.
pub async fn handle_defeat(world: &mut World, attacker: Option<Actor>, target: Actor) {
    match target {
        Actor::Mob(mob_id) => handle_mob_defeat(world, attacker, mob_id).await,
        Actor::Char(char_id) => handle_character_defeat(world, char_id).await,
    }
}

async fn handle_mob_defeat(world: &mut World, attacker: Option<Actor>, mob_id: crate::MobId) {
    let now = world.now();
    let (mob_name, mob_level, template_id, room_id) = {
        let Some(mob) = world.mob_mut(mob_id) else { return };
        mob.die(now);
        (mob.name.clone(), mob.level as i64, mob.template_id, mob.room_id)
    };
    let mob_title = text::capitalize(&mob_name);

    let killer = match attacker {
        Some(Actor::Char(id)) => Some(id),
        _ => None,
    };
    let attacker_name = attacker
        .map(|a| world.actor_name(a))
        .unwrap_or_else(|| "Something".into());
    log::info!("{attacker_name} has defeated {mob_name} in room {room_id}.");

    if let Some(killer_id) = killer {
        world.send_to_char(killer_id, &format!("You have slain {mob_title}!"));
        world.broadcast_room(
            room_id,
            &format!("\r\n{} has slain {mob_title}!", text::capitalize(&attacker_name)),
            &[killer_id],
        );
    } else {
        world.broadcast_room(room_id, &format!("\r\n{mob_title} collapses!"), &[]);
    }

    let (coins, item_templates) = determine_loot(world, template_id);
    let jitter = world.rng.gen_range(-(XP_PER_MOB_LEVEL / 2)..=(XP_PER_MOB_LEVEL / 2));
    let xp_gain = (mob_level * XP_PER_MOB_LEVEL + jitter).max(1) as f64;

    if let Some(killer_id) = killer {
        let present = world.present_group_members(killer_id);
        if present.len() >= 2 {
            // Group kill: 80% reward, integer-equal split, remainder coins
            // to the leader.
            let group_total = (xp_gain * GROUP_XP_MULTIPLIER).floor();
            let per_member = (group_total / present.len() as f64).floor();
            let coins_each = coins / present.len() as i64;
            let coin_remainder = coins % present.len() as i64;

            if let Some(group_id) = world.character(killer_id).and_then(|c| c.group_id) {
                world.broadcast_group(
                    group_id,
                    &format!(
                        "{{yYour group receives {} XP and {}!{{x",
                        group_total as i64,
                        text::format_coinage(coins)
                    ),
                    &[],
                );
                for &member in &present {
                    award_xp(world, member, per_member, true);
                    if let Some(c) = world.character_mut(member) {
                        c.coinage += coins_each;
                        c.dirty = true;
                    }
                }
                let leader = world.groups.get(&group_id).map(|g| g.leader);
                if let Some(leader_id) = leader {
                    if let Some(c) = world.character_mut(leader_id) {
                        c.coinage += coin_remainder;
                    }
                }
            }
        } else {
            award_xp(world, killer_id, xp_gain, false);
            if coins > 0 {
                if let Some(room) = world.room_mut(room_id) {
                    room.coinage += coins;
                    room.dirty = true;
                }
                let total = world.room(room_id).map_or(coins, |r| r.coinage);
                if let Err(e) = world.db.update_room_coinage(room_id, total).await {
                    log::error!("Persisting coinage for room {room_id} failed: {e}");
                }
                world.broadcast_room(
                    room_id,
                    &format!("\r\n{} falls from {mob_title}!", text::format_coinage(coins)),
                    &[],
                );
            }
        }
    }

    // Item drops hit the floor for everyone, group or not.
    if !item_templates.is_empty() {
        let mut dropped_names = Vec::new();
        for template_id in item_templates {
            match world
                .db
                .create_item_instance(template_id, ItemOwner::Room(room_id))
                .await
            {
                Ok(row) => {
                    let instance = crate::item::ItemInstance::from_row(&row);
                    let name = world
                        .item_template(template_id)
                        .map(|t| t.name.clone())
                        .unwrap_or_else(|| format!("item #{template_id}"));
                    world.items.insert(instance.id, instance);
                    if let Some(room) = world.room_mut(room_id) {
                        room.items.push(row.id);
                    }
                    dropped_names.push(name);
                }
                Err(e) => log::error!("Creating loot instance of template {template_id} failed: {e}"),
            }
        }
        if !dropped_names.is_empty() {
            world.broadcast_room(
                room_id,
                &format!("\r\n{mob_title}'s corpse drops: {}.", dropped_names.join(", ")),
                &[],
            );
        }
    }
}

async fn handle_character_defeat(world: &mut World, char_id: CharacterId) {
    let now = world.now();
    let (room_id, name, vitality, coin_drop) = {
        let Some(character) = world.character_mut(char_id) else { return };
        if character.status != Status::Alive {
            return;
        }
        character.hp = 0.0;
        character.status = Status::Dying;
        character.stance = Stance::Lying;
        character.is_fighting = false;
        character.target = None;
        character.casting = None;

        // Pool drains entirely; a tenth of the progress into the current
        // level drains from the total, never below the level floor.
        character.xp_pool = 0.0;
        let floor = progression::xp_floor_for_level(character.level);
        let progress = (character.xp_total - floor).max(0.0);
        let penalty = (progress * DEATH_XP_PENALTY_RATE).floor();
        character.xp_total = (character.xp_total - penalty).max(floor);

        let vitality = character.stats.get(Stat::Vitality).max(1);
        character.death_timer_ends_at = Some(now + vitality as f64);

        let coin_drop = (character.coinage as f64 * DEATH_COINAGE_DROP_RATE) as i64;
        character.coinage -= coin_drop;
        character.dirty = true;
        (character.location_id, character.name.clone(), vitality, coin_drop)
    };

    log::info!("Character {name} is dying in room {room_id} (timer {vitality}s).");
    world.send_to_char(char_id, "{rYou feel some of your experience drain away...{x");

    if coin_drop > 0 {
        if let Some(room) = world.room_mut(room_id) {
            room.coinage += coin_drop;
            room.dirty = true;
        }
        let total = world.room(room_id).map_or(coin_drop, |r| r.coinage);
        if let Err(e) = world.db.update_room_coinage(room_id, total).await {
            log::error!("Persisting coinage for room {room_id} failed: {e}");
        }
        world.broadcast_room(
            room_id,
            &format!("\r\nSome coins fall from {name} as they collapse!"),
            &[char_id],
        );
    }

    world.send_to_char(char_id, "\r\n{r*** YOU ARE DYING! ***{x");
    world.broadcast_room(
        room_id,
        &format!("\r\n{name} collapses to the ground, dying!"),
        &[char_id],
    );
}

/// The hit/crit lines everyone sees once damage is settled.
pub fn send_attack_messages(
    world: &World,
    attacker: Actor,
    target: Actor,
    hit: &HitResult,
    info: &DamageInfo,
    final_damage: i64,
) {
    let attacker_name = text::capitalize(&world.actor_name(attacker));
    let target_name = text::capitalize(&world.actor_name(target));
    let hit_desc = if hit.is_crit { "{rCRITICALLY HIT{x" } else { "hit" } ;

    world.send_to_actor(
        attacker,
        &format!(
            "You {hit_desc} {target_name} with your {} for {{y{final_damage}{{x damage!",
            text::strip_article(&info.attack_name)
        ),
    );
    if let Actor::Char(target_id) = target {
        let (hp, max_hp) = (world.actor_hp(target), world.actor_max_hp(target));
        world.send_to_char(
            target_id,
            &format!(
                "{{R{attacker_name} hits you with {} for {{y{final_damage}{{x damage!{{x ({}/{} HP)",
                info.attack_name, hp as i64, max_hp as i64
            ),
        );
    }
    if let Some(room_id) = world.actor_room(attacker) {
        let exclude = [attacker, target]
            .iter()
            .filter_map(|a| match a {
                Actor::Char(id) => Some(*id),
                Actor::Mob(_) => None,
            })
            .collect::<Vec<_>>();
        let verb = if hit.is_crit { "critically hits" } else { "hits" };
        world.broadcast_room(
            room_id,
            &format!("\r\n{attacker_name} {verb} {target_name}!"),
            &exclude,
        );
    }
}
