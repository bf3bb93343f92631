//! Attack, cast and use: the player-driven entries into the combat and
//! ability pipelines.

use ashenmoor_core::types::{ItemType, Stance};

use crate::abilities::{Ability, AbilityKind, TargetType};
use crate::character::CastingInfo;
use crate::combat::resolver::{resolve_ability_effect, resolve_physical_attack, resolve_ranged_attack};
use crate::combat::AttackSource;
use crate::world::{Actor, World};
use crate::{CharacterId, ItemId};

pub async fn cmd_attack(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some(character) = world.character(cn) else { return true };
    if character.stance != Stance::Standing {
        world.send_to_char(cn, "You must be standing to attack.");
        return true;
    }
    let room_id = character.location_id;
    let target_name = args.trim();
    if target_name.is_empty() {
        world.send_to_char(cn, "Attack whom?");
        return true;
    }

    // Mobs first, then other characters.
    let target = world
        .find_mob_in_room(room_id, target_name)
        .map(Actor::Mob)
        .or_else(|| {
            world
                .find_character_in_room(room_id, target_name)
                .filter(|&id| id != cn)
                .map(Actor::Char)
        });
    let Some(target) = target else {
        if world.find_character_in_room(room_id, target_name) == Some(cn) {
            world.send_to_char(cn, "You contemplate attacking yourself, but decide against it.");
        } else {
            world.send_to_char(cn, &format!("You don't see '{target_name}' here to attack."));
        }
        return true;
    };
    if !world.actor_is_alive(target) {
        world.send_to_char(cn, "They are already defeated.");
        return true;
    }

    if let Some(c) = world.character_mut(cn) {
        c.target = Some(target);
        c.is_fighting = true;
    }
    let display = world.actor_name(target);
    world.send_to_char(cn, &format!("You attack {display}!"));

    // Ranged weapons fire ammunition; everything else swings.
    let main_hand = world.character(cn).and_then(|c| c.main_hand());
    let weapon_type = main_hand.and_then(|id| world.template_of(id)).map(|t| t.item_type);

    match (main_hand, weapon_type) {
        (Some(weapon), Some(ItemType::RangedWeapon)) => {
            let Some(ammo) = find_ammo(world, cn) else {
                world.send_to_char(cn, "You have nothing left to shoot!");
                return true;
            };
            resolve_ranged_attack(world, Actor::Char(cn), target, weapon, ammo).await;
            consume_ammo(world, cn, ammo).await;
        }
        (Some(weapon), Some(t)) if t.is_weapon() => {
            resolve_physical_attack(
                world,
                Actor::Char(cn),
                target,
                AttackSource::Weapon(weapon),
                1.0,
                None,
            )
            .await;
        }
        _ => {
            resolve_physical_attack(world, Actor::Char(cn), target, AttackSource::Unarmed, 1.0, None)
                .await;
        }
    }
    true
}

/// First round of ammunition inside any quiver the character wears or
/// holds.
fn find_ammo(world: &World, cn: CharacterId) -> Option<ItemId> {
    let character = world.character(cn)?;
    let holdings: Vec<ItemId> = character
        .inventory
        .iter()
        .copied()
        .chain(character.unique_equipped())
        .collect();
    for container in holdings {
        if world.template_of(container).map(|t| t.item_type) != Some(ItemType::Quiver) {
            continue;
        }
        let contents = world.item(container).map(|i| i.contents.clone()).unwrap_or_default();
        for round in contents {
            if world.template_of(round).map(|t| t.item_type) == Some(ItemType::Ammo) {
                return Some(round);
            }
        }
    }
    None
}

/// A fired round is spent: pulled from its quiver and deleted.
async fn consume_ammo(world: &mut World, cn: CharacterId, ammo: ItemId) {
    let quiver = world
        .character(cn)
        .map(|c| {
            c.inventory
                .iter()
                .copied()
                .chain(c.unique_equipped())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
        .into_iter()
        .find(|&id| world.item(id).map_or(false, |i| i.contents.contains(&ammo)));

    if let Some(quiver_id) = quiver {
        if let Some(container) = world.item_mut(quiver_id) {
            container.contents.retain(|&id| id != ammo);
        }
    }
    world.items.remove(&ammo);
    if let Err(e) = world.db.delete_item_instance(ammo).await {
        log::error!("Deleting spent ammo {ammo} failed: {e}");
    }
}

/// Match the longest known ability key at the head of the argument string.
/// Ability names contain spaces, so a plain word split cannot work.
fn parse_ability_invocation<'a>(
    world: &World,
    args: &'a str,
    known: impl Iterator<Item = String>,
) -> Option<(Ability, &'a str)> {
    let lower = args.to_ascii_lowercase();
    let mut keys: Vec<String> = known.collect();
    keys.sort_unstable_by_key(|k| std::cmp::Reverse(k.len()));
    for key in keys {
        if lower == key || lower.starts_with(&format!("{key} ")) {
            if let Some(ability) = world.ability(&key) {
                return Some((ability.clone(), args[key.len()..].trim()));
            }
        }
    }
    None
}

pub async fn cmd_cast(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        let known = world
            .character(cn)
            .map(|c| c.known_spells.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        world.send_to_char(cn, "Cast which spell?");
        if !known.is_empty() {
            world.send_to_char(cn, &format!("Known spells: {known}."));
        }
        return true;
    }

    let known = world
        .character(cn)
        .map(|c| c.known_spells.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    let Some((ability, target_args)) = parse_ability_invocation(world, args.trim(), known.into_iter())
    else {
        world.send_to_char(cn, "You don't know any spell by that name.");
        return true;
    };
    if ability.kind != AbilityKind::Spell {
        world.send_to_char(cn, "That is not a spell.");
        return true;
    }
    begin_ability(world, cn, ability, target_args).await
}

pub async fn cmd_use(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        let known = world
            .character(cn)
            .map(|c| c.known_abilities.iter().cloned().collect::<Vec<_>>().join(", "))
            .unwrap_or_default();
        world.send_to_char(cn, "Use which ability?");
        if !known.is_empty() {
            world.send_to_char(cn, &format!("Known abilities: {known}."));
        }
        return true;
    }

    let known = world
        .character(cn)
        .map(|c| c.known_abilities.iter().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    let Some((ability, target_args)) = parse_ability_invocation(world, args.trim(), known.into_iter())
    else {
        world.send_to_char(cn, "You know no such ability.");
        return true;
    };
    if ability.kind != AbilityKind::Ability {
        world.send_to_char(cn, "That must be cast, not used.");
        return true;
    }
    begin_ability(world, cn, ability, target_args).await
}

/// Shared requirements gate and target resolution, then either an instant
/// resolution or a timed cast.
async fn begin_ability(
    world: &mut World,
    cn: CharacterId,
    ability: Ability,
    target_args: &str,
) -> bool {
    let Some(character) = world.character(cn) else { return true };

    if character.level < ability.level_req {
        world.send_to_char(
            cn,
            &format!(
                "You are not experienced enough for {} (requires level {}).",
                ability.name, ability.level_req
            ),
        );
        return true;
    }
    if character.essence < ability.cost {
        world.send_to_char(
            cn,
            &format!(
                "You don't have enough essence for {} (requires {}, have {}).",
                ability.name, ability.cost as i64, character.essence as i64
            ),
        );
        return true;
    }
    // Silence gags spellcasting outright.
    if ability.kind == AbilityKind::Spell {
        let now = world.now();
        let silenced = character
            .effects
            .values()
            .any(|e| e.kind == crate::effect::EffectKind::Silence && !e.is_expired(now));
        if silenced {
            world.send_to_char(cn, "{RYou open your mouth, but no words come out!{x");
            return true;
        }
    }

    let room_id = character.location_id;
    let target: Option<Actor> = match ability.target_type {
        TargetType::SelfOnly => Some(Actor::Char(cn)),
        TargetType::None | TargetType::Area => None,
        TargetType::Char => {
            let name = target_args.trim();
            if name.is_empty() {
                world.send_to_char(cn, &format!("Who do you want to target with {}?", ability.name));
                return true;
            }
            world.find_character_in_room(room_id, name).map(Actor::Char)
        }
        TargetType::Mob => {
            let name = target_args.trim();
            if name.is_empty() {
                world.send_to_char(cn, &format!("What do you want to target with {}?", ability.name));
                return true;
            }
            world.find_mob_in_room(room_id, name).map(Actor::Mob)
        }
        TargetType::CharOrMob => {
            let name = target_args.trim();
            if name.is_empty() {
                // Fall back to the current combat target.
                world.character(cn).and_then(|c| c.target)
            } else {
                world
                    .find_mob_in_room(room_id, name)
                    .map(Actor::Mob)
                    .or_else(|| world.find_character_in_room(room_id, name).map(Actor::Char))
            }
        }
    };

    let needs_target = !matches!(
        ability.target_type,
        TargetType::None | TargetType::Area | TargetType::SelfOnly
    );
    if needs_target {
        let valid = target.map_or(false, |t| world.actor_is_alive(t));
        if !valid {
            world.send_to_char(cn, "You don't see that target here.");
            return true;
        }
    }

    if ability.cast_time > 0.0 {
        // Timed cast: the ticker resolves it when the roundtime runs out.
        let target_display = match target {
            Some(t) if t != Actor::Char(cn) => format!(" on {}", world.actor_name(t)),
            Some(_) => " on yourself".to_string(),
            None => String::new(),
        };
        if let Some(c) = world.character_mut(cn) {
            c.casting = Some(CastingInfo {
                key: ability.key.clone(),
                display_name: ability.name.clone(),
                target,
            });
            c.roundtime = ability.cast_time;
        }
        world.send_to_char(cn, &format!("You begin casting {}{target_display}...", ability.name));
        return true;
    }

    // Instant: pay and resolve on the spot.
    if let Some(c) = world.character_mut(cn) {
        c.essence -= ability.cost;
        c.dirty = true;
    }
    resolve_ability_effect(world, cn, target, &ability).await;

    let rt_penalty = world
        .character(cn)
        .map(|c| c.total_av(world) as f64 * ashenmoor_core::constants::ROUNDTIME_PER_AV)
        .unwrap_or(0.0);
    if ability.roundtime > 0.0 {
        if let Some(c) = world.character_mut(cn) {
            c.roundtime = ability.roundtime + rt_penalty;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;

    #[tokio::test]
    async fn multi_word_ability_keys_parse_with_targets() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let known = vec!["magic missile".to_string(), "mage armor".to_string()];

        let (ability, rest) =
            parse_ability_invocation(&world, "magic missile rat", known.clone().into_iter()).unwrap();
        assert_eq!(ability.key, "magic missile");
        assert_eq!(rest, "rat");

        let (ability, rest) =
            parse_ability_invocation(&world, "mage armor", known.into_iter()).unwrap();
        assert_eq!(ability.key, "mage armor");
        assert_eq!(rest, "");
    }

    #[tokio::test]
    async fn unknown_spells_do_not_resolve() {
        let world = build_world().await;
        let known: Vec<String> = vec![];
        assert!(parse_ability_invocation(&world, "magic missile rat", known.into_iter()).is_none());
    }

    #[tokio::test]
    async fn timed_cast_sets_casting_state_and_roundtime() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.known_spells.insert("mage armor".into());
            c.essence = 50.0;
        }

        cmd_cast(&mut world, 1, "mage armor").await;
        let c = world.character(1).unwrap();
        let casting = c.casting.as_ref().expect("casting in progress");
        assert_eq!(casting.key, "mage armor");
        assert_eq!(casting.target, Some(Actor::Char(1)));
        assert!(c.roundtime > 0.0);
        // Essence is only paid when the cast completes.
        assert_eq!(c.essence, 50.0);
    }

    #[tokio::test]
    async fn casting_without_essence_is_refused() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.known_spells.insert("mage armor".into());
            c.essence = 0.0;
        }
        cmd_cast(&mut world, 1, "mage armor").await;
        assert!(world.character(1).unwrap().casting.is_none());
    }

    #[tokio::test]
    async fn attack_requires_a_present_target() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        cmd_attack(&mut world, 1, "dragon").await;
        let c = world.character(1).unwrap();
        assert!(!c.is_fighting);
        assert!(c.target.is_none());
    }
}
