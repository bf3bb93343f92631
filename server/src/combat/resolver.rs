//! Attack and ability coordination: walks the hit, block/parry and damage
//! phases in order, hands consequences to `outcome`, and owns the effect
//! apply/expire lifecycle.

use rand::Rng;

use ashenmoor_core::constants::{MISS_ROUNDTIME, ROUNDTIME_PER_AV, UNARMED_SPEED};
use ashenmoor_core::dice;
use ashenmoor_core::text;
use ashenmoor_core::types::{Status};

use crate::abilities::{fill_placeholders, Ability, AbilityEffectType, AoeScope, EffectDetails, TargetType};
use crate::effect::{Effect, EffectKind, EffectStat};
use crate::mob::AttackKind;
use crate::world::{Actor, World};
use crate::CharacterId;

use super::damage::{
    apply_weather, calculate_magical_damage, calculate_physical_damage, mitigate_magical,
    mitigate_physical,
};
use super::hit::{automatic_hit, check_magical_hit, check_physical_hit, roll_block, roll_parry};
use super::outcome::{
    apply_damage, break_meditation, check_concentration, handle_defeat, handle_durability,
    send_attack_messages,
};
use super::AttackSource;

/// Swing speed and display name of whatever is attacking.
fn source_speed(world: &World, source: &AttackSource) -> f64 {
    match source {
        AttackSource::Weapon(item_id) => world
            .template_of(*item_id)
            .map_or(UNARMED_SPEED, |t| t.stats.speed),
        AttackSource::Natural(attack) => attack.speed,
        AttackSource::Unarmed => UNARMED_SPEED,
    }
}

fn armor_roundtime_penalty(world: &World, attacker: Actor) -> f64 {
    match attacker {
        Actor::Char(_) => world.actor_total_av(attacker) as f64 * ROUNDTIME_PER_AV,
        Actor::Mob(_) => 0.0,
    }
}

/// Attacked mobs that were idle turn and fight back.
fn provoke(world: &mut World, attacker: Actor, target: Actor) {
    if let Actor::Mob(mob_id) = target {
        if let Some(mob) = world.mob_mut(mob_id) {
            if mob.is_alive() && !mob.is_fighting {
                mob.target = Some(attacker);
                mob.is_fighting = true;
            }
        }
    }
}

/// Resolve one physical attack act end to end.
pub async fn resolve_physical_attack(
    world: &mut World,
    attacker: Actor,
    target: Actor,
    source: AttackSource,
    damage_multiplier: f64,
    ability_mods: Option<&EffectDetails>,
) {
    if !world.actor_is_alive(attacker) || !world.actor_is_alive(target) {
        return;
    }
    if world.actor_room(attacker) != world.actor_room(target) {
        return;
    }

    let wpn_speed = source_speed(world, &source);
    let rt_penalty = armor_roundtime_penalty(world, attacker);
    let slow = world.actor_slow_penalty(attacker);
    let attacker_name = text::capitalize(&world.actor_name(attacker));
    let target_name = world.actor_name(target);

    provoke(world, attacker, target);

    let mut hit_modifier = ability_mods.map_or(0, |a| a.bonus_hit);
    let attacker_sees = world.actor_can_see(attacker);
    if !attacker_sees {
        hit_modifier -= 4;
    }
    if attacker_sees && !world.actor_can_see(target) {
        hit_modifier += 4;
    }

    let use_rar = matches!(
        &source,
        AttackSource::Natural(attack) if attack.attack_type == AttackKind::Ranged
    );

    let hit = check_physical_hit(world, attacker, target, use_rar, hit_modifier);

    if !hit.is_hit {
        let rating_label = if use_rar { "RAR" } else { "MAR" };
        world.send_to_actor(
            attacker,
            &format!(
                "You miss {target_name}. {{K[Roll: {} + {rating_label}: {} vs DV: {}]{{x",
                hit.roll, hit.attacker_rating, hit.target_dv
            ),
        );
        world.send_to_actor(target, &format!("{attacker_name}'s attack misses you."));
        world.actor_set_roundtime(attacker, MISS_ROUNDTIME + rt_penalty + slow);
        if world.actor_is_hidden(attacker) {
            world.actor_clear_hidden(attacker);
        }
        return;
    }

    // Phase B: parry, then block.
    if roll_parry(world, target) {
        world.send_to_actor(
            attacker,
            &format!("{{y{} parries your attack!{{x", text::capitalize(&target_name)),
        );
        world.send_to_actor(target, &format!("{{gYou parry {attacker_name}'s attack!{{x"));
        world.actor_set_roundtime(attacker, 1.0 + rt_penalty + slow);
        return;
    }
    if roll_block(world, target) {
        world.send_to_actor(
            attacker,
            &format!("{{y{} blocks your attack with their shield!{{x", text::capitalize(&target_name)),
        );
        world.send_to_actor(
            target,
            &format!("{{gYou block {attacker_name}'s attack with your shield!{{x"),
        );
        world.actor_set_roundtime(attacker, wpn_speed + rt_penalty + slow);
        return;
    }

    // Phase C.
    let mut info = calculate_physical_damage(world, attacker, &source, hit.is_crit, ability_mods);
    if (damage_multiplier - 1.0).abs() > f64::EPSILON {
        info.pre_mitigation = (info.pre_mitigation as f64 * damage_multiplier) as i64;
    }
    let final_damage = mitigate_physical(world, target, &info);

    check_concentration(world, target, final_damage);
    handle_durability(world, attacker, target, &source).await;
    apply_damage(world, target, final_damage);
    send_attack_messages(world, attacker, target, &hit, &info, final_damage);
    break_meditation(world, target, final_damage);

    world.actor_set_roundtime(attacker, wpn_speed + rt_penalty + slow);
    if world.actor_is_hidden(attacker) {
        world.actor_clear_hidden(attacker);
    }

    if world.actor_hp(target) <= 0.0 {
        handle_defeat(world, Some(attacker), target).await;
    }
}

/// Ranged attack: launcher plus one round of ammunition. The caller has
/// already located (and will consume) the ammo.
pub async fn resolve_ranged_attack(
    world: &mut World,
    attacker: Actor,
    target: Actor,
    weapon: crate::ItemId,
    ammo: crate::ItemId,
) {
    if !world.actor_is_alive(attacker) || !world.actor_is_alive(target) {
        return;
    }
    if world.actor_room(attacker) != world.actor_room(target) {
        return;
    }

    let wpn_speed = world.template_of(weapon).map_or(UNARMED_SPEED, |t| t.stats.speed);
    let rt_penalty = armor_roundtime_penalty(world, attacker);
    let slow = world.actor_slow_penalty(attacker);
    let ammo_name = world.item_name(ammo);
    let attacker_name = text::capitalize(&world.actor_name(attacker));
    let target_name = world.actor_name(target);

    provoke(world, attacker, target);

    // Firing blind is much worse than swinging blind.
    let mut hit_modifier = 0;
    let attacker_sees = world.actor_can_see(attacker);
    if !attacker_sees {
        hit_modifier -= 8;
    }
    if attacker_sees && !world.actor_can_see(target) {
        hit_modifier += 4;
    }

    let hit = check_physical_hit(world, attacker, target, true, hit_modifier);
    world.actor_set_roundtime(attacker, wpn_speed + rt_penalty + slow);

    if !hit.is_hit {
        world.send_to_actor(
            attacker,
            &format!(
                "Your {} misses {target_name}. {{K[Roll: {} + RAR: {} vs DV: {}]{{x",
                text::strip_article(&ammo_name),
                hit.roll,
                hit.attacker_rating,
                hit.target_dv
            ),
        );
        world.send_to_actor(target, &format!("{attacker_name}'s {ammo_name} flies past you."));
        if let Some(room_id) = world.actor_room(attacker) {
            world.broadcast_room(
                room_id,
                &format!("\r\n{attacker_name}'s shot goes wide of {target_name}!"),
                &actor_char_ids(&[attacker, target]),
            );
        }
        return;
    }

    if roll_block(world, target) {
        world.send_to_actor(
            attacker,
            &format!("{{y{} blocks your shot with their shield!{{x", text::capitalize(&target_name)),
        );
        world.send_to_actor(target, &format!("{{gYou block {attacker_name}'s shot!{{x"));
        return;
    }

    let mut info = calculate_physical_damage(
        world,
        attacker,
        &AttackSource::Weapon(weapon),
        hit.is_crit,
        None,
    );
    info.pre_mitigation += world.item(ammo).map_or(0, |i| i.stats.damage_bonus);
    info.attack_name = ammo_name;
    let final_damage = mitigate_physical(world, target, &info);

    check_concentration(world, target, final_damage);
    apply_damage(world, target, final_damage);
    send_attack_messages(world, attacker, target, &hit, &info, final_damage);
    break_meditation(world, target, final_damage);

    if world.actor_is_hidden(attacker) {
        world.actor_clear_hidden(attacker);
    }
    if world.actor_hp(target) <= 0.0 {
        handle_defeat(world, Some(attacker), target).await;
    }
}

/// Spell damage against one target.
pub async fn resolve_magical_attack(
    world: &mut World,
    caster: Actor,
    target: Actor,
    ability: &Ability,
) {
    if !world.actor_is_alive(caster) || !world.actor_is_alive(target) {
        return;
    }

    let details = &ability.effect;
    let caster_name = text::capitalize(&world.actor_name(caster));
    let target_name = world.actor_name(target);

    provoke(world, caster, target);

    let hit = if details.always_hits {
        automatic_hit()
    } else {
        let result = check_magical_hit(world, caster, target, details.school);
        if !result.is_hit {
            world.send_to_actor(
                caster,
                &format!(
                    "Your {} misses {target_name}. {{K[Roll: {} + {} vs DV: {}]{{x",
                    ability.name, result.roll, result.attacker_rating, result.target_dv
                ),
            );
            world.send_to_actor(target, &format!("{caster_name}'s {} misses you.", ability.name));
            return;
        }
        result
    };

    let mut info = calculate_magical_damage(world, caster, details, hit.is_crit);
    info.attack_name = ability.name.clone();
    if let Some(room_id) = world.actor_room(caster) {
        apply_weather(world, room_id, &mut info);
    }
    let final_damage = mitigate_magical(world, target, &info);

    apply_damage(world, target, final_damage);
    send_attack_messages(world, caster, target, &hit, &info, final_damage);
    break_meditation(world, target, final_damage);
    check_concentration(world, target, final_damage);

    if hit.is_hit {
        if let Some(rider) = details.applies_effect.clone() {
            apply_effect(world, caster, target, ability, &rider);
        }
    }

    if world.actor_is_hidden(caster) {
        world.actor_clear_hidden(caster);
    }
    if world.actor_hp(target) <= 0.0 {
        handle_defeat(world, Some(caster), target).await;
    }
}

fn actor_char_ids(actors: &[Actor]) -> Vec<CharacterId> {
    actors
        .iter()
        .filter_map(|a| match a {
            Actor::Char(id) => Some(*id),
            Actor::Mob(_) => None,
        })
        .collect()
}

/// Entry point for a finished cast or ability use: finds targets and walks
/// the effect-type dispatch.
pub async fn resolve_ability_effect(
    world: &mut World,
    caster_id: CharacterId,
    target: Option<Actor>,
    ability: &Ability,
) {
    let caster = Actor::Char(caster_id);
    let Some(room_id) = world.actor_room(caster) else { return };
    let caster_name = text::capitalize(&world.actor_name(caster));

    if let Some(msg) = &ability.messages.caster_self_complete {
        world.send_to_char(caster_id, &fill_placeholders(msg, &caster_name, ""));
    }
    if let Some(msg) = &ability.messages.room_complete {
        world.broadcast_room(
            room_id,
            &format!("\r\n{}", fill_placeholders(msg, &caster_name, "")),
            &[caster_id],
        );
    }

    // Area sweeps fan out over scope-eligible occupants and finish here.
    if ability.target_type == TargetType::Area {
        let targets = area_targets(world, caster_id, room_id, ability.effect.aoe_target_scope);
        if targets.is_empty() {
            world.send_to_char(caster_id, "There are no valid targets here.");
            return;
        }
        for t in targets {
            match ability.effect_type {
                AbilityEffectType::Damage => {
                    resolve_magical_attack(world, caster, t, ability).await
                }
                AbilityEffectType::Heal => apply_heal(world, caster, t, &ability.effect),
                AbilityEffectType::Buff | AbilityEffectType::Debuff => {
                    apply_effect(world, caster, t, ability, &ability.effect)
                }
                _ => {}
            }
        }
        if world.actor_is_hidden(caster) {
            world.actor_clear_hidden(caster);
        }
        return;
    }

    // Validate the remembered target: still here, still breathing.
    let needs_target = !matches!(ability.target_type, TargetType::None | TargetType::SelfOnly);
    let target = match ability.target_type {
        TargetType::SelfOnly => Some(caster),
        _ => target,
    };
    if needs_target {
        let valid = target.map_or(false, |t| {
            world.actor_is_alive(t) && world.actor_room(t) == Some(room_id)
        });
        if !valid {
            world.send_to_char(caster_id, "Your target is no longer valid.");
            return;
        }
    }

    match ability.effect_type {
        AbilityEffectType::Damage => {
            let Some(primary) = target else { return };
            if ability.effect.is_cone_aoe {
                let extra = secondary_mob_targets(
                    world,
                    room_id,
                    primary,
                    ability.effect.max_aoe_targets.saturating_sub(1),
                );
                for t in std::iter::once(primary).chain(extra) {
                    resolve_magical_attack(world, caster, t, ability).await;
                }
            } else {
                resolve_magical_attack(world, caster, primary, ability).await;
            }
        }
        AbilityEffectType::Heal => {
            if let Some(t) = target {
                apply_heal(world, caster, t, &ability.effect);
            }
        }
        AbilityEffectType::Buff | AbilityEffectType::Debuff => {
            if let Some(t) = target {
                apply_effect(world, caster, t, ability, &ability.effect);
            }
        }
        AbilityEffectType::ModifiedAttack => {
            let Some(primary) = target else { return };
            resolve_modified_attack(world, caster_id, primary, ability).await;
        }
        AbilityEffectType::StunAttempt => {
            let Some(t) = target else { return };
            resolve_stun_attempt(world, caster_id, t, ability);
        }
        AbilityEffectType::Cure => {
            if let Some(t) = target {
                resolve_cure(world, caster_id, t, ability);
            }
        }
        AbilityEffectType::Resurrect => {
            if let Some(Actor::Char(target_id)) = target {
                resolve_resurrect(world, caster_id, target_id, ability);
            } else {
                world.send_to_char(caster_id, "Your ritual requires a dead mortal.");
            }
        }
        AbilityEffectType::ContestedDebuff => {
            if let Some(t) = target {
                resolve_contested_debuff(world, caster_id, t, ability);
            }
        }
    }

    if world.actor_is_hidden(caster) {
        world.actor_clear_hidden(caster);
    }
}

fn area_targets(
    world: &World,
    caster_id: CharacterId,
    room_id: crate::RoomId,
    scope: AoeScope,
) -> Vec<Actor> {
    let Some(room) = world.room(room_id) else { return Vec::new() };
    match scope {
        AoeScope::Enemies => {
            let mut ids: Vec<crate::MobId> = room.mobs.iter().copied().collect();
            ids.sort_unstable();
            ids.into_iter()
                .filter(|&id| world.mob(id).map_or(false, |m| m.is_alive()))
                .map(Actor::Mob)
                .collect()
        }
        AoeScope::Allies => {
            let members = world.present_group_members(caster_id);
            if members.is_empty() {
                vec![Actor::Char(caster_id)]
            } else {
                members.into_iter().map(Actor::Char).collect()
            }
        }
        AoeScope::All => {
            let mut out: Vec<Actor> = room
                .characters
                .iter()
                .filter(|&&id| id != caster_id)
                .filter(|&&id| world.character(id).map_or(false, |c| c.is_alive()))
                .map(|&id| Actor::Char(id))
                .collect();
            let mut ids: Vec<crate::MobId> = room.mobs.iter().copied().collect();
            ids.sort_unstable();
            out.extend(
                ids.into_iter()
                    .filter(|&id| world.mob(id).map_or(false, |m| m.is_alive()))
                    .map(Actor::Mob),
            );
            out
        }
    }
}

/// Up to `count` living mobs in the room other than the primary, shuffled.
fn secondary_mob_targets(
    world: &mut World,
    room_id: crate::RoomId,
    primary: Actor,
    count: usize,
) -> Vec<Actor> {
    let Some(room) = world.room(room_id) else { return Vec::new() };
    let mut ids: Vec<crate::MobId> = room
        .mobs
        .iter()
        .copied()
        .filter(|&id| Actor::Mob(id) != primary)
        .filter(|&id| world.mob(id).map_or(false, |m| m.is_alive()))
        .collect();
    ids.sort_unstable();
    use rand::seq::SliceRandom;
    ids.shuffle(&mut world.rng);
    ids.truncate(count);
    ids.into_iter().map(Actor::Mob).collect()
}

async fn resolve_modified_attack(
    world: &mut World,
    caster_id: CharacterId,
    primary: Actor,
    ability: &Ability,
) {
    let caster = Actor::Char(caster_id);
    let details = &ability.effect;

    if details.requires_stealth_or_flank {
        let stealthed = world.actor_is_hidden(caster);
        let flanking = match primary {
            Actor::Mob(id) => world
                .mob(id)
                .map_or(false, |m| m.is_fighting && m.target != Some(caster)),
            Actor::Char(_) => false,
        };
        if !stealthed && !flanking {
            world.send_to_char(
                caster_id,
                "You must be hidden or striking an engaged target for that!",
            );
            return;
        }
    }

    let weapon_source = world
        .character(caster_id)
        .and_then(|c| c.main_hand())
        .map(AttackSource::Weapon)
        .unwrap_or(AttackSource::Unarmed);

    if details.is_cleave {
        let room_id = world.actor_room(caster).unwrap_or_default();
        let extra = secondary_mob_targets(
            world,
            room_id,
            primary,
            details.max_cleave_targets.saturating_sub(1),
        );
        for t in std::iter::once(primary).chain(extra) {
            resolve_physical_attack(
                world,
                caster,
                t,
                weapon_source.clone(),
                details.damage_multiplier,
                Some(details),
            )
            .await;
        }
        return;
    }

    resolve_physical_attack(
        world,
        caster,
        primary,
        weapon_source,
        details.damage_multiplier,
        Some(details),
    )
    .await;
}

fn resolve_stun_attempt(world: &mut World, caster_id: CharacterId, target: Actor, ability: &Ability) {
    let caster = Actor::Char(caster_id);
    let details = &ability.effect;

    if details.requires_shield
        && world
            .character(caster_id)
            .and_then(|c| c.shield(world))
            .is_none()
    {
        world.send_to_char(caster_id, "You need a shield equipped for that!");
        return;
    }

    let caster_name = text::capitalize(&world.actor_name(caster));
    let target_name = world.actor_name(target);
    let room_id = world.actor_room(caster).unwrap_or_default();

    provoke(world, caster, target);

    let rating = (world.actor_mar(caster) as f64 * details.mar_modifier_mult).floor() as i64;
    let dv = world.actor_dv(target);
    let roll = dice::d20(&mut world.rng);
    let landed = roll != 1 && (roll == 20 || rating + roll >= dv);

    if !landed {
        world.broadcast_room(
            room_id,
            &format!("\r\n{caster_name} tries to bash {target_name}, but misses."),
            &[],
        );
        return;
    }

    world.broadcast_room(room_id, &format!("\r\n{caster_name} bashes {target_name}!"), &[]);
    let chance: f64 = world.rng.gen_range(0.0..1.0);
    if chance < details.stun_chance {
        // Stuns ADD to roundtime rather than setting it.
        world.actor_add_roundtime(target, details.stun_duration);
        world.broadcast_room(
            room_id,
            &format!("\r\n{} is stunned!", text::capitalize(&target_name)),
            &[],
        );
        world.send_to_actor(target, "{RYou are stunned!{x");
    }
}

fn resolve_cure(world: &mut World, caster_id: CharacterId, target: Actor, ability: &Ability) {
    let Some(cure_kind) = ability.effect.cure_type else { return };
    let target_name = world.actor_name(target);

    let removed: Vec<String> = match target {
        Actor::Char(id) => world
            .character_mut(id)
            .map(|c| drain_effects_of_kind(&mut c.effects, cure_kind))
            .unwrap_or_default(),
        Actor::Mob(id) => world
            .mob_mut(id)
            .map(|m| drain_effects_of_kind(&mut m.effects, cure_kind))
            .unwrap_or_default(),
    };

    if removed.is_empty() {
        world.send_to_char(
            caster_id,
            &format!("{} is not afflicted by {}.", text::capitalize(&target_name), cure_kind.dot_label()),
        );
        return;
    }

    world.send_to_char(
        caster_id,
        &format!("You cure the {} afflicting {target_name}.", cure_kind.dot_label()),
    );
    if let Actor::Char(target_id) = target {
        if target_id != caster_id {
            let caster_name = world.actor_name(Actor::Char(caster_id));
            world.send_to_char(
                target_id,
                &format!("{} has cured your {}!", text::capitalize(&caster_name), cure_kind.dot_label()),
            );
        }
    }
}

fn drain_effects_of_kind(
    effects: &mut std::collections::HashMap<String, Effect>,
    kind: EffectKind,
) -> Vec<String> {
    let keys: Vec<String> = effects
        .iter()
        .filter(|(_, e)| e.kind == kind)
        .map(|(k, _)| k.clone())
        .collect();
    for key in &keys {
        effects.remove(key);
    }
    keys
}

fn resolve_resurrect(
    world: &mut World,
    caster_id: CharacterId,
    target_id: CharacterId,
    ability: &Ability,
) {
    let Some(target) = world.character(target_id) else { return };
    if target.status != Status::Dead {
        world.send_to_char(caster_id, "Your ritual requires a dead mortal.");
        return;
    }
    let tether = target.spiritual_tether.clamp(0, 10);
    let target_name = target.name.clone();
    let room_id = target.location_id;

    // The weaker the tether, the steeper the ritual: x2 per lost point.
    let base_cost = if ability.effect.xp_cost > 0.0 { ability.effect.xp_cost } else { 5000.0 };
    let multiplier = 2f64.powi((10 - tether) as i32);
    let cost = base_cost * multiplier;

    let Some(caster) = world.character(caster_id) else { return };
    if caster.xp_total < cost {
        world.send_to_char(
            caster_id,
            &format!("{{RYou lack the spiritual energy ({} XP) to perform the ritual.{{x", cost as i64),
        );
        return;
    }
    let caster_name = caster.name.clone();

    if let Some(c) = world.character_mut(caster_id) {
        c.xp_total -= cost;
        c.dirty = true;
    }
    world.send_to_char(
        caster_id,
        &format!("{{yYou sacrifice {} of your stored experience to fuel the ritual...{{x", cost as i64),
    );

    if let Some(t) = world.character_mut(target_id) {
        t.status = Status::Alive;
        t.hp = (t.max_hp / 10.0).max(1.0);
        t.essence = 0.0;
        t.spiritual_tether = (t.spiritual_tether + 1).min(10);
        t.death_timer_ends_at = None;
        t.dirty = true;
    }

    world.send_to_char(
        target_id,
        "{YYou feel your spirit violently pulled back into your body! You have been resurrected!{x",
    );
    world.broadcast_room(
        room_id,
        &format!(
            "\r\n{{YA blinding column of divine energy strikes {target_name}'s body as {caster_name} completes a resurrection ritual!{{x"
        ),
        &[caster_id, target_id],
    );
}

fn resolve_contested_debuff(
    world: &mut World,
    caster_id: CharacterId,
    target: Actor,
    ability: &Ability,
) {
    let caster = Actor::Char(caster_id);
    let Some(contest) = ability.effect.contest.clone() else { return };
    let target_name = world.actor_name(target);

    provoke(world, caster, target);

    let attacker_mod = world
        .character(caster_id)
        .map_or(0, |c| c.skill_modifier(world, &contest.attacker_skill));
    // Mobs contest with their raw agility modifier.
    let defender_mod = match target {
        Actor::Char(id) => world
            .character(id)
            .map_or(0, |c| c.skill_modifier(world, &contest.defender_skill)),
        Actor::Mob(id) => world
            .mob(id)
            .map_or(0, |m| ashenmoor_core::stats::modifier(m.stats.agility)),
    };

    let attacker_roll = dice::d20(&mut world.rng) + attacker_mod;
    let defender_roll = dice::d20(&mut world.rng) + defender_mod;

    if attacker_roll > defender_roll {
        world.send_to_char(caster_id, &format!("{{gYou take {target_name} down!{{x"));
        if let Some(on_success) = ability.effect.on_success.clone() {
            apply_effect(world, caster, target, ability, &on_success);
        }
    } else {
        world.send_to_char(caster_id, &format!("{{rYou fail to take {target_name} down.{{x"));
    }
}

/// Direct healing; can pull a DYING character back from the brink, never a
/// DEAD one.
pub fn apply_heal(world: &mut World, caster: Actor, target: Actor, details: &EffectDetails) {
    if let Actor::Char(id) = target {
        if world.character(id).map_or(true, |c| c.status == Status::Dead) {
            world.send_to_actor(caster, "They are beyond simple healing.");
            return;
        }
    }
    if let Actor::Mob(id) = target {
        if !world.mob(id).map_or(false, |m| m.is_alive()) {
            return;
        }
    }

    let heal_amount =
        details.heal_base + dice::roll(&mut world.rng, details.heal_rng);
    if heal_amount <= 0 {
        return;
    }

    let caster_name = text::capitalize(&world.actor_name(caster));
    let target_name = world.actor_name(target);
    let room_id = world.actor_room(target);

    let (actual, was_dying) = match target {
        Actor::Char(id) => {
            let Some(c) = world.character_mut(id) else { return };
            let was_dying = c.status == Status::Dying;
            let actual = (heal_amount as f64).min(c.max_hp - c.hp);
            c.hp += actual;
            if was_dying && c.hp > 0.0 {
                c.status = Status::Alive;
                c.death_timer_ends_at = None;
            }
            c.dirty = true;
            (actual, was_dying)
        }
        Actor::Mob(id) => {
            let Some(m) = world.mob_mut(id) else { return };
            let actual = (heal_amount as f64).min(m.max_hp - m.hp);
            m.hp += actual;
            (actual, false)
        }
    };

    if was_dying {
        world.send_to_actor(
            target,
            "{gYou feel life return to your limbs! You are no longer dying.{x",
        );
        if let Some(room_id) = room_id {
            world.broadcast_room(
                room_id,
                &format!("\r\n{} stirs and returns from the brink of death!", text::capitalize(&target_name)),
                &actor_char_ids(&[target]),
            );
        }
    }

    if caster == target {
        world.send_to_actor(caster, &format!("You heal yourself for {} hit points.", actual as i64));
    } else {
        world.send_to_actor(
            caster,
            &format!("You heal {target_name} for {} hit points.", actual as i64),
        );
        world.send_to_actor(
            target,
            &format!("{caster_name} heals you for {} hit points.", actual as i64),
        );
    }
    if let Some(room_id) = room_id {
        world.broadcast_room(
            room_id,
            &format!("\r\n{caster_name} heals {target_name}."),
            &actor_char_ids(&[caster, target]),
        );
    }
}

/// Apply a named timed effect. Last application of a name wins; expiry
/// reverts whatever was stored at entry.
pub fn apply_effect(
    world: &mut World,
    caster: Actor,
    target: Actor,
    ability: &Ability,
    details: &EffectDetails,
) {
    let Some(effect_name) = details.name.clone() else {
        log::warn!("Ability {:?} tried to apply an effect with no name", ability.key);
        return;
    };
    let stat = details.stat_affected;
    let mut amount = if details.amount != 0.0 { details.amount } else { details.potency };
    let duration = details.duration;
    let kind = details.kind.unwrap_or_default();

    // Mage Armor scales with the caster's spellcraft ranks.
    if ability.key == "mage armor" {
        if let Actor::Char(id) = caster {
            if let Some(c) = world.character(id) {
                amount += (c.skill_rank("spellcraft") / 25) as f64;
            }
        }
    }

    let valid_duration = duration > 0.0 || duration == -1.0;
    let Some(stat) = stat else {
        world.send_to_actor(caster, "The effect seems to dissipate harmlessly.");
        return;
    };
    if !valid_duration {
        world.send_to_actor(caster, "The effect seems to dissipate harmlessly.");
        return;
    }

    // A fresh shapechange pushes out any prior one, with proper messaging.
    if details.is_shapechange {
        let prior: Vec<String> = effect_keys_of(world, target)
            .into_iter()
            .filter(|key| {
                effect_on(world, target, key)
                    .and_then(|e| e.source_ability.clone())
                    .and_then(|source| world.ability(&source).map(|a| a.effect.is_shapechange))
                    .unwrap_or(false)
            })
            .collect();
        for key in prior {
            expire_effect(world, target, &key);
        }
    }

    let now = world.now();
    let ends_at = if duration == -1.0 { f64::INFINITY } else { now + duration };
    let effect = Effect {
        name: effect_name.clone(),
        kind,
        stat,
        amount,
        applied_at: now,
        ends_at,
        source_ability: Some(ability.key.clone()),
        caster: match caster {
            Actor::Char(id) => Some(id),
            Actor::Mob(_) => None,
        },
        locked_stance: details.set_stance,
    };

    match target {
        Actor::Char(id) => {
            if let Some(c) = world.character_mut(id) {
                c.effects.insert(effect_name.clone(), effect);
                c.dirty = true;
            }
        }
        Actor::Mob(id) => {
            if let Some(m) = world.mob_mut(id) {
                m.effects.insert(effect_name.clone(), effect);
            }
        }
    }

    // Immediate secondary consequences.
    if stat == EffectStat::MaxHp {
        match target {
            Actor::Char(id) => {
                if let Some(c) = world.character_mut(id) {
                    c.max_hp = (c.max_hp + amount).max(1.0);
                    c.hp = (c.hp + amount).clamp(0.0, c.max_hp);
                }
            }
            Actor::Mob(id) => {
                if let Some(m) = world.mob_mut(id) {
                    m.max_hp = (m.max_hp + amount).max(1.0);
                    m.hp = (m.hp + amount).clamp(0.0, m.max_hp);
                }
            }
        }
    }
    if kind == EffectKind::Stun {
        world.actor_add_roundtime(target, details.potency.max(0.0));
        world.send_to_actor(target, "{RYou are stunned!{x");
    }
    if let Some(stance) = details.set_stance {
        if let Actor::Char(id) = target {
            if let Some(c) = world.character_mut(id) {
                c.stance = stance;
            }
        }
    }

    // Compound payloads ride along under the same source ability.
    for sub in &details.effects_to_apply {
        apply_effect(world, caster, target, ability, sub);
    }

    // Messaging.
    let caster_name = text::capitalize(&world.actor_name(caster));
    let target_name = text::capitalize(&world.actor_name(target));
    if caster == target {
        if let Some(msg) = &ability.messages.apply_msg_self {
            world.send_to_actor(caster, &fill_placeholders(msg, &caster_name, &target_name));
        }
    } else {
        if let Some(msg) = &ability.messages.apply_msg_target {
            world.send_to_actor(target, &fill_placeholders(msg, &caster_name, &target_name));
        }
        world.send_to_actor(caster, &format!("You apply {effect_name} to {target_name}."));
    }
    if let Some(msg) = &ability.messages.apply_msg_room {
        if let Some(room_id) = world.actor_room(target) {
            world.broadcast_room(
                room_id,
                &format!("\r\n{}", fill_placeholders(msg, &caster_name, &target_name)),
                &actor_char_ids(&[caster, target]),
            );
        }
    }
}

fn effect_keys_of(world: &World, actor: Actor) -> Vec<String> {
    match actor {
        Actor::Char(id) => world
            .character(id)
            .map(|c| c.effects.keys().cloned().collect())
            .unwrap_or_default(),
        Actor::Mob(id) => world
            .mob(id)
            .map(|m| m.effects.keys().cloned().collect())
            .unwrap_or_default(),
    }
}

fn effect_on(world: &World, actor: Actor, key: &str) -> Option<Effect> {
    match actor {
        Actor::Char(id) => world.character(id).and_then(|c| c.effects.get(key).cloned()),
        Actor::Mob(id) => world.mob(id).and_then(|m| m.effects.get(key).cloned()),
    }
}

/// Remove one effect, revert its reversible entry deltas, and send the
/// source ability's expiration messages.
pub fn expire_effect(world: &mut World, target: Actor, key: &str) {
    let removed = match target {
        Actor::Char(id) => world.character_mut(id).and_then(|c| {
            c.dirty = true;
            c.effects.remove(key)
        }),
        Actor::Mob(id) => world.mob_mut(id).and_then(|m| m.effects.remove(key)),
    };
    let Some(effect) = removed else { return };

    if effect.stat == EffectStat::MaxHp {
        match target {
            Actor::Char(id) => {
                if let Some(c) = world.character_mut(id) {
                    c.max_hp = (c.max_hp - effect.amount).max(1.0);
                    c.hp = c.hp.min(c.max_hp);
                }
            }
            Actor::Mob(id) => {
                if let Some(m) = world.mob_mut(id) {
                    m.max_hp = (m.max_hp - effect.amount).max(1.0);
                    m.hp = m.hp.min(m.max_hp);
                }
            }
        }
    }

    // A stance-locking effect releases the bearer back to their feet.
    if effect.locked_stance.is_some() {
        if let Actor::Char(id) = target {
            if let Some(c) = world.character_mut(id) {
                c.stance = ashenmoor_core::types::Stance::Standing;
            }
        }
    }

    let Some(source_key) = effect.source_ability else { return };
    let Some(ability) = world.ability(&source_key).cloned() else { return };
    let target_name = text::capitalize(&world.actor_name(target));

    if let Actor::Char(id) = target {
        if let Some(msg) = ability
            .messages
            .expire_msg_self
            .as_ref()
            .or(ability.messages.expire_msg_target.as_ref())
        {
            world.send_to_char(id, &fill_placeholders(msg, "", &target_name));
        }
    }
    if let Some(msg) = &ability.messages.expire_msg_room {
        if let Some(room_id) = world.actor_room(target) {
            world.broadcast_room(
                room_id,
                &format!("\r\n{}", fill_placeholders(msg, "", &target_name)),
                &actor_char_ids(&[target]),
            );
        }
    }
}

/// One DoT pulse. Unattributed: a kill awards nothing to the original
/// caster.
pub async fn apply_dot_damage(world: &mut World, target: Actor, effect_name: &str) {
    let Some(effect) = effect_on(world, target, effect_name) else { return };
    let damage = effect.amount.max(0.0);
    if damage <= 0.0 {
        return;
    }

    let remaining = match target {
        Actor::Char(id) => {
            let Some(c) = world.character_mut(id) else { return };
            c.hp = (c.hp - damage).max(0.0);
            c.dirty = true;
            c.hp
        }
        Actor::Mob(id) => {
            let Some(m) = world.mob_mut(id) else { return };
            m.hp = (m.hp - damage).max(0.0);
            m.hp
        }
    };

    world.send_to_actor(
        target,
        &format!("{{rYou take {} {} damage!{{x", damage as i64, effect.kind.dot_label()),
    );

    if remaining <= 0.0 {
        handle_defeat(world, None, target).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::stats::Stat;
    use ashenmoor_core::types::Stance;

    /// Build a one-off ability from row fragments; keeps effect fixtures
    /// close to the tests that use them.
    fn ability_fixture(effect_type: &str, details: &str, messages: &str) -> Ability {
        Ability::from_row(&crate::db::world::AbilityRow {
            id: 99,
            internal_name: "test effect".into(),
            name: "Test Effect".into(),
            kind: "SPELL".into(),
            class_req: "[]".into(),
            level_req: 1,
            cost: 0.0,
            target_type: "SELF".into(),
            cast_time: 0.0,
            roundtime: 0.0,
            effect_type: effect_type.into(),
            effect_details: details.into(),
            messages: messages.into(),
        description: String::new(),
        })
        .expect("fixture ability parses")
    }

    #[tokio::test]
    async fn mage_armor_applies_and_expires_symmetrically() {
        let mut world = build_world().await;
        let mut rx = add_observed_character(&mut world, 1, 1);
        world
            .character_mut(1)
            .unwrap()
            .skills
            .insert("spellcraft".into(), 50);

        let ability = world.ability("mage armor").unwrap().clone();
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &ability, &ability.effect);

        // 15 base + floor(50/25) spellcraft bonus.
        let barrier = world.character(1).unwrap().barrier_value(&world);
        assert_eq!(barrier, 17);

        // Still active inside the window, gone after 180 seconds.
        world.advance_clock(100.0);
        assert_eq!(world.character(1).unwrap().barrier_value(&world), 17);

        world.advance_clock(100.0);
        assert_eq!(world.character(1).unwrap().barrier_value(&world), 0);

        expire_effect(&mut world, Actor::Char(1), "MageArmorBuff");
        assert!(world.character(1).unwrap().effects.is_empty());
        let output = drain_output(&mut rx);
        assert!(
            output.contains("The shimmering barrier around you dissipates."),
            "expiry message missing from: {output}"
        );
    }

    #[tokio::test]
    async fn max_hp_effects_revert_on_expiry() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let (base_max, base_hp) = {
            let c = world.character(1).unwrap();
            (c.max_hp, c.hp)
        };

        let ability = ability_fixture(
            "BUFF",
            r#"{"name": "Bulwark", "kind": "buff", "stat_affected": "max_hp",
                "amount": 20, "duration": 30.0}"#,
            "{}",
        );
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &ability, &ability.effect);
        {
            let c = world.character(1).unwrap();
            assert_eq!(c.max_hp, base_max + 20.0);
            assert_eq!(c.hp, base_hp + 20.0);
        }

        expire_effect(&mut world, Actor::Char(1), "Bulwark");
        let c = world.character(1).unwrap();
        assert_eq!(c.max_hp, base_max);
        assert!(c.hp <= c.max_hp, "hp clamped to restored max");
        assert_eq!(c.hp, base_hp);
    }

    #[tokio::test]
    async fn reapplying_a_named_effect_overwrites_but_reverts_what_was_stored() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);

        let strong = ability_fixture(
            "BUFF",
            r#"{"name": "Stoneskin", "kind": "buff", "stat_affected": "armor_value",
                "amount": 10, "duration": 60.0}"#,
            "{}",
        );
        let weak = ability_fixture(
            "BUFF",
            r#"{"name": "Stoneskin", "kind": "buff", "stat_affected": "armor_value",
                "amount": 4, "duration": 60.0}"#,
            "{}",
        );
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &strong, &strong.effect);
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &weak, &weak.effect);

        // Last writer wins.
        assert_eq!(world.character(1).unwrap().total_av(&world), 4);
        expire_effect(&mut world, Actor::Char(1), "Stoneskin");
        assert_eq!(world.character(1).unwrap().total_av(&world), 0);
    }

    #[tokio::test]
    async fn compound_effects_apply_and_share_source() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let rage = world.ability("rage").unwrap().clone();
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &rage, &rage.effect);

        let c = world.character(1).unwrap();
        assert!(c.effects.contains_key("Rage"));
        assert!(c.effects.contains_key("RageRecklessness"));
        assert_eq!(c.effects["Rage"].source_ability.as_deref(), Some("rage"));
        assert_eq!(
            c.effects["RageRecklessness"].source_ability.as_deref(),
            Some("rage")
        );

        // Might up, dodge down while both hold.
        assert_eq!(c.stat_value(&world, Stat::Might) - c.stats.might, 6);
        let dv_with = c.dv(&world);
        drop(c);
        expire_effect(&mut world, Actor::Char(1), "Rage");
        expire_effect(&mut world, Actor::Char(1), "RageRecklessness");
        let c = world.character(1).unwrap();
        assert_eq!(c.dv(&world), dv_with + 4);
    }

    #[tokio::test]
    async fn heal_revives_the_dying_but_not_the_dead() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_test_character(&mut world, 2, 1);
        {
            let c = world.character_mut(2).unwrap();
            c.hp = 0.0;
            c.status = Status::Dying;
            c.death_timer_ends_at = Some(1e9);
        }

        let details: EffectDetails =
            serde_json::from_str(r#"{"heal_base": 5, "heal_rng": 0}"#).unwrap();
        apply_heal(&mut world, Actor::Char(1), Actor::Char(2), &details);
        {
            let c = world.character(2).unwrap();
            assert_eq!(c.status, Status::Alive);
            assert_eq!(c.death_timer_ends_at, None);
            assert!(c.hp > 0.0);
        }

        world.character_mut(2).unwrap().status = Status::Dead;
        world.character_mut(2).unwrap().hp = 0.0;
        apply_heal(&mut world, Actor::Char(1), Actor::Char(2), &details);
        assert_eq!(world.character(2).unwrap().status, Status::Dead);
        assert_eq!(world.character(2).unwrap().hp, 0.0);
    }

    #[tokio::test]
    async fn xp_award_clamps_at_intellect_pool_cap() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.stats.set(Stat::Intellect, 10);
            c.xp_pool = 990.0;
        }
        super::super::outcome::award_xp(&mut world, 1, 50.0, false);
        assert_eq!(world.character(1).unwrap().xp_pool, 1000.0, "cap is intellect x 100");

        super::super::outcome::award_xp(&mut world, 1, 50.0, false);
        assert_eq!(world.character(1).unwrap().xp_pool, 1000.0, "overflow discarded");
    }

    #[tokio::test]
    async fn attacks_set_roundtime_and_provoke_mobs() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let mob_id = add_test_mob(&mut world, 500, 1, "[]");

        resolve_physical_attack(
            &mut world,
            Actor::Char(1),
            Actor::Mob(mob_id),
            AttackSource::Unarmed,
            1.0,
            None,
        )
        .await;

        let c = world.character(1).unwrap();
        assert!(c.roundtime > 0.0, "attack acts always charge roundtime");
        let mob = world.mob(mob_id).unwrap();
        assert!(mob.is_fighting, "attacked mobs retaliate");
        assert_eq!(mob.target, Some(Actor::Char(1)));
    }

    #[tokio::test]
    async fn dot_kills_award_nothing() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let mob_id = add_test_mob(&mut world, 501, 1, "[]");
        let now = world.now();
        {
            let mob = world.mob_mut(mob_id).unwrap();
            mob.hp = 2.0;
            mob.effects.insert(
                "Venom".into(),
                crate::effect::Effect {
                    name: "Venom".into(),
                    kind: EffectKind::Poison,
                    stat: EffectStat::Roundtime,
                    amount: 5.0,
                    applied_at: now,
                    ends_at: now + 30.0,
                    source_ability: None,
                    caster: Some(1),
                    locked_stance: None,
                },
            );
        }

        apply_dot_damage(&mut world, Actor::Mob(mob_id), "Venom").await;
        assert!(!world.mob(mob_id).unwrap().is_alive());
        // No attribution: the bystander's pool stays empty.
        assert_eq!(world.character(1).unwrap().xp_pool, 0.0);
    }

    #[tokio::test]
    async fn stance_locked_characters_are_released_on_expiry() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let trip = ability_fixture(
            "BUFF",
            r#"{"name": "Tripped", "kind": "debuff", "stat_affected": "dodge_value",
                "amount": -2, "duration": 5.0, "set_stance": "Lying"}"#,
            "{}",
        );
        apply_effect(&mut world, Actor::Char(1), Actor::Char(1), &trip, &trip.effect);
        assert_eq!(world.character(1).unwrap().stance, Stance::Lying);

        expire_effect(&mut world, Actor::Char(1), "Tripped");
        assert_eq!(world.character(1).unwrap().stance, Stance::Standing);
    }
}
