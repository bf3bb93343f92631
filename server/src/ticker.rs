//! The world tick: a fixed-interval pass that advances every per-entity
//! timer. The game loop calls [`Ticker::tick`] once per interval; each
//! callback runs in a fixed order and failures inside one are logged
//! without stopping the rest.

use std::time::Instant;

use rand::Rng;

use ashenmoor_core::constants::{ROUNDTIME_PER_AV, WEATHER_CYCLE_SECS, XP_ABSORB_RATE_PER_SEC};
use ashenmoor_core::flags::{RoomFlags, WEATHER_FLAGS};
use ashenmoor_core::text;
use ashenmoor_core::types::Status;
use ashenmoor_core::weather;

use crate::combat::resolver::{
    apply_dot_damage, expire_effect, resolve_ability_effect, resolve_physical_attack,
};
use crate::combat::AttackSource;
use crate::world::{Actor, World};
use crate::{CharacterId, MobId};

/// Seconds between periodic dirty-state flushes.
const SAVE_INTERVAL_SECS: f64 = 60.0;

pub struct Ticker {
    last_tick: Instant,
    weather_acc: f64,
    save_acc: f64,
}

impl Ticker {
    pub fn new() -> Ticker {
        Ticker { last_tick: Instant::now(), weather_acc: 0.0, save_acc: 0.0 }
    }

    /// One scheduler cycle. `dt` is wall-clock seconds since the previous
    /// cycle, so a stalled loop catches up rather than losing time.
    pub async fn tick(&mut self, world: &mut World) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_tick).as_secs_f64();
        self.last_tick = now;
        self.run_cycle(world, dt).await;
    }

    /// Callback order matters: roundtimes (and finished casts) first, then
    /// AI, respawns, death timers, effects, absorption, regen.
    pub async fn run_cycle(&mut self, world: &mut World, dt: f64) {
        update_roundtimes(world, dt).await;
        update_mob_ai(world, dt).await;
        update_respawns(world);
        update_death_timers(world).await;
        update_effects(world).await;
        update_xp_absorption(world, dt);
        update_regen(world, dt);

        self.weather_acc += dt;
        if self.weather_acc >= WEATHER_CYCLE_SECS {
            self.weather_acc = 0.0;
            update_weather(world);
        }

        self.save_acc += dt;
        if self.save_acc >= SAVE_INTERVAL_SECS {
            self.save_acc = 0.0;
            flush_dirty(world).await;
        }
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Ticker::new()
    }
}

/// Decay character roundtimes, clear stale combat state, and fire any cast
/// whose wind-up just finished.
async fn update_roundtimes(world: &mut World, dt: f64) {
    let ids: Vec<CharacterId> = world.characters.keys().copied().collect();
    for cn in ids {
        let (finished_casting, stale_target) = {
            let Some(c) = world.character_mut(cn) else { continue };
            let before = c.roundtime;
            if before > 0.0 {
                c.roundtime = (before - dt).max(0.0);
            }
            let finished = before > 0.0 && c.roundtime == 0.0 && c.casting.is_some();
            (finished, c.is_fighting)
        };

        // Combat against something gone (dead or elsewhere) ends quietly.
        if stale_target {
            let invalid = {
                let Some(c) = world.character(cn) else { continue };
                match c.target {
                    Some(target) => {
                        !world.actor_is_alive(target)
                            || world.actor_room(target) != Some(c.location_id)
                    }
                    None => true,
                }
            };
            if invalid {
                if let Some(c) = world.character_mut(cn) {
                    c.is_fighting = false;
                    c.target = None;
                }
            }
        }

        if finished_casting {
            complete_casting(world, cn).await;
        }
    }
}

/// A finished wind-up: pay essence and resolve, or fizzle without it.
async fn complete_casting(world: &mut World, cn: CharacterId) {
    let Some(casting) = world.character_mut(cn).and_then(|c| c.casting.take()) else { return };
    let Some(ability) = world.ability(&casting.key).cloned() else {
        log::error!("Character {cn} finished casting unknown ability {:?}", casting.key);
        return;
    };

    let enough = world.character(cn).map_or(false, |c| c.essence >= ability.cost);
    if !enough {
        world.send_to_char(
            cn,
            &format!("{{RYou lose focus ({}) - not enough essence!{{x", ability.name),
        );
        return;
    }
    if let Some(c) = world.character_mut(cn) {
        c.essence -= ability.cost;
        c.dirty = true;
    }

    resolve_ability_effect(world, cn, casting.target, &ability).await;

    // Recovery after the spell fires, slowed by armor load.
    let rt_penalty = world
        .character(cn)
        .map(|c| c.total_av(world) as f64 * ROUNDTIME_PER_AV)
        .unwrap_or(0.0);
    if let Some(c) = world.character_mut(cn) {
        c.roundtime = ability.roundtime + rt_penalty;
    }
}

/// Per-mob AI pass, in the contract order.
async fn update_mob_ai(world: &mut World, dt: f64) {
    let ids: Vec<MobId> = {
        let mut ids: Vec<MobId> = world.mobs.keys().copied().collect();
        ids.sort_unstable();
        ids
    };

    for mob_id in ids {
        let (ready, fighting, target, aggressive, room_id) = {
            let Some(mob) = world.mob_mut(mob_id) else { continue };
            if !mob.is_alive() {
                continue;
            }
            mob.tick_roundtime(dt);
            (
                mob.roundtime <= 0.0,
                mob.is_fighting,
                mob.target,
                mob.aggressive(),
                mob.room_id,
            )
        };

        // Drop a target that died or walked away.
        if fighting {
            let gone = match target {
                Some(t) => !world.actor_is_alive(t) || world.actor_room(t) != Some(room_id),
                None => true,
            };
            if gone {
                if let Some(mob) = world.mob_mut(mob_id) {
                    mob.target = None;
                    mob.is_fighting = false;
                }
            } else if ready {
                mob_swing(world, mob_id).await;
                continue;
            }
        }

        // Idle aggressives pick a living character and open up immediately.
        let idle = world.mob(mob_id).map_or(false, |m| !m.is_fighting);
        if idle && aggressive {
            let victims: Vec<CharacterId> = world
                .room(room_id)
                .map(|room| {
                    let mut ids: Vec<CharacterId> = room
                        .characters
                        .iter()
                        .copied()
                        .filter(|&id| {
                            world
                                .character(id)
                                .map_or(false, |c| c.is_alive() && !c.hidden)
                        })
                        .collect();
                    ids.sort_unstable();
                    ids
                })
                .unwrap_or_default();
            if victims.is_empty() {
                continue;
            }
            let pick = victims[world.rng.gen_range(0..victims.len())];
            let mob_name = world.mob(mob_id).map(|m| m.name.clone()).unwrap_or_default();
            if let Some(mob) = world.mob_mut(mob_id) {
                mob.target = Some(Actor::Char(pick));
                mob.is_fighting = true;
            }
            log::debug!("{mob_name} turns aggressive toward character {pick}");
            world.send_to_char(
                pick,
                &format!("{{r{} turns on you with hungry eyes!{{x", text::capitalize(&mob_name)),
            );
            if world.mob(mob_id).map_or(false, |m| m.roundtime <= 0.0) {
                mob_swing(world, mob_id).await;
            }
        }
    }
}

/// One attack act from a mob's template attack list.
async fn mob_swing(world: &mut World, mob_id: MobId) {
    let (target, attack) = {
        let Some(mob) = world.mob(mob_id) else { return };
        let Some(target) = mob.target else { return };
        let attacks = world
            .mob_template(mob.template_id)
            .map(|t| t.attacks.clone())
            .unwrap_or_default();
        if attacks.is_empty() {
            // Templates without attacks still shove.
            (target, crate::mob::MobAttack::default())
        } else {
            let pick = world.rng.gen_range(0..attacks.len());
            (target, attacks[pick].clone())
        }
    };
    resolve_physical_attack(
        world,
        Actor::Mob(mob_id),
        target,
        AttackSource::Natural(attack),
        1.0,
        None,
    )
    .await;
}

/// Reset any mob whose corpse has waited out its respawn delay.
fn update_respawns(world: &mut World) {
    let now = world.now();
    let ready: Vec<MobId> = world
        .mobs
        .values()
        .filter(|m| m.ready_to_respawn(now))
        .map(|m| m.id)
        .collect();
    for mob_id in ready {
        let (name, room_id) = {
            let Some(mob) = world.mob_mut(mob_id) else { continue };
            mob.respawn();
            (mob.name.clone(), mob.room_id)
        };
        log::info!("{name} (instance {mob_id}) respawns in room {room_id}.");
        world.broadcast_room(room_id, &format!("\r\n{} appears!", text::capitalize(&name)), &[]);
    }
}

/// DYING characters whose timer has elapsed pass on to DEAD and lose a
/// tether point. They stay where they fell until they release.
async fn update_death_timers(world: &mut World) {
    let now = world.now();
    let expired: Vec<CharacterId> = world
        .characters
        .values()
        .filter(|c| c.status == Status::Dying)
        .filter(|c| c.death_timer_ends_at.map_or(false, |at| now >= at))
        .map(|c| c.id)
        .collect();

    for cn in expired {
        let (name, tether) = {
            let Some(c) = world.character_mut(cn) else { continue };
            c.status = Status::Dead;
            c.death_timer_ends_at = None;
            c.spiritual_tether = (c.spiritual_tether - 1).max(0);
            c.dirty = true;
            (c.name.clone(), c.spiritual_tether)
        };
        log::info!("Character {name} has died (tether now {tether}).");
        world.send_to_char(cn, "{RYour connection to the living world weakens...{x");
        world.send_to_char(cn, "{RYou are dead. Type 'release' when you are ready to let go.{x");
        if tether <= 0 {
            log::warn!("Character {name} has reached zero spiritual tether.");
            world.send_to_char(cn, "{r*** Your soul feels irrevocably severed! ***{x");
        }

        if let Some(c) = world.character(cn) {
            if let Err(e) = world.db.save_character(c).await {
                log::error!("Saving dead character {name} failed: {e}");
            }
        }
    }
}

/// Pulse DoTs, then sweep expired effects.
async fn update_effects(world: &mut World) {
    let now = world.now();

    let mut actors: Vec<Actor> = world.characters.keys().map(|&id| Actor::Char(id)).collect();
    let mut mob_ids: Vec<MobId> = world.mobs.keys().copied().collect();
    mob_ids.sort_unstable();
    actors.extend(mob_ids.into_iter().map(Actor::Mob));

    for actor in actors {
        let effects: Vec<(String, bool, bool)> = {
            let map = match actor {
                Actor::Char(id) => world.character(id).map(|c| &c.effects),
                Actor::Mob(id) => world.mob(id).map(|m| &m.effects),
            };
            let Some(map) = map else { continue };
            map.values()
                .map(|e| (e.name.clone(), e.kind.is_dot(), e.is_expired(now)))
                .collect()
        };

        for (name, is_dot, expired) in effects {
            if is_dot && !expired && world.actor_is_alive(actor) {
                apply_dot_damage(world, actor, &name).await;
            }
            if expired {
                expire_effect(world, actor, &name);
            }
        }
    }
}

/// Characters resting at a node slowly bank their pool into total XP.
fn update_xp_absorption(world: &mut World, dt: f64) {
    let absorb = XP_ABSORB_RATE_PER_SEC * dt;
    let eligible: Vec<CharacterId> = world
        .characters
        .values()
        .filter(|c| c.xp_pool > 0.0)
        .filter(|c| world.room(c.location_id).map_or(false, |r| r.is_node()))
        .map(|c| c.id)
        .collect();

    for cn in eligible {
        let emptied = {
            let Some(c) = world.character_mut(cn) else { continue };
            let amount = c.xp_pool.min(absorb);
            c.xp_pool -= amount;
            c.xp_total += amount;
            c.dirty = true;
            c.xp_pool <= 0.0
        };
        if emptied {
            if let Some(c) = world.character_mut(cn) {
                c.xp_pool = 0.0;
            }
            world.send_to_char(cn, "You feel you have absorbed all you can for now.");
        }
    }
}

fn update_regen(world: &mut World, dt: f64) {
    let ids: Vec<CharacterId> = world.characters.keys().copied().collect();
    for cn in ids {
        let (in_node, vit_mod, aura_mod) = {
            let Some(c) = world.character(cn) else { continue };
            let in_node = world.room(c.location_id).map_or(false, |r| r.is_node());
            (in_node, c.vit_mod(world), c.aura_mod(world))
        };
        if let Some(c) = world.character_mut(cn) {
            c.update_regen(dt, in_node, vit_mod, aura_mod);
        }
    }
}

/// Re-roll each area's weather and rewrite the overlay flags of its
/// outdoor rooms.
fn update_weather(world: &mut World) {
    use chrono::Datelike;
    let month = chrono::Local::now().month();
    let season = weather::season_for_month(month);

    let area_ids: Vec<i64> = world.areas.keys().copied().collect();
    for area_id in area_ids {
        let Some(climate) = world.areas.get(&area_id).map(|a| a.climate) else { continue };
        let condition = weather::roll_condition(&mut world.rng, season, climate);
        let changed = world
            .areas
            .get(&area_id)
            .map_or(false, |a| a.weather != condition);
        if let Some(area) = world.areas.get_mut(&area_id) {
            area.weather = condition;
        }
        if !changed {
            continue;
        }

        let room_ids: Vec<crate::RoomId> = world
            .rooms
            .values()
            .filter(|r| r.area_id == area_id && r.flags.contains(RoomFlags::OUTDOORS))
            .map(|r| r.id)
            .collect();
        for room_id in room_ids {
            if let Some(room) = world.room_mut(room_id) {
                room.flags.remove(WEATHER_FLAGS);
                room.flags.insert(condition.room_flags());
                room.weather = condition;
            }
            world.broadcast_room(room_id, &format!("\r\n{}", condition.description()), &[]);
        }
    }
}

/// Periodic flush of everything flagged dirty since the last pass.
async fn flush_dirty(world: &mut World) {
    let dirty_chars: Vec<CharacterId> = world
        .characters
        .values()
        .filter(|c| c.dirty)
        .map(|c| c.id)
        .collect();
    for cn in dirty_chars {
        let result = match world.character(cn) {
            Some(c) => world.db.save_character(c).await,
            None => continue,
        };
        match result {
            Ok(_) => {
                if let Some(c) = world.character_mut(cn) {
                    c.dirty = false;
                }
            }
            Err(e) => log::error!("Periodic save of character {cn} failed: {e}"),
        }
    }

    let dirty_rooms: Vec<(crate::RoomId, i64)> = world
        .rooms
        .values()
        .filter(|r| r.dirty)
        .map(|r| (r.id, r.coinage))
        .collect();
    for (room_id, coinage) in dirty_rooms {
        match world.db.update_room_coinage(room_id, coinage).await {
            Ok(()) => {
                if let Some(r) = world.room_mut(room_id) {
                    r.dirty = false;
                }
            }
            Err(e) => log::error!("Periodic save of room {room_id} failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::stats::Stat;

    async fn cycle(world: &mut World, dt: f64) {
        let mut ticker = Ticker::new();
        world.advance_clock(dt);
        ticker.run_cycle(world, dt).await;
    }

    #[tokio::test]
    async fn roundtime_decays_to_zero() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().roundtime = 2.5;

        cycle(&mut world, 1.0).await;
        assert!((world.character(1).unwrap().roundtime - 1.5).abs() < 1e-9);
        cycle(&mut world, 2.0).await;
        assert_eq!(world.character(1).unwrap().roundtime, 0.0);
    }

    #[tokio::test]
    async fn death_timer_marches_to_dead_and_decrements_tether() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let death_timer_ends_at = world.now() + 10.0;
        {
            let c = world.character_mut(1).unwrap();
            c.stats.set(Stat::Vitality, 10);
            c.hp = 0.0;
            c.status = Status::Dying;
            c.death_timer_ends_at = Some(death_timer_ends_at);
            c.spiritual_tether = 10;
        }

        // Ten one-second ticks: timer expires on (or before) the tenth.
        for _ in 0..10 {
            cycle(&mut world, 1.0).await;
        }
        let c = world.character(1).unwrap();
        assert_eq!(c.status, Status::Dead);
        assert_eq!(c.spiritual_tether, 9);
        assert_eq!(c.death_timer_ends_at, None);
    }

    #[tokio::test]
    async fn xp_pool_absorbs_in_node_rooms() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.xp_pool = 5.0;
            c.xp_total = 0.0;
        }

        // Room 1 is a NODE; 1 XP per second.
        cycle(&mut world, 2.0).await;
        let c = world.character(1).unwrap();
        assert!((c.xp_pool - 3.0).abs() < 1e-9);
        assert!((c.xp_total - 2.0).abs() < 1e-9);

        cycle(&mut world, 10.0).await;
        let c = world.character(1).unwrap();
        assert_eq!(c.xp_pool, 0.0);
        assert!((c.xp_total - 5.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn dot_effects_pulse_and_expire() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let now = world.now();
        {
            let c = world.character_mut(1).unwrap();
            c.hp = 20.0;
            c.effects.insert(
                "VenomBite".into(),
                crate::effect::Effect {
                    name: "VenomBite".into(),
                    kind: crate::effect::EffectKind::Poison,
                    stat: crate::effect::EffectStat::Roundtime,
                    amount: 3.0,
                    applied_at: now,
                    ends_at: now + 2.5,
                    source_ability: None,
                    caster: None,
                    locked_stance: None,
                },
            );
        }

        cycle(&mut world, 1.0).await;
        assert!((world.character(1).unwrap().hp - 17.0).abs() < 1e-9);
        cycle(&mut world, 1.0).await;
        assert!((world.character(1).unwrap().hp - 14.0).abs() < 1e-9);

        // Third cycle crosses the deadline: the effect is gone, no pulse.
        cycle(&mut world, 1.0).await;
        let c = world.character(1).unwrap();
        assert!(c.effects.is_empty());
        assert!((c.hp - 14.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn aggressive_mobs_acquire_targets_and_swing() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        let mob_id = add_test_mob(&mut world, 600, 1, r#"["AGGRESSIVE"]"#);

        cycle(&mut world, 1.0).await;
        let mob = world.mob(mob_id).unwrap();
        assert!(mob.is_fighting);
        assert_eq!(mob.target, Some(Actor::Char(1)));
        assert!(mob.roundtime > 0.0, "the opening swing charged roundtime");
    }

    #[tokio::test]
    async fn idle_mobs_ignore_hidden_characters() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().hidden = true;
        let mob_id = add_test_mob(&mut world, 601, 1, r#"["AGGRESSIVE"]"#);

        cycle(&mut world, 1.0).await;
        assert!(!world.mob(mob_id).unwrap().is_fighting);
    }

    #[tokio::test]
    async fn dead_mobs_respawn_in_place_after_their_delay() {
        let mut world = build_world().await;
        let mob_id = add_test_mob(&mut world, 602, 1, "[]");
        let now = world.now();
        world.mob_mut(mob_id).unwrap().die(now);

        cycle(&mut world, 10.0).await;
        assert!(!world.mob(mob_id).unwrap().is_alive(), "10s into a 30s delay");

        cycle(&mut world, 25.0).await;
        let mob = world.mob(mob_id).unwrap();
        assert!(mob.is_alive());
        assert_eq!(mob.hp, mob.max_hp);
        assert_eq!(mob.room_id, 1, "respawn happens in place");
    }

    #[tokio::test]
    async fn finished_casts_resolve_and_spend_essence() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.known_spells.insert("mage armor".into());
            c.essence = 30.0;
            c.casting = Some(crate::character::CastingInfo {
                key: "mage armor".into(),
                display_name: "Mage Armor".into(),
                target: Some(Actor::Char(1)),
            });
            c.roundtime = 2.0;
        }

        cycle(&mut world, 2.5).await;
        let c = world.character(1).unwrap();
        assert!(c.casting.is_none());
        assert_eq!(c.essence, 25.0, "cost paid at completion");
        assert!(c.barrier_value(&world) >= 15, "the barrier effect landed");
        assert!(c.roundtime > 0.0, "post-cast recovery applied");
    }

    #[tokio::test]
    async fn regen_in_node_is_boosted_and_clamped() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        {
            let c = world.character_mut(1).unwrap();
            c.hp = 10.0;
        }
        cycle(&mut world, 1.0).await;
        let after_one = world.character(1).unwrap().hp;
        assert!(after_one > 10.0);

        cycle(&mut world, 10_000.0).await;
        let c = world.character(1).unwrap();
        assert_eq!(c.hp, c.max_hp, "regen clamps at max");
        assert_eq!(c.essence, c.max_essence);
    }
}
