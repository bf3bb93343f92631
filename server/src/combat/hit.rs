//! Phase A: does the attack land at all. A natural 1 always misses, a
//! natural 20 always critically hits; everything else is a contest of
//! modified roll plus rating against the defender's dodge value.

use ashenmoor_core::dice;
use ashenmoor_core::types::{DamageType, ItemType, School};

use crate::world::{Actor, World};

#[derive(Debug, Clone, Copy)]
pub struct HitResult {
    pub is_hit: bool,
    pub is_crit: bool,
    pub roll: i64,
    pub attacker_rating: i64,
    pub target_dv: i64,
}

/// Weapon-skill bonus for a player attacker: `floor(rank / 25)` of the
/// skill matching the wielded weapon, martial arts when unarmed.
fn weapon_skill_bonus(world: &World, attacker: Actor, use_rar: bool) -> i64 {
    let Actor::Char(id) = attacker else { return 0 };
    let Some(character) = world.character(id) else { return 0 };

    if use_rar {
        return character.skill_rank("projectile weapons") / 25;
    }

    let skill = match character.main_hand().and_then(|item| world.template_of(item)) {
        None => "martial arts",
        Some(template) if template.item_type.is_weapon() => match template.damage_type {
            Some(DamageType::Slash) | Some(DamageType::Pierce) => "bladed weapons",
            Some(DamageType::Bludgeon) | None => "bludgeon weapons",
            _ => "bludgeon weapons",
        },
        Some(_) => "martial arts",
    };
    character.skill_rank(skill) / 25
}

/// Defender DV; characters pay for their armor load out of dodge.
fn effective_dv(world: &World, target: Actor) -> i64 {
    let dv = world.actor_dv(target);
    match target {
        Actor::Char(_) => (dv - world.actor_total_av(target)).max(0),
        Actor::Mob(_) => dv,
    }
}

/// Physical hit check: d20 + MAR (or RAR) vs DV.
pub fn check_physical_hit(
    world: &mut World,
    attacker: Actor,
    target: Actor,
    use_rar: bool,
    hit_modifier: i64,
) -> HitResult {
    let base_rating = if use_rar {
        world.actor_rar(attacker)
    } else {
        world.actor_mar(attacker)
    };
    let attacker_rating = base_rating + weapon_skill_bonus(world, attacker, use_rar);
    let target_dv = effective_dv(world, target);

    let roll = dice::d20(&mut world.rng);
    let (is_hit, is_crit) = match roll {
        1 => (false, false),
        20 => (true, true),
        _ => ((roll + hit_modifier + attacker_rating) > target_dv, false),
    };

    HitResult { is_hit, is_crit, roll, attacker_rating, target_dv }
}

/// Magical hit check: d20 + APR/DPR vs DV.
pub fn check_magical_hit(
    world: &mut World,
    caster: Actor,
    target: Actor,
    school: School,
) -> HitResult {
    let attacker_rating = world.actor_power_rating(caster, school);
    let target_dv = world.actor_dv(target);

    let roll = dice::d20(&mut world.rng);
    let (is_hit, is_crit) = match roll {
        1 => (false, false),
        20 => (true, true),
        _ => ((roll + attacker_rating) > target_dv, false),
    };

    HitResult { is_hit, is_crit, roll, attacker_rating, target_dv }
}

/// A spell flagged `always_hits` skips phase A entirely.
pub fn automatic_hit() -> HitResult {
    HitResult { is_hit: true, is_crit: false, roll: 0, attacker_rating: 0, target_dv: 0 }
}

/// Parry chance for a defender: needs a main-hand weapon, scales with the
/// parrying skill, hard-capped. Zero without a weapon.
pub fn parry_chance(world: &World, defender: Actor) -> f64 {
    use ashenmoor_core::constants::{PARRY_CHANCE_CAP, PARRY_CHANCE_PER_RANK};

    let Actor::Char(id) = defender else { return 0.0 };
    let Some(character) = world.character(id) else { return 0.0 };
    let Some(weapon) = character.main_hand() else { return 0.0 };
    if !world.template_of(weapon).map_or(false, |t| t.item_type.is_weapon()) {
        return 0.0;
    }
    (character.skill_rank("parrying") as f64 * PARRY_CHANCE_PER_RANK).min(PARRY_CHANCE_CAP)
}

/// Block chance: the shield's base chance plus one percent per ten ranks of
/// shield usage. Zero without a shield in the off hand.
pub fn block_chance(world: &World, defender: Actor) -> f64 {
    let Actor::Char(id) = defender else { return 0.0 };
    let Some(character) = world.character(id) else { return 0.0 };
    let Some(shield) = character.shield(world) else { return 0.0 };

    let base = world.template_of(shield).map_or(0.0, |t| t.stats.block_chance);
    base + (character.skill_rank("shield usage") / 10) as f64 * 0.01
}

/// Phase B, first gate: parry negates the attack outright.
pub fn roll_parry(world: &mut World, defender: Actor) -> bool {
    use rand::Rng;
    let chance = parry_chance(world, defender);
    chance > 0.0 && world.rng.gen_range(0.0..1.0) < chance
}

/// Phase B, second gate: shield block. Checked only after parry fails.
pub fn roll_block(world: &mut World, defender: Actor) -> bool {
    use rand::Rng;
    let chance = block_chance(world, defender);
    chance > 0.0 && world.rng.gen_range(0.0..1.0) < chance
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::slots::WearSlot;
    use ashenmoor_core::stats::Stat;
    use crate::item::ItemInstance;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    async fn world_with_two_chars() -> crate::world::World {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        add_test_character(&mut world, 2, 1);
        world
    }

    #[tokio::test]
    async fn natural_extremes_override_ratings() {
        let mut world = world_with_two_chars().await;
        // Make the defender untouchable on paper.
        world.character_mut(2).unwrap().stats.set(Stat::Agility, 60);

        let mut saw_crit = false;
        let mut saw_fumble = false;
        for seed in 0..300 {
            world.rng = StdRng::seed_from_u64(seed);
            let result = check_physical_hit(&mut world, Actor::Char(1), Actor::Char(2), false, 0);
            if result.roll == 20 {
                assert!(result.is_hit && result.is_crit);
                saw_crit = true;
            }
            if result.roll == 1 {
                assert!(!result.is_hit);
                saw_fumble = true;
            }
        }
        assert!(saw_crit && saw_fumble, "300 seeds should produce both extremes");
    }

    #[tokio::test]
    async fn armor_load_penalizes_character_dodge() {
        let mut world = world_with_two_chars().await;
        add_template(&mut world, 900, "ARMOR", r#"{"armor": 8, "wear_location": "torso"}"#);
        world.items.insert(
            900,
            ItemInstance {
                id: 900,
                template_id: 900,
                condition: 100,
                stats: Default::default(),
                contents: Vec::new(),
            },
        );
        world
            .character_mut(2)
            .unwrap()
            .equipment
            .insert(WearSlot::Torso, 900);

        let bare_dv = world.character(2).unwrap().dv(&world);
        let result = check_physical_hit(&mut world, Actor::Char(1), Actor::Char(2), false, 0);
        assert_eq!(result.target_dv, (bare_dv - 8).max(0));
    }

    #[tokio::test]
    async fn parry_needs_a_weapon_and_ranks() {
        let mut world = world_with_two_chars().await;
        // No weapon, high skill: still cannot parry.
        world
            .character_mut(2)
            .unwrap()
            .skills
            .insert("parrying".into(), 100);
        assert!(!roll_parry(&mut world, Actor::Char(2)));
    }

    #[tokio::test]
    async fn block_without_shield_is_impossible() {
        let mut world = world_with_two_chars().await;
        world
            .character_mut(2)
            .unwrap()
            .skills
            .insert("shield usage".into(), 100);
        assert!(!roll_block(&mut world, Actor::Char(2)));
    }

    #[tokio::test]
    async fn block_chance_is_base_plus_rank_bonus() {
        let mut world = world_with_two_chars().await;
        add_template(
            &mut world,
            901,
            "SHIELD",
            r#"{"block_chance": 0.15, "armor": 2, "wear_location": "off_hand"}"#,
        );
        world.items.insert(
            901,
            ItemInstance {
                id: 901,
                template_id: 901,
                condition: 100,
                stats: Default::default(),
                contents: Vec::new(),
            },
        );
        {
            let c = world.character_mut(2).unwrap();
            c.equipment.insert(WearSlot::OffHand, 901);
            c.skills.insert("shield usage".into(), 20);
        }

        // 0.15 base + floor(20/10) * 0.01: a 0.14 roll would block.
        let chance = block_chance(&world, Actor::Char(2));
        assert!((chance - 0.17).abs() < 1e-9, "got {chance}");
    }

    #[tokio::test]
    async fn parry_chance_scales_and_caps() {
        let mut world = world_with_two_chars().await;
        add_template(&mut world, 902, "WEAPON", r#"{"damage_base": 5, "damage_rng": 3}"#);
        world.items.insert(
            902,
            ItemInstance {
                id: 902,
                template_id: 902,
                condition: 100,
                stats: Default::default(),
                contents: Vec::new(),
            },
        );
        world
            .character_mut(2)
            .unwrap()
            .equipment
            .insert(WearSlot::MainHand, 902);

        world.character_mut(2).unwrap().skills.insert("parrying".into(), 40);
        assert!((parry_chance(&world, Actor::Char(2)) - 0.2).abs() < 1e-9);

        // 500 ranks would be 2.5; the cap holds it at one in two.
        world.character_mut(2).unwrap().skills.insert("parrying".into(), 500);
        assert!((parry_chance(&world, Actor::Char(2)) - 0.5).abs() < 1e-9);
    }
}
