//! Phase C: pre-mitigation damage, the weather multiplier, and the layered
//! mitigation stack (flat defense scalar, then the armor/barrier
//! max-with-halving rule, then type resistance).

use ashenmoor_core::constants::{UNARMED_DAMAGE_BASE, UNARMED_DAMAGE_RNG};
use ashenmoor_core::dice;
use ashenmoor_core::flags::RoomFlags;
use ashenmoor_core::types::{DamageType, School};

use crate::abilities::EffectDetails;
use crate::world::{Actor, World};

use super::AttackSource;

#[derive(Debug, Clone)]
pub struct DamageInfo {
    pub pre_mitigation: i64,
    pub damage_type: DamageType,
    pub is_crit: bool,
    pub attack_name: String,
}

/// Pre-mitigation physical damage: weapon base + d(rng) + stat modifier +
/// ability bonus, with an exploding bonus die on a crit.
pub fn calculate_physical_damage(
    world: &mut World,
    attacker: Actor,
    source: &AttackSource,
    is_crit: bool,
    ability: Option<&EffectDetails>,
) -> DamageInfo {
    let (base, rng_size, damage_type, attack_name) = match source {
        AttackSource::Weapon(item_id) => match world.template_of(*item_id) {
            Some(template) => (
                template.stats.damage_base,
                template.stats.damage_rng,
                template.damage_type.unwrap_or(DamageType::Bludgeon),
                template.name.clone(),
            ),
            None => (UNARMED_DAMAGE_BASE, UNARMED_DAMAGE_RNG, DamageType::Bludgeon, "a strike".into()),
        },
        AttackSource::Natural(attack) => (
            attack.damage_base,
            attack.damage_rng,
            attack.damage_type.unwrap_or(DamageType::Bludgeon),
            attack.name.clone(),
        ),
        AttackSource::Unarmed => (
            UNARMED_DAMAGE_BASE,
            UNARMED_DAMAGE_RNG,
            DamageType::Bludgeon,
            "unarmed strike".into(),
        ),
    };

    let stat_modifier = world.actor_mar_stat_mod(attacker);
    let bonus_damage = ability.map_or(0, |a| a.bonus_damage);

    let mut random = dice::roll(&mut world.rng, rng_size);
    if is_crit {
        random += dice::roll_exploding(&mut world.rng, rng_size);
    }

    DamageInfo {
        pre_mitigation: (base + random + stat_modifier + bonus_damage).max(0),
        damage_type,
        is_crit,
        attack_name,
    }
}

impl World {
    /// Might modifier feeding physical damage.
    fn actor_mar_stat_mod(&self, actor: Actor) -> i64 {
        match actor {
            Actor::Char(id) => self
                .character(id)
                .map_or(0, |c| c.might_mod(self)),
            Actor::Mob(id) => self
                .mob(id)
                .map_or(0, |m| ashenmoor_core::stats::modifier(m.stats.might)),
        }
    }
}

/// Pre-mitigation magical damage; the school's power rating contributes
/// `max(1, floor(power / 4))`.
pub fn calculate_magical_damage(
    world: &mut World,
    caster: Actor,
    details: &EffectDetails,
    is_crit: bool,
) -> DamageInfo {
    let power = world.actor_power_rating(caster, details.school);
    let stat_modifier = if power <= 0 { power.div_euclid(4) } else { (power.div_euclid(4)).max(1) };

    let mut random = dice::roll(&mut world.rng, details.damage_rng);
    if is_crit {
        random += dice::roll_exploding(&mut world.rng, details.damage_rng);
    }

    DamageInfo {
        pre_mitigation: (details.damage_base + random + stat_modifier).max(0),
        damage_type: details.damage_type.unwrap_or(DamageType::Arcane),
        is_crit,
        attack_name: "a spell".into(),
    }
}

/// Environmental multiplier for magical damage types, read off the room's
/// weather flags.
pub fn weather_damage_modifier(flags: RoomFlags, damage_type: DamageType) -> f64 {
    let mut modifier = 1.0;
    if flags.contains(RoomFlags::WET) {
        match damage_type {
            DamageType::Fire => modifier *= 0.75,
            DamageType::Lightning => modifier *= 1.25,
            _ => {}
        }
    }
    if flags.contains(RoomFlags::STORMY) && damage_type == DamageType::Lightning {
        modifier *= 1.5;
    }
    if flags.contains(RoomFlags::FREEZING) {
        match damage_type {
            DamageType::Cold => modifier *= 1.25,
            DamageType::Fire => modifier *= 0.9,
            _ => {}
        }
    }
    if flags.contains(RoomFlags::BLAZING) {
        match damage_type {
            DamageType::Fire => modifier *= 1.25,
            DamageType::Cold => modifier *= 0.9,
            _ => {}
        }
    }
    if flags.contains(RoomFlags::SANDSTORM)
        && matches!(damage_type, DamageType::Fire | DamageType::Cold | DamageType::Lightning)
    {
        modifier *= 0.85;
    }
    modifier
}

/// Apply the room's weather multiplier to pre-mitigation damage (integer
/// floor).
pub fn apply_weather(world: &World, room_id: crate::RoomId, info: &mut DamageInfo) {
    let Some(room) = world.room(room_id) else { return };
    let modifier = weather_damage_modifier(room.flags, info.damage_type);
    if (modifier - 1.0).abs() > f64::EPSILON {
        info.pre_mitigation = (info.pre_mitigation as f64 * modifier).floor() as i64;
    }
}

/// Physical mitigation: flat PDS, then the better of armor or half-barrier,
/// then resistance. Never negative.
pub fn mitigate_physical(world: &World, target: Actor, info: &DamageInfo) -> i64 {
    let after_pds = (info.pre_mitigation - world.actor_pds(target)).max(0);

    let armor = world.actor_total_av(target);
    let half_barrier = world.actor_barrier_value(target).div_euclid(2);
    let after_armor = (after_pds - armor.max(half_barrier)).max(0);

    apply_resistance(world, target, info.damage_type, after_armor)
}

/// Magical mitigation mirrors the physical path with SDS and the
/// barrier-favored max rule.
pub fn mitigate_magical(world: &World, target: Actor, info: &DamageInfo) -> i64 {
    let after_sds = (info.pre_mitigation - world.actor_sds(target)).max(0);

    let barrier = world.actor_barrier_value(target);
    let half_armor = world.actor_total_av(target).div_euclid(2);
    let after_barrier = (after_sds - barrier.max(half_armor)).max(0);

    apply_resistance(world, target, info.damage_type, after_barrier)
}

fn apply_resistance(world: &World, target: Actor, damage_type: DamageType, damage: i64) -> i64 {
    let resistance = world.actor_resistance(target, damage_type);
    if resistance == 0.0 {
        return damage.max(0);
    }
    ((damage as f64 * (1.0 - resistance)) as i64).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;
    use ashenmoor_core::stats::Stat;

    #[test]
    fn weather_floor_math_from_the_contract() {
        // 8 damage under a 0.75 modifier floors to 6.
        let modifier = weather_damage_modifier(RoomFlags::WET, DamageType::Fire);
        assert_eq!(modifier, 0.75);
        assert_eq!((8.0f64 * modifier).floor() as i64, 6);
    }

    #[test]
    fn storm_stacks_on_wet_for_lightning() {
        let flags = RoomFlags::WET | RoomFlags::STORMY;
        let modifier = weather_damage_modifier(flags, DamageType::Lightning);
        assert!((modifier - 1.875).abs() < 1e-9, "1.25 * 1.5, got {modifier}");
    }

    #[test]
    fn blazing_inverts_freezing() {
        assert_eq!(weather_damage_modifier(RoomFlags::FREEZING, DamageType::Cold), 1.25);
        assert_eq!(weather_damage_modifier(RoomFlags::BLAZING, DamageType::Cold), 0.9);
        assert_eq!(weather_damage_modifier(RoomFlags::BLAZING, DamageType::Fire), 1.25);
    }

    #[test]
    fn sandstorm_dampens_all_elemental_channels() {
        for damage_type in [DamageType::Fire, DamageType::Cold, DamageType::Lightning] {
            assert_eq!(weather_damage_modifier(RoomFlags::SANDSTORM, damage_type), 0.85);
        }
        assert_eq!(weather_damage_modifier(RoomFlags::SANDSTORM, DamageType::Arcane), 1.0);
    }

    #[tokio::test]
    async fn physical_mitigation_layers_in_order() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        // vit 15 -> pds 5.
        world.character_mut(1).unwrap().stats.set(Stat::Vitality, 15);

        let info = DamageInfo {
            pre_mitigation: 20,
            damage_type: DamageType::Slash,
            is_crit: false,
            attack_name: "test".into(),
        };
        // 20 - pds 5 = 15; no armor, no barrier, no resistance.
        assert_eq!(mitigate_physical(&world, Actor::Char(1), &info), 15);
    }

    #[tokio::test]
    async fn mitigation_never_goes_negative() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().stats.set(Stat::Vitality, 60);

        let info = DamageInfo {
            pre_mitigation: 3,
            damage_type: DamageType::Slash,
            is_crit: false,
            attack_name: "test".into(),
        };
        assert_eq!(mitigate_physical(&world, Actor::Char(1), &info), 0);
    }

    #[tokio::test]
    async fn unarmed_uses_one_and_two(){
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        // Might 10 -> +3 modifier; unarmed is base 1 + d2.
        for _ in 0..50 {
            let info = calculate_physical_damage(
                &mut world,
                Actor::Char(1),
                &AttackSource::Unarmed,
                false,
                None,
            );
            assert!((5..=6).contains(&info.pre_mitigation), "got {}", info.pre_mitigation);
            assert_eq!(info.damage_type, DamageType::Bludgeon);
        }
    }
}
