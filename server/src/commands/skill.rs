//! Progression: leveling at a node, spending skill points, raising
//! attributes.

use ashenmoor_core::constants::{MAX_LEVEL, SKILL_POINTS_PER_LEVEL};
use ashenmoor_core::progression;
use ashenmoor_core::stats::Stat;

use crate::skills;
use crate::world::World;
use crate::CharacterId;

pub async fn cmd_advance(world: &mut World, cn: CharacterId, _args: &str) -> bool {
    let Some(c) = world.character(cn) else { return true };
    if !world.room(c.location_id).map_or(false, |r| r.is_node()) {
        world.send_to_char(cn, "You must be at a node to consolidate your experience and advance.");
        return true;
    }
    if c.level >= MAX_LEVEL {
        world.send_to_char(cn, &format!("You have already reached the maximum level ({MAX_LEVEL})."));
        return true;
    }
    let Some(xp_needed) = progression::xp_needed_for_level(c.level) else {
        return true;
    };
    if c.xp_total < xp_needed {
        world.send_to_char(
            cn,
            &format!("You require {} more experience to advance.", (xp_needed - c.xp_total) as i64),
        );
        return true;
    }

    let (hp_die, essence_die) = world
        .class_def(c.class_id)
        .map(|class| (class.hp_die, class.essence_die))
        .unwrap_or((6, 6));
    let (vit_mod, aura_mod, pers_mod) =
        (c.vit_mod(world), c.aura_mod(world), c.pers_mod(world));

    let (level, hp_gain, essence_gain, sp_gain, ap_gain, tether_gain) = {
        let mut rng = {
            use rand::{RngCore, SeedableRng};
            rand::rngs::StdRng::seed_from_u64(world.rng.next_u64())
        };
        let Some(c) = world.character_mut(cn) else { return true };
        c.level += 1;
        let sp_gain = SKILL_POINTS_PER_LEVEL;
        c.unspent_skill_points += sp_gain;
        let ap_gain = if c.level % 4 == 0 { 1 } else { 0 };
        c.unspent_attribute_points += ap_gain;
        let tether_gain = if c.level % 5 == 0 { 1 } else { 0 };
        c.spiritual_tether += tether_gain;

        let (hp_gain, essence_gain) =
            c.apply_level_up_gains(&mut rng, hp_die, essence_die, vit_mod, aura_mod, pers_mod);
        (c.level, hp_gain, essence_gain, sp_gain, ap_gain, tether_gain)
    };

    learn_class_unlocks(world, cn);

    let name = world.character(cn).map(|c| c.name.clone()).unwrap_or_default();
    log::info!("Character {name} advanced to level {level} (+{hp_gain:.0} hp, +{essence_gain:.0} essence).");

    let Some(c) = world.character(cn) else { return true };
    let mut lines = vec![
        "\r\n{G*** CONGRATULATIONS! ***{x".to_string(),
        format!("You have advanced to level {level}!"),
        format!("Maximum HP increased by {} (now {}).", hp_gain as i64, c.max_hp as i64),
        format!("Maximum essence increased by {} (now {}).", essence_gain as i64, c.max_essence as i64),
        format!("You gain {sp_gain} skill points (unspent: {}).", c.unspent_skill_points),
    ];
    if ap_gain > 0 {
        lines.push(format!(
            "You gain {ap_gain} attribute point (unspent: {}).",
            c.unspent_attribute_points
        ));
    }
    if tether_gain > 0 {
        lines.push(format!("Your spiritual tether strengthens ({}/10).", c.spiritual_tether));
    }
    world.send_to_char(cn, &lines.join("\r\n"));

    let room_id = world.character(cn).map(|c| c.location_id).unwrap_or_default();
    world.broadcast_room(room_id, &format!("\r\n{name} glows briefly with consolidated power!"), &[cn]);

    if let Some(c) = world.character(cn) {
        if let Err(e) = world.db.save_character(c).await {
            log::error!("Saving advanced character {name} failed: {e}");
        }
    }
    true
}

/// Grant any catalog abilities the character now qualifies for.
fn learn_class_unlocks(world: &mut World, cn: CharacterId) {
    let Some(c) = world.character(cn) else { return };
    let class_name = world.class_name(c.class_id).to_ascii_lowercase();
    let level = c.level;

    let unlocks: Vec<(String, String, bool)> = world
        .abilities
        .values()
        .filter(|a| a.usable_by_class(&class_name) && a.level_req <= level)
        .map(|a| {
            (
                a.key.clone(),
                a.name.clone(),
                a.kind == crate::abilities::AbilityKind::Spell,
            )
        })
        .collect();

    let mut learned = Vec::new();
    if let Some(c) = world.character_mut(cn) {
        for (key, name, is_spell) in unlocks {
            let added = if is_spell {
                c.known_spells.insert(key)
            } else {
                c.known_abilities.insert(key)
            };
            if added {
                learned.push((name, is_spell));
            }
        }
        if !learned.is_empty() {
            c.dirty = true;
        }
    }
    for (name, is_spell) in learned {
        let kind = if is_spell { "spell" } else { "ability" };
        world.send_to_char(cn, &format!("{{GYou have learned the {name} {kind}!{{x"));
    }
}

pub async fn cmd_spend(world: &mut World, cn: CharacterId, args: &str) -> bool {
    if args.trim().is_empty() {
        let points = world.character(cn).map_or(0, |c| c.unspent_skill_points);
        world.send_to_char(cn, "Spend points on which skill? (e.g. spend lockpicking 2)");
        world.send_to_char(cn, &format!("You have {points} skill points available."));
        return true;
    }

    // `spend <skill words> [amount]`
    let mut words: Vec<&str> = args.split_whitespace().collect();
    let mut amount: i64 = 1;
    if let Some(last) = words.last() {
        if let Ok(n) = last.parse::<i64>() {
            amount = n;
            words.pop();
        }
    }
    let skill_query = words.join(" ").to_ascii_lowercase();
    if amount <= 0 {
        world.send_to_char(cn, "You must spend a positive number of points.");
        return true;
    }

    let matches: Vec<&&str> = skills::INITIAL_SKILLS
        .iter()
        .filter(|s| s.starts_with(&skill_query))
        .collect();
    let skill = match matches.as_slice() {
        [only] => only.to_string(),
        _ if skills::INITIAL_SKILLS.contains(&skill_query.as_str()) => skill_query.clone(),
        [] => {
            world.send_to_char(cn, &format!("Unknown skill '{skill_query}'. Type 'skills' to list them."));
            return true;
        }
        _ => {
            world.send_to_char(cn, &format!("'{skill_query}' is ambiguous; be more specific."));
            return true;
        }
    };

    let Some(c) = world.character_mut(cn) else { return true };
    if c.unspent_skill_points < amount {
        let available = c.unspent_skill_points;
        world.send_to_char(cn, &format!("You only have {available} points to spend."));
        return true;
    }
    c.unspent_skill_points -= amount;
    let rank = c.skills.entry(skill.clone()).or_insert(0);
    *rank += amount;
    let new_rank = *rank;
    c.dirty = true;

    world.send_to_char(
        cn,
        &format!("You train {skill} to rank {new_rank}. ({} points left)",
            world.character(cn).map_or(0, |c| c.unspent_skill_points)),
    );
    true
}

pub async fn cmd_improve(world: &mut World, cn: CharacterId, args: &str) -> bool {
    let Some(stat) = Stat::parse(args.trim()) else {
        world.send_to_char(
            cn,
            "Improve which attribute? (might, vitality, agility, intellect, aura, persona)",
        );
        return true;
    };

    let Some(c) = world.character(cn) else { return true };
    if c.unspent_attribute_points < 1 {
        world.send_to_char(cn, "You have no attribute points to spend.");
        return true;
    }
    let (hp_die, essence_die) = world
        .class_def(c.class_id)
        .map(|class| (class.hp_die, class.essence_die))
        .unwrap_or((6, 6));

    let new_value = {
        let Some(c) = world.character_mut(cn) else { return true };
        c.unspent_attribute_points -= 1;
        let new_value = c.stats.get(stat) + 1;
        c.stats.set(stat, new_value);
        c.dirty = true;
        new_value
    };

    // A shifted attribute can move the vitals ceiling.
    let (vit_mod, aura_mod, pers_mod) = {
        let Some(c) = world.character(cn) else { return true };
        (c.vit_mod(world), c.aura_mod(world), c.pers_mod(world))
    };
    if let Some(c) = world.character_mut(cn) {
        c.recalculate_max_vitals(hp_die, essence_die, vit_mod, aura_mod, pers_mod);
    }

    world.send_to_char(
        cn,
        &format!("Your {} rises to {new_value}.", stat.key()),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::test_support::*;

    #[tokio::test]
    async fn spend_trains_prefix_matched_skills() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().unspent_skill_points = 10;

        cmd_spend(&mut world, 1, "lockp 3").await;
        let c = world.character(1).unwrap();
        assert_eq!(c.skill_rank("lockpicking"), 3);
        assert_eq!(c.unspent_skill_points, 7);
    }

    #[tokio::test]
    async fn spend_rejects_overdraft_and_unknowns() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().unspent_skill_points = 1;

        cmd_spend(&mut world, 1, "stealth 5").await;
        assert_eq!(world.character(1).unwrap().skill_rank("stealth"), 0);

        cmd_spend(&mut world, 1, "juggling").await;
        assert_eq!(world.character(1).unwrap().unspent_skill_points, 1);
    }

    #[tokio::test]
    async fn advance_needs_a_node_and_enough_xp() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        // Room 1 is seeded as a NODE; without XP nothing happens.
        cmd_advance(&mut world, 1, "").await;
        assert_eq!(world.character(1).unwrap().level, 1);

        world.character_mut(1).unwrap().xp_total = 2000.0;
        cmd_advance(&mut world, 1, "").await;
        let c = world.character(1).unwrap();
        assert_eq!(c.level, 2);
        assert_eq!(c.unspent_skill_points, SKILL_POINTS_PER_LEVEL);
        assert_eq!(c.hp, c.max_hp, "level-up refills vitals");
    }

    #[tokio::test]
    async fn improve_spends_attribute_points() {
        let mut world = build_world().await;
        add_test_character(&mut world, 1, 1);
        world.character_mut(1).unwrap().unspent_attribute_points = 2;

        cmd_improve(&mut world, 1, "might").await;
        let c = world.character(1).unwrap();
        assert_eq!(c.stats.might, 11);
        assert_eq!(c.unspent_attribute_points, 1);
    }
}
