//! Template-driven NPCs. Instances are runtime-only: they spawn at world
//! build, die in place, and respawn from their own template after a delay.

use std::collections::HashMap;

use rand::Rng;
use serde::Deserialize;

use ashenmoor_core::flags::MobFlags;
use ashenmoor_core::stats::{modifier, Stat, StatBlock};
use ashenmoor_core::types::DamageType;

use crate::db::world::MobTemplateRow;
use crate::effect::{total_bonus, Effect, EffectStat};
use crate::item::LootTable;
use crate::world::Actor;
use crate::{MobId, RoomId};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MobAttack {
    pub name: String,
    pub damage_base: i64,
    pub damage_rng: i64,
    pub speed: f64,
    pub attack_type: AttackKind,
    pub damage_type: Option<DamageType>,
}

impl Default for MobAttack {
    fn default() -> Self {
        MobAttack {
            name: "a strike".into(),
            damage_base: 1,
            damage_rng: 2,
            speed: 2.0,
            attack_type: AttackKind::Melee,
            damage_type: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttackKind {
    Melee,
    Ranged,
}

impl Default for AttackKind {
    fn default() -> Self {
        AttackKind::Melee
    }
}

#[derive(Debug, Clone)]
pub struct MobTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub level: u32,
    pub max_hp: i64,
    pub stats: StatBlock,
    pub attacks: Vec<MobAttack>,
    pub loot: LootTable,
    pub flags: MobFlags,
    pub resistances: HashMap<DamageType, f64>,
    pub respawn_delay: f64,
}

impl MobTemplate {
    pub fn from_row(row: &MobTemplateRow) -> MobTemplate {
        let stats: StatBlock = serde_json::from_str(&row.stats).unwrap_or_else(|e| {
            log::warn!("Mob template {} has bad stats JSON: {e}", row.id);
            StatBlock::default()
        });
        let attacks: Vec<MobAttack> = serde_json::from_str(&row.attacks).unwrap_or_else(|e| {
            log::warn!("Mob template {} has bad attacks JSON: {e}", row.id);
            Vec::new()
        });
        let loot: LootTable = serde_json::from_str(&row.loot).unwrap_or_default();
        let flag_names: Vec<String> = serde_json::from_str(&row.flags).unwrap_or_default();
        let flags = MobFlags::from_names(flag_names.iter().map(String::as_str));
        let resistances: HashMap<DamageType, f64> =
            serde_json::from_str(&row.resistances).unwrap_or_default();

        MobTemplate {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            level: row.level.max(1) as u32,
            max_hp: row.max_hp.max(1),
            stats,
            attacks,
            loot,
            flags,
            resistances,
            respawn_delay: row.respawn_delay_seconds.max(0) as f64,
        }
    }
}

#[derive(Debug)]
pub struct Mob {
    pub id: MobId,
    pub template_id: i64,
    pub name: String,
    pub room_id: RoomId,
    pub level: u32,
    pub hp: f64,
    pub max_hp: f64,
    pub stats: StatBlock,
    pub flags: MobFlags,
    pub respawn_delay: f64,
    // Runtime combat state.
    pub target: Option<Actor>,
    pub is_fighting: bool,
    pub roundtime: f64,
    pub time_of_death: Option<f64>,
    pub effects: HashMap<String, Effect>,
    pub hidden: bool,
}

impl Mob {
    /// Spawn an instance. Max HP and stats get a little per-instance
    /// variance (+/-10%) so a room of rats is not a row of clones.
    pub fn spawn(id: MobId, template: &MobTemplate, room_id: RoomId, rng: &mut impl Rng) -> Mob {
        let variance = rng.gen_range(0.9..=1.1);
        let max_hp = ((template.max_hp as f64 * variance).round()).max(1.0);

        let mut stats = template.stats;
        for stat in Stat::ALL {
            let jitter = rng.gen_range(-1..=1);
            stats.set(stat, (stats.get(stat) + jitter).max(1));
        }

        Mob {
            id,
            template_id: template.id,
            name: template.name.clone(),
            room_id,
            level: template.level,
            hp: max_hp,
            max_hp,
            stats,
            flags: template.flags,
            respawn_delay: template.respawn_delay,
            target: None,
            is_fighting: false,
            roundtime: 0.0,
            time_of_death: None,
            effects: HashMap::new(),
            hidden: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0 && self.time_of_death.is_none()
    }

    pub fn aggressive(&self) -> bool {
        self.flags.contains(MobFlags::AGGRESSIVE)
    }

    pub fn tick_roundtime(&mut self, dt: f64) {
        if self.roundtime > 0.0 {
            self.roundtime = (self.roundtime - dt).max(0.0);
        }
    }

    /// Mark dead and start the respawn clock.
    pub fn die(&mut self, now: f64) {
        if !self.is_alive() {
            return;
        }
        self.hp = 0.0;
        self.target = None;
        self.is_fighting = false;
        self.roundtime = 0.0;
        self.time_of_death = Some(now);
    }

    /// Reset in place to full template state.
    pub fn respawn(&mut self) {
        if self.is_alive() {
            return;
        }
        self.hp = self.max_hp;
        self.target = None;
        self.is_fighting = false;
        self.roundtime = 0.0;
        self.time_of_death = None;
        self.effects.clear();
        self.hidden = false;
    }

    pub fn ready_to_respawn(&self, now: f64) -> bool {
        match self.time_of_death {
            Some(died_at) => now - died_at >= self.respawn_delay,
            None => false,
        }
    }

    // --- Derived attributes (effects included, no equipment) ---

    fn stat_mod(&self, stat: Stat, now: f64) -> i64 {
        let channel = EffectStat::from_attribute(stat);
        modifier(self.stats.get(stat) + total_bonus(&self.effects, channel, now) as i64)
    }

    pub fn mar(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Might, now)
            + self.stat_mod(Stat::Agility, now).div_euclid(2)
            + total_bonus(&self.effects, EffectStat::AttackRating, now) as i64
    }

    pub fn rar(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Agility, now)
            + self.stat_mod(Stat::Might, now).div_euclid(2)
            + total_bonus(&self.effects, EffectStat::AttackRating, now) as i64
    }

    pub fn apr(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Intellect, now) + self.stat_mod(Stat::Aura, now).div_euclid(2)
    }

    pub fn dpr(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Aura, now) + self.stat_mod(Stat::Persona, now).div_euclid(2)
    }

    pub fn pds(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Vitality, now)
    }

    pub fn sds(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Aura, now)
    }

    pub fn dv(&self, now: f64) -> i64 {
        self.stat_mod(Stat::Agility, now) * 2
            + total_bonus(&self.effects, EffectStat::DodgeValue, now) as i64
    }

    pub fn total_av(&self, now: f64) -> i64 {
        total_bonus(&self.effects, EffectStat::ArmorValue, now) as i64
    }

    pub fn barrier_value(&self, now: f64) -> i64 {
        total_bonus(&self.effects, EffectStat::BarrierValue, now) as i64
    }

    pub fn slow_penalty(&self, now: f64) -> f64 {
        total_bonus(&self.effects, EffectStat::Roundtime, now).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template() -> MobTemplate {
        MobTemplate::from_row(&MobTemplateRow {
            id: 7,
            name: "a giant rat".into(),
            description: "Mangy and bold.".into(),
            level: 2,
            max_hp: 20,
            stats: r#"{"might": 9, "agility": 9}"#.into(),
            attacks: r#"[{"name": "a bite", "damage_base": 2, "damage_rng": 3, "speed": 2.0}]"#
                .into(),
            loot: r#"{"coinage_max": 20, "items": [{"template_id": 3, "chance": 0.5}]}"#.into(),
            flags: r#"["AGGRESSIVE"]"#.into(),
            resistances: r#"{"poison": 0.5}"#.into(),
            respawn_delay_seconds: 30,
        })
    }

    #[test]
    fn template_hydrates_typed_fields() {
        let t = template();
        assert_eq!(t.attacks.len(), 1);
        assert_eq!(t.attacks[0].speed, 2.0);
        assert_eq!(t.loot.coinage_max, 20);
        assert!(t.flags.contains(MobFlags::AGGRESSIVE));
        assert_eq!(t.resistances.get(&DamageType::Poison), Some(&0.5));
    }

    #[test]
    fn spawn_variance_stays_close_to_template() {
        let t = template();
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..100 {
            let mob = Mob::spawn(i, &t, 1, &mut rng);
            assert!(mob.max_hp >= 18.0 && mob.max_hp <= 22.0, "hp {}", mob.max_hp);
            assert!(mob.is_alive());
        }
    }

    #[test]
    fn death_and_respawn_cycle() {
        let t = template();
        let mut rng = StdRng::seed_from_u64(1);
        let mut mob = Mob::spawn(1, &t, 1, &mut rng);

        mob.die(100.0);
        assert!(!mob.is_alive());
        assert!(!mob.ready_to_respawn(110.0));
        assert!(mob.ready_to_respawn(130.0));

        mob.respawn();
        assert!(mob.is_alive());
        assert_eq!(mob.hp, mob.max_hp);
        assert_eq!(mob.time_of_death, None);
    }

    #[test]
    fn dv_is_twice_agility_mod() {
        let t = template();
        let mut rng = StdRng::seed_from_u64(9);
        let mut mob = Mob::spawn(1, &t, 1, &mut rng);
        mob.stats.set(Stat::Agility, 9);
        assert_eq!(mob.dv(0.0), 6);
    }
}
