//! Player characters: durable sheet plus runtime combat and session state.
//! Derived attributes are computed on demand from base stats, equipped item
//! overlays and live effects, so a query is always consistent with whatever
//! just changed.

use std::collections::{BTreeSet, HashMap, HashSet};

use rand::Rng;

use ashenmoor_core::constants;
use ashenmoor_core::dice;
use ashenmoor_core::flags::RoomFlags;
use ashenmoor_core::stats::{modifier, Stat, StatBlock};
use ashenmoor_core::types::{DamageType, ItemType, Sex, Stance, Status};

use ashenmoor_core::slots::WearSlot;

use crate::db::characters::CharacterRow;
use crate::effect::{total_bonus, Effect, EffectStat};
use crate::skills;
use crate::world::{Actor, World};
use crate::{CharacterId, GroupId, ItemId, RoomId, SessionId};

/// A spell or ability mid-cast; resolves when roundtime runs out.
#[derive(Debug, Clone)]
pub struct CastingInfo {
    pub key: String,
    pub display_name: String,
    pub target: Option<Actor>,
}

/// An item held out to another character, waiting on accept/decline.
#[derive(Debug, Clone)]
pub struct GiveOffer {
    pub from: CharacterId,
    pub item: ItemId,
}

#[derive(Debug)]
pub struct Character {
    // --- Durable sheet ---
    pub id: CharacterId,
    pub player_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub name: String,
    pub sex: Sex,
    pub race_id: i64,
    pub class_id: i64,
    pub level: u32,
    pub hp: f64,
    pub max_hp: f64,
    pub essence: f64,
    pub max_essence: f64,
    pub xp_pool: f64,
    pub xp_total: f64,
    pub unspent_skill_points: i64,
    pub unspent_attribute_points: i64,
    pub spiritual_tether: i64,
    pub description: String,
    pub coinage: i64,
    pub location_id: RoomId,
    pub status: Status,
    pub stance: Stance,
    pub stats: StatBlock,
    pub skills: HashMap<String, i64>,
    pub known_spells: BTreeSet<String>,
    pub known_abilities: BTreeSet<String>,
    pub inventory: Vec<ItemId>,
    pub equipment: HashMap<WearSlot, ItemId>,
    pub hunger: f64,
    pub thirst: f64,
    pub total_playtime_seconds: i64,
    pub is_admin: bool,

    // --- Runtime only ---
    pub session: Option<SessionId>,
    pub target: Option<Actor>,
    pub is_fighting: bool,
    pub casting: Option<CastingInfo>,
    pub effects: HashMap<String, Effect>,
    pub roundtime: f64,
    pub death_timer_ends_at: Option<f64>,
    pub pending_give: Option<GiveOffer>,
    pub detected_traps: HashSet<ItemId>,
    pub hidden: bool,
    pub group_id: Option<GroupId>,
    pub resistances: HashMap<DamageType, f64>,
    pub login_at: Option<f64>,
    pub dirty: bool,
}

impl Character {
    /// Build from a database row. JSON columns that fail to parse are
    /// logged and replaced with empties; a corrupt sheet should load
    /// degraded, not brick the login.
    pub fn from_row(row: &CharacterRow, is_admin: bool) -> Character {
        let stats: StatBlock = serde_json::from_str(&row.stats).unwrap_or_else(|e| {
            log::warn!("Character {} has bad stats JSON: {e}", row.id);
            StatBlock::default()
        });
        let skills: HashMap<String, i64> = serde_json::from_str(&row.skills).unwrap_or_else(|e| {
            log::warn!("Character {} has bad skills JSON: {e}", row.id);
            HashMap::new()
        });
        let known_spells: BTreeSet<String> =
            serde_json::from_str(&row.known_spells).unwrap_or_default();
        let known_abilities: BTreeSet<String> =
            serde_json::from_str(&row.known_abilities).unwrap_or_default();

        let mut status = Status::parse(&row.status).unwrap_or_else(|| {
            log::warn!(
                "Character {} loaded with invalid status {:?}, resetting to ALIVE",
                row.id,
                row.status
            );
            Status::Alive
        });
        let stance = Stance::parse(&row.stance).unwrap_or(Stance::Standing);

        let max_hp = row.max_hp.max(1.0);
        let max_essence = row.max_essence.max(0.0);
        let mut hp = row.hp.clamp(0.0, max_hp);
        let essence = row.essence.clamp(0.0, max_essence);

        // A character saved mid-death comes back on the ground, not in limbo.
        if matches!(status, Status::Dying | Status::Dead) {
            hp = 0.0;
            status = Status::Dead;
        }

        Character {
            id: row.id,
            player_id: row.player_id,
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            name: format!("{} {}", row.first_name, row.last_name),
            sex: Sex::parse(&row.sex).unwrap_or(Sex::Neutral),
            race_id: row.race_id.unwrap_or(0),
            class_id: row.class_id.unwrap_or(0),
            level: row.level.max(1) as u32,
            hp,
            max_hp,
            essence,
            max_essence,
            xp_pool: row.xp_pool.max(0.0),
            xp_total: row.xp_total.max(0.0),
            unspent_skill_points: row.unspent_skill_points,
            unspent_attribute_points: row.unspent_attribute_points,
            spiritual_tether: row.spiritual_tether,
            description: row.description.clone(),
            coinage: row.coinage.max(0),
            location_id: row.location_id,
            status,
            stance,
            stats,
            skills,
            known_spells,
            known_abilities,
            inventory: Vec::new(),
            equipment: HashMap::new(),
            hunger: row.hunger.clamp(0.0, constants::HUNGER_MAX),
            thirst: row.thirst.clamp(0.0, constants::THIRST_MAX),
            total_playtime_seconds: row.total_playtime_seconds,
            is_admin,
            session: None,
            target: None,
            is_fighting: false,
            casting: None,
            effects: HashMap::new(),
            roundtime: 0.0,
            death_timer_ends_at: None,
            pending_give: None,
            detected_traps: HashSet::new(),
            hidden: false,
            group_id: None,
            resistances: HashMap::new(),
            login_at: None,
            dirty: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0.0 && self.status != Status::Dead
    }

    // --- Derived attributes ---

    /// Effective attribute: base + equipped overlays + live effects.
    pub fn stat_value(&self, world: &World, stat: Stat) -> i64 {
        let now = world.now();
        let channel = EffectStat::from_attribute(stat);
        let from_effects = total_bonus(&self.effects, channel, now);
        let from_equipment = self.equipment_bonus(world, channel);
        self.stats.get(stat) + from_effects as i64 + from_equipment as i64
    }

    pub fn stat_mod(&self, world: &World, stat: Stat) -> i64 {
        modifier(self.stat_value(world, stat))
    }

    pub fn might_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Might)
    }
    pub fn vit_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Vitality)
    }
    pub fn agi_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Agility)
    }
    pub fn int_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Intellect)
    }
    pub fn aura_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Aura)
    }
    pub fn pers_mod(&self, world: &World) -> i64 {
        self.stat_mod(world, Stat::Persona)
    }

    /// Melee attack rating.
    pub fn mar(&self, world: &World) -> i64 {
        self.might_mod(world)
            + self.agi_mod(world).div_euclid(2)
            + total_bonus(&self.effects, EffectStat::AttackRating, world.now()) as i64
    }

    /// Ranged attack rating.
    pub fn rar(&self, world: &World) -> i64 {
        self.agi_mod(world)
            + self.might_mod(world).div_euclid(2)
            + total_bonus(&self.effects, EffectStat::AttackRating, world.now()) as i64
    }

    /// Arcane power rating.
    pub fn apr(&self, world: &World) -> i64 {
        self.int_mod(world) + self.aura_mod(world).div_euclid(2)
    }

    /// Divine power rating.
    pub fn dpr(&self, world: &World) -> i64 {
        self.aura_mod(world) + self.pers_mod(world).div_euclid(2)
    }

    /// Physical defense scalar, flat subtraction before armor.
    pub fn pds(&self, world: &World) -> i64 {
        self.vit_mod(world)
    }

    /// Spiritual defense scalar.
    pub fn sds(&self, world: &World) -> i64 {
        self.aura_mod(world)
    }

    /// Dodge value before the armor penalty the hit check applies.
    pub fn dv(&self, world: &World) -> i64 {
        self.agi_mod(world) * 2
            + self.skill_rank("dodge") / 25
            + total_bonus(&self.effects, EffectStat::DodgeValue, world.now()) as i64
    }

    /// Total armor value from worn armor and shields plus armor effects.
    pub fn total_av(&self, world: &World) -> i64 {
        let mut total = 0i64;
        for item_id in self.unique_equipped() {
            if let Some(template) = world.template_of(item_id) {
                if matches!(template.item_type, ItemType::Armor | ItemType::Shield) {
                    total += template.stats.armor;
                }
            }
        }
        total + total_bonus(&self.effects, EffectStat::ArmorValue, world.now()) as i64
    }

    /// Barrier value: live barrier effects plus equipped overlays.
    pub fn barrier_value(&self, world: &World) -> i64 {
        let now = world.now();
        total_bonus(&self.effects, EffectStat::BarrierValue, now) as i64
            + self.equipment_bonus(world, EffectStat::BarrierValue) as i64
    }

    /// Accumulated slow from roundtime-channel effects, never negative.
    pub fn slow_penalty(&self, world: &World) -> f64 {
        total_bonus(&self.effects, EffectStat::Roundtime, world.now()).max(0.0)
    }

    pub fn resistance(&self, damage_type: DamageType) -> f64 {
        self.resistances.get(&damage_type).copied().unwrap_or(0.0)
    }

    fn equipment_bonus(&self, world: &World, channel: EffectStat) -> f64 {
        let mut total = 0.0;
        for item_id in self.unique_equipped() {
            if let Some(template) = world.template_of(item_id) {
                for (key, amount) in &template.stats.bonus_stats {
                    if EffectStat::parse(key) == Some(channel) {
                        total += amount;
                    }
                }
            }
        }
        total
    }

    /// Equipped item ids with the two-handed double entry collapsed.
    pub fn unique_equipped(&self) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for slot in WearSlot::ALL {
            if let Some(&item_id) = self.equipment.get(&slot) {
                if seen.insert(item_id) {
                    out.push(item_id);
                }
            }
        }
        out
    }

    // --- Skills ---

    pub fn skill_rank(&self, skill: &str) -> i64 {
        self.skills.get(&skill.to_ascii_lowercase()).copied().unwrap_or(0)
    }

    /// Rank plus the governing attribute's modifier.
    pub fn skill_modifier(&self, world: &World, skill: &str) -> i64 {
        let rank = self.skill_rank(skill);
        match skills::attribute_for_skill(skill) {
            Some(stat) => rank + self.stat_mod(world, stat),
            None => rank,
        }
    }

    pub fn knows_spell(&self, key: &str) -> bool {
        self.known_spells.contains(&key.to_ascii_lowercase())
    }

    pub fn knows_ability(&self, key: &str) -> bool {
        self.known_abilities.contains(&key.to_ascii_lowercase())
    }

    // --- Inventory ---

    pub fn hands_are_full(&self) -> bool {
        self.inventory.len() >= constants::HANDS_CAPACITY
    }

    pub fn max_weight(&self) -> i64 {
        self.stats.get(Stat::Might) * 10
    }

    pub fn current_weight(&self, world: &World) -> i64 {
        self.inventory
            .iter()
            .chain(self.unique_equipped().iter())
            .filter_map(|&id| world.template_of(id))
            .map(|t| t.stats.weight)
            .sum()
    }

    pub fn main_hand(&self) -> Option<ItemId> {
        self.equipment.get(&WearSlot::MainHand).copied()
    }

    /// Off-hand item id when it is a shield.
    pub fn shield(&self, world: &World) -> Option<ItemId> {
        let item_id = self.equipment.get(&WearSlot::OffHand).copied()?;
        let template = world.template_of(item_id)?;
        (template.item_type == ItemType::Shield).then_some(item_id)
    }

    // --- Vitals ---

    /// Per-tick regeneration; NODE rooms boost both pools, meditation
    /// boosts essence. Modifiers are passed in precomputed so the ticker
    /// can split its world borrow cleanly.
    pub fn update_regen(&mut self, dt: f64, in_node: bool, vit_mod: i64, aura_mod: i64) {
        if !matches!(self.status, Status::Alive | Status::Meditating) {
            return;
        }

        if self.hp < self.max_hp {
            let mut rate = constants::HP_REGEN_BASE_PER_SEC
                + vit_mod as f64 * constants::HP_REGEN_VIT_MULTIPLIER;
            if in_node {
                rate *= constants::NODE_REGEN_MULTIPLIER;
            }
            self.hp = (self.hp + rate.max(0.0) * dt).min(self.max_hp);
        }

        if self.essence < self.max_essence {
            let mut rate = constants::ESSENCE_REGEN_BASE_PER_SEC
                + aura_mod as f64 * constants::ESSENCE_REGEN_AURA_MULTIPLIER;
            if self.status == Status::Meditating {
                rate *= constants::MEDITATE_REGEN_MULTIPLIER;
            }
            if in_node {
                rate *= constants::NODE_REGEN_MULTIPLIER;
            }
            self.essence = (self.essence + rate.max(0.0) * dt).min(self.max_essence);
        }

        self.hunger = (self.hunger - constants::HUNGER_DECAY_PER_SEC * dt).max(0.0);
        self.thirst = (self.thirst - constants::THIRST_DECAY_PER_SEC * dt).max(0.0);
    }

    /// Reset after `release`: full vitals, clean combat state.
    pub fn respawn(&mut self) {
        self.hp = self.max_hp;
        self.essence = self.max_essence;
        self.status = Status::Alive;
        self.stance = Stance::Standing;
        self.target = None;
        self.is_fighting = false;
        self.casting = None;
        self.death_timer_ends_at = None;
        self.roundtime = 0.0;
        self.dirty = true;
    }

    /// Recompute maximum vitals from level, class dice and the given
    /// modifiers. Leaves current HP/essence alone apart from clamping.
    pub fn recalculate_max_vitals(
        &mut self,
        hp_die: i64,
        essence_die: i64,
        vit_mod: i64,
        aura_mod: i64,
        pers_mod: i64,
    ) {
        let level = self.level as f64;
        let base_hp = hp_die as f64 + (level - 1.0) * (hp_die as f64 / 2.0 + 0.5);
        let base_essence = essence_die as f64 + (level - 1.0) * (essence_die as f64 / 2.0 + 0.5);

        self.max_hp = (base_hp + level * vit_mod as f64).max(1.0);
        self.max_essence = (base_essence + level * (aura_mod + pers_mod) as f64).max(0.0);
        self.hp = self.hp.min(self.max_hp);
        self.essence = self.essence.min(self.max_essence);
    }

    /// Roll and apply the vitals gained by a level-up, then refill both
    /// pools. Returns (hp gain, essence gain).
    pub fn apply_level_up_gains(
        &mut self,
        rng: &mut impl Rng,
        hp_die: i64,
        essence_die: i64,
        vit_mod: i64,
        aura_mod: i64,
        pers_mod: i64,
    ) -> (f64, f64) {
        let hp_gain = (dice::roll(rng, hp_die) + vit_mod).max(1) as f64;
        let essence_gain = (dice::roll(rng, essence_die) + aura_mod + pers_mod).max(0) as f64;

        self.max_hp += hp_gain;
        self.max_essence += essence_gain;
        self.hp = self.max_hp;
        self.essence = self.max_essence;
        self.dirty = true;
        (hp_gain, essence_gain)
    }

    /// Pour XP into the pool, clamped by the given pool cap. Returns the
    /// amount actually absorbed; overflow is discarded.
    pub fn add_xp_to_pool(&mut self, cap: f64, amount: f64) -> f64 {
        if amount <= 0.0 {
            return 0.0;
        }
        let space = (cap - self.xp_pool).max(0.0);
        let added = amount.min(space);
        if added > 0.0 {
            self.xp_pool += added;
            self.dirty = true;
        }
        added
    }

    /// Whether the character can see in their current room.
    pub fn can_see(&self, world: &World) -> bool {
        let Some(room) = world.room(self.location_id) else {
            return true;
        };
        if !room.flags.contains(RoomFlags::DARK) {
            return true;
        }
        // A lit light source in hand or worn pierces the dark.
        self.inventory
            .iter()
            .chain(self.unique_equipped().iter())
            .any(|&id| {
                world.item(id).map_or(false, |i| i.stats.lit)
                    && world.template_of(id).map_or(false, |t| t.item_type == ItemType::Light)
            })
    }

    /// Status prompt printed before each read: `<hp/maxhp essence/maxessence|Stance>`.
    pub fn prompt(&self) -> String {
        format!(
            "<{}/{} {}/{}|{}> ",
            self.hp as i64,
            self.max_hp as i64,
            self.essence as i64,
            self.max_essence as i64,
            self.stance.as_str()
        )
    }
}
