//! Item templates (immutable catalog rows) and item instances (the mutable,
//! uniquely-owned objects that actually move through the world).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use ashenmoor_core::flags::ItemFlags;
use ashenmoor_core::slots::WearSlot;
use ashenmoor_core::types::{DamageType, ItemType};

use crate::db::world::ItemTemplateRow;
use crate::db::items::ItemInstanceRow;
use crate::ItemId;

/// Wear location in template JSON: a single slot or a list of slots (a
/// two-handed weapon lists both hands).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum WearLocationSpec {
    One(WearSlot),
    Many(Vec<WearSlot>),
}

fn default_weight() -> i64 {
    1
}

fn default_speed() -> f64 {
    1.0
}

/// Typed view of the template `stats` JSON column. Missing keys default so
/// the content editor can stay sparse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TemplateStats {
    #[serde(default = "default_weight")]
    pub weight: i64,
    pub value: i64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    pub damage_base: i64,
    pub damage_rng: i64,
    pub armor: i64,
    pub block_chance: f64,
    pub capacity: i64,
    wear_location: Option<WearLocationSpec>,
    /// Consumable payload: "restore_hunger", "restore_thirst", "heal_hp".
    pub effect: Option<String>,
    pub amount: f64,
    /// Passive bonuses while equipped, keyed by effect-stat name.
    pub bonus_stats: BTreeMap<String, f64>,
    /// Lock ids a key opens.
    pub unlocks: Vec<i64>,
    /// Lock id carried by a lockable container.
    pub lock_id: Option<i64>,
    /// Loot rolled into a container on first open.
    pub loot: Option<LootTable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LootTable {
    pub coinage_max: i64,
    pub items: Vec<LootRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootRule {
    pub template_id: i64,
    #[serde(default)]
    pub chance: f64,
}

#[derive(Debug, Clone)]
pub struct ItemTemplate {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub item_type: ItemType,
    pub damage_type: Option<DamageType>,
    pub flags: ItemFlags,
    pub stats: TemplateStats,
}

impl ItemTemplate {
    /// Hydrate from a catalog row. Malformed JSON is logged and replaced by
    /// defaults; a bad template must never take the boot down.
    pub fn from_row(row: &ItemTemplateRow) -> ItemTemplate {
        let item_type = ItemType::parse(&row.item_type).unwrap_or_else(|| {
            log::warn!("Item template {} has unknown type {:?}", row.id, row.item_type);
            ItemType::General
        });
        let damage_type = row.damage_type.as_deref().and_then(DamageType::parse);
        let flag_names: Vec<String> = serde_json::from_str(&row.flags).unwrap_or_default();
        let flags = ItemFlags::from_names(flag_names.iter().map(String::as_str));
        let stats: TemplateStats = serde_json::from_str(&row.stats).unwrap_or_else(|e| {
            log::warn!("Item template {} has bad stats JSON: {e}", row.id);
            TemplateStats::default()
        });

        ItemTemplate {
            id: row.id,
            name: row.name.clone(),
            description: row.description.clone(),
            item_type,
            damage_type,
            flags,
            stats,
        }
    }

    /// Slots the item can occupy when worn or wielded.
    pub fn wear_slots(&self) -> Vec<WearSlot> {
        match &self.stats.wear_location {
            Some(WearLocationSpec::One(slot)) => vec![*slot],
            Some(WearLocationSpec::Many(slots)) => slots.clone(),
            None => match self.item_type {
                ItemType::Weapon | ItemType::RangedWeapon => vec![WearSlot::MainHand],
                ItemType::TwoHandedWeapon => vec![WearSlot::MainHand, WearSlot::OffHand],
                ItemType::Shield => vec![WearSlot::OffHand],
                _ => Vec::new(),
            },
        }
    }

    pub fn is_wearable(&self) -> bool {
        !self.wear_slots().is_empty()
    }
}

/// Trap state carried by a container instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrapState {
    pub active: bool,
    pub perception_dc: i64,
    pub disarm_dc: i64,
    pub damage: i64,
}

impl Default for TrapState {
    fn default() -> Self {
        TrapState { active: true, perception_dc: 12, disarm_dc: 12, damage: 5 }
    }
}

/// Mutable per-instance overlay, persisted as the `instance_stats` JSON
/// column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceStats {
    pub lit: bool,
    pub locked: bool,
    pub open: bool,
    /// Container loot has been materialized already.
    pub loot_rolled: bool,
    /// Ammo damage bonus applied on top of the launcher's damage.
    pub damage_bonus: i64,
    pub trap: Option<TrapState>,
}

#[derive(Debug, Clone)]
pub struct ItemInstance {
    pub id: ItemId,
    pub template_id: i64,
    pub condition: i64,
    pub stats: InstanceStats,
    /// Runtime view of container contents, rebuilt from owner rows at load.
    pub contents: Vec<ItemId>,
}

impl ItemInstance {
    pub fn from_row(row: &ItemInstanceRow) -> ItemInstance {
        let stats: InstanceStats = serde_json::from_str(&row.instance_stats).unwrap_or_else(|e| {
            log::warn!("Item instance {} has bad instance_stats JSON: {e}", row.id);
            InstanceStats::default()
        });
        ItemInstance {
            id: row.id,
            template_id: row.template_id,
            condition: row.condition.clamp(0, 100),
            stats,
            contents: Vec::new(),
        }
    }

    pub fn stats_json(&self) -> String {
        serde_json::to_string(&self.stats).unwrap_or_else(|_| "{}".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template_row(item_type: &str, stats: &str) -> ItemTemplateRow {
        ItemTemplateRow {
            id: 1,
            name: "a test item".into(),
            description: String::new(),
            item_type: item_type.into(),
            damage_type: None,
            flags: "[]".into(),
            stats: stats.into(),
        }
    }

    #[test]
    fn sparse_stats_fill_defaults() {
        let row = template_row("WEAPON", r#"{"damage_base": 5}"#);
        let template = ItemTemplate::from_row(&row);
        assert_eq!(template.stats.damage_base, 5);
        assert_eq!(template.stats.weight, 1);
        assert_eq!(template.stats.speed, 1.0);
    }

    #[test]
    fn wear_location_accepts_scalar_and_list() {
        let one = ItemTemplate::from_row(&template_row("ARMOR", r#"{"wear_location": "torso"}"#));
        assert_eq!(one.wear_slots(), vec![WearSlot::Torso]);

        let many = ItemTemplate::from_row(&template_row(
            "TWO_HANDED_WEAPON",
            r#"{"wear_location": ["main_hand", "off_hand"]}"#,
        ));
        assert_eq!(many.wear_slots(), vec![WearSlot::MainHand, WearSlot::OffHand]);
    }

    #[test]
    fn two_handed_weapons_default_to_both_hands() {
        let template = ItemTemplate::from_row(&template_row("TWO_HANDED_WEAPON", "{}"));
        assert_eq!(template.wear_slots(), vec![WearSlot::MainHand, WearSlot::OffHand]);
    }

    #[test]
    fn bad_stats_json_degrades_to_defaults() {
        let template = ItemTemplate::from_row(&template_row("GENERAL", "not json"));
        assert_eq!(template.stats.value, 0);
        assert_eq!(template.item_type, ItemType::General);
    }

    #[test]
    fn instance_stats_round_trip() {
        let mut stats = InstanceStats::default();
        stats.locked = true;
        stats.trap = Some(TrapState { active: true, perception_dc: 15, disarm_dc: 18, damage: 9 });
        let json = serde_json::to_string(&stats).unwrap();
        let back: InstanceStats = serde_json::from_str(&json).unwrap();
        assert!(back.locked);
        assert_eq!(back.trap.unwrap().damage, 9);
    }
}
