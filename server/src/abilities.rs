//! Spell and ability catalog. Rows come from `ability_templates`; the
//! `effect_details` and `messages` columns stay JSON-shaped for the content
//! editor and deserialize into the typed records here.

use serde::Deserialize;

use ashenmoor_core::types::{DamageType, School, Stance};

use crate::db::world::AbilityRow;
use crate::effect::{EffectKind, EffectStat};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityKind {
    Spell,
    Ability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetType {
    SelfOnly,
    Char,
    Mob,
    CharOrMob,
    Area,
    None,
}

impl TargetType {
    fn parse(s: &str) -> Option<TargetType> {
        match s.to_ascii_uppercase().as_str() {
            "SELF" => Some(TargetType::SelfOnly),
            "CHAR" => Some(TargetType::Char),
            "MOB" => Some(TargetType::Mob),
            "CHAR_OR_MOB" => Some(TargetType::CharOrMob),
            "AREA" => Some(TargetType::Area),
            "NONE" => Some(TargetType::None),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbilityEffectType {
    Damage,
    Heal,
    Buff,
    Debuff,
    ModifiedAttack,
    StunAttempt,
    Cure,
    Resurrect,
    ContestedDebuff,
}

impl AbilityEffectType {
    fn parse(s: &str) -> Option<AbilityEffectType> {
        match s.to_ascii_uppercase().as_str() {
            "DAMAGE" => Some(AbilityEffectType::Damage),
            "HEAL" => Some(AbilityEffectType::Heal),
            "BUFF" => Some(AbilityEffectType::Buff),
            "DEBUFF" => Some(AbilityEffectType::Debuff),
            "MODIFIED_ATTACK" => Some(AbilityEffectType::ModifiedAttack),
            "STUN_ATTEMPT" => Some(AbilityEffectType::StunAttempt),
            "CURE" => Some(AbilityEffectType::Cure),
            "RESURRECT" => Some(AbilityEffectType::Resurrect),
            "CONTESTED_DEBUFF" => Some(AbilityEffectType::ContestedDebuff),
            _ => None,
        }
    }
}

/// Who an area effect sweeps over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AoeScope {
    Enemies,
    Allies,
    All,
}

impl Default for AoeScope {
    fn default() -> Self {
        AoeScope::Enemies
    }
}

fn default_multiplier() -> f64 {
    1.0
}

/// The grab-bag payload of an ability. Defaults keep sparse authoring legal;
/// each effect type reads only the fields it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EffectDetails {
    // Named timed effect (BUFF / DEBUFF).
    pub name: Option<String>,
    pub kind: Option<EffectKind>,
    pub stat_affected: Option<EffectStat>,
    pub amount: f64,
    pub potency: f64,
    pub duration: f64,
    pub is_shapechange: bool,
    pub set_stance: Option<Stance>,
    /// Compound payload applied alongside the primary effect.
    pub effects_to_apply: Vec<EffectDetails>,

    // Direct damage.
    pub damage_base: i64,
    pub damage_rng: i64,
    pub damage_type: Option<DamageType>,
    pub school: School,
    pub always_hits: bool,
    /// Rider applied after damage lands.
    pub applies_effect: Option<Box<EffectDetails>>,

    // Healing.
    pub heal_base: i64,
    pub heal_rng: i64,

    // Modified physical attacks.
    #[serde(default = "default_multiplier")]
    pub damage_multiplier: f64,
    pub bonus_damage: i64,
    pub bonus_hit: i64,
    pub is_cleave: bool,
    pub max_cleave_targets: usize,
    pub is_cone_aoe: bool,
    pub max_aoe_targets: usize,
    pub aoe_target_scope: AoeScope,
    pub requires_stealth_or_flank: bool,

    // Stun attempts.
    pub requires_shield: bool,
    #[serde(default = "default_multiplier")]
    pub mar_modifier_mult: f64,
    pub stun_chance: f64,
    pub stun_duration: f64,

    // Cure / resurrect.
    pub cure_type: Option<EffectKind>,
    pub xp_cost: f64,

    // Contested checks.
    pub contest: Option<Contest>,
    pub on_success: Option<Box<EffectDetails>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contest {
    pub attacker_skill: String,
    pub defender_skill: String,
}

/// Message block; placeholders `{caster_name}` and `{target_name}` are
/// substituted at send time.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AbilityMessages {
    pub caster_self_complete: Option<String>,
    pub room_complete: Option<String>,
    pub apply_msg_self: Option<String>,
    pub apply_msg_target: Option<String>,
    pub apply_msg_room: Option<String>,
    pub expire_msg_self: Option<String>,
    pub expire_msg_target: Option<String>,
    pub expire_msg_room: Option<String>,
}

pub fn fill_placeholders(template: &str, caster_name: &str, target_name: &str) -> String {
    template
        .replace("{caster_name}", caster_name)
        .replace("{target_name}", target_name)
}

#[derive(Debug, Clone)]
pub struct Ability {
    pub key: String,
    pub name: String,
    pub kind: AbilityKind,
    pub class_req: Vec<String>,
    pub level_req: u32,
    pub cost: f64,
    pub target_type: TargetType,
    pub cast_time: f64,
    pub roundtime: f64,
    pub effect_type: AbilityEffectType,
    pub effect: EffectDetails,
    pub messages: AbilityMessages,
    pub description: String,
}

impl Ability {
    /// Hydrate a catalog row; `None` (with a log line) when a column is
    /// unusable, so one bad template cannot poison the catalog.
    pub fn from_row(row: &AbilityRow) -> Option<Ability> {
        let kind = match row.kind.to_ascii_uppercase().as_str() {
            "SPELL" => AbilityKind::Spell,
            "ABILITY" => AbilityKind::Ability,
            other => {
                log::error!("Ability {:?} has unknown type {other:?}", row.internal_name);
                return None;
            }
        };
        let target_type = match TargetType::parse(&row.target_type) {
            Some(t) => t,
            None => {
                log::error!(
                    "Ability {:?} has unknown target_type {:?}",
                    row.internal_name,
                    row.target_type
                );
                return None;
            }
        };
        let effect_type = match AbilityEffectType::parse(&row.effect_type) {
            Some(t) => t,
            None => {
                log::error!(
                    "Ability {:?} has unknown effect_type {:?}",
                    row.internal_name,
                    row.effect_type
                );
                return None;
            }
        };
        let effect: EffectDetails = match serde_json::from_str(&row.effect_details) {
            Ok(details) => details,
            Err(e) => {
                log::error!("Ability {:?} has bad effect_details: {e}", row.internal_name);
                return None;
            }
        };
        let messages: AbilityMessages = serde_json::from_str(&row.messages).unwrap_or_default();
        let class_req: Vec<String> = serde_json::from_str(&row.class_req).unwrap_or_default();

        Some(Ability {
            key: row.internal_name.to_ascii_lowercase(),
            name: row.name.clone(),
            kind,
            class_req: class_req.iter().map(|c| c.to_ascii_lowercase()).collect(),
            level_req: row.level_req.max(1) as u32,
            cost: row.cost,
            target_type,
            cast_time: row.cast_time.max(0.0),
            roundtime: row.roundtime.max(0.0),
            effect_type,
            effect,
            messages,
            description: row.description.clone(),
        })
    }

    pub fn usable_by_class(&self, class_name: &str) -> bool {
        self.class_req.is_empty() || self.class_req.iter().any(|c| c == &class_name.to_ascii_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(effect_type: &str, details: &str) -> AbilityRow {
        AbilityRow {
            id: 1,
            internal_name: "test strike".into(),
            name: "Test Strike".into(),
            kind: "ABILITY".into(),
            class_req: r#"["warrior"]"#.into(),
            level_req: 3,
            cost: 5.0,
            target_type: "CHAR_OR_MOB".into(),
            cast_time: 0.0,
            roundtime: 2.0,
            effect_type: effect_type.into(),
            effect_details: details.into(),
            messages: "{}".into(),
            description: String::new(),
        }
    }

    #[test]
    fn hydrates_modified_attack() {
        let ability = Ability::from_row(&row(
            "MODIFIED_ATTACK",
            r#"{"damage_multiplier": 1.5, "bonus_damage": 3}"#,
        ))
        .unwrap();
        assert_eq!(ability.effect_type, AbilityEffectType::ModifiedAttack);
        assert_eq!(ability.effect.damage_multiplier, 1.5);
        assert_eq!(ability.effect.bonus_damage, 3);
        // Unset multiplier-ish fields keep their defaults.
        assert_eq!(ability.effect.mar_modifier_mult, 1.0);
        assert!(ability.usable_by_class("Warrior"));
        assert!(!ability.usable_by_class("mage"));
    }

    #[test]
    fn rejects_unknown_effect_type() {
        assert!(Ability::from_row(&row("EXPLODE", "{}")).is_none());
    }

    #[test]
    fn buff_details_with_compound_payload() {
        let ability = Ability::from_row(&row(
            "BUFF",
            r#"{"name": "Rage", "kind": "buff", "stat_affected": "might", "amount": 6,
                "duration": 30.0,
                "effects_to_apply": [{"name": "Reckless", "kind": "debuff",
                                       "stat_affected": "dodge_value", "amount": -4,
                                       "duration": 30.0}]}"#,
        ))
        .unwrap();
        assert_eq!(ability.effect.stat_affected, Some(EffectStat::Might));
        assert_eq!(ability.effect.effects_to_apply.len(), 1);
        assert_eq!(
            ability.effect.effects_to_apply[0].stat_affected,
            Some(EffectStat::DodgeValue)
        );
    }

    #[test]
    fn placeholder_substitution() {
        let out = fill_placeholders("{caster_name} strikes {target_name}!", "Brakk", "a rat");
        assert_eq!(out, "Brakk strikes a rat!");
    }
}
