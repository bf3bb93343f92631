//! Timed effects: buffs, debuffs, damage-over-time, control. An effect is
//! keyed by name on its bearer; a second application of the same name
//! overwrites the first, but expiry always reverts the amount that was
//! actually stored at entry.

use serde::{Deserialize, Serialize};

use ashenmoor_core::stats::Stat;
use ashenmoor_core::types::Stance;

use crate::CharacterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Buff,
    Debuff,
    Stun,
    Bleed,
    Poison,
    Silence,
    Shapechange,
    #[serde(rename = "stance_lock")]
    StanceLock,
}

impl Default for EffectKind {
    fn default() -> Self {
        EffectKind::Buff
    }
}

impl EffectKind {
    /// Bleed and poison tick HP damage each scheduler cycle.
    pub fn is_dot(self) -> bool {
        matches!(self, EffectKind::Bleed | EffectKind::Poison)
    }

    pub fn dot_label(self) -> &'static str {
        match self {
            EffectKind::Bleed => "bleed",
            EffectKind::Poison => "poison",
            _ => "damage",
        }
    }
}

/// Closed set of channels an effect can modify. The wire names match the
/// content editor's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectStat {
    Might,
    Vitality,
    Agility,
    Intellect,
    Aura,
    Persona,
    MaxHp,
    ArmorValue,
    BarrierValue,
    DodgeValue,
    AttackRating,
    Roundtime,
}

impl EffectStat {
    pub fn from_attribute(stat: Stat) -> EffectStat {
        match stat {
            Stat::Might => EffectStat::Might,
            Stat::Vitality => EffectStat::Vitality,
            Stat::Agility => EffectStat::Agility,
            Stat::Intellect => EffectStat::Intellect,
            Stat::Aura => EffectStat::Aura,
            Stat::Persona => EffectStat::Persona,
        }
    }

    pub fn as_attribute(self) -> Option<Stat> {
        match self {
            EffectStat::Might => Some(Stat::Might),
            EffectStat::Vitality => Some(Stat::Vitality),
            EffectStat::Agility => Some(Stat::Agility),
            EffectStat::Intellect => Some(Stat::Intellect),
            EffectStat::Aura => Some(Stat::Aura),
            EffectStat::Persona => Some(Stat::Persona),
            _ => None,
        }
    }

    pub fn parse(name: &str) -> Option<EffectStat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "might" => Some(EffectStat::Might),
            "vitality" => Some(EffectStat::Vitality),
            "agility" => Some(EffectStat::Agility),
            "intellect" => Some(EffectStat::Intellect),
            "aura" => Some(EffectStat::Aura),
            "persona" => Some(EffectStat::Persona),
            "max_hp" => Some(EffectStat::MaxHp),
            "armor_value" => Some(EffectStat::ArmorValue),
            "barrier_value" => Some(EffectStat::BarrierValue),
            "dodge_value" => Some(EffectStat::DodgeValue),
            "attack_rating" => Some(EffectStat::AttackRating),
            "roundtime" => Some(EffectStat::Roundtime),
            _ => None,
        }
    }
}

/// An applied, time-bounded modifier living on a character or mob.
#[derive(Debug, Clone)]
pub struct Effect {
    pub name: String,
    pub kind: EffectKind,
    pub stat: EffectStat,
    /// Bonus for stat channels, potency for DoTs and stuns.
    pub amount: f64,
    pub applied_at: f64,
    /// Monotonic deadline; `f64::INFINITY` encodes "until removed".
    pub ends_at: f64,
    pub source_ability: Option<String>,
    pub caster: Option<CharacterId>,
    /// Stance forced while the effect holds, reverted on expiry.
    pub locked_stance: Option<Stance>,
}

impl Effect {
    pub fn is_expired(&self, now: f64) -> bool {
        self.ends_at <= now
    }

    /// Contribution to a derived-stat query on the given channel.
    pub fn bonus_for(&self, stat: EffectStat, now: f64) -> f64 {
        if self.stat == stat && !self.is_expired(now) {
            self.amount
        } else {
            0.0
        }
    }
}

/// Sum the live bonuses on one channel across an effect map.
pub fn total_bonus(
    effects: &std::collections::HashMap<String, Effect>,
    stat: EffectStat,
    now: f64,
) -> f64 {
    effects.values().map(|e| e.bonus_for(stat, now)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn barrier_effect(name: &str, amount: f64, ends_at: f64) -> Effect {
        Effect {
            name: name.into(),
            kind: EffectKind::Buff,
            stat: EffectStat::BarrierValue,
            amount,
            applied_at: 0.0,
            ends_at,
            source_ability: None,
            caster: None,
            locked_stance: None,
        }
    }

    #[test]
    fn live_effects_contribute_expired_do_not() {
        let mut effects = HashMap::new();
        effects.insert("a".to_string(), barrier_effect("a", 15.0, 100.0));
        effects.insert("b".to_string(), barrier_effect("b", 5.0, 10.0));

        assert_eq!(total_bonus(&effects, EffectStat::BarrierValue, 50.0), 15.0);
        assert_eq!(total_bonus(&effects, EffectStat::BarrierValue, 5.0), 20.0);
        assert_eq!(total_bonus(&effects, EffectStat::ArmorValue, 5.0), 0.0);
    }

    #[test]
    fn until_removed_effects_never_expire() {
        let effect = barrier_effect("stance", 25.0, f64::INFINITY);
        assert!(!effect.is_expired(1e12));
    }

    #[test]
    fn effect_stat_wire_names() {
        assert_eq!(EffectStat::parse("barrier_value"), Some(EffectStat::BarrierValue));
        assert_eq!(EffectStat::parse("MIGHT"), Some(EffectStat::Might));
        assert_eq!(EffectStat::parse("charisma"), None);
        let json = serde_json::to_string(&EffectStat::MaxHp).unwrap();
        assert_eq!(json, "\"max_hp\"");
    }

    #[test]
    fn dot_kinds() {
        assert!(EffectKind::Poison.is_dot());
        assert!(EffectKind::Bleed.is_dot());
        assert!(!EffectKind::Buff.is_dot());
        assert!(!EffectKind::Stun.is_dot());
    }
}
