//! The six attribute channels and the modifier curve derived from them.

use serde::{Deserialize, Serialize};

/// Closed set of base attributes. Everything derived (attack ratings, dodge,
/// defense scalars) is computed from the modifiers of these six.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Might,
    Vitality,
    Agility,
    Intellect,
    Aura,
    Persona,
}

impl Stat {
    pub const ALL: [Stat; 6] = [
        Stat::Might,
        Stat::Vitality,
        Stat::Agility,
        Stat::Intellect,
        Stat::Aura,
        Stat::Persona,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Stat::Might => "might",
            Stat::Vitality => "vitality",
            Stat::Agility => "agility",
            Stat::Intellect => "intellect",
            Stat::Aura => "aura",
            Stat::Persona => "persona",
        }
    }

    pub fn parse(name: &str) -> Option<Stat> {
        match name.trim().to_ascii_lowercase().as_str() {
            "might" => Some(Stat::Might),
            "vitality" => Some(Stat::Vitality),
            "agility" => Some(Stat::Agility),
            "intellect" => Some(Stat::Intellect),
            "aura" => Some(Stat::Aura),
            "persona" => Some(Stat::Persona),
            _ => None,
        }
    }
}

/// Modifier curve: `floor(stat / 3)`, with a -5 floor for degenerate values.
pub fn modifier(value: i64) -> i64 {
    if value < 1 {
        return -5;
    }
    value.div_euclid(3)
}

fn default_stat() -> i64 {
    10
}

/// Fixed-shape record of the six attributes. The database column stays
/// JSON-shaped (`{"might": 14, ...}`) for the content editor; missing keys
/// default to 10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(default = "default_stat")]
    pub might: i64,
    #[serde(default = "default_stat")]
    pub vitality: i64,
    #[serde(default = "default_stat")]
    pub agility: i64,
    #[serde(default = "default_stat")]
    pub intellect: i64,
    #[serde(default = "default_stat")]
    pub aura: i64,
    #[serde(default = "default_stat")]
    pub persona: i64,
}

impl Default for StatBlock {
    fn default() -> Self {
        StatBlock {
            might: 10,
            vitality: 10,
            agility: 10,
            intellect: 10,
            aura: 10,
            persona: 10,
        }
    }
}

impl StatBlock {
    pub fn get(&self, stat: Stat) -> i64 {
        match stat {
            Stat::Might => self.might,
            Stat::Vitality => self.vitality,
            Stat::Agility => self.agility,
            Stat::Intellect => self.intellect,
            Stat::Aura => self.aura,
            Stat::Persona => self.persona,
        }
    }

    pub fn set(&mut self, stat: Stat, value: i64) {
        match stat {
            Stat::Might => self.might = value,
            Stat::Vitality => self.vitality = value,
            Stat::Agility => self.agility = value,
            Stat::Intellect => self.intellect = value,
            Stat::Aura => self.aura = value,
            Stat::Persona => self.persona = value,
        }
    }

    /// Modifier of one channel.
    pub fn modifier(&self, stat: Stat) -> i64 {
        modifier(self.get(stat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_is_floor_of_thirds() {
        assert_eq!(modifier(1), 0);
        assert_eq!(modifier(2), 0);
        assert_eq!(modifier(3), 1);
        assert_eq!(modifier(10), 3);
        assert_eq!(modifier(15), 5);
        assert_eq!(modifier(35), 11);
    }

    #[test]
    fn modifier_floors_degenerate_values() {
        assert_eq!(modifier(0), -5);
        assert_eq!(modifier(-10), -5);
    }

    #[test]
    fn stat_block_missing_keys_default_to_ten() {
        let block: StatBlock = serde_json::from_str(r#"{"might": 15}"#).unwrap();
        assert_eq!(block.might, 15);
        assert_eq!(block.vitality, 10);
        assert_eq!(block.persona, 10);
    }

    #[test]
    fn stat_parse_round_trips_keys() {
        for stat in Stat::ALL {
            assert_eq!(Stat::parse(stat.key()), Some(stat));
        }
        assert_eq!(Stat::parse("luck"), None);
    }
}
