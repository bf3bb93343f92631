//! Closed enumerations shared across the character, item and combat models.

use serde::{Deserialize, Serialize};

/// Life state of a character. `Dead` implies HP is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Alive,
    Meditating,
    Dying,
    Dead,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Alive => "ALIVE",
            Status::Meditating => "MEDITATING",
            Status::Dying => "DYING",
            Status::Dead => "DEAD",
        }
    }

    pub fn parse(s: &str) -> Option<Status> {
        match s.to_ascii_uppercase().as_str() {
            "ALIVE" => Some(Status::Alive),
            "MEDITATING" => Some(Status::Meditating),
            "DYING" => Some(Status::Dying),
            "DEAD" => Some(Status::Dead),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Standing,
    Sitting,
    Lying,
}

impl Stance {
    pub fn as_str(self) -> &'static str {
        match self {
            Stance::Standing => "Standing",
            Stance::Sitting => "Sitting",
            Stance::Lying => "Lying",
        }
    }

    pub fn parse(s: &str) -> Option<Stance> {
        match s.to_ascii_lowercase().as_str() {
            "standing" => Some(Stance::Standing),
            "sitting" => Some(Stance::Sitting),
            "lying" => Some(Stance::Lying),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    Neutral,
}

impl Sex {
    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::Neutral => "They/Them",
        }
    }

    pub fn parse(s: &str) -> Option<Sex> {
        match s.to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Sex::Male),
            "female" | "f" => Some(Sex::Female),
            "they/them" | "t" | "neutral" => Some(Sex::Neutral),
            _ => None,
        }
    }

    /// (subject, object, possessive) pronoun set.
    pub fn pronouns(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Sex::Male => ("he", "him", "his"),
            Sex::Female => ("she", "her", "her"),
            Sex::Neutral => ("they", "them", "their"),
        }
    }
}

/// Item template categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    General,
    Weapon,
    TwoHandedWeapon,
    RangedWeapon,
    Ammo,
    Armor,
    Shield,
    Container,
    Quiver,
    Quest,
    Food,
    Drink,
    Key,
    Light,
}

impl ItemType {
    pub fn parse(s: &str) -> Option<ItemType> {
        match s.to_ascii_uppercase().as_str() {
            "GENERAL" => Some(ItemType::General),
            "WEAPON" => Some(ItemType::Weapon),
            "TWO_HANDED_WEAPON" => Some(ItemType::TwoHandedWeapon),
            "RANGED_WEAPON" => Some(ItemType::RangedWeapon),
            "AMMO" => Some(ItemType::Ammo),
            "ARMOR" => Some(ItemType::Armor),
            "SHIELD" => Some(ItemType::Shield),
            "CONTAINER" => Some(ItemType::Container),
            "QUIVER" => Some(ItemType::Quiver),
            "QUEST" => Some(ItemType::Quest),
            "FOOD" => Some(ItemType::Food),
            "DRINK" => Some(ItemType::Drink),
            "KEY" => Some(ItemType::Key),
            "LIGHT" => Some(ItemType::Light),
            _ => None,
        }
    }

    pub fn is_weapon(self) -> bool {
        matches!(self, ItemType::Weapon | ItemType::TwoHandedWeapon)
    }
}

/// Damage channels, physical and magical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageType {
    Slash,
    Pierce,
    Bludgeon,
    Fire,
    Cold,
    Lightning,
    Earth,
    Arcane,
    Divine,
    Poison,
    Sonic,
}

impl DamageType {
    pub fn key(self) -> &'static str {
        match self {
            DamageType::Slash => "slash",
            DamageType::Pierce => "pierce",
            DamageType::Bludgeon => "bludgeon",
            DamageType::Fire => "fire",
            DamageType::Cold => "cold",
            DamageType::Lightning => "lightning",
            DamageType::Earth => "earth",
            DamageType::Arcane => "arcane",
            DamageType::Divine => "divine",
            DamageType::Poison => "poison",
            DamageType::Sonic => "sonic",
        }
    }

    pub fn parse(s: &str) -> Option<DamageType> {
        match s.to_ascii_lowercase().as_str() {
            "slash" => Some(DamageType::Slash),
            "pierce" => Some(DamageType::Pierce),
            "bludgeon" => Some(DamageType::Bludgeon),
            "fire" => Some(DamageType::Fire),
            "cold" => Some(DamageType::Cold),
            "lightning" => Some(DamageType::Lightning),
            "earth" => Some(DamageType::Earth),
            "arcane" => Some(DamageType::Arcane),
            "divine" => Some(DamageType::Divine),
            "poison" => Some(DamageType::Poison),
            "sonic" => Some(DamageType::Sonic),
            _ => None,
        }
    }

    pub fn is_magical(self) -> bool {
        !matches!(self, DamageType::Slash | DamageType::Pierce | DamageType::Bludgeon)
    }
}

/// Magic school an ability draws on; selects APR or DPR as its power rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum School {
    Arcane,
    Divine,
}

impl Default for School {
    fn default() -> Self {
        School::Arcane
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [Status::Alive, Status::Meditating, Status::Dying, Status::Dead] {
            assert_eq!(Status::parse(s.as_str()), Some(s));
        }
    }

    #[test]
    fn item_type_weapon_classes() {
        assert!(ItemType::Weapon.is_weapon());
        assert!(ItemType::TwoHandedWeapon.is_weapon());
        assert!(!ItemType::RangedWeapon.is_weapon());
        assert!(!ItemType::Shield.is_weapon());
    }

    #[test]
    fn damage_type_magical_split() {
        assert!(!DamageType::Slash.is_magical());
        assert!(!DamageType::Bludgeon.is_magical());
        assert!(DamageType::Fire.is_magical());
        assert!(DamageType::Divine.is_magical());
    }
}
