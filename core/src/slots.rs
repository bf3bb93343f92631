//! Equipment slots. One canonical enumeration; the database and the content
//! editor speak the same snake_case names.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WearSlot {
    MainHand,
    OffHand,
    Head,
    Neck,
    Shoulders,
    Torso,
    Back,
    Cloak,
    Arms,
    Hands,
    WristL,
    FingerL,
    WristR,
    FingerR,
    Waist,
    Legs,
    Feet,
}

impl WearSlot {
    /// Display order used by `score` and equipment listings.
    pub const ALL: [WearSlot; 17] = [
        WearSlot::MainHand,
        WearSlot::OffHand,
        WearSlot::Head,
        WearSlot::Neck,
        WearSlot::Shoulders,
        WearSlot::Torso,
        WearSlot::Back,
        WearSlot::Cloak,
        WearSlot::Arms,
        WearSlot::Hands,
        WearSlot::WristL,
        WearSlot::FingerL,
        WearSlot::WristR,
        WearSlot::FingerR,
        WearSlot::Waist,
        WearSlot::Legs,
        WearSlot::Feet,
    ];

    pub fn key(self) -> &'static str {
        match self {
            WearSlot::MainHand => "main_hand",
            WearSlot::OffHand => "off_hand",
            WearSlot::Head => "head",
            WearSlot::Neck => "neck",
            WearSlot::Shoulders => "shoulders",
            WearSlot::Torso => "torso",
            WearSlot::Back => "back",
            WearSlot::Cloak => "cloak",
            WearSlot::Arms => "arms",
            WearSlot::Hands => "hands",
            WearSlot::WristL => "wrist_l",
            WearSlot::FingerL => "finger_l",
            WearSlot::WristR => "wrist_r",
            WearSlot::FingerR => "finger_r",
            WearSlot::Waist => "waist",
            WearSlot::Legs => "legs",
            WearSlot::Feet => "feet",
        }
    }

    /// Human-readable label, e.g. "main hand".
    pub fn label(self) -> &'static str {
        match self {
            WearSlot::MainHand => "main hand",
            WearSlot::OffHand => "off hand",
            WearSlot::Head => "head",
            WearSlot::Neck => "neck",
            WearSlot::Shoulders => "shoulders",
            WearSlot::Torso => "torso",
            WearSlot::Back => "back",
            WearSlot::Cloak => "cloak",
            WearSlot::Arms => "arms",
            WearSlot::Hands => "hands",
            WearSlot::WristL => "left wrist",
            WearSlot::FingerL => "left finger",
            WearSlot::WristR => "right wrist",
            WearSlot::FingerR => "right finger",
            WearSlot::Waist => "waist",
            WearSlot::Legs => "legs",
            WearSlot::Feet => "feet",
        }
    }

    pub fn parse(s: &str) -> Option<WearSlot> {
        WearSlot::ALL.iter().copied().find(|slot| slot.key() == s.trim().to_ascii_lowercase())
    }

    pub fn is_hand(self) -> bool {
        matches!(self, WearSlot::MainHand | WearSlot::OffHand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        for slot in WearSlot::ALL {
            assert_eq!(WearSlot::parse(slot.key()), Some(slot));
        }
    }

    #[test]
    fn legacy_names_are_rejected() {
        assert_eq!(WearSlot::parse("WIELD_MAIN"), None);
        assert_eq!(WearSlot::parse("WIELD_OFF"), None);
    }

    #[test]
    fn serde_uses_snake_case_keys() {
        let json = serde_json::to_string(&WearSlot::MainHand).unwrap();
        assert_eq!(json, "\"main_hand\"");
    }
}
