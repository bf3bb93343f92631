//! Bitflag sets for rooms, mobs and items. The database stores these as
//! JSON arrays of names; unknown names are logged and dropped rather than
//! failing the load.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RoomFlags: u32 {
        const NODE      = 1 << 0;
        const SHOP      = 1 << 1;
        const BANK      = 1 << 2;
        const DARK      = 1 << 3;
        const INDOORS   = 1 << 4;
        const OUTDOORS  = 1 << 5;
        const REPAIRER  = 1 << 6;
        // Weather overlays, rewritten by the weather cycle for outdoor rooms.
        const WET       = 1 << 7;
        const STORMY    = 1 << 8;
        const FREEZING  = 1 << 9;
        const BLAZING   = 1 << 10;
        const SANDSTORM = 1 << 11;
        const FOGGY     = 1 << 12;
        const WINDY     = 1 << 13;
        const SNOWY     = 1 << 14;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MobFlags: u32 {
        const AGGRESSIVE = 1 << 0;
        const SENTINEL   = 1 << 1;
        const STATIONARY = 1 << 2;
        const NO_LOOT    = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ItemFlags: u32 {
        const NO_DROP = 1 << 0;
        const QUEST   = 1 << 1;
        const MAGICAL = 1 << 2;
        const HIDDEN  = 1 << 3;
    }
}

/// All weather overlay bits, cleared before each weather re-roll.
pub const WEATHER_FLAGS: RoomFlags = RoomFlags::WET
    .union(RoomFlags::STORMY)
    .union(RoomFlags::FREEZING)
    .union(RoomFlags::BLAZING)
    .union(RoomFlags::SANDSTORM)
    .union(RoomFlags::FOGGY)
    .union(RoomFlags::WINDY)
    .union(RoomFlags::SNOWY);

impl RoomFlags {
    pub fn parse_one(name: &str) -> Option<RoomFlags> {
        match name.trim().to_ascii_uppercase().as_str() {
            "NODE" => Some(RoomFlags::NODE),
            "SHOP" => Some(RoomFlags::SHOP),
            "BANK" => Some(RoomFlags::BANK),
            "DARK" => Some(RoomFlags::DARK),
            "INDOORS" => Some(RoomFlags::INDOORS),
            "OUTDOORS" => Some(RoomFlags::OUTDOORS),
            "REPAIRER" => Some(RoomFlags::REPAIRER),
            "WET" => Some(RoomFlags::WET),
            "STORMY" => Some(RoomFlags::STORMY),
            "FREEZING" => Some(RoomFlags::FREEZING),
            "BLAZING" => Some(RoomFlags::BLAZING),
            "SANDSTORM" => Some(RoomFlags::SANDSTORM),
            "FOGGY" => Some(RoomFlags::FOGGY),
            "WINDY" => Some(RoomFlags::WINDY),
            "SNOWY" => Some(RoomFlags::SNOWY),
            _ => None,
        }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> RoomFlags {
        let mut flags = RoomFlags::empty();
        for name in names {
            match RoomFlags::parse_one(name) {
                Some(flag) => flags |= flag,
                None => log::warn!("Ignoring unknown room flag {name:?}"),
            }
        }
        flags
    }
}

impl MobFlags {
    pub fn parse_one(name: &str) -> Option<MobFlags> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AGGRESSIVE" => Some(MobFlags::AGGRESSIVE),
            "SENTINEL" => Some(MobFlags::SENTINEL),
            "STATIONARY" => Some(MobFlags::STATIONARY),
            "NO_LOOT" => Some(MobFlags::NO_LOOT),
            _ => None,
        }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> MobFlags {
        let mut flags = MobFlags::empty();
        for name in names {
            match MobFlags::parse_one(name) {
                Some(flag) => flags |= flag,
                None => log::warn!("Ignoring unknown mob flag {name:?}"),
            }
        }
        flags
    }
}

impl ItemFlags {
    pub fn parse_one(name: &str) -> Option<ItemFlags> {
        match name.trim().to_ascii_uppercase().as_str() {
            "NO_DROP" => Some(ItemFlags::NO_DROP),
            "QUEST" => Some(ItemFlags::QUEST),
            "MAGICAL" => Some(ItemFlags::MAGICAL),
            "HIDDEN" => Some(ItemFlags::HIDDEN),
            _ => None,
        }
    }

    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> ItemFlags {
        let mut flags = ItemFlags::empty();
        for name in names {
            match ItemFlags::parse_one(name) {
                Some(flag) => flags |= flag,
                None => log::warn!("Ignoring unknown item flag {name:?}"),
            }
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_flags_from_names_skips_unknown() {
        let flags = RoomFlags::from_names(["node", "SHOP", "whatever"]);
        assert_eq!(flags, RoomFlags::NODE | RoomFlags::SHOP);
    }

    #[test]
    fn weather_mask_covers_only_overlays() {
        assert!(WEATHER_FLAGS.contains(RoomFlags::WET));
        assert!(WEATHER_FLAGS.contains(RoomFlags::SNOWY));
        assert!(!WEATHER_FLAGS.contains(RoomFlags::NODE));
        assert!(!WEATHER_FLAGS.contains(RoomFlags::OUTDOORS));
    }

    #[test]
    fn mob_flags_parse() {
        let flags = MobFlags::from_names(["aggressive", "sentinel"]);
        assert!(flags.contains(MobFlags::AGGRESSIVE));
        assert!(flags.contains(MobFlags::SENTINEL));
        assert!(!flags.contains(MobFlags::STATIONARY));
    }
}
