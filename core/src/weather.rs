//! Area weather: per-climate seasonal tables and the room-flag overlays each
//! condition contributes. The server re-rolls conditions on a slow cycle and
//! rewrites the weather flags of outdoor rooms; combat only ever reads the
//! flags.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::flags::RoomFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Climate {
    Temperate,
    Tropical,
    Arid,
    Arctic,
    Coastal,
}

impl Climate {
    pub fn parse(s: &str) -> Option<Climate> {
        match s.to_ascii_lowercase().as_str() {
            "temperate" => Some(Climate::Temperate),
            "tropical" => Some(Climate::Tropical),
            "arid" => Some(Climate::Arid),
            "arctic" => Some(Climate::Arctic),
            "coastal" => Some(Climate::Coastal),
            _ => None,
        }
    }
}

impl Default for Climate {
    fn default() -> Self {
        Climate::Temperate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeatherCondition {
    Clear,
    Rain,
    HeavyRain,
    Thunderstorm,
    Foggy,
    Windy,
    Snowy,
    Blizzard,
    Freezing,
    Blazing,
    Sandstorm,
}

impl Default for WeatherCondition {
    fn default() -> Self {
        WeatherCondition::Clear
    }
}

impl WeatherCondition {
    pub fn description(self) -> &'static str {
        match self {
            WeatherCondition::Clear => "The sky is clear and the weather is pleasant.",
            WeatherCondition::Rain => "Rain falls steadily from the sky.",
            WeatherCondition::HeavyRain => "Heavy rain pounds down, soaking everything.",
            WeatherCondition::Thunderstorm => "Thunder crashes as lightning splits the sky.",
            WeatherCondition::Foggy => "Thick fog obscures your vision.",
            WeatherCondition::Windy => "Strong winds buffet you.",
            WeatherCondition::Snowy => "Snow falls gently from the sky.",
            WeatherCondition::Blizzard => "A howling blizzard blinds you with snow.",
            WeatherCondition::Freezing => "The air is bitterly cold.",
            WeatherCondition::Blazing => "The sun beats down mercilessly.",
            WeatherCondition::Sandstorm => "Stinging sand whips through the air.",
        }
    }

    /// Room-flag overlay the condition contributes while active.
    pub fn room_flags(self) -> RoomFlags {
        match self {
            WeatherCondition::Clear => RoomFlags::empty(),
            WeatherCondition::Rain => RoomFlags::WET,
            WeatherCondition::HeavyRain => RoomFlags::WET,
            WeatherCondition::Thunderstorm => RoomFlags::WET | RoomFlags::STORMY,
            WeatherCondition::Foggy => RoomFlags::FOGGY,
            WeatherCondition::Windy => RoomFlags::WINDY,
            WeatherCondition::Snowy => RoomFlags::SNOWY | RoomFlags::WET,
            WeatherCondition::Blizzard => {
                RoomFlags::SNOWY | RoomFlags::WINDY | RoomFlags::FREEZING
            }
            WeatherCondition::Freezing => RoomFlags::FREEZING,
            WeatherCondition::Blazing => RoomFlags::BLAZING,
            WeatherCondition::Sandstorm => RoomFlags::SANDSTORM | RoomFlags::WINDY,
        }
    }
}

/// Weighted table of conditions for a season/climate pair.
fn table(season: Season, climate: Climate) -> &'static [(WeatherCondition, u32)] {
    use Climate::*;
    use Season::*;
    use WeatherCondition::*;
    match (season, climate) {
        (Spring, Temperate) => &[(Clear, 40), (Rain, 25), (Foggy, 15), (Windy, 10), (Thunderstorm, 10)],
        (Spring, Tropical) => &[(Clear, 30), (Rain, 30), (HeavyRain, 20), (Thunderstorm, 15), (Windy, 5)],
        (Spring, Arid) => &[(Clear, 60), (Windy, 20), (Sandstorm, 10), (Blazing, 10)],
        (Spring, Arctic) => &[(Snowy, 40), (Windy, 30), (Clear, 20), (Blizzard, 10)],
        (Spring, Coastal) => &[(Clear, 35), (Foggy, 25), (Rain, 20), (Windy, 20)],
        (Summer, Temperate) => &[(Clear, 60), (Windy, 15), (Rain, 10), (Thunderstorm, 10), (Blazing, 5)],
        (Summer, Tropical) => &[(HeavyRain, 30), (Thunderstorm, 25), (Rain, 20), (Clear, 15), (Blazing, 10)],
        (Summer, Arid) => &[(Blazing, 50), (Clear, 30), (Sandstorm, 15), (Windy, 5)],
        (Summer, Arctic) => &[(Clear, 60), (Windy, 25), (Snowy, 10), (Foggy, 5)],
        (Summer, Coastal) => &[(Clear, 50), (Windy, 20), (Foggy, 15), (Rain, 15)],
        (Fall, Temperate) => &[(Clear, 35), (Rain, 25), (Foggy, 20), (Windy, 15), (Thunderstorm, 5)],
        (Fall, Tropical) => &[(Rain, 35), (HeavyRain, 25), (Clear, 20), (Thunderstorm, 15), (Windy, 5)],
        (Fall, Arid) => &[(Clear, 55), (Windy, 25), (Sandstorm, 15), (Blazing, 5)],
        (Fall, Arctic) => &[(Snowy, 45), (Windy, 30), (Blizzard, 15), (Clear, 10)],
        (Fall, Coastal) => &[(Foggy, 30), (Rain, 25), (Windy, 25), (Clear, 20)],
        (Winter, Temperate) => &[(Snowy, 30), (Freezing, 25), (Clear, 20), (Foggy, 15), (Windy, 10)],
        (Winter, Tropical) => &[(Rain, 40), (Clear, 30), (HeavyRain, 20), (Windy, 10)],
        (Winter, Arid) => &[(Clear, 60), (Windy, 20), (Freezing, 15), (Sandstorm, 5)],
        (Winter, Arctic) => &[(Blizzard, 40), (Snowy, 30), (Freezing, 20), (Windy, 10)],
        (Winter, Coastal) => &[(Foggy, 35), (Windy, 25), (Freezing, 20), (Rain, 15), (Clear, 5)],
    }
}

/// Pick a condition from the season/climate table by weight.
pub fn roll_condition(rng: &mut impl Rng, season: Season, climate: Climate) -> WeatherCondition {
    let entries = table(season, climate);
    let total: u32 = entries.iter().map(|(_, w)| w).sum();
    let mut pick = rng.gen_range(0..total);
    for (condition, weight) in entries {
        if pick < *weight {
            return *condition;
        }
        pick -= weight;
    }
    WeatherCondition::Clear
}

/// Season for a month number (1..=12), northern-hemisphere style.
pub fn season_for_month(month: u32) -> Season {
    match month {
        3..=5 => Season::Spring,
        6..=8 => Season::Summer,
        9..=11 => Season::Fall,
        _ => Season::Winter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn rolled_conditions_come_from_the_table() {
        let mut rng = StdRng::seed_from_u64(5);
        let entries = table(Season::Winter, Climate::Arctic);
        for _ in 0..200 {
            let c = roll_condition(&mut rng, Season::Winter, Climate::Arctic);
            assert!(entries.iter().any(|(cond, _)| *cond == c));
        }
    }

    #[test]
    fn thunderstorm_is_wet_and_stormy() {
        let flags = WeatherCondition::Thunderstorm.room_flags();
        assert!(flags.contains(RoomFlags::WET));
        assert!(flags.contains(RoomFlags::STORMY));
    }

    #[test]
    fn seasons_cover_all_months() {
        assert_eq!(season_for_month(1), Season::Winter);
        assert_eq!(season_for_month(4), Season::Spring);
        assert_eq!(season_for_month(7), Season::Summer);
        assert_eq!(season_for_month(10), Season::Fall);
        assert_eq!(season_for_month(12), Season::Winter);
    }
}
