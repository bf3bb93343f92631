//! Leveling curve and experience-pool rules.

use crate::constants::{
    MAX_LEVEL, XP_BASE, XP_EXPONENT, XP_POOL_CAP_PER_INTELLECT, XP_TIER_STEP,
};

/// Total XP required to advance from `current_level` to the next level, or
/// `None` at the level cap.
///
/// `base * (target - 1)^exponent`, multiplied by a tier factor that grows by
/// `XP_TIER_STEP` every ten levels.
pub fn xp_needed_for_level(current_level: u32) -> Option<f64> {
    if current_level >= MAX_LEVEL {
        return None;
    }
    let target = current_level + 1;
    if target <= 1 {
        return Some(0.0);
    }
    let tier_multiplier = 1.0 + ((target - 1) / 10) as f64 * XP_TIER_STEP;
    let required = (XP_BASE * ((target - 1) as f64).powf(XP_EXPONENT)).floor();
    Some((required * tier_multiplier).floor())
}

/// XP at which the given level begins; the floor the death penalty cannot
/// drain past.
pub fn xp_floor_for_level(level: u32) -> f64 {
    if level <= 1 {
        0.0
    } else {
        xp_needed_for_level(level - 1).unwrap_or(f64::MAX)
    }
}

/// A character's experience pool holds at most `intellect * 100` points;
/// overflow is discarded.
pub fn xp_pool_cap(intellect: i64) -> f64 {
    intellect.max(0) as f64 * XP_POOL_CAP_PER_INTELLECT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_base_case() {
        // Level 1 -> 2: base * 1^2.5 * tier 1.0.
        assert_eq!(xp_needed_for_level(1), Some(1000.0));
    }

    #[test]
    fn curve_is_monotonic() {
        let mut last = 0.0;
        for level in 1..MAX_LEVEL {
            let needed = xp_needed_for_level(level).unwrap();
            assert!(needed > last, "level {level} regressed");
            last = needed;
        }
    }

    #[test]
    fn tier_multiplier_kicks_in_every_ten_levels() {
        // Target level 11 lands in the second tier (1.5x).
        let raw = (XP_BASE * 10f64.powf(XP_EXPONENT)).floor();
        assert_eq!(xp_needed_for_level(10), Some((raw * 1.5).floor()));
    }

    #[test]
    fn max_level_has_no_next() {
        assert_eq!(xp_needed_for_level(MAX_LEVEL), None);
        assert_eq!(xp_needed_for_level(MAX_LEVEL + 5), None);
    }

    #[test]
    fn pool_cap_is_intellect_times_hundred() {
        assert_eq!(xp_pool_cap(10), 1000.0);
        assert_eq!(xp_pool_cap(35), 3500.0);
        assert_eq!(xp_pool_cap(-3), 0.0);
    }
}
