//! Dice helpers. Everything takes an `Rng` so combat math stays testable
//! with a seeded generator.

use rand::Rng;

use crate::constants::MAX_DIE_EXPLOSIONS;

/// Roll a single die with the given number of sides. Zero-sided dice roll 0.
pub fn roll(rng: &mut impl Rng, sides: i64) -> i64 {
    if sides <= 0 {
        return 0;
    }
    rng.gen_range(1..=sides)
}

/// d20 attack/check roll.
pub fn d20(rng: &mut impl Rng) -> i64 {
    roll(rng, 20)
}

/// Sum of 4d6, the stat-generation roll.
pub fn roll_4d6(rng: &mut impl Rng) -> i64 {
    (0..4).map(|_| roll(rng, 6)).sum()
}

/// Six 4d6 rolls sorted high to low, ready for assignment.
pub fn roll_stat_set(rng: &mut impl Rng) -> [i64; 6] {
    let mut set = [0i64; 6];
    for slot in set.iter_mut() {
        *slot = roll_4d6(rng);
    }
    set.sort_unstable_by(|a, b| b.cmp(a));
    set
}

/// Exploding die: roll d(sides); a max face adds another roll of the same
/// die, chaining at most `MAX_DIE_EXPLOSIONS` times.
pub fn roll_exploding(rng: &mut impl Rng, sides: i64) -> i64 {
    if sides <= 0 {
        return 0;
    }
    let mut total = 0i64;
    let mut chains = 0u32;
    loop {
        let face = roll(rng, sides);
        total += face;
        if face < sides || chains >= MAX_DIE_EXPLOSIONS {
            break;
        }
        chains += 1;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn roll_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let v = roll(&mut rng, 20);
            assert!((1..=20).contains(&v));
        }
        assert_eq!(roll(&mut rng, 0), 0);
        assert_eq!(roll(&mut rng, -3), 0);
    }

    #[test]
    fn four_d6_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..1000 {
            let v = roll_4d6(&mut rng);
            assert!((4..=24).contains(&v));
        }
    }

    #[test]
    fn stat_set_is_sorted_descending() {
        let mut rng = StdRng::seed_from_u64(3);
        let set = roll_stat_set(&mut rng);
        for pair in set.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    /// A d1 always shows its max face, so the explosion cap is the only
    /// thing stopping it: cap + 1 total rolls of 1 each.
    #[test]
    fn exploding_die_honors_chain_cap() {
        let mut rng = StdRng::seed_from_u64(1);
        let total = roll_exploding(&mut rng, 1);
        assert_eq!(total, (MAX_DIE_EXPLOSIONS + 1) as i64);
    }

    #[test]
    fn exploding_die_minimum_is_one_roll() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..1000 {
            let v = roll_exploding(&mut rng, 6);
            assert!(v >= 1);
        }
    }
}
