//! Raw die rolling
//!
//! Produces `RollData` from a count, a die size and optional fixed
//! overrides. The random source is always passed in.

use rand::Rng;

use super::RollData;

/// Roll one die. Sizes below 1 give 0 and a d1 never touches the RNG.
pub fn roll_die<R: Rng>(die_size: u32, rng: &mut R) -> i64 {
    match die_size {
        0 => 0,
        1 => 1,
        size => i64::from(rng.random_range(1..=size)),
    }
}

/// Roll `die_count` dice of `die_size` sides.
///
/// The first `fixed_rolls.len()` dice take their value from `fixed_rolls`
/// and are marked fixed; the rest come from `rng`.
pub fn roll_dice<R: Rng>(
    die_count: u32,
    die_size: u32,
    fixed_rolls: &[i64],
    rng: &mut R,
) -> Vec<RollData> {
    let mut rolls = Vec::with_capacity(die_count as usize);

    for index in 0..die_count as usize {
        let roll = match fixed_rolls.get(index) {
            Some(&fixed) => RollData::new(index, die_size, fixed, true),
            None => RollData::new(index, die_size, roll_die(die_size, rng), false),
        };
        rolls.push(roll);
    }

    rolls
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fixed_rolls_override() {
        let mut rng = StdRng::seed_from_u64(7);
        let rolls = roll_dice(3, 6, &[6, 1], &mut rng);

        assert_eq!(rolls.len(), 3);
        assert_eq!(rolls[0].value(), 6);
        assert!(rolls[0].is_fixed() && rolls[0].is_max());
        assert_eq!(rolls[1].value(), 1);
        assert!(rolls[1].is_fixed() && rolls[1].is_min());
        assert!(!rolls[2].is_fixed());
        assert!((1..=6).contains(&rolls[2].value()));
    }

    #[test]
    fn test_indexes_follow_creation_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let rolls = roll_dice(5, 8, &[], &mut rng);
        let indexes: Vec<usize> = rolls.iter().map(|r| r.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_degenerate_sizes() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(roll_dice(4, 1, &[], &mut rng).iter().all(|r| r.value() == 1));
        assert!(roll_dice(4, 0, &[], &mut rng).iter().all(|r| r.value() == 0));
    }

    proptest! {
        #[test]
        fn test_rolled_value_in_range(size in 2..1000u32, seed: u64) {
            let mut rng = StdRng::seed_from_u64(seed);
            let value = roll_die(size, &mut rng);
            prop_assert!(value >= 1 && value <= i64::from(size));
        }
    }
}
