//! Roll manipulation pipeline
//!
//! Each manipulation variant has its own `apply`. `run_pipeline` calls them
//! in the fixed order threshold, explode, drop/keep, because each stage must
//! see the population the previous one produced.

use rand::Rng;
use tracing::warn;

use super::roller::roll_die;
use super::{DicePart, DropKeep, DropKeepMode, Explode, RollData, SortedRollData, Threshold, ThresholdKind};

impl Threshold {
    /// Clamp one roll's working value, leaving what was rolled untouched
    pub fn clamp(&self, roll: &mut RollData) {
        match self.kind {
            ThresholdKind::High if roll.value > self.bound => {
                roll.value = self.bound;
                roll.is_above_threshold = true;
            }
            ThresholdKind::Low if roll.value < self.bound => {
                roll.value = self.bound;
                roll.is_below_threshold = true;
            }
            _ => {}
        }
    }

    pub fn apply(&self, rolls: &mut [RollData]) {
        for roll in rolls.iter_mut() {
            self.clamp(roll);
        }
    }
}

impl Explode {
    /// Add one die per triggering roll, new dice included, up to `cap` extra
    /// dice. New dice go through `threshold` as they are created.
    ///
    /// Returns the number of dice added.
    pub fn apply<R: Rng>(
        &self,
        rolls: &mut Vec<RollData>,
        die_size: u32,
        threshold: Option<Threshold>,
        cap: u32,
        rng: &mut R,
    ) -> u32 {
        let mut added = 0;
        let mut position = 0;

        while position < rolls.len() {
            if self.triggers(rolls[position].initial_value(), die_size) {
                if added >= cap {
                    warn!("Explosion cap of {} reached on d{}", cap, die_size);
                    break;
                }

                let mut extra = RollData::new(rolls.len(), die_size, roll_die(die_size, rng), false);
                extra.is_explosion = true;
                if let Some(threshold) = threshold {
                    threshold.clamp(&mut extra);
                }

                rolls[position].is_exploded = true;
                rolls.push(extra);
                added += 1;
            }
            position += 1;
        }

        added
    }
}

impl DropKeep {
    /// Mark rolls dropped, selecting over the value-sorted view.
    ///
    /// A count at or above the number of rolls drops everything for the drop
    /// modes and keeps everything for the keep modes.
    pub fn apply(&self, rolls: &mut [RollData]) {
        let n = (self.count as usize).min(rolls.len());

        let selected: Vec<usize> = {
            let sorted = SortedRollData::new(rolls);
            match self.mode {
                DropKeepMode::DropLowest | DropKeepMode::KeepLowest => sorted.lowest_first()[..n].to_vec(),
                DropKeepMode::DropHighest | DropKeepMode::KeepHighest => {
                    let mut order = sorted.highest_first();
                    order.truncate(n);
                    order
                }
            }
        };

        let drop_selected = matches!(self.mode, DropKeepMode::DropLowest | DropKeepMode::DropHighest);

        for (position, roll) in rolls.iter_mut().enumerate() {
            let is_selected = selected.contains(&position);
            roll.is_dropped = is_selected == drop_selected;
        }
    }
}

/// Run every manipulation of `part` over its rolls in execution order
pub fn run_pipeline<R: Rng>(part: &DicePart, rolls: &mut Vec<RollData>, explosion_cap: u32, rng: &mut R) {
    if let Some(threshold) = part.threshold {
        threshold.apply(rolls);
    }
    if let Some(explode) = part.explode {
        explode.apply(rolls, part.die_size, part.threshold, explosion_cap, rng);
    }
    if let Some(drop_keep) = part.drop_keep {
        drop_keep.apply(rolls);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::{roll_dice, ExplodeTrigger, Sign};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed(size: u32, values: &[i64]) -> Vec<RollData> {
        let mut rng = StdRng::seed_from_u64(0);
        roll_dice(values.len() as u32, size, values, &mut rng)
    }

    fn dropped(rolls: &[RollData]) -> Vec<i64> {
        rolls.iter().filter(|r| r.is_dropped()).map(|r| r.value()).collect()
    }

    #[test]
    fn test_threshold_keeps_initial_and_flags() {
        let mut rolls = fixed(6, &[6, 1, 4]);
        Threshold::high(4).apply(&mut rolls);

        assert_eq!(rolls[0].value(), 4);
        assert_eq!(rolls[0].initial_value(), 6);
        assert!(rolls[0].is_max());
        assert!(rolls[0].is_above_threshold());
        assert!(!rolls[2].is_above_threshold());

        let mut rolls = fixed(6, &[1, 5]);
        Threshold::low(2).apply(&mut rolls);
        assert_eq!(rolls[0].value(), 2);
        assert!(rolls[0].is_min());
        assert!(rolls[0].is_below_threshold());
        assert_eq!(rolls[1].value(), 5);
    }

    #[test]
    fn test_explode_one_sided_terminates() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut rolls = roll_dice(2, 1, &[], &mut rng);
        let added = Explode::new(ExplodeTrigger::Max).apply(&mut rolls, 1, None, 50, &mut rng);

        assert_eq!(added, 50);
        assert_eq!(rolls.len(), 52);
        assert!(rolls[2..].iter().all(|r| r.is_explosion()));
        assert!(rolls[0].is_exploded());
    }

    #[test]
    fn test_explode_marks_trigger_and_extra() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut rolls = fixed(6, &[6, 2]);
        let added = Explode::new(ExplodeTrigger::Max).apply(&mut rolls, 6, None, 100, &mut rng);

        assert!(added >= 1);
        assert!(rolls[0].is_exploded());
        assert!(!rolls[1].is_exploded());
        assert_eq!(rolls[2].index(), 2);
        assert!(rolls[2].is_explosion());
        assert!(!rolls[2].is_fixed());
    }

    #[test]
    fn test_explosions_pass_threshold() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut rolls = fixed(6, &[6]);
        let threshold = Threshold::high(3);
        threshold.apply(&mut rolls);
        Explode::new(ExplodeTrigger::AtLeast(1)).apply(&mut rolls, 6, Some(threshold), 10, &mut rng);

        assert_eq!(rolls.len(), 11);
        assert!(rolls.iter().all(|r| r.value() <= 3));
    }

    #[test]
    fn test_drop_lowest_tie_takes_leftmost() {
        let mut rolls = fixed(6, &[3, 1, 1, 5]);
        DropKeep::new(DropKeepMode::DropLowest, 1).apply(&mut rolls);
        assert!(rolls[1].is_dropped());
        assert!(!rolls[2].is_dropped());
    }

    #[test]
    fn test_keep_highest_tie_takes_leftmost() {
        let mut rolls = fixed(20, &[12, 18, 18]);
        DropKeep::new(DropKeepMode::KeepHighest, 1).apply(&mut rolls);
        assert!(!rolls[1].is_dropped());
        assert!(rolls[0].is_dropped() && rolls[2].is_dropped());
    }

    #[test]
    fn test_drop_keep_modes() {
        let mut rolls = fixed(6, &[6, 5, 3, 1]);
        DropKeep::new(DropKeepMode::DropHighest, 2).apply(&mut rolls);
        assert_eq!(dropped(&rolls), vec![6, 5]);

        let mut rolls = fixed(6, &[6, 5, 3, 1]);
        DropKeep::new(DropKeepMode::KeepLowest, 1).apply(&mut rolls);
        assert_eq!(dropped(&rolls), vec![6, 5, 3]);
    }

    #[test]
    fn test_count_beyond_roll_count() {
        let mut rolls = fixed(6, &[2, 4, 6]);
        DropKeep::new(DropKeepMode::DropLowest, 5).apply(&mut rolls);
        assert!(rolls.iter().all(|r| r.is_dropped()));

        let mut rolls = fixed(6, &[2, 4, 6]);
        DropKeep::new(DropKeepMode::KeepHighest, 3).apply(&mut rolls);
        assert!(rolls.iter().all(|r| !r.is_dropped()));
    }

    #[test]
    fn test_pipeline_order_ignores_source_order() {
        let mut part = DicePart::dice(Sign::Plus, 4, 6);
        part.drop_keep = Some(DropKeep::new(DropKeepMode::DropLowest, 1));
        part.threshold = Some(Threshold::low(3));

        // Clamping runs first, so the 1 becomes 3 and ties with the 3 before it
        let mut rolls = fixed(6, &[6, 3, 1, 4]);
        let mut rng = StdRng::seed_from_u64(0);
        run_pipeline(&part, &mut rolls, 100, &mut rng);

        assert!(rolls[1].is_dropped());
        assert!(!rolls[2].is_dropped());
        assert_eq!(SortedRollData::new(&rolls).post_sum(), 13);
    }
}
