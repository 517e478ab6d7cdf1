//! Deterministic views over a part's rolls

use super::RollData;

/// Index and value orderings over one set of rolls.
///
/// Both views hold positions into the roll slice. Value ties always go to
/// the lower (earlier) index so drop/keep selection is reproducible.
#[derive(Debug, Clone)]
pub struct SortedRollData<'a> {
    rolls: &'a [RollData],
    by_index: Vec<usize>,
    by_value: Vec<usize>,
}

impl<'a> SortedRollData<'a> {
    pub fn new(rolls: &'a [RollData]) -> Self {
        let mut by_index: Vec<usize> = (0..rolls.len()).collect();
        by_index.sort_by_key(|&i| rolls[i].index());

        let mut by_value = by_index.clone();
        by_value.sort_by(|&a, &b| {
            rolls[a]
                .value()
                .cmp(&rolls[b].value())
                .then(rolls[a].index().cmp(&rolls[b].index()))
        });

        Self { rolls, by_index, by_value }
    }

    /// Rolls in creation order
    pub fn by_index(&self) -> impl Iterator<Item = &'a RollData> + '_ {
        let rolls = self.rolls;
        self.by_index.iter().map(move |&i| &rolls[i])
    }

    /// Rolls by ascending value, ties by ascending index
    pub fn by_value(&self) -> impl Iterator<Item = &'a RollData> + '_ {
        let rolls = self.rolls;
        self.by_value.iter().map(move |&i| &rolls[i])
    }

    /// Positions lowest first (the `by_value` order)
    pub fn lowest_first(&self) -> &[usize] {
        &self.by_value
    }

    /// Positions highest first, ties still by ascending index
    pub fn highest_first(&self) -> Vec<usize> {
        let rolls = self.rolls;
        let mut order = self.by_index.clone();
        order.sort_by(|&a, &b| {
            rolls[b]
                .value()
                .cmp(&rolls[a].value())
                .then(rolls[a].index().cmp(&rolls[b].index()))
        });
        order
    }

    /// All rolls, explosions included
    pub fn count(&self) -> usize {
        self.rolls.len()
    }

    /// Rolls before any explosion was added
    pub fn pre_count(&self) -> usize {
        self.rolls.iter().filter(|r| !r.is_explosion()).count()
    }

    pub fn kept_count(&self) -> usize {
        self.rolls.iter().filter(|r| !r.is_dropped()).count()
    }

    /// Sum of the values as rolled
    pub fn pre_sum(&self) -> i64 {
        self.rolls.iter().map(|r| r.initial_value()).fold(0, i64::saturating_add)
    }

    /// Sum of the working values of the rolls still kept
    pub fn post_sum(&self) -> i64 {
        self.rolls
            .iter()
            .filter(|r| !r.is_dropped())
            .map(|r| r.value())
            .fold(0, i64::saturating_add)
    }
}
