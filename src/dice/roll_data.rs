//! Per-die roll records
//!
//! A `RollData` is created once by the roller. Afterwards only the working
//! `value` and the manipulation flags change; the rolled value and the
//! min/max flags derived from it stay as rolled.

use serde::Serialize;

/// A single die result together with its manipulation state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollData {
    index: usize,
    die_size: u32,
    initial_value: i64,
    is_fixed: bool,
    is_min: bool,
    is_max: bool,
    /// Working value after threshold clamping
    pub(crate) value: i64,
    pub(crate) is_dropped: bool,
    /// This roll triggered an extra roll
    pub(crate) is_exploded: bool,
    /// This roll is an extra roll
    pub(crate) is_explosion: bool,
    pub(crate) is_above_threshold: bool,
    pub(crate) is_below_threshold: bool,
}

impl RollData {
    /// Create a fresh roll record. Min/max are derived here and never again.
    pub fn new(index: usize, die_size: u32, initial_value: i64, is_fixed: bool) -> Self {
        Self {
            index,
            die_size,
            initial_value,
            is_fixed,
            is_min: die_size >= 1 && initial_value == 1,
            is_max: die_size >= 1 && initial_value == i64::from(die_size),
            value: initial_value,
            is_dropped: false,
            is_exploded: false,
            is_explosion: false,
            is_above_threshold: false,
            is_below_threshold: false,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn die_size(&self) -> u32 {
        self.die_size
    }

    /// The value as rolled (or fixed), before any manipulation
    pub fn initial_value(&self) -> i64 {
        self.initial_value
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    pub fn is_fixed(&self) -> bool {
        self.is_fixed
    }

    pub fn is_min(&self) -> bool {
        self.is_min
    }

    pub fn is_max(&self) -> bool {
        self.is_max
    }

    pub fn is_dropped(&self) -> bool {
        self.is_dropped
    }

    pub fn is_exploded(&self) -> bool {
        self.is_exploded
    }

    pub fn is_explosion(&self) -> bool {
        self.is_explosion
    }

    pub fn is_above_threshold(&self) -> bool {
        self.is_above_threshold
    }

    pub fn is_below_threshold(&self) -> bool {
        self.is_below_threshold
    }

    /// Whether threshold clamping changed the working value
    pub fn is_clamped(&self) -> bool {
        self.is_above_threshold || self.is_below_threshold
    }

    /// Rendered form of this roll, see [`crate::dice::format`]
    pub fn text(&self) -> String {
        super::format::render_roll(self)
    }
}
