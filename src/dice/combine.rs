//! Part combining and critical resolution

use rand::Rng;
use tracing::warn;

use super::expression::signed;
use super::{RolledPart, Sign, TestOutcome};
use crate::config::CriticalMethod;

/// Fold part totals left to right.
///
/// `+` and `-` close the running group and open a new one seeded with the
/// signed part total. `*` and `/` apply to the running group, so they bind
/// tighter. Division rounds toward negative infinity; a zero divisor gives 0.
pub fn combine(parts: &[RolledPart]) -> i64 {
    let mut closed: i64 = 0;
    let mut group: Option<i64> = None;

    for part in parts {
        match part.part.sign {
            Sign::Plus | Sign::Minus => {
                if let Some(value) = group.take() {
                    closed = closed.saturating_add(value);
                }
                group = Some(signed(part));
            }
            Sign::Times => {
                group = Some(group.unwrap_or(0).saturating_mul(part.total));
            }
            Sign::Divide => {
                group = Some(floor_div(group.unwrap_or(0), part.total));
            }
        }
    }

    closed.saturating_add(group.unwrap_or(0))
}

fn floor_div(dividend: i64, divisor: i64) -> i64 {
    if divisor == 0 {
        warn!("Division by zero while combining dice parts, using 0");
        return 0;
    }
    let Some(quotient) = dividend.checked_div(divisor) else {
        return i64::MAX;
    };
    if dividend % divisor != 0 && (dividend < 0) != (divisor < 0) {
        quotient - 1
    } else {
        quotient
    }
}

/// Total of `part` once a critical success is resolved with `method`.
///
/// `RollTwice` rolls the part again with fresh dice: fixed rolls are not
/// reused, manipulations are.
pub fn resolve_critical<R: Rng>(part: &RolledPart, method: CriticalMethod, explosion_cap: u32, rng: &mut R) -> i64 {
    match method {
        CriticalMethod::TimesTwo => part.total.saturating_mul(2),
        CriticalMethod::RollTwice => {
            let mut fresh = part.part.clone();
            fresh.fixed_rolls.clear();
            let reroll = RolledPart::roll(&fresh, explosion_cap, rng);
            part.total.saturating_add(reroll.total)
        }
        CriticalMethod::AddMax => {
            let max = i64::from(part.part.die_count) * i64::from(part.part.die_size);
            part.total.saturating_add(max).saturating_add(part.part.modifier_total())
        }
        CriticalMethod::Unknown => part.total,
    }
}

/// Decides whether a test part counts as a critical success.
///
/// Margins and natural-roll rules belong to the game system; closures with
/// the same signature implement this too.
pub trait CriticalRule {
    fn is_critical(&self, part: &RolledPart, outcome: &TestOutcome) -> bool;
}

impl<F> CriticalRule for F
where
    F: Fn(&RolledPart, &TestOutcome) -> bool,
{
    fn is_critical(&self, part: &RolledPart, outcome: &TestOutcome) -> bool {
        self(part, outcome)
    }
}

/// Nothing is ever critical
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCritical;

impl CriticalRule for NeverCritical {
    fn is_critical(&self, _part: &RolledPart, _outcome: &TestOutcome) -> bool {
        false
    }
}

/// A passed test where a kept die rolled its maximum face
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalMax;

impl CriticalRule for NaturalMax {
    fn is_critical(&self, part: &RolledPart, outcome: &TestOutcome) -> bool {
        outcome.passed && part.has_natural_max()
    }
}
