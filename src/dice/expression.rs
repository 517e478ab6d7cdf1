//! Parsed and rolled expressions

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use super::combine::{combine, resolve_critical, CriticalRule};
use super::pipeline::run_pipeline;
use super::roller::roll_dice;
use super::{DicePart, RollData, Sign, SortedRollData, Test};
use crate::config::{CriticalMethod, Limits};

/// A parsed formula: its parts in source order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expression {
    pub parts: Vec<DicePart>,
    /// Written with a leading `s` / `secret`
    pub secret: bool,
    /// The formula as given, trimmed
    pub source: String,
}

impl Expression {
    pub fn parts(&self) -> &[DicePart] {
        &self.parts
    }

    /// Whether any part rolls dice
    pub fn has_dice(&self) -> bool {
        self.parts.iter().any(|p| !p.is_bare())
    }

    /// Roll every part with the default explosion cap
    pub fn roll<R: Rng>(&self, rng: &mut R) -> RolledExpression {
        roll(self, rng)
    }
}

/// One part after rolling and manipulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolledPart {
    pub part: DicePart,
    /// Rolls in creation order; `rolls[i].index() == i`
    pub rolls: Vec<RollData>,
    /// Unsigned total: kept roll values plus modifiers, after any critical
    pub total: i64,
    /// Set when a critical was resolved on this part
    pub critical: Option<CriticalMethod>,
}

impl RolledPart {
    /// Roll `part` and run its manipulations
    pub fn roll<R: Rng>(part: &DicePart, explosion_cap: u32, rng: &mut R) -> Self {
        let mut rolls = roll_dice(part.die_count, part.die_size, &part.fixed_rolls, rng);
        run_pipeline(part, &mut rolls, explosion_cap, rng);
        let total = SortedRollData::new(&rolls).post_sum().saturating_add(part.modifier_total());

        Self {
            part: part.clone(),
            rolls,
            total,
            critical: None,
        }
    }

    pub fn sorted(&self) -> SortedRollData<'_> {
        SortedRollData::new(&self.rolls)
    }

    /// Whether a kept die showed its maximum face as rolled
    pub fn has_natural_max(&self) -> bool {
        self.rolls.iter().any(|r| !r.is_dropped() && r.is_max())
    }
}

/// Result of a test against its segment's combined total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub test: Test,
    pub total: i64,
    pub passed: bool,
}

/// A run of parts ending at a test part, or at the end of the expression
#[derive(Debug, Clone, Serialize)]
pub struct Segment<'a> {
    pub parts: &'a [RolledPart],
    pub total: i64,
    pub outcome: Option<TestOutcome>,
}

impl Segment<'_> {
    pub fn is_critical(&self) -> bool {
        self.parts.iter().any(|p| p.critical.is_some())
    }
}

/// Every part of an expression, rolled
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RolledExpression {
    pub source: String,
    pub parts: Vec<RolledPart>,
    pub secret: bool,
}

impl RolledExpression {
    /// Combined total over every part
    pub fn total(&self) -> i64 {
        combine(&self.parts)
    }

    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::new();
        let mut start = 0;

        for (i, rolled) in self.parts.iter().enumerate() {
            if let Some(test) = rolled.part.test {
                let parts = &self.parts[start..=i];
                let total = combine(parts);
                segments.push(Segment {
                    parts,
                    total,
                    outcome: Some(TestOutcome {
                        test,
                        total,
                        passed: test.passes(total),
                    }),
                });
                start = i + 1;
            }
        }

        if start < self.parts.len() {
            let parts = &self.parts[start..];
            segments.push(Segment {
                parts,
                total: combine(parts),
                outcome: None,
            });
        }

        segments
    }

    /// Test outcomes in source order
    pub fn outcomes(&self) -> Vec<TestOutcome> {
        self.segments().into_iter().filter_map(|s| s.outcome).collect()
    }

    /// Ask `rule` about every test part and amplify the ones it calls critical.
    ///
    /// Returns the number of parts amplified.
    pub fn apply_criticals<C, R>(&mut self, rule: &C, method: CriticalMethod, explosion_cap: u32, rng: &mut R) -> usize
    where
        C: CriticalRule + ?Sized,
        R: Rng,
    {
        let mut critical = Vec::new();
        let mut start = 0;
        for i in 0..self.parts.len() {
            let Some(test) = self.parts[i].part.test else {
                continue;
            };
            let total = combine(&self.parts[start..=i]);
            let outcome = TestOutcome {
                test,
                total,
                passed: test.passes(total),
            };
            if rule.is_critical(&self.parts[i], &outcome) {
                critical.push(i);
            }
            start = i + 1;
        }

        for &i in &critical {
            let total = resolve_critical(&self.parts[i], method, explosion_cap, rng);
            debug!("Critical on part {} ({:?}): {} -> {}", i, method, self.parts[i].total, total);
            self.parts[i].total = total;
            self.parts[i].critical = Some(method);
        }

        critical.len()
    }
}

/// Roll every part of `expression` with the default explosion cap
pub fn roll<R: Rng>(expression: &Expression, rng: &mut R) -> RolledExpression {
    roll_with_cap(expression, Limits::default().explosion_cap, rng)
}

/// Roll every part of `expression`, adding at most `explosion_cap` dice per part
pub fn roll_with_cap<R: Rng>(expression: &Expression, explosion_cap: u32, rng: &mut R) -> RolledExpression {
    let parts = expression
        .parts
        .iter()
        .map(|part| RolledPart::roll(part, explosion_cap, rng))
        .collect();

    RolledExpression {
        source: expression.source.clone(),
        parts,
        secret: expression.secret,
    }
}

/// Signed contribution of an additive part, for callers that sum by hand
pub fn signed(part: &RolledPart) -> i64 {
    match part.part.sign {
        Sign::Minus => part.total.saturating_neg(),
        _ => part.total,
    }
}
