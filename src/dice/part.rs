//! Parsed dice parts and their manipulations
//!
//! A formula like `4d6dl1+2 - 1d4` parses into one `DicePart` per signed
//! group of dice. Parts are immutable once parsed; rolling produces a
//! [`RolledPart`](super::RolledPart) alongside.

use serde::Serialize;
use std::fmt;

/// Operator joining a part to the parts before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Sign {
    #[default]
    Plus,
    Minus,
    Times,
    Divide,
}

impl Sign {
    /// `+` and `-` start a new additive group; `*` and `/` bind to the current one
    pub fn is_additive(self) -> bool {
        matches!(self, Sign::Plus | Sign::Minus)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Sign::Plus => "+",
            Sign::Minus => "-",
            Sign::Times => "*",
            Sign::Divide => "/",
        }
    }
}

impl fmt::Display for Sign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A trailing `+N` / `-N` term as written after a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Modifier {
    /// Written with a leading minus
    pub negative: bool,
    pub value: i64,
}

impl Modifier {
    pub fn new(negative: bool, value: i64) -> Self {
        Self { negative, value }
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { '-' } else { '+' };
        write!(f, "{}{}", sign, self.value)
    }
}

/// Which side a threshold clamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ThresholdKind {
    /// Values above the bound are lowered to it
    High,
    /// Values below the bound are raised to it
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Threshold {
    pub bound: i64,
    pub kind: ThresholdKind,
}

impl Threshold {
    pub fn high(bound: i64) -> Self {
        Self { bound, kind: ThresholdKind::High }
    }

    pub fn low(bound: i64) -> Self {
        Self { bound, kind: ThresholdKind::Low }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ThresholdKind::High => write!(f, "th{}", self.bound),
            ThresholdKind::Low => write!(f, "tl{}", self.bound),
        }
    }
}

/// Which rolled values cause an extra die
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExplodeTrigger {
    /// The die's maximum face
    Max,
    Exactly(i64),
    AtLeast(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Explode {
    pub trigger: ExplodeTrigger,
}

impl Explode {
    pub fn new(trigger: ExplodeTrigger) -> Self {
        Self { trigger }
    }

    /// Whether a die of `die_size` showing `value` explodes
    pub fn triggers(&self, value: i64, die_size: u32) -> bool {
        match self.trigger {
            ExplodeTrigger::Max => die_size >= 1 && value == i64::from(die_size),
            ExplodeTrigger::Exactly(n) => value == n,
            ExplodeTrigger::AtLeast(n) => value >= n,
        }
    }
}

impl fmt::Display for Explode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.trigger {
            ExplodeTrigger::Max => write!(f, "x"),
            ExplodeTrigger::Exactly(n) => write!(f, "x{}", n),
            ExplodeTrigger::AtLeast(n) => write!(f, "x>={}", n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DropKeepMode {
    DropHighest,
    DropLowest,
    KeepHighest,
    KeepLowest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DropKeep {
    pub mode: DropKeepMode,
    pub count: u32,
}

impl DropKeep {
    pub fn new(mode: DropKeepMode, count: u32) -> Self {
        Self { mode, count }
    }
}

impl fmt::Display for DropKeep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self.mode {
            DropKeepMode::DropHighest => "dh",
            DropKeepMode::DropLowest => "dl",
            DropKeepMode::KeepHighest => "kh",
            DropKeepMode::KeepLowest => "kl",
        };
        write!(f, "{}{}", code, self.count)
    }
}

/// The closed set of roll manipulations.
///
/// Source order is irrelevant: a part always runs threshold, then
/// explode, then drop/keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Manipulation {
    Threshold(Threshold),
    Explode(Explode),
    DropKeep(DropKeep),
}

impl Manipulation {
    pub fn name(&self) -> &'static str {
        match self {
            Manipulation::Threshold(_) => "threshold",
            Manipulation::Explode(_) => "explode",
            Manipulation::DropKeep(_) => "drop/keep",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparator {
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Equal,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::GreaterOrEqual => ">=",
            Comparator::Less => "<",
            Comparator::LessOrEqual => "<=",
            Comparator::Equal => "=",
        }
    }
}

/// A pass/fail check against a target number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Test {
    pub comparator: Comparator,
    pub target: i64,
}

impl Test {
    pub fn new(comparator: Comparator, target: i64) -> Self {
        Self { comparator, target }
    }

    pub fn passes(&self, total: i64) -> bool {
        match self.comparator {
            Comparator::Greater => total > self.target,
            Comparator::GreaterOrEqual => total >= self.target,
            Comparator::Less => total < self.target,
            Comparator::LessOrEqual => total <= self.target,
            Comparator::Equal => total == self.target,
        }
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.comparator.symbol(), self.target)
    }
}

/// One signed group of like dice, or a bare number when `die_count == 0`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DicePart {
    pub sign: Sign,
    pub die_count: u32,
    pub die_size: u32,
    pub fixed_rolls: Vec<i64>,
    pub threshold: Option<Threshold>,
    pub explode: Option<Explode>,
    pub drop_keep: Option<DropKeep>,
    pub no_sort: bool,
    pub modifiers: Vec<Modifier>,
    pub test: Option<Test>,
    pub description: Option<String>,
}

impl DicePart {
    /// A part rolling `count` dice of `size` sides
    pub fn dice(sign: Sign, count: u32, size: u32) -> Self {
        Self {
            sign,
            die_count: count,
            die_size: size,
            ..Default::default()
        }
    }

    /// A bare numeric term
    pub fn number(sign: Sign, value: i64) -> Self {
        Self {
            sign,
            modifiers: vec![Modifier::new(sign == Sign::Minus, value)],
            ..Default::default()
        }
    }

    pub fn is_bare(&self) -> bool {
        self.die_count == 0
    }

    /// Manipulations in execution order
    pub fn manipulations(&self) -> Vec<Manipulation> {
        let mut out = Vec::new();
        if let Some(threshold) = self.threshold {
            out.push(Manipulation::Threshold(threshold));
        }
        if let Some(explode) = self.explode {
            out.push(Manipulation::Explode(explode));
        }
        if let Some(drop_keep) = self.drop_keep {
            out.push(Manipulation::DropKeep(drop_keep));
        }
        out
    }

    /// Install a manipulation. Returns the rejected one if that slot is taken.
    pub fn set_manipulation(&mut self, manipulation: Manipulation) -> Result<(), Manipulation> {
        match manipulation {
            Manipulation::Threshold(t) if self.threshold.is_none() => self.threshold = Some(t),
            Manipulation::Explode(e) if self.explode.is_none() => self.explode = Some(e),
            Manipulation::DropKeep(d) if self.drop_keep.is_none() => self.drop_keep = Some(d),
            other => return Err(other),
        }
        Ok(())
    }

    /// Net contribution of the modifiers to this part's own total.
    ///
    /// Totals are unsigned relative to `sign`, so a modifier written with the
    /// part's own sign adds: `-1d4-1` is `-(1d4+1)`.
    pub fn modifier_total(&self) -> i64 {
        let part_negative = self.sign == Sign::Minus;
        self.modifiers
            .iter()
            .map(|m| if m.negative == part_negative { m.value } else { m.value.saturating_neg() })
            .fold(0, i64::saturating_add)
    }

    /// Dice notation of this part without sign, modifiers or test
    pub fn notation(&self) -> String {
        if self.is_bare() {
            return String::new();
        }
        let mut out = format!("{}d{}", self.die_count, self.die_size);
        for manipulation in self.manipulations() {
            match manipulation {
                Manipulation::Threshold(t) => out.push_str(&t.to_string()),
                Manipulation::Explode(e) => out.push_str(&e.to_string()),
                Manipulation::DropKeep(d) => out.push_str(&d.to_string()),
            }
        }
        if self.no_sort {
            out.push_str("ns");
        }
        out
    }
}
