//! Dice expression engine
//!
//! Implements chat dice formulas:
//! - Tokenizing `4d6dl1 + 2d8x! - 1 >= 12` into signed dice parts
//! - Rolling with an injected random source or fixed overrides
//! - Threshold, explode and drop/keep manipulations, always in that order
//! - Two-tier combining (`*` `/` before `+` `-`) and critical amplification
//! - Markdown rendering with a secret-roll policy

mod combine;
mod expression;
pub mod format;
mod parser;
mod part;
mod pipeline;
mod roll_data;
mod roller;
mod sorter;

pub use combine::{combine, resolve_critical, CriticalRule, NaturalMax, NeverCritical};
pub use expression::{roll, roll_with_cap, signed, Expression, RolledExpression, RolledPart, Segment, TestOutcome};
pub use format::{apply_secret_policy, format, FormatOptions, FormattedRoll, Routing};
pub use parser::{contains_die, parse, parse_with_limits, ParseError, ParseErrorKind};
pub use part::{
    Comparator, DicePart, DropKeep, DropKeepMode, Explode, ExplodeTrigger, Manipulation, Modifier, Sign, Test,
    Threshold, ThresholdKind,
};
pub use pipeline::run_pipeline;
pub use roll_data::RollData;
pub use roller::{roll_dice, roll_die};
pub use sorter::SortedRollData;
