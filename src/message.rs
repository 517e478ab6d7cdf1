//! Inline rolls in chat messages
//!
//! Every non-nested `[[...]]` group in a message is evaluated on its own:
//! dice formulas through the engine, anything else through the math
//! evaluator. A failing group is reported in place and never blanks the
//! others.

use rand::Rng;
use regex::Regex;
use serde::Serialize;
use std::ops::Range;
use std::sync::LazyLock;

use crate::dice::{contains_die, ParseError, Routing};
use crate::engine::{Engine, Evaluation};
use crate::math::evaluate_math;

static INLINE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").unwrap());

/// What one inline group evaluated to
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InlineOutcome {
    Roll(Evaluation),
    /// Math result, or one of the math sentinels
    Math { value: String },
    Error { message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineRoll {
    /// Byte range of the whole `[[...]]` group in the message
    pub span: Range<usize>,
    pub formula: String,
    pub outcome: InlineOutcome,
}

impl InlineRoll {
    /// Text that replaces the group in the rendered message
    pub fn rendered(&self) -> String {
        match &self.outcome {
            InlineOutcome::Roll(eval) => eval.formatted.text.clone(),
            InlineOutcome::Math { value } => value.clone(),
            InlineOutcome::Error { message } => format!("[[{}]] ({})", self.formula, message),
        }
    }

    fn routing(&self) -> Option<Routing> {
        match &self.outcome {
            InlineOutcome::Roll(eval) => eval.formatted.routing,
            _ => None,
        }
    }

    fn has_secret(&self) -> bool {
        matches!(&self.outcome, InlineOutcome::Roll(eval) if eval.formatted.has_secret)
    }
}

/// A message with its inline groups evaluated
#[derive(Debug, Clone, Serialize)]
pub struct MessageResult {
    pub text: String,
    pub rolls: Vec<InlineRoll>,
    pub has_secret: bool,
    /// First routing intent among the message's rolls
    pub routing: Option<Routing>,
}

/// Byte spans and formulas of every `[[...]]` group, outer brackets stripped
pub fn extract_inline(message: &str) -> Vec<(Range<usize>, &str)> {
    INLINE_REGEX
        .captures_iter(message)
        .filter_map(|caps| Some((caps.get(0)?.range(), caps.get(1)?.as_str().trim())))
        .collect()
}

/// Evaluate one formula: dice when it holds a die token, math otherwise
pub fn evaluate_formula<R: Rng>(engine: &Engine, formula: &str, rng: &mut R) -> InlineOutcome {
    if !contains_die(formula) {
        return InlineOutcome::Math {
            value: evaluate_math(formula),
        };
    }
    match engine.evaluate(formula, rng) {
        Ok(eval) => InlineOutcome::Roll(eval),
        Err(e) => error_outcome(&e),
    }
}

fn error_outcome(e: &ParseError) -> InlineOutcome {
    InlineOutcome::Error { message: e.to_string() }
}

/// Evaluate every inline group of `message` and splice the results in.
///
/// A message without inline groups yields no rolls and unchanged text.
pub fn evaluate_message<R: Rng>(engine: &Engine, message: &str, rng: &mut R) -> MessageResult {
    let rolls: Vec<InlineRoll> = extract_inline(message)
        .into_iter()
        .map(|(span, formula)| InlineRoll {
            span,
            formula: formula.to_string(),
            outcome: evaluate_formula(engine, formula, rng),
        })
        .collect();

    let mut text = String::with_capacity(message.len());
    let mut last = 0;
    for roll in &rolls {
        text.push_str(&message[last..roll.span.start]);
        text.push_str(&roll.rendered());
        last = roll.span.end;
    }
    text.push_str(&message[last..]);

    MessageResult {
        text,
        has_secret: rolls.iter().any(InlineRoll::has_secret),
        routing: rolls.iter().find_map(InlineRoll::routing),
        rolls,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EngineConfig, SecretMethod};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(message: &str) -> MessageResult {
        let mut rng = StdRng::seed_from_u64(12);
        evaluate_message(&Engine::default(), message, &mut rng)
    }

    #[test]
    fn test_extract() {
        let groups = extract_inline("hit [[1d20+5]] for [[ 2d6 ]] and [[]]");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].1, "1d20+5");
        assert_eq!(groups[0].0, 4..14);
        assert_eq!(groups[1].1, "2d6");
    }

    #[test]
    fn test_no_groups() {
        let result = run("just talking");
        assert!(result.rolls.is_empty());
        assert_eq!(result.text, "just talking");
    }

    #[test]
    fn test_dice_and_math_groups() {
        let result = run("I swing [[2d6(4,5)+1]] and heal [[floor(7/2)]]!");
        assert_eq!(result.rolls.len(), 2);
        assert!(matches!(result.rolls[0].outcome, InlineOutcome::Roll(ref e) if e.total == 10));
        assert!(matches!(result.rolls[1].outcome, InlineOutcome::Math { ref value } if value == "3"));
        assert!(result.text.starts_with("I swing **10** ⟵ 2d6"));
        assert!(result.text.ends_with("and heal 3!"));
    }

    #[test]
    fn test_failure_is_local() {
        let result = run("[[1d0]] then [[1d4(2)]] then [[1/0]]");
        assert!(matches!(result.rolls[0].outcome, InlineOutcome::Error { .. }));
        assert!(matches!(result.rolls[1].outcome, InlineOutcome::Roll(ref e) if e.total == 2));
        assert!(matches!(result.rolls[2].outcome, InlineOutcome::Math { ref value } if value == "(NaN)"));
        assert!(result.text.starts_with("[[1d0]] (die size must be at least 1"));
    }

    #[test]
    fn test_secret_routing_bubbles_up() {
        let engine = Engine::new(EngineConfig {
            secret_method: SecretMethod::GameMasterDirect,
            ..EngineConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(12);
        let result = evaluate_message(&engine, "[[1d6]] [[s 1d20]]", &mut rng);
        assert!(result.has_secret);
        assert_eq!(result.routing, Some(Routing::GameMasterDirect));
    }
}
