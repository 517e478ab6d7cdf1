//! Dice formula tokenizer and part parser
//!
//! Turns a formula such as `4d6dl1 + 2d8x! - 1 >= 12` into an ordered list of
//! [`DicePart`]s. Tokenizing and part assembly are separate passes so every
//! error can point back at the offending token. Any error aborts the whole
//! formula: a partial roll is never produced.
//!
//! # Token table
//! - `NdM` die (count defaults to 1), optionally followed by `(v1,v2,...)` fixed rolls
//! - `thN` / `tlN` threshold, `x` `x!` `!` explode (optionally `N` or `>=N`)
//! - `dlN` `dhN` `klN` `khN` `kN` drop/keep, `ns` no-sort
//! - `>=` `<=` `>` `<` `=` (or `gte` `gt` `lte` `lt` `eq`) followed by a target
//! - `+ - * / × ÷` operators, plain numbers, `( ... )` and `min/max/floor/ceil/round( ... )` math
//! - anything else starting with a letter is a description label

use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use super::{
    Comparator, DicePart, DropKeep, DropKeepMode, Explode, ExplodeTrigger, Expression, Manipulation,
    Modifier, Sign, Test, Threshold,
};
use crate::config::Limits;
use crate::math::evaluate_math;

/// Why a formula was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("nothing to roll")]
    Empty,
    #[error("unexpected character '{0}'")]
    UnexpectedCharacter(char),
    #[error("die size must be at least 1")]
    InvalidDieSize,
    #[error("dice count must be at least 1")]
    InvalidDieCount,
    #[error("too many dice ({count} > {max})")]
    TooManyDice { count: u64, max: u32 },
    #[error("die size too large ({size} > {max})")]
    DieTooLarge { size: u64, max: u32 },
    #[error("{given} fixed rolls for {count} dice")]
    TooManyFixedRolls { given: usize, count: u32 },
    #[error("fixed roll {value} is outside 1..={size}")]
    FixedRollOutOfRange { value: i64, size: u32 },
    #[error("malformed fixed roll list")]
    InvalidFixedRolls,
    #[error("conflicting {0} manipulations")]
    ConflictingManipulation(&'static str),
    #[error("{0} needs dice to act on")]
    ManipulationWithoutDice(&'static str),
    #[error("{0} must come before modifiers and tests")]
    ManipulationAfterModifier(&'static str),
    #[error("test has nothing to check")]
    TestWithoutTerm,
    #[error("test is missing its target number")]
    MissingTestTarget,
    #[error("two operators in a row")]
    DoubleOperator,
    #[error("missing operator before number")]
    MissingOperator,
    #[error("expression ends with an operator")]
    DanglingOperator,
    #[error("'{0}' has no term to its left")]
    LeadingOperator(Sign),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unterminated group")]
    UnterminatedGroup,
    #[error("unresolved placeholder")]
    UnresolvedPlaceholder,
    #[error("math did not reduce to a number: {0}")]
    InvalidMath(String),
    #[error("number too large")]
    NumberTooLarge,
}

/// A rejected formula, with the byte offset and text where it went wrong
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason} at offset {offset} (near '{fragment}')")]
pub struct ParseError {
    pub offset: usize,
    pub fragment: String,
    pub reason: ParseErrorKind,
}

impl ParseError {
    fn new(offset: usize, fragment: impl Into<String>, reason: ParseErrorKind) -> Self {
        Self {
            offset,
            fragment: fragment.into(),
            reason,
        }
    }
}

static SECRET_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(?:secret|s)\s+").unwrap());
static DIE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(\d*)d(\d+)").unwrap());
static FIXED_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\s*(\d+(?:\s*,\s*\d+)*)\s*\)").unwrap());
static THRESHOLD_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^t([hl])(\d+)").unwrap());
static EXPLODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:x!?|!)(?:(>=)?(\d+))?").unwrap());
static DROP_KEEP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^(dl|dh|kl|kh|k)(\d+)?").unwrap());
static NO_SORT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^ns").unwrap());
static TEST_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(>=|<=|==?|>|<|gte|gt|lte|lt|eq)\s*(-?\d+)?").unwrap());
static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());
static MATH_FN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:min|max|floor|ceil|round)\s*\(").unwrap());

static DIE_ANYWHERE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(?:^|[^a-z])\d*d\d+").unwrap());

/// Characters that end a description label
const DESCRIPTION_STOPS: &str = "+-*/×÷()[]{}<>=";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Secret,
    Die { count: u64, size: u64 },
    FixedRolls(Vec<i64>),
    Manipulation(Manipulation),
    NoSort,
    Test(Test),
    Operator(Sign),
    Number(i64),
    Description(String),
}

#[derive(Debug, Clone)]
struct Spanned {
    offset: usize,
    fragment: String,
    token: Token,
}

/// Parse a formula with the default limits
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    parse_with_limits(input, &Limits::default())
}

/// Parse a formula, rejecting dice counts and sizes beyond `limits`
pub fn parse_with_limits(input: &str, limits: &Limits) -> Result<Expression, ParseError> {
    let result = tokenize(input).and_then(|tokens| assemble(input, tokens, limits));
    if let Err(ref e) = result {
        debug!("Rejected dice formula '{}': {}", input, e);
    }
    result
}

/// Whether `text` holds a die token anywhere, i.e. should be rolled rather
/// than handed to the math evaluator
pub fn contains_die(text: &str) -> bool {
    DIE_ANYWHERE_REGEX.is_match(text)
}

/// A word token ending in a letter only counts when the next char is not a
/// letter, or when the letters continue into another manipulation (`xkh3`)
fn ends_word(rest: &str, len: usize) -> bool {
    let tail = &rest[len..];
    let last_is_letter = rest[..len].chars().last().is_some_and(|c| c.is_ascii_alphabetic());
    let next_is_letter = tail.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    if !(last_is_letter && next_is_letter) {
        return true;
    }
    manipulation_len(tail).is_some_and(|n| ends_word(tail, n))
}

fn manipulation_len(text: &str) -> Option<usize> {
    [&THRESHOLD_REGEX, &EXPLODE_REGEX, &DROP_KEEP_REGEX, &NO_SORT_REGEX]
        .into_iter()
        .find_map(|re| re.find(text))
        .map(|m| m.end())
}

fn parse_number(text: &str, offset: usize) -> Result<i64, ParseError> {
    text.parse::<i64>()
        .map_err(|_| ParseError::new(offset, text, ParseErrorKind::NumberTooLarge))
}

fn parse_count(text: &str, offset: usize) -> Result<u64, ParseError> {
    text.parse::<u64>()
        .map_err(|_| ParseError::new(offset, text, ParseErrorKind::NumberTooLarge))
}

/// Byte length of a parenthesised group starting at `rest[0] == '('`
fn group_len(rest: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Evaluate a math group and round it down to a whole number
fn math_value(text: &str, offset: usize) -> Result<i64, ParseError> {
    let reduced = evaluate_math(text);
    match reduced.parse::<f64>() {
        Ok(value) if value.is_finite() && value.abs() < i64::MAX as f64 => Ok(value.floor() as i64),
        _ => Err(ParseError::new(offset, text, ParseErrorKind::InvalidMath(reduced))),
    }
}

fn tokenize(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens: Vec<Spanned> = Vec::new();
    let mut pos = input.len() - input.trim_start().len();

    if let Some(m) = SECRET_REGEX.find(&input[pos..]) {
        tokens.push(Spanned {
            offset: pos,
            fragment: m.as_str().trim().to_string(),
            token: Token::Secret,
        });
        pos += m.end();
    }

    while pos < input.len() {
        let rest = &input[pos..];
        let Some(c) = rest.chars().next() else { break };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        let after_die = matches!(tokens.last(), Some(Spanned { token: Token::Die { .. }, .. }));
        let (len, token) = next_token(rest, pos, after_die)?;
        tokens.push(Spanned {
            offset: pos,
            fragment: rest[..len].trim_end().to_string(),
            token,
        });
        pos += len;
    }

    Ok(tokens)
}

fn next_token(rest: &str, pos: usize, after_die: bool) -> Result<(usize, Token), ParseError> {
    let c = rest.chars().next().unwrap_or_default();
    let fail = |len: usize, reason| Err(ParseError::new(pos, &rest[..len], reason));

    if let Some(caps) = DIE_REGEX.captures(rest) {
        let len = caps[0].len();
        let count = match &caps[1] {
            "" => 1,
            text => parse_count(text, pos)?,
        };
        let size = parse_count(&caps[2], pos)?;
        return Ok((len, Token::Die { count, size }));
    }

    if c == '(' && after_die {
        if let Some(caps) = FIXED_REGEX.captures(rest) {
            let values = caps[1]
                .split(',')
                .map(|v| parse_number(v.trim(), pos))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok((caps[0].len(), Token::FixedRolls(values)));
        }
        return match group_len(rest) {
            Some(len) => fail(len, ParseErrorKind::InvalidFixedRolls),
            None => fail(rest.len(), ParseErrorKind::UnterminatedGroup),
        };
    }

    if let Some(caps) = THRESHOLD_REGEX.captures(rest) {
        let bound = parse_number(&caps[2], pos)?;
        let threshold = if caps[1].eq_ignore_ascii_case("h") {
            Threshold::high(bound)
        } else {
            Threshold::low(bound)
        };
        return Ok((caps[0].len(), Token::Manipulation(Manipulation::Threshold(threshold))));
    }

    if let Some(caps) = EXPLODE_REGEX.captures(rest) {
        let len = caps[0].len();
        if ends_word(rest, len) {
            return Ok((len, Token::Manipulation(Manipulation::Explode(explode_from(&caps, pos)?))));
        }
    }

    if let Some(caps) = DROP_KEEP_REGEX.captures(rest) {
        let len = caps[0].len();
        if ends_word(rest, len) {
            let mode = match caps[1].to_ascii_lowercase().as_str() {
                "dl" => DropKeepMode::DropLowest,
                "dh" => DropKeepMode::DropHighest,
                "kl" => DropKeepMode::KeepLowest,
                _ => DropKeepMode::KeepHighest,
            };
            let count = match caps.get(2) {
                Some(m) => u32::try_from(parse_count(m.as_str(), pos)?)
                    .map_err(|_| ParseError::new(pos, m.as_str(), ParseErrorKind::NumberTooLarge))?,
                None => 1,
            };
            return Ok((len, Token::Manipulation(Manipulation::DropKeep(DropKeep::new(mode, count)))));
        }
    }

    if let Some(m) = NO_SORT_REGEX.find(rest) {
        if ends_word(rest, m.end()) {
            return Ok((m.end(), Token::NoSort));
        }
    }

    if let Some(caps) = TEST_REGEX.captures(rest) {
        let word = &caps[1];
        if ends_word(rest, word.len()) {
            let comparator = match word.to_ascii_lowercase().as_str() {
                ">=" | "gte" => Comparator::GreaterOrEqual,
                "<=" | "lte" => Comparator::LessOrEqual,
                ">" | "gt" => Comparator::Greater,
                "<" | "lt" => Comparator::Less,
                _ => Comparator::Equal,
            };
            let Some(target) = caps.get(2) else {
                return fail(caps[0].len(), ParseErrorKind::MissingTestTarget);
            };
            let target = parse_number(target.as_str(), pos)?;
            return Ok((caps[0].len(), Token::Test(Test::new(comparator, target))));
        }
    }

    let operator = match c {
        '+' => Some(Sign::Plus),
        '-' => Some(Sign::Minus),
        '*' | '×' => Some(Sign::Times),
        '/' | '÷' => Some(Sign::Divide),
        _ => None,
    };
    if let Some(sign) = operator {
        return Ok((c.len_utf8(), Token::Operator(sign)));
    }

    if let Some(m) = NUMBER_REGEX.find(rest) {
        return Ok((m.end(), Token::Number(parse_number(m.as_str(), pos)?)));
    }

    if c == '(' || MATH_FN_REGEX.is_match(rest) {
        let open = rest.find('(').unwrap_or(0);
        return match group_len(&rest[open..]) {
            Some(len) => {
                let text = &rest[..open + len];
                Ok((text.len(), Token::Number(math_value(text, pos)?)))
            }
            None => fail(rest.len(), ParseErrorKind::UnterminatedGroup),
        };
    }

    if c == '{' {
        let len = rest.find('}').map(|i| i + 1).unwrap_or(rest.len());
        return fail(len, ParseErrorKind::UnresolvedPlaceholder);
    }

    if let Some(len) = description_len(rest) {
        return Ok((len, Token::Description(rest[..len].trim().to_string())));
    }

    match c {
        ')' | '[' | ']' | '}' => fail(c.len_utf8(), ParseErrorKind::UnterminatedGroup),
        _ => fail(c.len_utf8(), ParseErrorKind::UnexpectedCharacter(c)),
    }
}

/// A label runs from a letter up to a stop character or a die token after a space
fn description_len(rest: &str) -> Option<usize> {
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let mut after_space = false;
    for (i, c) in rest.char_indices() {
        if DESCRIPTION_STOPS.contains(c) || (after_space && DIE_REGEX.is_match(&rest[i..])) {
            return Some(i);
        }
        after_space = c.is_whitespace();
    }
    Some(rest.len())
}

fn explode_from(caps: &Captures<'_>, pos: usize) -> Result<Explode, ParseError> {
    let trigger = match (caps.get(1), caps.get(2)) {
        (Some(_), Some(n)) => ExplodeTrigger::AtLeast(parse_number(n.as_str(), pos)?),
        (None, Some(n)) => ExplodeTrigger::Exactly(parse_number(n.as_str(), pos)?),
        _ => ExplodeTrigger::Max,
    };
    Ok(Explode::new(trigger))
}

/// Part assembly state
struct Assembler<'a> {
    limits: &'a Limits,
    parts: Vec<DicePart>,
    pending_sign: Option<Sign>,
    pending_description: Option<String>,
    secret: bool,
}

impl Assembler<'_> {
    /// The last part, if it can still take manipulations, modifiers or a test
    fn open_part(&mut self) -> Option<&mut DicePart> {
        self.parts.last_mut().filter(|p| p.test.is_none())
    }

    fn push_part(&mut self, mut part: DicePart) {
        if let Some(description) = self.pending_description.take() {
            part.description = Some(description);
        }
        self.parts.push(part);
    }

    fn token(&mut self, spanned: Spanned) -> Result<(), ParseError> {
        let Spanned { offset, fragment, token } = spanned;
        let err = |reason| Err(ParseError::new(offset, fragment.clone(), reason));

        match token {
            Token::Secret => self.secret = true,

            Token::Die { count, size } => {
                if count == 0 {
                    return err(ParseErrorKind::InvalidDieCount);
                }
                if size == 0 {
                    return err(ParseErrorKind::InvalidDieSize);
                }
                if count > u64::from(self.limits.max_dice) {
                    return err(ParseErrorKind::TooManyDice { count, max: self.limits.max_dice });
                }
                if size > u64::from(self.limits.max_die_size) {
                    return err(ParseErrorKind::DieTooLarge { size, max: self.limits.max_die_size });
                }
                let sign = self.pending_sign.take().unwrap_or_default();
                // Both bounded by u32 limits above
                self.push_part(DicePart::dice(sign, count as u32, size as u32));
            }

            Token::FixedRolls(values) => {
                let Some(part) = self.parts.last_mut() else {
                    return err(ParseErrorKind::InvalidFixedRolls);
                };
                if values.len() > part.die_count as usize {
                    return err(ParseErrorKind::TooManyFixedRolls {
                        given: values.len(),
                        count: part.die_count,
                    });
                }
                let size = part.die_size;
                if let Some(&value) = values.iter().find(|&&v| v < 1 || v > i64::from(size)) {
                    return err(ParseErrorKind::FixedRollOutOfRange { value, size });
                }
                part.fixed_rolls = values;
            }

            Token::Manipulation(manipulation) => {
                self.check_manipulable(manipulation.name(), offset, &fragment)?;
                if let Some(part) = self.parts.last_mut() {
                    if part.set_manipulation(manipulation).is_err() {
                        return err(ParseErrorKind::ConflictingManipulation(manipulation.name()));
                    }
                }
            }

            Token::NoSort => {
                self.check_manipulable("no-sort", offset, &fragment)?;
                if let Some(part) = self.parts.last_mut() {
                    if part.no_sort {
                        return err(ParseErrorKind::ConflictingManipulation("no-sort"));
                    }
                    part.no_sort = true;
                }
            }

            Token::Test(test) => {
                if self.pending_sign.is_some() {
                    return err(ParseErrorKind::TestWithoutTerm);
                }
                match self.open_part() {
                    Some(part) => part.test = Some(test),
                    None => return err(ParseErrorKind::TestWithoutTerm),
                }
            }

            Token::Operator(sign) => {
                if self.pending_sign.is_some() {
                    return err(ParseErrorKind::DoubleOperator);
                }
                // `*` and `/` never open a segment, even after a test
                if !sign.is_additive() && self.open_part().is_none() {
                    return err(ParseErrorKind::LeadingOperator(sign));
                }
                self.pending_sign = Some(sign);
            }

            Token::Number(value) => match self.pending_sign.take() {
                None if self.parts.is_empty() => self.push_part(DicePart::number(Sign::Plus, value)),
                None => return err(ParseErrorKind::MissingOperator),
                Some(sign) if sign.is_additive() => {
                    let negative = (sign == Sign::Minus) != (value < 0);
                    let modifier = Modifier::new(negative, value.abs());
                    match self.open_part().filter(|part| part.sign.is_additive()) {
                        Some(part) => part.modifiers.push(modifier),
                        None => self.push_part(DicePart::number(sign, value)),
                    }
                }
                Some(sign) => {
                    if sign == Sign::Divide && value == 0 {
                        return err(ParseErrorKind::DivisionByZero);
                    }
                    self.push_part(DicePart::number(sign, value));
                }
            },

            Token::Description(text) => {
                let target = if self.pending_sign.is_none() {
                    self.parts.last_mut().map(|p| &mut p.description)
                } else {
                    None
                };
                let slot = target.unwrap_or(&mut self.pending_description);
                *slot = Some(match slot.take() {
                    Some(existing) => format!("{} {}", existing, text),
                    None => text,
                });
            }
        }

        Ok(())
    }

    /// Manipulations need an open dice part with no modifiers yet
    fn check_manipulable(&self, name: &'static str, offset: usize, fragment: &str) -> Result<(), ParseError> {
        let reason = match self.parts.last() {
            _ if self.pending_sign.is_some() => ParseErrorKind::ManipulationWithoutDice(name),
            None => ParseErrorKind::ManipulationWithoutDice(name),
            Some(part) if part.is_bare() => ParseErrorKind::ManipulationWithoutDice(name),
            Some(part) if part.test.is_some() || !part.modifiers.is_empty() => {
                ParseErrorKind::ManipulationAfterModifier(name)
            }
            Some(_) => return Ok(()),
        };
        Err(ParseError::new(offset, fragment, reason))
    }
}

fn assemble(input: &str, tokens: Vec<Spanned>, limits: &Limits) -> Result<Expression, ParseError> {
    let last_fragment = tokens.last().map(|t| t.fragment.clone()).unwrap_or_default();

    let mut assembler = Assembler {
        limits,
        parts: Vec::new(),
        pending_sign: None,
        pending_description: None,
        secret: false,
    };

    for token in tokens {
        assembler.token(token)?;
    }

    if assembler.pending_sign.is_some() {
        return Err(ParseError::new(input.len(), last_fragment, ParseErrorKind::DanglingOperator));
    }
    if assembler.parts.is_empty() {
        return Err(ParseError::new(input.len(), last_fragment, ParseErrorKind::Empty));
    }

    Ok(Expression {
        parts: assembler.parts,
        secret: assembler.secret,
        source: input.trim().to_string(),
    })
}
