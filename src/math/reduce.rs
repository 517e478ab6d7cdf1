//! Step-wise reduction of function calls and groups

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;
use tracing::debug;

use super::error::{MathError, Result};
use super::eval::evaluate;

/// Result was not a finite number
pub const NAN_SENTINEL: &str = "(NaN)";
/// Expression could not be evaluated
pub const ERR_SENTINEL: &str = "(ERR)";

/// Reduction steps before giving up
const MAX_STEPS: usize = 1000;

const NUM: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static MIN_MAX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b(min|max)\(\s*({NUM}(?:\s*,\s*{NUM})*)\s*\)")).unwrap()
});
static ROUNDING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?i)\b(floor|ceil|round)\(\s*({NUM})\s*\)")).unwrap());
static INNER_GROUP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(([^()]*)\)").unwrap());
static BARE_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"^\s*{NUM}\s*$")).unwrap());
static WRAPPED_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(&format!(r"\(\s*({NUM})\s*\)")).unwrap());

/// Why a single reduction stopped early
enum Halt {
    NotFinite,
    Failed(MathError),
}

impl From<MathError> for Halt {
    fn from(e: MathError) -> Self {
        Halt::Failed(e)
    }
}

/// Integral values print without a decimal point
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn is_bare_number(text: &str) -> bool {
    BARE_NUMBER_REGEX.is_match(text)
}

fn finite(value: f64) -> std::result::Result<f64, Halt> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Halt::NotFinite)
    }
}

fn splice(text: &str, start: usize, end: usize, replacement: &str) -> String {
    format!("{}{}{}", &text[..start], replacement, &text[end..])
}

fn parse_args(list: &str) -> Result<Vec<f64>> {
    list.split(',')
        .map(|arg| arg.trim().parse::<f64>().map_err(|_| MathError::Number(arg.trim().to_string())))
        .collect()
}

/// Name of the function whose call starts at `open`, if any
fn function_before(text: &str, open: usize) -> Option<&str> {
    let head = &text[..open];
    let name_start = head
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphabetic())
        .last()
        .map(|(i, _)| i)?;
    Some(&head[name_start..])
}

/// Whether `(number)` at `span` can lose its parentheses without changing
/// meaning: it must not fuse with a neighbouring number or group, and a
/// signed number must stay grouped under `^`
fn can_unwrap(text: &str, span: Range<usize>, number: &str) -> bool {
    let before = text[..span.start].chars().rev().find(|c| !c.is_whitespace());
    let after = text[span.end..].chars().find(|c| !c.is_whitespace());

    let fuses_before = before.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == ')');
    let fuses_after = after.is_some_and(|c| c.is_ascii_digit() || c == '.' || c == '(');
    let signed = number.starts_with(['-', '+']);

    !fuses_before && !fuses_after && !(signed && after == Some('^'))
}

/// Apply the first applicable rule once. `None` when nothing applies.
fn step(text: &str) -> std::result::Result<Option<String>, Halt> {
    // min / max over numeric arguments
    if let Some(caps) = MIN_MAX_REGEX.captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let args = parse_args(&caps[2])?;
        let value = if caps[1].eq_ignore_ascii_case("min") {
            args.into_iter().fold(f64::INFINITY, f64::min)
        } else {
            args.into_iter().fold(f64::NEG_INFINITY, f64::max)
        };
        let value = finite(value)?;
        return Ok(Some(splice(text, whole.start, whole.end, &format_number(value))));
    }

    // floor / ceil / round of a number
    if let Some(caps) = ROUNDING_REGEX.captures(text) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let arg = parse_args(&caps[2])?[0];
        let value = match caps[1].to_ascii_lowercase().as_str() {
            "floor" => arg.floor(),
            "ceil" => arg.ceil(),
            _ => arg.round(),
        };
        let value = finite(value)?;
        return Ok(Some(splice(text, whole.start, whole.end, &format_number(value))));
    }

    // innermost group whose content is not already numbers
    for caps in INNER_GROUP_REGEX.captures_iter(text) {
        let Some(content) = caps.get(1) else { continue };
        let args: Vec<&str> = content.as_str().split(',').collect();
        if args.iter().all(|a| is_bare_number(a)) {
            continue;
        }

        let is_call = function_before(text, content.start() - 1).is_some();
        if !is_call && args.len() > 1 {
            return Err(Halt::Failed(MathError::UnexpectedInfix(",".to_string())));
        }

        let reduced = args
            .iter()
            .map(|arg| evaluate(arg).map_err(Halt::from).and_then(finite).map(format_number))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        return Ok(Some(splice(text, content.start(), content.end(), &reduced.join(","))));
    }

    // redundant parentheses around a bare number
    for caps in WRAPPED_NUMBER_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if function_before(text, whole.start()).is_some() || !can_unwrap(text, whole.range(), &caps[1]) {
            continue;
        }
        return Ok(Some(splice(text, whole.start(), whole.end(), &caps[1])));
    }

    Ok(None)
}

/// Reduce `text` to a number
pub fn reduce(text: &str) -> Result<f64> {
    let mut current = text.trim().to_string();

    for _ in 0..MAX_STEPS {
        match step(&current) {
            Ok(Some(next)) => current = next,
            Ok(None) => return evaluate(&current),
            Err(Halt::NotFinite) => return Ok(f64::NAN),
            Err(Halt::Failed(e)) => return Err(e),
        }
    }

    Err(MathError::Runaway)
}

/// Reduce a math expression to a numeric string.
///
/// Non-finite results give [`NAN_SENTINEL`], anything unparseable gives
/// [`ERR_SENTINEL`]. A leading `+` survives: `+(1+2)` is `+3`.
pub fn evaluate_math(text: &str) -> String {
    let trimmed = text.trim();
    let keep_plus = trimmed.starts_with('+');

    match reduce(trimmed) {
        Ok(value) if value.is_finite() => {
            let out = format_number(value);
            if keep_plus && value >= 0.0 {
                format!("+{}", out)
            } else {
                out
            }
        }
        Ok(_) => {
            debug!("Math '{}' is not a finite number", text);
            NAN_SENTINEL.to_string()
        }
        Err(e) => {
            debug!("Math '{}' failed: {}", text, e);
            ERR_SENTINEL.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_arithmetic() {
        assert_eq!(evaluate_math("2+2"), "4");
        assert_eq!(evaluate_math("7/2"), "3.5");
        assert_eq!(evaluate_math("2^10"), "1024");
        assert_eq!(evaluate_math(" (1+2)*(3+4) "), "21");
    }

    #[test]
    fn test_sentinels() {
        assert_eq!(evaluate_math("(2"), ERR_SENTINEL);
        assert_eq!(evaluate_math("1/0"), NAN_SENTINEL);
        assert_eq!(evaluate_math("0/0"), NAN_SENTINEL);
        assert_eq!(evaluate_math("floor(1/0)"), NAN_SENTINEL);
        assert_eq!(evaluate_math("2 + banana"), ERR_SENTINEL);
        assert_eq!(evaluate_math(""), ERR_SENTINEL);
        assert_eq!(evaluate_math("(1,2)"), ERR_SENTINEL);
        assert_eq!(evaluate_math("abs(1,2)"), ERR_SENTINEL);
    }

    #[test]
    fn test_sign_preserved() {
        assert_eq!(evaluate_math("+(1+2)"), "+3");
        assert_eq!(evaluate_math("-(1+2)"), "-3");
        assert_eq!(evaluate_math("+(1-5)"), "-4");
    }

    #[test]
    fn test_functions() {
        assert_eq!(evaluate_math("max(1,4)"), "4");
        assert_eq!(evaluate_math("MIN( 3 , -2 )"), "-2");
        assert_eq!(evaluate_math("floor(5/2)"), "2");
        assert_eq!(evaluate_math("ceil(5/2)"), "3");
        assert_eq!(evaluate_math("round(2.5)"), "3");
        assert_eq!(evaluate_math("floor(-2.5)"), "-3");
    }

    #[test]
    fn test_nested_reduction() {
        assert_eq!(evaluate_math("max(floor(7/2), 2)"), "3");
        assert_eq!(evaluate_math("min(1+1, 3*3) + 1"), "3");
        assert_eq!(evaluate_math("((2))"), "2");
        assert_eq!(evaluate_math("2*(3+(4-1))"), "12");
    }

    #[test]
    fn test_signed_group_under_power() {
        assert_eq!(evaluate_math("(-3)^2"), "9");
        assert_eq!(evaluate_math("(1-4)^2"), "9");
        assert_eq!(evaluate_math("2^(-1)"), "0.5");
        assert_eq!(evaluate_math("-(3)^2"), "-9");
        assert_eq!(step("(-3)^2").ok().flatten(), None);
    }

    #[test]
    fn test_adjacent_groups_do_not_fuse() {
        assert_eq!(evaluate_math("2(3)"), ERR_SENTINEL);
        assert_eq!(evaluate_math("(1+1)(2)"), ERR_SENTINEL);
        assert_eq!(evaluate_math("(2) 3"), ERR_SENTINEL);
        assert_eq!(evaluate_math("max((2), 3)"), "3");
        assert_eq!(evaluate_math("5-(-3)"), "8");
    }

    #[test]
    fn test_deep_nesting_is_an_error() {
        let prefixes = format!("({}1)", "-".repeat(5000));
        assert_eq!(evaluate_math(&prefixes), ERR_SENTINEL);

        let groups = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        assert_eq!(evaluate_math(&groups), ERR_SENTINEL);
    }

    #[test]
    fn test_steps() {
        assert_eq!(step("max(1,2)+1").ok().flatten(), Some("2+1".to_string()));
        assert_eq!(step("floor(2.7)").ok().flatten(), Some("2".to_string()));
        assert_eq!(step("(1+2)*2").ok().flatten(), Some("(3)*2".to_string()));
        assert_eq!(step("(3)*2").ok().flatten(), Some("3*2".to_string()));
        assert_eq!(step("3*2").ok().flatten(), None);
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(4.0), "4");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.25), "0.25");
    }
}
