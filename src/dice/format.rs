//! Rendering rolled expressions as chat text
//!
//! Markdown markers per roll: dropped `~~v~~`, max `**v**`, min `_v_`,
//! clamped `6→4`, exploded `6!`, fixed `3ᶠ`. Each segment renders as
//! `**total** ⟵ parts` with its test result appended.

use serde::{Deserialize, Serialize};

use super::{RollData, RolledExpression, RolledPart, Segment, Sign};
use crate::config::{CriticalMethod, SecretMethod};

/// Options recognised by the formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// How criticals are resolved before formatting; each part's marker
    /// shows the method recorded on that part
    pub critical_method: CriticalMethod,
    pub secret_method: SecretMethod,
    /// Show rolls lowest first unless the part says `ns`
    pub sort_ascending: bool,
    /// Append `ᶠ` to fixed rolls (off by default)
    pub mark_fixed: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            critical_method: CriticalMethod::TimesTwo,
            secret_method: SecretMethod::Hide,
            sort_ascending: true,
            mark_fixed: false,
        }
    }
}

/// Where the caller should deliver a secret roll instead of the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Routing {
    GameMasterChannel,
    GameMasterDirect,
}

/// Rendered output plus what the presentation layer needs to post it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormattedRoll {
    pub text: String,
    pub has_secret: bool,
    pub routing: Option<Routing>,
}

pub fn render_roll(roll: &RollData) -> String {
    render_roll_with(roll, true)
}

fn render_roll_with(roll: &RollData, mark_fixed: bool) -> String {
    let mut text = if roll.is_clamped() {
        format!("{}→{}", roll.initial_value(), roll.value())
    } else {
        roll.value().to_string()
    };

    if roll.is_max() {
        text = format!("**{}**", text);
    } else if roll.is_min() {
        text = format!("_{}_", text);
    }
    if roll.is_exploded() {
        text.push('!');
    }
    if mark_fixed && roll.is_fixed() {
        text.push('ᶠ');
    }
    if roll.is_dropped() {
        text = format!("~~{}~~", text);
    }
    text
}

/// One part as `NdM<manipulations> [rolls]<modifiers><test> <description>`,
/// without its leading operator
pub fn render_part(rolled: &RolledPart, options: &FormatOptions) -> String {
    let part = &rolled.part;
    let mut out = String::new();

    if part.is_bare() {
        out.push_str(&rolled.total.to_string());
    } else {
        let sorted = rolled.sorted();
        let render = |roll: &RollData| render_roll_with(roll, options.mark_fixed);
        let rolls: Vec<String> = if options.sort_ascending && !part.no_sort {
            sorted.by_value().map(render).collect()
        } else {
            sorted.by_index().map(render).collect()
        };
        out.push_str(&part.notation());
        out.push_str(&format!(" [{}]", rolls.join(",")));
        for modifier in &part.modifiers {
            out.push_str(&modifier.to_string());
        }
    }

    if let Some(test) = part.test {
        out.push_str(&format!(" {}", test));
    }
    if let Some(description) = &part.description {
        out.push(' ');
        out.push_str(description);
    }
    out
}

fn critical_marker(method: CriticalMethod) -> &'static str {
    match method {
        CriticalMethod::TimesTwo => " (critical ×2)",
        CriticalMethod::RollTwice => " (critical, rolled twice)",
        CriticalMethod::AddMax => " (critical, max added)",
        CriticalMethod::Unknown => " (critical)",
    }
}

pub fn render_segment(segment: &Segment<'_>, options: &FormatOptions) -> String {
    let mut parts = String::new();
    for (i, rolled) in segment.parts.iter().enumerate() {
        let sign = rolled.part.sign;
        if i > 0 {
            parts.push_str(&format!(" {} ", sign));
        } else if sign == Sign::Minus {
            parts.push('-');
        }
        parts.push_str(&render_part(rolled, options));
    }

    let mut out = format!("**{}** ⟵ {}", segment.total, parts);
    if let Some(outcome) = segment.outcome {
        out.push_str(if outcome.passed { " → Success" } else { " → Failure" });
    }
    if let Some(method) = segment.parts.iter().find_map(|p| p.critical) {
        out.push_str(critical_marker(method));
    }
    out
}

/// Apply the secret policy to rendered text. Pure: routing is only an intent.
pub fn apply_secret_policy(text: String, secret: bool, method: SecretMethod) -> (String, Option<Routing>) {
    if !secret {
        return (text, None);
    }
    match method {
        SecretMethod::Ignore => (text, None),
        SecretMethod::Hide => (format!("||{}||", text), None),
        SecretMethod::GameMasterChannel => (text, Some(Routing::GameMasterChannel)),
        SecretMethod::GameMasterDirect => (text, Some(Routing::GameMasterDirect)),
    }
}

/// Render every segment, one per line, then apply the secret policy
pub fn format(rolled: &RolledExpression, options: &FormatOptions) -> FormattedRoll {
    let text = rolled
        .segments()
        .iter()
        .map(|segment| render_segment(segment, options))
        .collect::<Vec<_>>()
        .join("\n");

    let (text, routing) = apply_secret_policy(text, rolled.secret, options.secret_method);

    FormattedRoll {
        text,
        has_secret: rolled.secret,
        routing,
    }
}
