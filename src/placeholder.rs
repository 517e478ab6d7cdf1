//! Macro argument substitution
//!
//! Fills `{0}`, `{1}` positional and `{name}` / `{name:default}` named
//! placeholders before a formula is parsed. A placeholder with no value and
//! no default stays in the text, where the parser rejects it.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\d+|[A-Za-z_][A-Za-z0-9_]*)(?::([^{}]*))?\}").unwrap());

/// Values for a macro's placeholders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    positional: Vec<String>,
    named: HashMap<String, String>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split raw arguments: `name=value` is named, anything else positional
    pub fn parse<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut args = Self::new();
        for item in raw {
            let item = item.as_ref();
            match item.split_once('=') {
                Some((name, value)) if is_name(name) => {
                    args.named.insert(name.to_string(), value.to_string());
                }
                _ => args.positional.push(item.to_string()),
            }
        }
        args
    }

    pub fn push(&mut self, value: impl Into<String>) -> &mut Self {
        self.positional.push(value.into());
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Value for a placeholder key: digits index the positional list
    pub fn get(&self, key: &str) -> Option<&str> {
        match key.parse::<usize>() {
            Ok(index) => self.positional.get(index).map(String::as_str),
            Err(_) => self.named.get(key).map(String::as_str),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

fn is_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Substitute every placeholder that has a value or a default
pub fn fill_placeholders(template: &str, args: &Arguments) -> String {
    PLACEHOLDER_REGEX
        .replace_all(template, |caps: &Captures<'_>| {
            let value = args.get(&caps[1]).or_else(|| caps.get(2).map(|m| m.as_str()));
            match value {
                Some(v) => v.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional() {
        let args = Arguments::parse(["2", "5"]);
        assert_eq!(fill_placeholders("{0}d6+{1}", &args), "2d6+5");
    }

    #[test]
    fn test_named_and_default() {
        let args = Arguments::parse(["bonus=4"]);
        assert_eq!(fill_placeholders("1d20+{bonus}", &args), "1d20+4");
        assert_eq!(fill_placeholders("1d20+{bonus:0}+{adv:1}", &args), "1d20+4+1");
    }

    #[test]
    fn test_unknown_left_alone() {
        let args = Arguments::new();
        assert_eq!(fill_placeholders("1d20+{bonus}", &args), "1d20+{bonus}");
        assert_eq!(fill_placeholders("{0}d6", &args), "{0}d6");
    }

    #[test]
    fn test_builder() {
        let mut args = Arguments::new();
        args.push("3").set("die", "8");
        assert_eq!(fill_placeholders("{0}d{die}", &args), "3d8");
        assert!(!args.is_empty());
    }

    #[test]
    fn test_equals_in_positional() {
        let args = Arguments::parse([">=5"]);
        assert_eq!(args.get("0"), Some(">=5"));
    }
}
