//! Configured entry point: parse, roll, resolve criticals, format

use rand::Rng;
use serde::Serialize;
use tracing::debug;

use crate::config::EngineConfig;
use crate::dice::{
    format, parse_with_limits, roll_with_cap, CriticalRule, Expression, FormattedRoll, NaturalMax, ParseError,
    RolledExpression, TestOutcome,
};

/// One formula, fully evaluated
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub rolled: RolledExpression,
    pub total: i64,
    pub outcomes: Vec<TestOutcome>,
    pub formatted: FormattedRoll,
}

/// Holds configuration; immutable once built and safe to share between threads
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn parse(&self, formula: &str) -> Result<Expression, ParseError> {
        parse_with_limits(formula, &self.config.limits)
    }

    pub fn roll<R: Rng>(&self, expression: &Expression, rng: &mut R) -> RolledExpression {
        roll_with_cap(expression, self.config.limits.explosion_cap, rng)
    }

    pub fn format(&self, rolled: &RolledExpression) -> FormattedRoll {
        format(rolled, &self.config.format_options())
    }

    /// Evaluate with natural-maximum criticals
    pub fn evaluate<R: Rng>(&self, formula: &str, rng: &mut R) -> Result<Evaluation, ParseError> {
        self.evaluate_with(formula, &NaturalMax, rng)
    }

    /// Evaluate, letting `rule` decide which test parts are critical
    pub fn evaluate_with<C, R>(&self, formula: &str, rule: &C, rng: &mut R) -> Result<Evaluation, ParseError>
    where
        C: CriticalRule + ?Sized,
        R: Rng,
    {
        let expression = self.parse(formula)?;
        let mut rolled = self.roll(&expression, rng);
        let options = self.config.format_options();

        let criticals = rolled.apply_criticals(rule, options.critical_method, self.config.limits.explosion_cap, rng);

        let total = rolled.total();
        let outcomes = rolled.outcomes();
        let formatted = format(&rolled, &options);
        debug!(
            "Evaluated '{}' = {} ({} parts, {} critical)",
            expression.source,
            total,
            rolled.parts.len(),
            criticals
        );

        Ok(Evaluation {
            rolled,
            total,
            outcomes,
            formatted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CriticalMethod, Limits, SecretMethod};
    use crate::dice::{NeverCritical, ParseErrorKind, Routing};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine(config: EngineConfig) -> Engine {
        Engine::new(config)
    }

    #[test]
    fn test_evaluate_fixed() {
        let mut rng = StdRng::seed_from_u64(1);
        let eval = Engine::default().evaluate("4d6(6,5,3,1)dl1", &mut rng).unwrap();
        assert_eq!(eval.total, 14);
        assert!(eval.outcomes.is_empty());
        assert!(eval.formatted.text.starts_with("**14**"));
    }

    #[test]
    fn test_limits_come_from_config() {
        let config = EngineConfig {
            limits: Limits {
                max_dice: 10,
                ..Limits::default()
            },
            ..EngineConfig::default()
        };
        let err = engine(config).parse("11d6").unwrap_err();
        assert_eq!(err.reason, ParseErrorKind::TooManyDice { count: 11, max: 10 });
    }

    #[test]
    fn test_explosion_cap_from_config() {
        let config = EngineConfig {
            limits: Limits {
                explosion_cap: 5,
                ..Limits::default()
            },
            ..EngineConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let eval = engine(config).evaluate("3d1x", &mut rng).unwrap();
        assert_eq!(eval.rolled.parts[0].rolls.len(), 8);
        assert_eq!(eval.total, 8);
    }

    #[test]
    fn test_critical_method_from_config() {
        let config = EngineConfig {
            critical_method: CriticalMethod::AddMax,
            ..EngineConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let eval = engine(config).evaluate("1d20(20)+2 >= 15", &mut rng).unwrap();
        assert_eq!(eval.total, 44);
        assert!(eval.outcomes[0].passed);

        let mut rng = StdRng::seed_from_u64(1);
        let plain = Engine::default()
            .evaluate_with("1d20(20)+2 >= 15", &NeverCritical, &mut rng)
            .unwrap();
        assert_eq!(plain.total, 22);
    }

    #[test]
    fn test_critical_marker_follows_options() {
        let config = EngineConfig {
            critical_method: CriticalMethod::RollTwice,
            ..EngineConfig::default()
        };
        assert_eq!(config.format_options().critical_method, CriticalMethod::RollTwice);

        let mut rng = StdRng::seed_from_u64(1);
        let eval = engine(config).evaluate("1d20(20) >= 10", &mut rng).unwrap();
        assert_eq!(eval.rolled.parts[0].critical, Some(CriticalMethod::RollTwice));
        assert!(eval.formatted.text.contains("(critical, rolled twice)"));
    }

    #[test]
    fn test_secret_routing() {
        let config = EngineConfig {
            secret_method: SecretMethod::GameMasterChannel,
            ..EngineConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let eval = engine(config).evaluate("secret 1d20", &mut rng).unwrap();
        assert!(eval.formatted.has_secret);
        assert_eq!(eval.formatted.routing, Some(Routing::GameMasterChannel));
    }

    #[test]
    fn test_same_seed_same_result() {
        let engine = Engine::default();
        let a = engine.evaluate("8d10x dh2 + 3", &mut StdRng::seed_from_u64(77)).unwrap();
        let b = engine.evaluate("8d10x dh2 + 3", &mut StdRng::seed_from_u64(77)).unwrap();
        assert_eq!(a.total, b.total);
        assert_eq!(a.formatted, b.formatted);
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
