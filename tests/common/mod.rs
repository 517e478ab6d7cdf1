//! Common test utilities - DiceTest harness for end-to-end evaluation

#![allow(dead_code)]

use dicebot::dice::{parse, RolledExpression};
use dicebot::{evaluate_message, Engine, EngineConfig, Evaluation, MessageResult};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// An engine plus a seeded random source, so every run is reproducible
pub struct DiceTest {
    pub engine: Engine,
    pub rng: StdRng,
}

impl DiceTest {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            engine: Engine::new(config),
            rng: StdRng::seed_from_u64(0x5eed),
        }
    }

    /// Evaluate a formula that is expected to parse
    pub fn eval(&mut self, formula: &str) -> Evaluation {
        self.engine
            .evaluate(formula, &mut self.rng)
            .unwrap_or_else(|e| panic!("'{}' failed to parse: {}", formula, e))
    }

    pub fn message(&mut self, text: &str) -> MessageResult {
        evaluate_message(&self.engine, text, &mut self.rng)
    }

    /// Parse and roll without criticals or formatting
    pub fn roll(&mut self, formula: &str) -> RolledExpression {
        let expression = parse(formula).unwrap_or_else(|e| panic!("'{}' failed to parse: {}", formula, e));
        self.engine.roll(&expression, &mut self.rng)
    }
}
