//! dicebot - dice expression engine for tabletop chat
//!
//! Parses dice formulas such as `4d6dl1+3` or `[[2d8x! >= 10]]`, rolls them
//! with an injected random source, and renders annotated chat text.

pub mod config;
pub mod dice;
pub mod engine;
pub mod math;
pub mod message;
pub mod placeholder;

pub use config::{ConfigError, CriticalMethod, EngineConfig, Limits, SecretMethod};
pub use engine::{Engine, Evaluation};
pub use math::evaluate_math;
pub use message::{evaluate_message, MessageResult};
pub use placeholder::{fill_placeholders, Arguments};
