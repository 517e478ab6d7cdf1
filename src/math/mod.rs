//! Math evaluator for modifiers and standalone math rolls
//!
//! `evaluate_math` reduces function calls and parenthesised groups step by
//! step, then hands the remaining numeric text to a Pratt evaluator. There
//! is no dynamic code execution: only numbers, `+ - * / ^`, parentheses and
//! `min`, `max`, `floor`, `ceil`, `round` are understood.
//!
//! Failures never abort the caller. They come back as the sentinels
//! [`NAN_SENTINEL`] and [`ERR_SENTINEL`].

mod error;
mod eval;
mod lexer;
mod reduce;

pub use error::MathError;
pub use eval::evaluate;
pub use reduce::{evaluate_math, format_number, reduce, ERR_SENTINEL, NAN_SENTINEL};
