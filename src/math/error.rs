#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MathError {
    #[error("Invalid character '{0}' at position {1}")]
    Token(char, usize),

    #[error("Invalid number: {0}")]
    Number(String),

    #[error("Input is empty")]
    Empty,

    #[error("Parenthesis was not closed")]
    UnclosedParenthesis,

    #[error("Unexpected prefix: {0}")]
    UnexpectedPrefix(String),

    #[error("Unexpected infix: {0}")]
    UnexpectedInfix(String),

    #[error("Trailing input after expression")]
    Trailing,

    #[error("Expression did not settle")]
    Runaway,

    #[error("Expression is nested too deeply")]
    TooDeep,
}

pub type Result<T> = std::result::Result<T, MathError>;
