use super::error::{MathError, Result};
use super::lexer::{Lexer, Token};

/// Nested prefixes, groups and `^` operands allowed before giving up
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest = 1,
    Sum = 2,
    Product = 3,
    Prefix = 4,
    Power = 5,
}

impl Precedence {
    fn of_token(token: &Token) -> Self {
        match token {
            Token::Plus | Token::Minus => Precedence::Sum,
            Token::Multiply | Token::Divide => Precedence::Product,
            Token::Power => Precedence::Power,
            _ => Precedence::Lowest,
        }
    }
}

/// A Pratt evaluator over numbers, `+ - * / ^` and parentheses.
///
/// Evaluates while parsing; there is no tree. `^` is right-associative and
/// binds tighter than a prefix sign, so `-2^2` is `-4`.
#[derive(Debug)]
pub(crate) struct Evaluator {
    lexer: Lexer,
    current: Token,
    peek: Token,
    depth: usize,
}

impl Evaluator {
    pub fn new(input: &str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;

        if current == Token::Eof {
            return Err(MathError::Empty);
        }

        let peek = lexer.next_token()?;
        Ok(Self {
            lexer,
            current,
            peek,
            depth: 0,
        })
    }

    /// Evaluate the whole input. Division by zero gives an infinity or NaN,
    /// not an error.
    pub fn evaluate(&mut self) -> Result<f64> {
        let value = self.parse_tokens(Precedence::Lowest)?;
        if self.peek != Token::Eof {
            return Err(MathError::Trailing);
        }
        Ok(value)
    }

    fn next_token(&mut self) -> Result<()> {
        self.current = self.peek;
        self.peek = self.lexer.next_token()?;
        Ok(())
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of_token(&self.peek)
    }

    fn parse_tokens(&mut self, precedence: Precedence) -> Result<f64> {
        if self.depth >= MAX_DEPTH {
            return Err(MathError::TooDeep);
        }
        self.depth += 1;
        let result = self.parse_operators(precedence);
        self.depth -= 1;
        result
    }

    fn parse_operators(&mut self, precedence: Precedence) -> Result<f64> {
        let mut value = self.parse_prefix()?;

        while self.peek != Token::Eof && precedence < self.peek_precedence() {
            self.next_token()?;
            value = self.parse_infix(value)?;
        }

        Ok(value)
    }

    fn parse_prefix(&mut self) -> Result<f64> {
        match self.current {
            Token::Number(v) => Ok(v),

            Token::Minus => {
                self.next_token()?;
                Ok(-self.parse_tokens(Precedence::Prefix)?)
            }

            Token::Plus => {
                self.next_token()?;
                self.parse_tokens(Precedence::Prefix)
            }

            Token::LeftParenthesis => {
                self.next_token()?;
                let value = self.parse_tokens(Precedence::Lowest)?;

                if self.peek != Token::RightParenthesis {
                    return Err(MathError::UnclosedParenthesis);
                }

                self.next_token()?;
                Ok(value)
            }

            other => Err(MathError::UnexpectedPrefix(format!("{other:?}"))),
        }
    }

    fn parse_infix(&mut self, left: f64) -> Result<f64> {
        let operator = self.current;

        let precedence = match operator {
            // Right-associative: the right side may take another `^`
            Token::Power => Precedence::Prefix,
            _ => Precedence::of_token(&operator),
        };

        self.next_token()?;
        let right = self.parse_tokens(precedence)?;

        match operator {
            Token::Plus => Ok(left + right),
            Token::Minus => Ok(left - right),
            Token::Multiply => Ok(left * right),
            Token::Divide => Ok(left / right),
            Token::Power => Ok(left.powf(right)),
            other => Err(MathError::UnexpectedInfix(format!("{other:?}"))),
        }
    }
}

/// Evaluate a pure numeric expression
pub fn evaluate(input: &str) -> Result<f64> {
    Evaluator::new(input)?.evaluate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_precedence() {
        assert_eq!(evaluate("1 + 2 * 3"), Ok(7.0));
        assert_eq!(evaluate("(1 + 2) * 3"), Ok(9.0));
        assert_eq!(evaluate("10 - 4 - 3"), Ok(3.0));
        assert_eq!(evaluate("12 / 4 / 3"), Ok(1.0));
    }

    #[test]
    fn test_power() {
        assert_eq!(evaluate("2^3^2"), Ok(512.0));
        assert_eq!(evaluate("-2^2"), Ok(-4.0));
        assert_eq!(evaluate("2^-1"), Ok(0.5));
        assert_eq!(evaluate("2*3^2"), Ok(18.0));
    }

    #[test]
    fn test_prefix_signs() {
        assert_eq!(evaluate("--3"), Ok(3.0));
        assert_eq!(evaluate("+(1+2)"), Ok(3.0));
        assert_eq!(evaluate("2--3"), Ok(5.0));
    }

    #[test]
    fn test_division_is_not_an_error() {
        assert_eq!(evaluate("1/0"), Ok(f64::INFINITY));
        assert!(evaluate("0/0").unwrap().is_nan());
    }

    #[test]
    fn test_errors() {
        assert_eq!(evaluate("   "), Err(MathError::Empty));
        assert_eq!(evaluate("(2"), Err(MathError::UnclosedParenthesis));
        assert_eq!(evaluate("2)"), Err(MathError::Trailing));
        assert_eq!(evaluate("2 3"), Err(MathError::Trailing));
        assert!(matches!(evaluate("1 +"), Err(MathError::UnexpectedPrefix(_))));
    }

    #[test]
    fn test_nesting_limit() {
        assert_eq!(evaluate(&format!("{}1", "-".repeat(5000))), Err(MathError::TooDeep));
        assert_eq!(evaluate(&format!("{}1{}", "(".repeat(200), ")".repeat(200))), Err(MathError::TooDeep));
        assert_eq!(evaluate(&format!("2{}", "^1".repeat(100))), Err(MathError::TooDeep));

        assert_eq!(evaluate(&format!("{}3", "-".repeat(10))), Ok(3.0));
        assert_eq!(evaluate(&format!("{}1{}", "(".repeat(20), ")".repeat(20))), Ok(1.0));
    }

    proptest! {
        #[test]
        fn test_sums_match_integer_math(a in -1000i64..1000, b in -1000i64..1000, c in 1i64..100) {
            let text = format!("{} + {} * {}", a, b, c);
            prop_assert_eq!(evaluate(&text), Ok((a + b * c) as f64));
        }
    }
}
