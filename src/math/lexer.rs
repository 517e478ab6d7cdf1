use super::error::{MathError, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Token {
    Number(f64),
    Plus,
    Minus,
    Multiply,
    Divide,
    Power,
    LeftParenthesis,
    RightParenthesis,
    Eof,
}

#[derive(Debug)]
pub(crate) struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(&ch) = self.input.get(self.position) else {
            return Ok(Token::Eof);
        };

        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' | '×' => Token::Multiply,
            '/' | '÷' => Token::Divide,
            '^' => Token::Power,
            '(' => Token::LeftParenthesis,
            ')' => Token::RightParenthesis,
            '0'..='9' | '.' => return self.read_number(),
            _ => return Err(MathError::Token(ch, self.position)),
        };

        self.position += 1;
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.input.len() && self.input[self.position].is_whitespace() {
            self.position += 1;
        }
    }

    /// Digits with an optional fraction and exponent
    fn read_number(&mut self) -> Result<Token> {
        let start = self.position;

        while self.position < self.input.len() {
            let ch = self.input[self.position];
            let exponent_sign = matches!(ch, '+' | '-')
                && self.position > start
                && matches!(self.input[self.position - 1], 'e' | 'E');

            if ch.is_ascii_digit() || ch == '.' || ch == 'e' || ch == 'E' || exponent_sign {
                self.position += 1;
            } else {
                break;
            }
        }

        let text: String = self.input[start..self.position].iter().collect();
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| MathError::Number(text))
    }
}
