//! Arithmetic expressions over parameters and row variables.
//!
//! An expression is a flat token list as the step list edits it, e.g.
//! `( width + 2 ) * margin`. It is parsed on every evaluation with the usual
//! precedence: unary minus, then `*` `/`, then `+` `-`.

use crate::error::{ExpressionError, ExpressionResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            Operator::Add => lhs + rhs,
            Operator::Sub => lhs - rhs,
            Operator::Mul => lhs * rhs,
            Operator::Div => lhs / rhs,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Token {
    Number(f64),
    /// Index into the drawing's parameters.
    Parameter(usize),
    /// Column index into the bound dataset.
    RowVariable(usize),
    Operator(Operator),
    Open,
    Close,
}

/// A value the evaluator cannot produce on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Parameter(usize),
    RowVariable(usize),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(Vec<Token>);

impl Expression {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }

    pub fn number(value: f64) -> Self {
        Self(vec![Token::Number(value)])
    }

    pub fn tokens(&self) -> &[Token] {
        &self.0
    }

    /// The value of a single-number expression.
    pub fn as_number(&self) -> Option<f64> {
        match self.0.as_slice() {
            [Token::Number(n)] => Some(*n),
            _ => None,
        }
    }

    /// Evaluate, asking `operand` for parameter and row variable values.
    pub fn evaluate<F>(&self, operand: F) -> ExpressionResult<f64>
    where
        F: FnMut(Operand) -> ExpressionResult<f64>,
    {
        if self.0.is_empty() {
            return Err(ExpressionError::Empty);
        }
        let mut parser = Parser {
            tokens: &self.0,
            pos: 0,
            operand,
        };
        let value = parser.sum()?;
        if parser.pos < self.0.len() {
            return Err(ExpressionError::UnexpectedToken(parser.pos));
        }
        if !value.is_finite() {
            return Err(ExpressionError::NotFinite);
        }
        Ok(value)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Self::number(value)
    }
}

impl From<Vec<Token>> for Expression {
    fn from(tokens: Vec<Token>) -> Self {
        Self(tokens)
    }
}

struct Parser<'a, F> {
    tokens: &'a [Token],
    pos: usize,
    operand: F,
}

impl<F> Parser<'_, F>
where
    F: FnMut(Operand) -> ExpressionResult<f64>,
{
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn sum(&mut self) -> ExpressionResult<f64> {
        let mut value = self.product()?;
        while let Some(Token::Operator(op @ (Operator::Add | Operator::Sub))) = self.peek() {
            self.pos += 1;
            let rhs = self.product()?;
            value = op.apply(value, rhs);
        }
        Ok(value)
    }

    fn product(&mut self) -> ExpressionResult<f64> {
        let mut value = self.factor()?;
        while let Some(Token::Operator(op @ (Operator::Mul | Operator::Div))) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = op.apply(value, rhs);
        }
        Ok(value)
    }

    fn factor(&mut self) -> ExpressionResult<f64> {
        let position = self.pos;
        let token = self.peek().ok_or(ExpressionError::UnexpectedEnd)?;
        self.pos += 1;
        match token {
            Token::Number(n) => Ok(n),
            Token::Parameter(index) => (self.operand)(Operand::Parameter(index)),
            Token::RowVariable(index) => (self.operand)(Operand::RowVariable(index)),
            Token::Operator(Operator::Sub) => Ok(-self.factor()?),
            Token::Open => {
                let value = self.sum()?;
                match self.peek() {
                    Some(Token::Close) => {
                        self.pos += 1;
                        Ok(value)
                    }
                    Some(_) => Err(ExpressionError::UnexpectedToken(self.pos)),
                    None => Err(ExpressionError::UnexpectedEnd),
                }
            }
            Token::Operator(_) | Token::Close => Err(ExpressionError::UnexpectedToken(position)),
        }
    }
}
