//! Error types for shape registration, loop expansion and data expressions.
//!
//! Gesture interpretation itself never fails loudly: malformed indices are
//! ignored, missing snap targets are `None` and aborted draws travel as
//! [`StepUpdate::Abort`](crate::step::StepUpdate). The errors here cover the
//! places where something is genuinely wrong.

use crate::point::ComponentId;
use thiserror::Error;

/// A shape type that does not satisfy the handler contract.
#[derive(Debug, Error, PartialEq)]
pub enum ContractError {
    #[error("Shape type has an empty display name")]
    EmptyName,
    #[error("Shape type already registered: {0}")]
    Duplicate(String),
    #[error("Shape type {0} exposes no snapping points for its default props")]
    NoSnappingPoints(String),
    #[error("Shape type {kind} cannot resolve its own snapping point '{point}'")]
    UnresolvablePoint { kind: String, point: String },
}

/// Result type for shape registration.
pub type ContractResult<T> = Result<T, ContractError>;

/// Loop expansion errors.
#[derive(Debug, Error, PartialEq)]
pub enum LoopError {
    #[error("Replica {replica} is already mapped from {existing}, cannot map it from {original}")]
    NonInjectiveMap {
        original: ComponentId,
        replica: ComponentId,
        existing: ComponentId,
    },
    #[error("Loop not found: {0}")]
    UnknownLoop(usize),
    #[error("Loop template is empty")]
    EmptyTemplate,
    #[error("Loop needs at least one iteration")]
    NoIterations,
}

/// Result type for loop operations.
pub type LoopResult<T> = Result<T, LoopError>;

/// Data expression evaluation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ExpressionError {
    #[error("Expression is empty")]
    Empty,
    #[error("Expression ends early")]
    UnexpectedEnd,
    #[error("Unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("Expression does not evaluate to a finite number")]
    NotFinite,
    #[error("Parameter not found: {0}")]
    UnknownParameter(usize),
    #[error("Row variable {variable} has no value at row {row}")]
    MissingValue { variable: usize, row: usize },
    #[error("Parameter {0} refers back to itself")]
    CyclicParameter(usize),
}

/// Result type for expression evaluation.
pub type ExpressionResult<T> = Result<T, ExpressionError>;
