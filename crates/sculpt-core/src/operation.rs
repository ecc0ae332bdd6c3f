//! Operation selector.

use crate::shapes::ShapeType;
use std::sync::Arc;

/// What a canvas gesture does.
#[derive(Debug, Clone)]
pub enum Operation {
    /// Draw a new component of the given shape type.
    Draw(ShapeType),
    Move,
    Scale,
    Rotate,
    /// Toggle the guide flag on the selected components.
    Guide,
    /// Turn the selected steps into a loop.
    Loop,
}

impl PartialEq for Operation {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Operation::Draw(a), Operation::Draw(b)) => Arc::ptr_eq(a, b) || a.name() == b.name(),
            (Operation::Move, Operation::Move)
            | (Operation::Scale, Operation::Scale)
            | (Operation::Rotate, Operation::Rotate)
            | (Operation::Guide, Operation::Guide)
            | (Operation::Loop, Operation::Loop) => true,
            _ => false,
        }
    }
}

impl Operation {
    /// Instant operations run once and never stay selected.
    pub fn is_instant(&self) -> bool {
        matches!(self, Operation::Guide | Operation::Loop)
    }

    /// Operations that act on an existing, selected component.
    pub fn is_transform(&self) -> bool {
        matches!(self, Operation::Move | Operation::Scale | Operation::Rotate)
    }
}

/// Result of a toggle.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationChange {
    Selected(Operation),
    Cleared,
    /// An instant operation to run now.
    Command(Operation),
}

/// The current operation of one drawing.
#[derive(Debug, Clone, Default)]
pub struct OperationSelector {
    current: Option<Operation>,
}

impl OperationSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Operation> {
        self.current.as_ref()
    }

    /// Select `operation`, or clear it if it is already selected.
    pub fn toggle(&mut self, operation: Operation) -> OperationChange {
        if operation.is_instant() {
            return OperationChange::Command(operation);
        }
        if self.current.as_ref() == Some(&operation) {
            self.current = None;
            return OperationChange::Cleared;
        }
        self.current = Some(operation.clone());
        OperationChange::Selected(operation)
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}
