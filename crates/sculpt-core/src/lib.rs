//! Sculpt Core Library
//!
//! Platform-agnostic step recording, replay and snapping for the sculpt
//! procedural drawing editor. Every shape on the canvas is the result of
//! replaying a log of DRAW, MOVE, SCALE and ROTATE steps; loops repeat a
//! range of steps once per row of a bound dataset.

pub mod components;
pub mod config;
pub mod data;
pub mod drawing;
pub mod error;
pub mod expression;
pub mod gesture;
pub mod interpreter;
pub mod looping;
pub mod operation;
pub mod point;
pub mod props;
pub mod quadtree;
pub mod sequence;
pub mod shapes;
pub mod snapping;
pub mod step;

pub use components::{ComponentInfo, ComponentRegistry, ROOT_NAME};
pub use config::{DEFAULT_SNAP_THRESHOLD, DEFAULT_SPLIT_LIMIT, EditorConfig, MAX_TREE_DEPTH};
pub use data::{Bindings, DataSet, Parameter, Parameters, RowVariable};
pub use drawing::Drawing;
pub use error::{ContractError, ContractResult, ExpressionError, ExpressionResult, LoopError, LoopResult};
pub use expression::{Expression, Operand, Operator, Token};
pub use gesture::{Debounce, GestureEvent, GestureKind, GesturePayload, GesturePhase, Throttle};
pub use interpreter::{Interpreter, RunMode, Scene};
pub use looping::{ComponentMap, LoopStep};
pub use operation::{Operation, OperationChange, OperationSelector};
pub use point::{ComponentId, NamedPoint, PointRef, PointSpec};
pub use props::{Binding, PropValue, PropertyType, Props, SerializableColor};
pub use quadtree::{SnapCandidate, SpatialPointIndex};
pub use sequence::{StepSequence, UpdateEffect};
pub use shapes::{CanvasShape, RectangleShape, ShapeCatalog, ShapeKind, ShapeType, StepSlot};
pub use snapping::{SnapEvent, SnappingRegistry};
pub use step::{DrawStep, IdMap, MoveStep, RotateStep, ScaleStep, Step, StepCommon, StepInfo, StepKind, StepUpdate};
