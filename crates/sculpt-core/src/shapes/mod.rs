//! Shape types and the contract every drawable shape satisfies.

pub mod canvas;
pub mod rectangle;

pub use canvas::CanvasShape;
pub use rectangle::RectangleShape;

use crate::error::{ContractError, ContractResult};
use crate::gesture::GesturePayload;
use crate::point::{NamedPoint, PointRef, PointSpec};
use crate::props::{PropertyType, Props};
use crate::step::{DrawStep, MoveStep, RotateStep, ScaleStep, Step, StepUpdate};
use kurbo::Point;
use std::fmt;
use std::sync::Arc;

/// Shared handle to a shape type.
pub type ShapeType = Arc<dyn ShapeKind>;

/// Looks up the current position of a snapped point.
pub trait PointResolver {
    fn resolve(&self, point: &PointRef) -> Option<Point>;
}

/// Current position of a step point: the live position of its snap point
/// when it has one, the recorded coordinate otherwise.
pub fn resolve_spec(resolver: &dyn PointResolver, spec: &PointSpec) -> Point {
    spec.reference
        .as_ref()
        .and_then(|r| resolver.resolve(r))
        .unwrap_or(spec.position)
}

/// One segment of a human readable step description.
#[derive(Debug, Clone, PartialEq)]
pub enum StepSlot {
    Text(String),
    /// A component name.
    Name(String),
    Point(PointSpec),
    Number(f64),
}

impl StepSlot {
    pub fn text(s: impl Into<String>) -> Self {
        StepSlot::Text(s.into())
    }
}

/// Behaviour a drawable shape type provides to the step interpreter.
///
/// The `evaluate_*` handlers are pure: they map a step and the component's
/// current props to a partial props update, or `None` when the step does not
/// apply. The `on_*` builders turn gesture payloads into step fields.
pub trait ShapeKind: Send + Sync {
    /// Display name, also the prefix for default component names.
    fn name(&self) -> &str;

    fn default_props(&self) -> Props;

    /// Named points other gestures can lock onto. Pure function of props.
    fn snapping_points(&self, props: &Props) -> Vec<NamedPoint>;

    fn snapping_point(&self, props: &Props, name: &str) -> Option<NamedPoint> {
        self.snapping_points(props).into_iter().find(|p| p.name == name)
    }

    /// Type of an editable property, `Opaque` for anything else.
    fn property_definition(&self, _name: &str) -> PropertyType {
        PropertyType::Opaque
    }

    /// Props shown in the property panel.
    fn editable_props(&self) -> &[&str] {
        &[]
    }

    /// The shape's own snap point nearest to `position`.
    fn closest_control_point(&self, props: &Props, position: Point) -> Option<NamedPoint> {
        self.snapping_points(props).into_iter().min_by(|a, b| {
            a.position
                .distance(position)
                .total_cmp(&b.position.distance(position))
        })
    }

    fn evaluate_draw(&self, ctx: &dyn PointResolver, props: &Props, step: &DrawStep) -> Option<Props>;
    fn evaluate_move(&self, ctx: &dyn PointResolver, props: &Props, step: &MoveStep) -> Option<Props>;
    fn evaluate_scale(&self, ctx: &dyn PointResolver, props: &Props, step: &ScaleStep) -> Option<Props>;
    fn evaluate_rotate(&self, ctx: &dyn PointResolver, props: &Props, step: &RotateStep) -> Option<Props>;

    fn on_draw_start(&self, step: DrawStep, _payload: &GesturePayload) -> DrawStep {
        step
    }

    fn on_draw(&self, step: DrawStep, _payload: &GesturePayload) -> DrawStep {
        step
    }

    /// May return [`StepUpdate::Abort`] when no shape was formed.
    fn on_draw_end(&self, step: DrawStep, _payload: &GesturePayload) -> StepUpdate {
        StepUpdate::Step(Step::Draw(step))
    }

    fn on_move_start(&self, _props: &Props, step: MoveStep, _payload: &GesturePayload) -> MoveStep {
        step
    }

    fn on_move(&self, step: MoveStep, _payload: &GesturePayload) -> MoveStep {
        step
    }

    fn on_move_end(&self, step: MoveStep, _payload: &GesturePayload) -> MoveStep {
        step
    }

    fn on_scale_start(&self, _props: &Props, step: ScaleStep, _payload: &GesturePayload) -> ScaleStep {
        step
    }

    fn on_scale(&self, step: ScaleStep, _payload: &GesturePayload) -> ScaleStep {
        step
    }

    fn on_scale_end(&self, step: ScaleStep, _payload: &GesturePayload) -> ScaleStep {
        step
    }

    fn on_rotate_start(&self, _props: &Props, step: RotateStep, _payload: &GesturePayload) -> RotateStep {
        step
    }

    fn on_rotate(&self, step: RotateStep, _payload: &GesturePayload) -> RotateStep {
        step
    }

    fn on_rotate_end(&self, step: RotateStep, _payload: &GesturePayload) -> RotateStep {
        step
    }

    fn draw_step_slots(&self, _name: &str, _step: &DrawStep) -> Vec<StepSlot> {
        Vec::new()
    }

    fn move_step_slots(&self, _name: &str, _step: &MoveStep) -> Vec<StepSlot> {
        Vec::new()
    }

    fn scale_step_slots(&self, _name: &str, _step: &ScaleStep) -> Vec<StepSlot> {
        Vec::new()
    }

    fn rotate_step_slots(&self, _name: &str, _step: &RotateStep) -> Vec<StepSlot> {
        Vec::new()
    }
}

impl dyn ShapeKind {
    /// Dispatch a step to the matching evaluation handler.
    pub fn evaluate(&self, ctx: &dyn PointResolver, props: &Props, step: &Step) -> Option<Props> {
        match step {
            Step::Draw(s) => self.evaluate_draw(ctx, props, s),
            Step::Move(s) => self.evaluate_move(ctx, props, s),
            Step::Scale(s) => self.evaluate_scale(ctx, props, s),
            Step::Rotate(s) => self.evaluate_rotate(ctx, props, s),
        }
    }

    /// Dispatch a step to the matching slot builder.
    pub fn step_slots(&self, name: &str, step: &Step) -> Vec<StepSlot> {
        match step {
            Step::Draw(s) => self.draw_step_slots(name, s),
            Step::Move(s) => self.move_step_slots(name, s),
            Step::Scale(s) => self.scale_step_slots(name, s),
            Step::Rotate(s) => self.rotate_step_slots(name, s),
        }
    }
}

impl fmt::Debug for dyn ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShapeKind({})", self.name())
    }
}

/// Registered shape types, validated on registration.
#[derive(Debug, Default, Clone)]
pub struct ShapeCatalog {
    kinds: Vec<ShapeType>,
}

impl ShapeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in drawable shapes.
    pub fn with_builtins() -> ContractResult<Self> {
        let mut catalog = Self::new();
        catalog.register(Arc::new(RectangleShape))?;
        Ok(catalog)
    }

    /// Validate and register a shape type. Nothing is registered on error.
    pub fn register(&mut self, kind: ShapeType) -> ContractResult<()> {
        let name = kind.name().to_string();
        if name.trim().is_empty() {
            return Err(ContractError::EmptyName);
        }
        if self.get(&name).is_some() {
            return Err(ContractError::Duplicate(name));
        }
        let defaults = kind.default_props();
        let points = kind.snapping_points(&defaults);
        if points.is_empty() {
            return Err(ContractError::NoSnappingPoints(name));
        }
        for point in &points {
            if kind.snapping_point(&defaults, &point.name).as_ref() != Some(point) {
                return Err(ContractError::UnresolvablePoint {
                    kind: name,
                    point: point.name.clone(),
                });
            }
        }
        log::debug!("Registered shape type {}", name);
        self.kinds.push(kind);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ShapeType> {
        self.kinds.iter().find(|k| k.name() == name).cloned()
    }

    pub fn kinds(&self) -> &[ShapeType] {
        &self.kinds
    }
}
