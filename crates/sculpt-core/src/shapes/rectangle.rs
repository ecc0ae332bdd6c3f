//! Rectangle shape type.

use super::{PointResolver, ShapeKind, StepSlot, resolve_spec};
use crate::gesture::GesturePayload;
use crate::point::{NamedPoint, PointRef, PointSpec};
use crate::props::{PropertyType, Props, SerializableColor};
use crate::step::{DrawStep, MoveStep, RotateStep, ScaleStep, Step, StepUpdate};
use kurbo::{Point, Vec2};

/// Names of the nine rectangle snap points, in the order they are reported.
pub const RECT_POINT_NAMES: [&str; 9] = [
    "top left",
    "top mid",
    "top right",
    "mid left",
    "center",
    "mid right",
    "bottom left",
    "bottom mid",
    "bottom right",
];

const EDITABLE_PROPS: [&str; 5] = ["fill", "stroke", "fillOpacity", "strokeOpacity", "strokeWidth"];

/// The nine snap points of an axis-aligned box.
pub(crate) fn box_points(x: f64, y: f64, width: f64, height: f64) -> Vec<NamedPoint> {
    let xs = [x, x + width / 2.0, x + width];
    let ys = [y, y + height / 2.0, y + height];
    RECT_POINT_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| NamedPoint::new(*name, xs[i % 3], ys[i / 3]))
        .collect()
}

/// Name of the point across the box: left/right and top/bottom swap,
/// `mid` and `center` stay.
pub fn opposite_point(name: &str) -> String {
    name.split(' ')
        .map(|part| match part {
            "left" => "right",
            "right" => "left",
            "top" => "bottom",
            "bottom" => "top",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Axis-aligned rectangle described by `x`, `y`, `width`, `height` props.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleShape;

impl RectangleShape {
    /// The gesture's own control point: the payload's point when it belongs
    /// to the component, otherwise the nearest one.
    fn own_control_point(
        &self,
        props: &Props,
        common: &crate::step::StepCommon,
        payload: &GesturePayload,
    ) -> Option<PointSpec> {
        let component = common.component?;
        let point = payload
            .point
            .as_ref()
            .filter(|p| p.component == component)
            .and_then(|p| self.snapping_point(props, &p.name))
            .or_else(|| self.closest_control_point(props, payload.position))?;
        Some(PointSpec::snapped(PointRef::new(component, point.name), point.position))
    }

    /// The point opposite `source` on the same component.
    fn pivot_for(&self, props: &Props, source: &PointSpec) -> Option<PointSpec> {
        let reference = source.reference.as_ref()?;
        let other = self.snapping_point(props, &opposite_point(&reference.name))?;
        Some(PointSpec::snapped(
            PointRef::new(reference.component, other.name),
            other.position,
        ))
    }
}

impl ShapeKind for RectangleShape {
    fn name(&self) -> &str {
        "Rectangle"
    }

    fn default_props(&self) -> Props {
        Props::new()
            .with("x", 0.0)
            .with("y", 0.0)
            .with("width", 0.0)
            .with("height", 0.0)
            .with("rotation", 0.0)
            .with("fill", SerializableColor::new(236, 236, 236, 204))
            .with("stroke", SerializableColor::new(204, 204, 204, 255))
            .with("fillOpacity", 1.0)
            .with("strokeOpacity", 1.0)
            .with("strokeWidth", 1.0)
    }

    fn snapping_points(&self, props: &Props) -> Vec<NamedPoint> {
        box_points(
            props.number_or_zero("x"),
            props.number_or_zero("y"),
            props.number_or_zero("width"),
            props.number_or_zero("height"),
        )
    }

    fn property_definition(&self, name: &str) -> PropertyType {
        match name {
            "strokeOpacity" | "fillOpacity" | "strokeWidth" => PropertyType::Number,
            "fill" | "stroke" => PropertyType::Color,
            _ => PropertyType::Opaque,
        }
    }

    fn editable_props(&self) -> &[&str] {
        &EDITABLE_PROPS
    }

    fn evaluate_draw(&self, ctx: &dyn PointResolver, _props: &Props, step: &DrawStep) -> Option<Props> {
        let source = resolve_spec(ctx, step.common.source.as_ref()?);
        let target = match (step.delta, step.common.target.as_ref()) {
            (None, _) => source,
            (Some(_), Some(target)) if target.is_snapped() => resolve_spec(ctx, target),
            (Some(delta), _) => source + delta,
        };
        // Corner-normalized: whichever way the drag went, x/y is the top left.
        Some(
            Props::new()
                .with("x", source.x.min(target.x))
                .with("y", source.y.min(target.y))
                .with("width", (target.x - source.x).abs())
                .with("height", (target.y - source.y).abs()),
        )
    }

    fn evaluate_move(&self, ctx: &dyn PointResolver, props: &Props, step: &MoveStep) -> Option<Props> {
        let name = step.common.source.as_ref()?.point_name()?;
        self.snapping_point(props, name)?;

        let target = match step.common.target.as_ref() {
            Some(target) if target.is_snapped() => {
                ctx.resolve(target.reference.as_ref()?)?
            }
            _ => {
                let initial = step.common.initial_props.as_ref()?;
                self.snapping_point(initial, name)?.position + step.delta
            }
        };

        let width = props.number_or_zero("width");
        let height = props.number_or_zero("height");
        let (x, y) = match name {
            "top left" => (target.x, target.y),
            "top mid" => (target.x - width / 2.0, target.y),
            "top right" => (target.x - width, target.y),
            "mid left" => (target.x, target.y - height / 2.0),
            "center" => (target.x - width / 2.0, target.y - height / 2.0),
            "mid right" => (target.x - width, target.y - height / 2.0),
            "bottom left" => (target.x, target.y - height),
            "bottom mid" => (target.x - width / 2.0, target.y - height),
            "bottom right" => (target.x - width, target.y - height),
            _ => return None,
        };
        Some(Props::new().with("x", x).with("y", y))
    }

    fn evaluate_scale(&self, _ctx: &dyn PointResolver, _props: &Props, step: &ScaleStep) -> Option<Props> {
        let name = step.common.source.as_ref()?.point_name()?;
        let initial = step.common.initial_props.as_ref()?;
        let sx = step.scale_x.unwrap_or(1.0);
        let sy = step.scale_y.unwrap_or(1.0);
        let x = initial.number_or_zero("x");
        let y = initial.number_or_zero("y");
        let width = initial.number_or_zero("width");
        let height = initial.number_or_zero("height");

        // The opposite point stays fixed.
        let shifted_x = x + (1.0 - sx) * width;
        let shifted_y = y + (1.0 - sy) * height;
        let props = Props::new();
        let props = match name {
            "bottom right" => props.with("width", width * sx).with("height", height * sy),
            "mid right" => props.with("width", width * sx),
            "bottom mid" => props.with("height", height * sy),
            "top right" => props
                .with("y", shifted_y)
                .with("width", width * sx)
                .with("height", height * sy),
            "top mid" => props.with("y", shifted_y).with("height", height * sy),
            "top left" => props
                .with("x", shifted_x)
                .with("y", shifted_y)
                .with("width", width * sx)
                .with("height", height * sy),
            "mid left" => props.with("x", shifted_x).with("width", width * sx),
            "bottom left" => props
                .with("x", shifted_x)
                .with("width", width * sx)
                .with("height", height * sy),
            _ => return None,
        };
        Some(props)
    }

    fn evaluate_rotate(&self, _ctx: &dyn PointResolver, props: &Props, step: &RotateStep) -> Option<Props> {
        let pivot_name = step.common.target.as_ref()?.point_name()?;
        let pivot = self.snapping_point(props, pivot_name)?;
        Some(
            Props::new()
                .with("rotation", step.angle.to_degrees())
                .with("rotateX", pivot.position.x)
                .with("rotateY", pivot.position.y),
        )
    }

    fn on_draw_start(&self, mut step: DrawStep, payload: &GesturePayload) -> DrawStep {
        step.common.source = Some(PointSpec {
            reference: payload.point.clone(),
            position: payload.position,
        });
        step.delta = None;
        step
    }

    fn on_draw(&self, mut step: DrawStep, payload: &GesturePayload) -> DrawStep {
        let Some(source) = step.common.source.as_ref() else {
            return step;
        };
        step.common.target = Some(PointSpec {
            reference: payload.point.clone(),
            position: source.position + payload.delta,
        });
        step.delta = Some(payload.delta);
        step
    }

    fn on_draw_end(&self, mut step: DrawStep, payload: &GesturePayload) -> StepUpdate {
        let Some(source) = step.common.source.as_ref() else {
            return StepUpdate::Abort;
        };
        let delta = payload.position - source.position;
        // No drag at all, or released where it started: nothing was drawn.
        if step.delta.is_none() || delta == Vec2::ZERO {
            return StepUpdate::Abort;
        }
        step.delta = Some(delta);
        step.common.target = Some(PointSpec {
            reference: payload.point.clone(),
            position: payload.position,
        });
        StepUpdate::Step(Step::Draw(step))
    }

    fn on_move_start(&self, props: &Props, mut step: MoveStep, payload: &GesturePayload) -> MoveStep {
        step.delta = Vec2::ZERO;
        step.common.source = self.own_control_point(props, &step.common, payload);
        step.common.target = None;
        step
    }

    fn on_move(&self, mut step: MoveStep, payload: &GesturePayload) -> MoveStep {
        let Some(source) = step.common.source.as_ref().filter(|s| s.is_snapped()) else {
            return step;
        };
        step.common.target = Some(PointSpec::literal(source.position + payload.delta));
        step.delta = payload.delta;
        step
    }

    fn on_move_end(&self, mut step: MoveStep, payload: &GesturePayload) -> MoveStep {
        let Some(source) = step.common.source.as_ref() else {
            return step;
        };
        step.common.target = Some(match &payload.point {
            Some(point) => PointSpec::snapped(point.clone(), payload.position),
            None => PointSpec::literal(source.position + step.delta),
        });
        step
    }

    fn on_scale_start(&self, props: &Props, mut step: ScaleStep, payload: &GesturePayload) -> ScaleStep {
        step.scale_x = None;
        step.scale_y = None;
        step.common.source = self.own_control_point(props, &step.common, payload);
        step.common.target = step
            .common
            .source
            .as_ref()
            .and_then(|source| self.pivot_for(props, source));
        step
    }

    fn on_scale(&self, mut step: ScaleStep, payload: &GesturePayload) -> ScaleStep {
        let (Some(source), Some(target), Some(initial)) = (
            step.common.source.as_ref(),
            step.common.target.as_ref(),
            step.common.initial_props.as_ref(),
        ) else {
            return step;
        };
        let Some(name) = source.point_name().filter(|_| target.is_snapped()) else {
            return step;
        };
        let original_width = initial.number_or_zero("width").abs();
        let original_height = initial.number_or_zero("height").abs();
        let (s, t, d) = (source.position, target.position, payload.delta);

        let (width, height) = match name {
            "top left" => (Some(original_width - d.x), Some(original_height - d.y)),
            "top mid" => (None, Some(t.y - s.y - d.y)),
            "top right" => (Some(s.x + d.x - t.x), Some(t.y - d.y - s.y)),
            "mid right" => (Some(s.x + d.x - t.x), None),
            "bottom right" => (Some(s.x + d.x - t.x), Some(s.y + d.y - t.y)),
            "bottom mid" => (None, Some(s.y + d.y - t.y)),
            "bottom left" => (Some(original_width - d.x), Some(original_height + d.y)),
            "mid left" => (Some(t.x - s.x - d.x), None),
            _ => (None, None),
        };
        let ratio = |new: Option<f64>, original: f64| {
            new.filter(|_| original > 0.0)
                .map(|n| n.max(0.0) / original)
        };
        step.scale_x = ratio(width, original_width);
        step.scale_y = ratio(height, original_height);
        step
    }

    fn on_rotate_start(&self, props: &Props, mut step: RotateStep, payload: &GesturePayload) -> RotateStep {
        step.angle = 0.0;
        step.common.source = self.own_control_point(props, &step.common, payload);
        step.common.target = step
            .common
            .source
            .as_ref()
            .and_then(|source| self.pivot_for(props, source));
        step
    }

    fn on_rotate(&self, mut step: RotateStep, payload: &GesturePayload) -> RotateStep {
        let (Some(source), Some(target)) = (step.common.source.as_ref(), step.common.target.as_ref()) else {
            return step;
        };
        if !target.is_snapped() {
            return step;
        }
        step.angle = rotation_angle(source.position, target.position, source.position + payload.delta);
        step
    }

    fn draw_step_slots(&self, name: &str, step: &DrawStep) -> Vec<StepSlot> {
        let mut slots = vec![StepSlot::text("Draw"), StepSlot::Name(name.to_string()), StepSlot::text("from")];
        let Some(source) = step.common.source.clone() else {
            return slots;
        };
        let source_position = source.position;
        slots.push(StepSlot::Point(source));
        match step.common.target.as_ref() {
            Some(target) if !target.is_snapped() => {
                slots.push(StepSlot::Number(target.position.x - source_position.x));
                slots.push(StepSlot::text("px horizontally"));
                slots.push(StepSlot::Number(target.position.y - source_position.y));
                slots.push(StepSlot::text("px vertically"));
            }
            target => {
                slots.push(StepSlot::text("to"));
                if let Some(target) = target {
                    slots.push(StepSlot::Point(target.clone()));
                }
            }
        }
        slots
    }

    fn move_step_slots(&self, _name: &str, step: &MoveStep) -> Vec<StepSlot> {
        let mut slots = vec![StepSlot::text("Move")];
        let Some(source) = step.common.source.clone() else {
            return slots;
        };
        let source_position = source.position;
        slots.push(StepSlot::Point(source));
        match step.common.target.as_ref() {
            Some(target) if !target.is_snapped() => {
                slots.push(StepSlot::Number(target.position.x - source_position.x));
                slots.push(StepSlot::text("px horizontally"));
                slots.push(StepSlot::Number(target.position.y - source_position.y));
                slots.push(StepSlot::text("px vertically"));
            }
            target => {
                slots.push(StepSlot::text("such that it meets"));
                if let Some(target) = target {
                    slots.push(StepSlot::Point(target.clone()));
                }
            }
        }
        slots
    }

    fn scale_step_slots(&self, name: &str, step: &ScaleStep) -> Vec<StepSlot> {
        let mut slots = vec![StepSlot::text("Scale"), StepSlot::Name(name.to_string())];
        if let Some(target) = step.common.target.as_ref().filter(|t| t.is_snapped()) {
            slots.push(StepSlot::text("about"));
            slots.push(StepSlot::Point(target.clone()));
            slots.push(StepSlot::text("by"));
        }
        if let Some(sx) = step.scale_x {
            slots.push(StepSlot::Number(sx));
        }
        if let Some(sy) = step.scale_y {
            if step.scale_x.is_some() {
                slots.push(StepSlot::text(","));
            }
            slots.push(StepSlot::Number(sy));
        }
        slots
    }

    fn rotate_step_slots(&self, name: &str, step: &RotateStep) -> Vec<StepSlot> {
        let mut slots = vec![StepSlot::text("Rotate"), StepSlot::Name(name.to_string()), StepSlot::text("about")];
        if let Some(target) = step.common.target.clone() {
            slots.push(StepSlot::Point(target));
        }
        slots.push(StepSlot::text("by"));
        slots.push(StepSlot::Number(step.angle.to_degrees()));
        slots.push(StepSlot::text("degrees"));
        slots
    }
}

/// Angle swept by dragging `source` to `cursor` around `pivot`, in
/// (-π, π]. Positive is clockwise on screen (y grows downwards).
pub fn rotation_angle(source: Point, pivot: Point, cursor: Point) -> f64 {
    let from = source - pivot;
    let to = cursor - pivot;
    if from.hypot2() == 0.0 || to.hypot2() == 0.0 {
        return 0.0;
    }
    from.cross(to).atan2(from.dot(to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::ComponentId;
    use crate::step::{StepCommon, StepInfo};
    use std::collections::HashMap;
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::sync::Arc;

    struct Points(HashMap<PointRef, Point>);

    impl PointResolver for Points {
        fn resolve(&self, point: &PointRef) -> Option<Point> {
            self.0.get(point).copied()
        }
    }

    fn no_points() -> Points {
        Points(HashMap::new())
    }

    fn common(component: Option<ComponentId>) -> StepCommon {
        let mut common = StepCommon::new(StepInfo::new(Arc::new(RectangleShape)));
        common.component = component;
        common
    }

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Props {
        RectangleShape
            .default_props()
            .with("x", x)
            .with("y", y)
            .with("width", w)
            .with("height", h)
    }

    fn payload(x: f64, y: f64, dx: f64, dy: f64) -> GesturePayload {
        GesturePayload::new(Point::new(x, y), Vec2::new(dx, dy))
    }

    fn approx(props: &Props, key: &str, expected: f64) {
        let value = props.number(key).unwrap_or(f64::NAN);
        assert!((value - expected).abs() < 1e-9, "{} = {}, expected {}", key, value, expected);
    }

    #[test]
    fn test_snapping_points_order_and_positions() {
        let points = RectangleShape.snapping_points(&rect(10.0, 20.0, 100.0, 50.0));
        let names: Vec<&str> = points.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, RECT_POINT_NAMES.to_vec());
        assert_eq!(points[4].position, Point::new(60.0, 45.0));
        assert_eq!(points[8].position, Point::new(110.0, 70.0));
    }

    #[test]
    fn test_opposite_point() {
        assert_eq!(opposite_point("top left"), "bottom right");
        assert_eq!(opposite_point("mid right"), "mid left");
        assert_eq!(opposite_point("center"), "center");
    }

    #[test]
    fn test_draw_normalizes_corners() {
        let shape = RectangleShape;
        let step = shape.on_draw_start(
            DrawStep { common: common(None), delta: None },
            &payload(100.0, 100.0, 0.0, 0.0),
        );
        for (dx, dy, x, y) in [
            (50.0, 30.0, 100.0, 100.0),
            (-50.0, 30.0, 50.0, 100.0),
            (-50.0, -30.0, 50.0, 70.0),
            (50.0, -30.0, 100.0, 70.0),
        ] {
            let moved = shape.on_draw(step.clone(), &payload(0.0, 0.0, dx, dy));
            let props = shape.evaluate_draw(&no_points(), &Props::new(), &moved).unwrap();
            approx(&props, "x", x);
            approx(&props, "y", y);
            approx(&props, "width", 50.0);
            approx(&props, "height", 30.0);
        }
    }

    #[test]
    fn test_draw_without_delta_is_empty() {
        let shape = RectangleShape;
        let step = shape.on_draw_start(
            DrawStep { common: common(None), delta: None },
            &payload(5.0, 6.0, 0.0, 0.0),
        );
        let props = shape.evaluate_draw(&no_points(), &Props::new(), &step).unwrap();
        approx(&props, "x", 5.0);
        approx(&props, "width", 0.0);
        approx(&props, "height", 0.0);
    }

    #[test]
    fn test_draw_end_aborts_without_displacement() {
        let shape = RectangleShape;
        let step = shape.on_draw_start(
            DrawStep { common: common(None), delta: None },
            &payload(5.0, 6.0, 0.0, 0.0),
        );
        assert!(shape.on_draw_end(step.clone(), &payload(5.0, 6.0, 0.0, 0.0)).is_abort());

        let moved = shape.on_draw(step, &payload(0.0, 0.0, 3.0, 3.0));
        assert!(shape.on_draw_end(moved.clone(), &payload(5.0, 6.0, 0.0, 0.0)).is_abort());
        assert!(!shape.on_draw_end(moved, &payload(15.0, 16.0, 0.0, 0.0)).is_abort());
    }

    #[test]
    fn test_draw_to_snapped_target_follows_point() {
        let shape = RectangleShape;
        let anchor = PointRef::new(ComponentId::Child(0), "bottom right");
        let step = shape.on_draw_start(
            DrawStep { common: common(None), delta: None },
            &payload(0.0, 0.0, 0.0, 0.0),
        );
        let moved = shape.on_draw(step, &payload(0.0, 0.0, 10.0, 10.0));
        let mut end_payload = payload(10.0, 10.0, 0.0, 0.0);
        end_payload.point = Some(anchor.clone());
        let ended = shape.on_draw_end(moved, &end_payload).into_step().unwrap();
        let Step::Draw(ended) = ended else { panic!("expected draw") };

        // The anchor has since moved to (40, 20).
        let points = Points(HashMap::from([(anchor, Point::new(40.0, 20.0))]));
        let props = shape.evaluate_draw(&points, &Props::new(), &ended).unwrap();
        approx(&props, "width", 40.0);
        approx(&props, "height", 20.0);
    }

    #[test]
    fn test_move_by_delta_from_initial_props() {
        let shape = RectangleShape;
        let props = rect(10.0, 10.0, 100.0, 50.0);
        let mut step = MoveStep { common: common(Some(ComponentId::Child(0))), delta: Vec2::ZERO };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_move_start(&props, step, &payload(110.0, 60.0, 0.0, 0.0));
        assert_eq!(step.common.source.as_ref().and_then(|s| s.point_name()), Some("bottom right"));

        let step = shape.on_move(step, &payload(0.0, 0.0, 20.0, -5.0));
        let out = shape.evaluate_move(&no_points(), &props, &step).unwrap();
        approx(&out, "x", 30.0);
        approx(&out, "y", 5.0);

        // Idempotent: same inputs, same output.
        let again = shape.evaluate_move(&no_points(), &props, &step).unwrap();
        assert_eq!(out, again);
    }

    #[test]
    fn test_move_to_snapped_point() {
        let shape = RectangleShape;
        let props = rect(10.0, 10.0, 100.0, 50.0);
        let mut step = MoveStep { common: common(Some(ComponentId::Child(0))), delta: Vec2::ZERO };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_move_start(&props, step, &payload(60.0, 35.0, 0.0, 0.0));
        let target = PointRef::new(ComponentId::Root, "center");
        let mut end = payload(400.0, 300.0, 0.0, 0.0);
        end.point = Some(target.clone());
        let step = shape.on_move_end(step, &end);

        let points = Points(HashMap::from([(target, Point::new(400.0, 300.0))]));
        let out = shape.evaluate_move(&points, &props, &step).unwrap();
        approx(&out, "x", 350.0);
        approx(&out, "y", 275.0);
    }

    #[test]
    fn test_scale_bottom_right() {
        let shape = RectangleShape;
        let props = rect(0.0, 0.0, 100.0, 50.0);
        let mut step = ScaleStep { common: common(Some(ComponentId::Child(0))), scale_x: None, scale_y: None };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_scale_start(&props, step, &payload(100.0, 50.0, 0.0, 0.0));
        assert_eq!(step.common.target.as_ref().and_then(|t| t.point_name()), Some("top left"));

        let step = shape.on_scale(step, &payload(0.0, 0.0, 100.0, -25.0));
        assert_eq!(step.scale_x, Some(2.0));
        assert_eq!(step.scale_y, Some(0.5));
        let out = shape.evaluate_scale(&no_points(), &props, &step).unwrap();
        approx(&out, "width", 200.0);
        approx(&out, "height", 25.0);
        assert!(out.get("x").is_none());
    }

    #[test]
    fn test_scale_top_left_keeps_bottom_right_fixed() {
        let shape = RectangleShape;
        let props = rect(10.0, 10.0, 100.0, 100.0);
        let mut step = ScaleStep { common: common(Some(ComponentId::Child(0))), scale_x: None, scale_y: None };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_scale_start(&props, step, &payload(10.0, 10.0, 0.0, 0.0));
        let step = shape.on_scale(step, &payload(0.0, 0.0, 50.0, 50.0));
        let out = shape.evaluate_scale(&no_points(), &props, &step).unwrap();
        approx(&out, "x", 60.0);
        approx(&out, "y", 60.0);
        approx(&out, "width", 50.0);
        approx(&out, "height", 50.0);
    }

    #[test]
    fn test_scale_of_zero_width_is_ignored() {
        let shape = RectangleShape;
        let props = rect(0.0, 0.0, 0.0, 10.0);
        let mut step = ScaleStep { common: common(Some(ComponentId::Child(0))), scale_x: None, scale_y: None };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_scale_start(&props, step, &payload(0.0, 10.0, 0.0, 0.0));
        let step = shape.on_scale(step, &payload(0.0, 0.0, 10.0, 10.0));
        assert_eq!(step.scale_x, None);
        assert!(step.scale_y.is_some());
    }

    #[test]
    fn test_rotation_angle_quarter_turns() {
        let pivot = Point::new(0.0, 0.0);
        let source = Point::new(10.0, 0.0);
        let clockwise = rotation_angle(source, pivot, Point::new(0.0, 10.0));
        assert!((clockwise - FRAC_PI_2).abs() < 1e-9);
        let counter = rotation_angle(source, pivot, Point::new(0.0, -10.0));
        assert!((counter + FRAC_PI_2).abs() < 1e-9);
        assert!(rotation_angle(source, pivot, pivot).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rotation_angle_is_continuous_past_half_turn() {
        let pivot = Point::new(0.0, 0.0);
        let source = Point::new(10.0, 0.0);
        let below = rotation_angle(source, pivot, Point::new(-10.0, 0.1));
        let above = rotation_angle(source, pivot, Point::new(-10.0, -0.1));
        assert!(below > 3.0 && below <= PI);
        assert!(above < -3.0 && above > -PI);
        let slight = rotation_angle(source, pivot, Point::new(10.0, -1.0));
        assert!(slight < 0.0 && slight > -0.2);
    }

    #[test]
    fn test_rotate_about_opposite_point() {
        let shape = RectangleShape;
        let props = rect(0.0, 0.0, 100.0, 50.0);
        let mut step = RotateStep { common: common(Some(ComponentId::Child(0))), angle: 0.0 };
        step.common.initial_props = Some(props.clone());
        let step = shape.on_rotate_start(&props, step, &payload(100.0, 25.0, 0.0, 0.0));
        assert_eq!(step.common.target.as_ref().and_then(|t| t.point_name()), Some("mid left"));

        // Drag the mid right point straight down to below the pivot.
        let step = shape.on_rotate(step, &payload(0.0, 0.0, -100.0, 100.0));
        let out = shape.evaluate_rotate(&no_points(), &props, &step).unwrap();
        approx(&out, "rotation", 90.0);
        approx(&out, "rotateX", 0.0);
        approx(&out, "rotateY", 25.0);
    }

    #[test]
    fn test_property_definitions() {
        let shape = RectangleShape;
        assert_eq!(shape.property_definition("fill"), PropertyType::Color);
        assert_eq!(shape.property_definition("strokeWidth"), PropertyType::Number);
        assert_eq!(shape.property_definition("x"), PropertyType::Opaque);
    }

    #[test]
    fn test_draw_slots_literal_target() {
        let shape = RectangleShape;
        let step = shape.on_draw_start(
            DrawStep { common: common(None), delta: None },
            &payload(0.0, 0.0, 0.0, 0.0),
        );
        let step = shape.on_draw(step, &payload(0.0, 0.0, 50.0, 30.0));
        let slots = shape.draw_step_slots("Rectangle1", &step);
        assert_eq!(slots[0], StepSlot::text("Draw"));
        assert_eq!(slots[1], StepSlot::Name("Rectangle1".to_string()));
        assert_eq!(slots[4], StepSlot::Number(50.0));
        assert_eq!(slots[6], StepSlot::Number(30.0));
    }

    #[test]
    fn test_scale_slots() {
        let shape = RectangleShape;
        let mut step = ScaleStep { common: common(Some(ComponentId::Child(0))), scale_x: Some(2.0), scale_y: Some(0.5) };
        step.common.target = Some(PointSpec::snapped(
            PointRef::new(ComponentId::Child(0), "top left"),
            Point::ZERO,
        ));
        let slots = shape.scale_step_slots("Rectangle1", &step);
        assert_eq!(
            slots[slots.len() - 3..],
            [StepSlot::Number(2.0), StepSlot::text(","), StepSlot::Number(0.5)]
        );
    }
}
