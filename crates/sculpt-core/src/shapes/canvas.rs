//! The root canvas. It is never drawn or transformed by steps; it only
//! contributes snap points.

use super::rectangle::box_points;
use super::{PointResolver, ShapeKind};
use crate::point::NamedPoint;
use crate::props::Props;
use crate::step::{DrawStep, MoveStep, RotateStep, ScaleStep};
use kurbo::Rect;

#[derive(Debug, Clone, Copy)]
pub struct CanvasShape {
    bounds: Rect,
}

impl CanvasShape {
    pub fn new(bounds: Rect) -> Self {
        Self { bounds }
    }
}

impl ShapeKind for CanvasShape {
    fn name(&self) -> &str {
        "Canvas"
    }

    fn default_props(&self) -> Props {
        Props::new()
            .with("x", self.bounds.x0)
            .with("y", self.bounds.y0)
            .with("width", self.bounds.width())
            .with("height", self.bounds.height())
    }

    fn snapping_points(&self, props: &Props) -> Vec<NamedPoint> {
        box_points(
            props.number_or_zero("x"),
            props.number_or_zero("y"),
            props.number_or_zero("width"),
            props.number_or_zero("height"),
        )
    }

    fn evaluate_draw(&self, _: &dyn PointResolver, _: &Props, _: &DrawStep) -> Option<Props> {
        None
    }

    fn evaluate_move(&self, _: &dyn PointResolver, _: &Props, _: &MoveStep) -> Option<Props> {
        None
    }

    fn evaluate_scale(&self, _: &dyn PointResolver, _: &Props, _: &ScaleStep) -> Option<Props> {
        None
    }

    fn evaluate_rotate(&self, _: &dyn PointResolver, _: &Props, _: &RotateStep) -> Option<Props> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;

    #[test]
    fn test_canvas_points_follow_bounds() {
        let canvas = CanvasShape::new(Rect::new(0.0, 0.0, 800.0, 600.0));
        let center = canvas.snapping_point(&canvas.default_props(), "center").unwrap();
        assert_eq!(center.position, Point::new(400.0, 300.0));
        assert_eq!(canvas.snapping_points(&canvas.default_props()).len(), 9);
    }
}
