//! Recorded procedural operations.

use crate::point::{ComponentId, PointRef, PointSpec};
use crate::props::Props;
use crate::shapes::ShapeType;
use kurbo::Vec2;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Translation table from one set of component ids to another.
pub type IdMap = BTreeMap<ComponentId, ComponentId>;

/// Component metadata carried by a step.
///
/// For a DRAW step this is copied onto the registry record when the
/// component is minted; `guide` and `selected` are seeded here by later
/// edits so they survive replay.
#[derive(Clone)]
pub struct StepInfo {
    pub kind: ShapeType,
    pub name: Option<String>,
    pub guide: Option<bool>,
    pub selected: Option<bool>,
}

impl StepInfo {
    pub fn new(kind: ShapeType) -> Self {
        Self {
            kind,
            name: None,
            guide: None,
            selected: None,
        }
    }

    pub fn named(kind: ShapeType, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(kind)
        }
    }
}

impl fmt::Debug for StepInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepInfo")
            .field("kind", &self.kind.name())
            .field("name", &self.name)
            .field("guide", &self.guide)
            .field("selected", &self.selected)
            .finish()
    }
}

impl PartialEq for StepInfo {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.kind, &other.kind) || self.kind.name() == other.kind.name())
            && self.name == other.name
            && self.guide == other.guide
            && self.selected == other.selected
    }
}

/// Fields shared by every step type.
#[derive(Debug, Clone, PartialEq)]
pub struct StepCommon {
    /// Owning component. Assigned when a DRAW step is first interpreted.
    pub component: Option<ComponentId>,
    /// True while the gesture that records this step is in progress.
    pub active: bool,
    /// Loop this step belongs to.
    pub loop_index: Option<usize>,
    /// Loop iteration this copy was produced for.
    pub iteration: Option<usize>,
    pub source: Option<PointSpec>,
    pub target: Option<PointSpec>,
    /// For DRAW: props seeded into the component when it is minted.
    /// Otherwise: the component's props when the gesture started.
    pub initial_props: Option<Props>,
    pub info: StepInfo,
}

impl StepCommon {
    pub fn new(info: StepInfo) -> Self {
        Self {
            component: None,
            active: false,
            loop_index: None,
            iteration: None,
            source: None,
            target: None,
            initial_props: None,
            info,
        }
    }

    pub fn for_component(component: ComponentId, info: StepInfo) -> Self {
        Self {
            component: Some(component),
            ..Self::new(info)
        }
    }

    fn remap_points(&mut self, map: &IdMap) {
        for spec in [self.source.as_mut(), self.target.as_mut()].into_iter().flatten() {
            if let Some(reference) = spec.reference.as_mut() {
                if let Some(mapped) = map.get(&reference.component) {
                    reference.component = *mapped;
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawStep {
    pub common: StepCommon,
    /// Drag displacement; `None` until the first move event.
    pub delta: Option<Vec2>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MoveStep {
    pub common: StepCommon,
    pub delta: Vec2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleStep {
    pub common: StepCommon,
    pub scale_x: Option<f64>,
    pub scale_y: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RotateStep {
    pub common: StepCommon,
    /// Radians, positive clockwise in screen coordinates.
    pub angle: f64,
}

/// Step type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    Draw,
    Move,
    Scale,
    Rotate,
}

/// A recorded operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Draw(DrawStep),
    Move(MoveStep),
    Scale(ScaleStep),
    Rotate(RotateStep),
}

impl Step {
    pub fn draw(info: StepInfo) -> Self {
        Step::Draw(DrawStep {
            common: StepCommon::new(info),
            delta: None,
        })
    }

    pub fn move_component(component: ComponentId, info: StepInfo) -> Self {
        Step::Move(MoveStep {
            common: StepCommon::for_component(component, info),
            delta: Vec2::ZERO,
        })
    }

    pub fn scale(component: ComponentId, info: StepInfo) -> Self {
        Step::Scale(ScaleStep {
            common: StepCommon::for_component(component, info),
            scale_x: None,
            scale_y: None,
        })
    }

    pub fn rotate(component: ComponentId, info: StepInfo) -> Self {
        Step::Rotate(RotateStep {
            common: StepCommon::for_component(component, info),
            angle: 0.0,
        })
    }

    pub fn kind(&self) -> StepKind {
        match self {
            Step::Draw(_) => StepKind::Draw,
            Step::Move(_) => StepKind::Move,
            Step::Scale(_) => StepKind::Scale,
            Step::Rotate(_) => StepKind::Rotate,
        }
    }

    pub fn common(&self) -> &StepCommon {
        match self {
            Step::Draw(s) => &s.common,
            Step::Move(s) => &s.common,
            Step::Scale(s) => &s.common,
            Step::Rotate(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut StepCommon {
        match self {
            Step::Draw(s) => &mut s.common,
            Step::Move(s) => &mut s.common,
            Step::Scale(s) => &mut s.common,
            Step::Rotate(s) => &mut s.common,
        }
    }

    pub fn component(&self) -> Option<ComponentId> {
        self.common().component
    }

    pub fn is_active(&self) -> bool {
        self.common().active
    }

    pub fn set_active(&mut self, active: bool) {
        self.common_mut().active = active;
    }

    pub fn loop_index(&self) -> Option<usize> {
        self.common().loop_index
    }

    pub fn is_draw(&self) -> bool {
        matches!(self, Step::Draw(_))
    }

    /// Rewrite the owning component and the component segment of every
    /// snapped point through `map`. Point names are left intact.
    pub fn remap(&mut self, map: &IdMap) {
        if map.is_empty() {
            return;
        }
        let common = self.common_mut();
        if let Some(component) = common.component {
            if let Some(mapped) = map.get(&component) {
                common.component = Some(*mapped);
            }
        }
        common.remap_points(map);
    }

    /// Like [`Step::remap`] but leaves the owning component alone.
    pub fn remap_points(&mut self, map: &IdMap) {
        self.common_mut().remap_points(map);
    }

    /// Every component this step refers to.
    pub fn referenced_components(&self) -> Vec<ComponentId> {
        let common = self.common();
        let mut ids: Vec<ComponentId> = common.component.into_iter().collect();
        for spec in [common.source.as_ref(), common.target.as_ref()].into_iter().flatten() {
            if let Some(PointRef { component, .. }) = &spec.reference {
                if !ids.contains(component) {
                    ids.push(*component);
                }
            }
        }
        ids
    }
}

/// Result of a gesture builder: either the updated step or the sentinel
/// telling the sequence to unwind the in-progress insertion.
#[derive(Debug, Clone, PartialEq)]
pub enum StepUpdate {
    Step(Step),
    Abort,
}

impl StepUpdate {
    pub fn is_abort(&self) -> bool {
        matches!(self, StepUpdate::Abort)
    }

    pub fn into_step(self) -> Option<Step> {
        match self {
            StepUpdate::Step(step) => Some(step),
            StepUpdate::Abort => None,
        }
    }
}

impl From<Step> for StepUpdate {
    fn from(step: Step) -> Self {
        StepUpdate::Step(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::rectangle::RectangleShape;
    use kurbo::Point;

    fn rect_info() -> StepInfo {
        StepInfo::new(Arc::new(RectangleShape))
    }

    #[test]
    fn test_remap_rewrites_component_and_points() {
        let mut step = Step::move_component(ComponentId::Child(1), rect_info());
        step.common_mut().source = Some(PointSpec::snapped(
            PointRef::new(ComponentId::Child(1), "top left"),
            Point::new(0.0, 0.0),
        ));
        step.common_mut().target = Some(PointSpec::snapped(
            PointRef::new(ComponentId::Root, "center"),
            Point::new(400.0, 300.0),
        ));

        let map = IdMap::from([(ComponentId::Child(1), ComponentId::Child(4))]);
        step.remap(&map);

        assert_eq!(step.component(), Some(ComponentId::Child(4)));
        let common = step.common();
        assert_eq!(common.source.as_ref().and_then(|s| s.reference.clone()).unwrap().to_string(), "0.4:top left");
        // Points on components outside the map are untouched.
        assert_eq!(common.target.as_ref().and_then(|s| s.reference.clone()).unwrap().to_string(), "0:center");
    }

    #[test]
    fn test_remap_points_keeps_owner() {
        let mut step = Step::draw(rect_info());
        step.common_mut().component = Some(ComponentId::Child(0));
        step.common_mut().source = Some(PointSpec::snapped(
            PointRef::new(ComponentId::Child(2), "center"),
            Point::new(5.0, 5.0),
        ));
        let map = IdMap::from([
            (ComponentId::Child(0), ComponentId::Child(9)),
            (ComponentId::Child(2), ComponentId::Child(3)),
        ]);
        step.remap_points(&map);
        assert_eq!(step.component(), Some(ComponentId::Child(0)));
        assert_eq!(step.referenced_components(), vec![ComponentId::Child(0), ComponentId::Child(3)]);
    }

    #[test]
    fn test_abort_sentinel() {
        assert!(StepUpdate::Abort.is_abort());
        assert!(StepUpdate::Abort.into_step().is_none());
        let update: StepUpdate = Step::draw(rect_info()).into();
        assert!(!update.is_abort());
    }
}
