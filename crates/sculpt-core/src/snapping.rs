//! Snap point registry.
//!
//! Snap points are derived from component props and cached in a
//! [`SpatialPointIndex`]. Visibility changes (show, hide, highlight) are
//! queued as [`SnapEvent`]s for the render layer to drain; they never touch
//! the index.

use crate::components::ComponentRegistry;
use crate::config::EditorConfig;
use crate::point::{ComponentId, NamedPoint, PointRef, PointSpec};
use crate::quadtree::{SnapCandidate, SpatialPointIndex};
use kurbo::Point;

/// Visibility notifications for snap point overlays.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapEvent {
    /// Show every snap point currently in the index.
    Show(Vec<(PointRef, Point)>),
    Hide,
    Highlight { id: PointRef, position: Point },
    Unhighlight,
}

/// Owns the spatial index of snap points for one drawing.
#[derive(Debug, Clone)]
pub struct SnappingRegistry {
    index: SpatialPointIndex,
    threshold: f64,
    showing: bool,
    highlighted: Option<PointRef>,
    events: Vec<SnapEvent>,
}

impl SnappingRegistry {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            index: SpatialPointIndex::with_limits(config.canvas, config.split_limit, config.max_depth),
            threshold: config.snap_threshold,
            showing: false,
            highlighted: None,
            events: Vec::new(),
        }
    }

    /// Upsert the snap points of a component.
    pub fn set_snapping_points(&mut self, component: ComponentId, points: &[NamedPoint]) {
        for point in points {
            self.index
                .insert(PointRef::new(component, point.name.clone()), point.position);
        }
    }

    /// Remove every snap point owned by a component.
    pub fn remove_snapping_points(&mut self, component: ComponentId) {
        let owned: Vec<PointRef> = self
            .index
            .points()
            .filter(|p| p.id.component == component)
            .map(|p| p.id.clone())
            .collect();
        for id in &owned {
            self.index.remove(id);
        }
        if self.highlighted.as_ref().is_some_and(|h| h.component == component) {
            self.unhighlight_point();
        }
        if self.showing && !owned.is_empty() {
            self.show();
        }
    }

    /// Closest snap point to `position`, with no filter.
    pub fn closest_snapping_point(&self, position: Point) -> Option<SnapCandidate> {
        self.closest_snapping_point_filtered(position, |_| true, 0)
    }

    /// Closest snap point within the threshold that passes `filter`.
    ///
    /// Candidates are ordered by id length (longest first, so points owned
    /// by nested components beat canvas points), then distance, then id.
    /// `cycle` picks among them modulo the candidate count so repeated
    /// queries can step through overlapping points.
    pub fn closest_snapping_point_filtered(
        &self,
        position: Point,
        filter: impl Fn(&PointRef) -> bool,
        cycle: usize,
    ) -> Option<SnapCandidate> {
        let mut candidates = self.index.query(position, self.threshold, filter);
        if candidates.is_empty() {
            return None;
        }
        candidates.sort_by(|a, b| {
            let len_a = a.id.to_string().len();
            let len_b = b.id.to_string().len();
            len_b
                .cmp(&len_a)
                .then(a.distance.total_cmp(&b.distance))
                .then_with(|| a.id.cmp(&b.id))
        });
        let pick = cycle % candidates.len();
        Some(candidates.swap_remove(pick))
    }

    /// Current position of a snap point.
    pub fn point(&self, id: &PointRef) -> Option<Point> {
        self.index.get(id)
    }

    /// Drop every non-root point. Canvas points survive so a fresh replay
    /// starts from the same baseline.
    pub fn reset(&mut self) {
        let root: Vec<(PointRef, Point)> = self
            .index
            .points()
            .filter(|p| p.id.component.is_root())
            .map(|p| (p.id.clone(), p.position))
            .collect();
        self.index.clear();
        for (id, position) in root {
            self.index.insert(id, position);
        }
        self.highlighted = None;
    }

    /// Human readable description of a point, e.g. `Rectangle1's top left`
    /// or `12,40` for a literal coordinate.
    pub fn point_description(&self, spec: &PointSpec, components: &ComponentRegistry) -> String {
        match &spec.reference {
            Some(reference) => {
                let owner = components
                    .info(reference.component)
                    .map(|info| info.name.as_str())
                    .unwrap_or("?");
                format!("{}'s {}", owner, reference.name)
            }
            None => format!("{},{}", spec.position.x, spec.position.y),
        }
    }

    pub fn highlight_point(&mut self, candidate: &SnapCandidate) {
        self.highlighted = Some(candidate.id.clone());
        self.events.push(SnapEvent::Highlight {
            id: candidate.id.clone(),
            position: candidate.position,
        });
    }

    pub fn unhighlight_point(&mut self) {
        self.highlighted = None;
        self.events.push(SnapEvent::Unhighlight);
    }

    /// Queue the full point set. A queued `Show` not yet followed by a
    /// `Hide` is refreshed in place.
    pub fn show(&mut self) {
        self.showing = true;
        let points = self
            .index
            .points()
            .map(|p| (p.id.clone(), p.position))
            .collect();
        let last = self
            .events
            .iter()
            .rposition(|e| matches!(e, SnapEvent::Show(_) | SnapEvent::Hide));
        match last.map(|i| &mut self.events[i]) {
            Some(SnapEvent::Show(queued)) => *queued = points,
            _ => self.events.push(SnapEvent::Show(points)),
        }
    }

    pub fn hide(&mut self) {
        self.showing = false;
        self.events.push(SnapEvent::Hide);
    }

    pub fn is_showing(&self) -> bool {
        self.showing
    }

    pub fn highlighted(&self) -> Option<&PointRef> {
        self.highlighted.as_ref()
    }

    /// Drain pending visibility events.
    pub fn take_events(&mut self) -> Vec<SnapEvent> {
        std::mem::take(&mut self.events)
    }

    /// Carry visibility state over from a registry that is being replaced.
    pub(crate) fn inherit_visibility(&mut self, previous: &mut SnappingRegistry) {
        self.showing = previous.showing;
        self.events = std::mem::take(&mut previous.events);
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Ids of every registered point.
    pub fn point_ids(&self) -> Vec<PointRef> {
        let mut ids: Vec<PointRef> = self.index.points().map(|p| p.id.clone()).collect();
        ids.sort();
        ids
    }
}
