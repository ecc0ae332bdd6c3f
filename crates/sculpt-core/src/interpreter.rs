//! Step interpreter.
//!
//! The interpreter is the only writer of the component and snapping
//! registries. Every evaluation replays steps into a fresh [`Scene`] and
//! swaps it in at the end, so callers never observe a half-replayed state.

use crate::components::ComponentRegistry;
use crate::config::EditorConfig;
use crate::data::Bindings;
use crate::point::{ComponentId, PointRef, PointSpec};
use crate::props::Props;
use crate::quadtree::SnapCandidate;
use crate::snapping::{SnapEvent, SnappingRegistry};
use crate::step::{IdMap, Step};
use kurbo::Point;

/// The registries produced by replaying steps.
#[derive(Debug, Clone)]
pub struct Scene {
    pub components: ComponentRegistry,
    pub snapping: SnappingRegistry,
}

impl Scene {
    /// A scene holding only the root canvas and its snap points.
    pub fn new(config: &EditorConfig) -> Self {
        let components = ComponentRegistry::new(config);
        let mut snapping = SnappingRegistry::new(config);
        let root = components.root();
        snapping.set_snapping_points(ComponentId::Root, &root.kind.snapping_points(&root.props));
        Self { components, snapping }
    }

    /// Re-register a component's snap points from its current props.
    fn register_points(&mut self, id: ComponentId) {
        if let Some(info) = self.components.info(id) {
            let points = info.kind.snapping_points(&info.props);
            self.snapping.set_snapping_points(id, &points);
        }
    }
}

/// How a step is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Applying a gesture update to the current scene.
    Live,
    /// Rebuilding history into a fresh scene.
    Replay,
}

/// Runs steps against the scene it owns.
#[derive(Debug, Clone)]
pub struct Interpreter {
    config: EditorConfig,
    scene: Scene,
}

impl Interpreter {
    pub fn new(config: EditorConfig) -> Self {
        let scene = Scene::new(&config);
        Self { config, scene }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.scene.components
    }

    pub fn snapping(&self) -> &SnappingRegistry {
        &self.scene.snapping
    }

    /// Run one step and return the component it applied to.
    ///
    /// Steps are rewritten through `remap` first: DRAW steps only have their
    /// points rewritten, other steps also their owning component. A DRAW
    /// step mints its component on every replay, and during live updates
    /// only until it has one. Non-DRAW steps snapshot the component's props
    /// into `initial_props` on replay of a committed step, and once at the
    /// start of a live gesture.
    pub fn run_step(
        &mut self,
        step: &mut Step,
        mode: RunMode,
        remap: &IdMap,
        bindings: &Bindings<'_>,
    ) -> Option<ComponentId> {
        if step.is_draw() {
            step.remap_points(remap);
        } else {
            step.remap(remap);
        }
        let committing = !step.is_active() || step.loop_index().is_some();

        if let Step::Draw(draw) = step {
            let mint = match mode {
                RunMode::Replay => true,
                RunMode::Live => draw
                    .common
                    .component
                    .is_none_or(|id| !self.scene.components.contains(id)),
            };
            if mint {
                let common = &mut draw.common;
                let seed = common
                    .initial_props
                    .as_ref()
                    .map(|props| bindings.resolve_props(props, common.iteration))
                    .unwrap_or_default();
                let id = self.scene.components.insert_child(
                    common.info.kind.clone(),
                    common.info.name.clone(),
                    &seed,
                );
                if let Some(record) = self.scene.components.info_mut(id) {
                    if let Some(guide) = common.info.guide {
                        record.guide = guide;
                    }
                    if let Some(selected) = common.info.selected {
                        record.selected = selected;
                    }
                }
                common.component = Some(id);
            }
        }

        let id = step.component()?;
        let Some(info) = self.scene.components.info(id) else {
            log::trace!("Skipping step for missing component {}", id);
            return None;
        };
        if id.is_root() {
            return None;
        }
        let kind = info.kind.clone();
        let props = info.props.clone();

        if !step.is_draw() {
            let common = step.common_mut();
            let snapshot = match mode {
                RunMode::Replay => committing,
                RunMode::Live => common.initial_props.is_none(),
            };
            if snapshot {
                common.initial_props = Some(props.clone());
            }
        }

        self.scene.snapping.remove_snapping_points(id);
        if let Some(partial) = kind.evaluate(&self.scene.components, &props, step) {
            self.scene.components.set_props(id, &partial);
        }
        if committing {
            self.scene.register_points(id);
        }
        Some(id)
    }

    /// Replay `steps` into a fresh scene and swap it in.
    ///
    /// Returns the map from the component id each DRAW step carried to the
    /// id it was minted with. Later steps are rewritten through that map as
    /// they are replayed, so ids recorded in `steps` stay consistent with
    /// the scene.
    pub fn replay(&mut self, steps: &mut [Step], bindings: &Bindings<'_>) -> IdMap {
        let mut previous = std::mem::replace(&mut self.scene, Scene::new(&self.config));
        let mut rebind = IdMap::new();
        for step in steps.iter_mut() {
            let recorded = step.component();
            let is_draw = step.is_draw();
            let minted = self.run_step(step, RunMode::Replay, &rebind, bindings);
            if let (true, Some(recorded), Some(minted)) = (is_draw, recorded, minted) {
                if recorded == minted {
                    rebind.remove(&recorded);
                } else {
                    rebind.insert(recorded, minted);
                }
            }
        }
        self.scene.snapping.inherit_visibility(&mut previous.snapping);
        rebind
    }

    /// Evaluate history up to and including `index` (`None` for the empty
    /// prefix).
    ///
    /// The whole list is replayed once to keep recorded ids consistent, then
    /// the prefix is replayed again if it is shorter. The previous selection
    /// is carried over when its component still exists.
    pub fn evaluate(&mut self, steps: &mut [Step], index: Option<usize>, bindings: &Bindings<'_>) -> IdMap {
        let selection = self.scene.components.selected_ids();
        let rebind = self.replay(steps, bindings);
        let end = index.map_or(0, |i| (i + 1).min(steps.len()));
        if end < steps.len() {
            self.replay(&mut steps[..end], bindings);
        }

        let restored = selection
            .first()
            .map(|id| rebind.get(id).copied().unwrap_or(*id))
            .filter(|id| self.scene.components.contains(*id));
        if restored.is_some() {
            self.scene.components.set_selection_state(restored);
        }
        log::debug!(
            "Evaluated {} of {} steps, {} components",
            end,
            steps.len(),
            self.scene.components.len()
        );
        rebind
    }

    /// Closest snap point within the threshold passing `filter`.
    pub fn closest_point(
        &self,
        position: Point,
        filter: impl Fn(&PointRef) -> bool,
        cycle: usize,
    ) -> Option<SnapCandidate> {
        self.scene
            .snapping
            .closest_snapping_point_filtered(position, filter, cycle)
    }

    pub fn point_description(&self, spec: &PointSpec) -> String {
        self.scene
            .snapping
            .point_description(spec, &self.scene.components)
    }

    pub fn props(&self, id: ComponentId) -> Option<&Props> {
        self.scene.components.props(id)
    }

    pub fn set_selection_state(&mut self, selected: Option<ComponentId>) {
        self.scene.components.set_selection_state(selected);
    }

    pub fn remove_child(&mut self, id: ComponentId) {
        self.scene.snapping.remove_snapping_points(id);
        self.scene.components.remove_child(id);
    }

    pub fn remove_snapping_points(&mut self, id: ComponentId) {
        self.scene.snapping.remove_snapping_points(id);
    }

    pub fn highlight_point(&mut self, candidate: &SnapCandidate) {
        self.scene.snapping.highlight_point(candidate);
    }

    pub fn unhighlight_point(&mut self) {
        self.scene.snapping.unhighlight_point();
    }

    pub fn show_points(&mut self) {
        self.scene.snapping.show();
    }

    pub fn hide_points(&mut self) {
        self.scene.snapping.hide();
    }

    pub fn take_events(&mut self) -> Vec<SnapEvent> {
        self.scene.snapping.take_events()
    }
}
