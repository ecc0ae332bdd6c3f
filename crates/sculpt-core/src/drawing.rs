//! Drawing document: routes gestures to the current operation, records the
//! resulting steps and exposes the evaluated scene.

use crate::components::{ComponentInfo, ComponentRegistry};
use crate::config::EditorConfig;
use crate::data::{Bindings, DataSet, Parameters};
use crate::expression::Expression;
use crate::gesture::{Debounce, GestureEvent, GesturePayload, GesturePhase, Throttle};
use crate::interpreter::{Interpreter, RunMode};
use crate::operation::{Operation, OperationChange, OperationSelector};
use crate::point::{ComponentId, PointSpec};
use crate::props::{Binding, Props};
use crate::sequence::{StepSequence, UpdateEffect};
use crate::shapes::{ShapeCatalog, ShapeType, StepSlot};
use crate::snapping::SnapEvent;
use crate::step::{DrawStep, IdMap, MoveStep, RotateStep, ScaleStep, Step, StepCommon, StepInfo, StepUpdate};
use kurbo::{Point, Vec2};
use std::ops::Range;
use uuid::Uuid;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::Instant;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transform {
    Move,
    Scale,
    Rotate,
}

/// A procedural drawing: the step history, the scene it evaluates to and
/// the editing state around it.
#[derive(Debug, Clone)]
pub struct Drawing {
    /// Unique drawing identifier.
    pub id: String,
    /// Drawing name.
    pub name: String,
    catalog: ShapeCatalog,
    interpreter: Interpreter,
    sequence: StepSequence,
    operations: OperationSelector,
    data: DataSet,
    parameters: Parameters,
    throttle: Throttle<GestureEvent>,
    snap_check: Debounce<Point>,
    snap_cycle: usize,
}

impl Default for Drawing {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl Drawing {
    /// Create an empty drawing with the built-in shape types.
    pub fn new(config: EditorConfig) -> Self {
        let throttle = Throttle::new(config.throttle_interval);
        let snap_check = Debounce::new(config.snap_debounce);
        let catalog = ShapeCatalog::with_builtins().unwrap_or_else(|err| {
            log::error!("Built-in shape type rejected: {}", err);
            ShapeCatalog::new()
        });
        Self {
            id: Uuid::new_v4().to_string(),
            name: "Untitled".to_string(),
            catalog,
            interpreter: Interpreter::new(config),
            sequence: StepSequence::new(),
            operations: OperationSelector::new(),
            data: DataSet::default(),
            parameters: Parameters::new(),
            throttle,
            snap_check,
            snap_cycle: 0,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        self.interpreter.config()
    }

    pub fn catalog(&self) -> &ShapeCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut ShapeCatalog {
        &mut self.catalog
    }

    /// Registered shape type by name.
    pub fn shape(&self, name: &str) -> Option<ShapeType> {
        self.catalog.get(name)
    }

    pub fn sequence(&self) -> &StepSequence {
        &self.sequence
    }

    pub fn components(&self) -> &ComponentRegistry {
        self.interpreter.components()
    }

    pub fn operation(&self) -> Option<&Operation> {
        self.operations.current()
    }

    pub fn data(&self) -> &DataSet {
        &self.data
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    // --- Queries ---

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.interpreter.components().info(id)
    }

    pub fn props(&self, id: ComponentId) -> Option<&Props> {
        self.interpreter.props(id)
    }

    pub fn is_selected(&self, id: ComponentId) -> bool {
        self.interpreter.components().is_selected(id)
    }

    pub fn steps(&self) -> &[Step] {
        self.sequence.steps()
    }

    pub fn get_steps(&self, range: Range<usize>) -> &[Step] {
        self.sequence.get_steps(range)
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.sequence.current_step()
    }

    /// Human readable segments describing the step at `index`.
    pub fn step_slots(&self, index: usize) -> Option<Vec<StepSlot>> {
        let step = self.sequence.steps().get(index)?;
        let info = &step.common().info;
        let name = step
            .component()
            .and_then(|id| self.info(id))
            .map(|record| record.name.clone())
            .or_else(|| info.name.clone())
            .unwrap_or_else(|| info.kind.name().to_string());
        Some(info.kind.step_slots(&name, step))
    }

    pub fn point_description(&self, spec: &PointSpec) -> String {
        self.interpreter.point_description(spec)
    }

    /// Current value of a binding, at the active row outside loops.
    pub fn evaluate_binding(&self, binding: &Binding, iteration: Option<usize>) -> Option<f64> {
        Bindings::new(&self.data, &self.parameters)
            .resolve(binding, iteration)
            .map_err(|err| log::debug!("Binding does not evaluate: {}", err))
            .ok()
    }

    pub fn binding_label(&self, binding: &Binding) -> String {
        Bindings::new(&self.data, &self.parameters).label(binding)
    }

    /// Drain queued snap point visibility changes.
    pub fn take_snap_events(&mut self) -> Vec<SnapEvent> {
        self.interpreter.take_events()
    }

    // --- Operations ---

    /// Toggle an operation. Instant operations run immediately.
    pub fn select_operation(&mut self, operation: Operation) -> OperationChange {
        let change = self.operations.toggle(operation);
        match &change {
            OperationChange::Selected(Operation::Draw(_)) => {
                self.sequence.seed_selection(None);
                self.interpreter.set_selection_state(None);
                self.interpreter.show_points();
            }
            OperationChange::Selected(_) | OperationChange::Cleared => {
                self.interpreter.hide_points();
            }
            OperationChange::Command(Operation::Guide) => {
                self.toggle_guide();
            }
            OperationChange::Command(Operation::Loop) => {
                self.loop_selected_steps();
            }
            OperationChange::Command(_) => {}
        }
        log::debug!("Operation change: {:?}", change);
        change
    }

    /// Advance the snap candidate used when several points overlap.
    pub fn cycle_snap_candidates(&mut self) {
        self.snap_cycle = self.snap_cycle.wrapping_add(1);
    }

    // --- Gestures ---

    /// Feed a gesture event through the move throttle. Returns true if a
    /// step was recorded or updated.
    pub fn dispatch(&mut self, event: GestureEvent, now: Instant) -> bool {
        match event.phase() {
            GesturePhase::Start => {
                self.throttle.reset();
                self.route(event, Some(now))
            }
            GesturePhase::Move => match self.throttle.push(event, now) {
                Some(event) => self.route(event, Some(now)),
                None => false,
            },
            GesturePhase::End => {
                // The trailing move lands before the end event.
                let trailing = match self.throttle.flush() {
                    Some(event) => self.route(event, Some(now)),
                    None => false,
                };
                self.route(event, Some(now)) || trailing
            }
        }
    }

    /// Deliver a held move event and run a due snap check.
    pub fn poll(&mut self, now: Instant) -> bool {
        let changed = match self.throttle.poll(now) {
            Some(event) => self.route(event, Some(now)),
            None => false,
        };
        if let Some(position) = self.snap_check.poll(now) {
            self.detect_snap(position);
        }
        changed
    }

    /// Handle a gesture event immediately, without rate limiting.
    pub fn handle_event(&mut self, event: GestureEvent) -> bool {
        self.route(event, None)
    }

    fn route(&mut self, event: GestureEvent, now: Option<Instant>) -> bool {
        let Some(operation) = self.operations.current().cloned() else {
            return false;
        };
        let update = match operation {
            Operation::Draw(kind) => self.handle_drawing(kind, &event),
            Operation::Move => self.handle_transform(Transform::Move, &event),
            Operation::Scale => self.handle_transform(Transform::Scale, &event),
            Operation::Rotate => self.handle_transform(Transform::Rotate, &event),
            Operation::Guide | Operation::Loop => None,
        };
        let Some(update) = update else {
            return false;
        };
        let effect = self.sequence.update_current_step(update);
        self.apply(effect);

        if event.phase() == GesturePhase::Move {
            match now {
                Some(now) => self.snap_check.schedule(event.payload.position, now),
                None => self.detect_snap(event.payload.position),
            }
        }
        true
    }

    fn handle_drawing(&mut self, kind: ShapeType, event: &GestureEvent) -> Option<StepUpdate> {
        match event.phase() {
            GesturePhase::Start => {
                self.sequence.advance();
                self.interpreter.show_points();
                let payload = self.snapped_payload(&event.payload, &[]);

                let step = DrawStep {
                    common: StepCommon::new(StepInfo::new(kind.clone())),
                    delta: None,
                };
                let mut step = Step::Draw(kind.on_draw_start(step, &payload));
                step.common_mut().info.selected = Some(true);
                step.set_active(true);
                self.sequence.seed_selection(None);
                let id = self.run_live(&mut step);
                self.interpreter.set_selection_state(id);
                Some(StepUpdate::Step(step))
            }
            GesturePhase::Move => {
                let Step::Draw(current) = self.active_step()? else {
                    return None;
                };
                let kind = current.common.info.kind.clone();
                let mut step = Step::Draw(kind.on_draw(current, &event.payload));
                self.run_live(&mut step);
                Some(StepUpdate::Step(step))
            }
            GesturePhase::End => {
                let Step::Draw(current) = self.active_step()? else {
                    return None;
                };
                let blacklist = self.snap_blacklist(&Step::Draw(current.clone()));
                let payload = self.snapped_payload(&event.payload, &blacklist);
                let component = current.common.component;
                let in_loop = current.common.loop_index.is_some();
                let kind = current.common.info.kind.clone();

                match kind.on_draw_end(current, &payload) {
                    StepUpdate::Abort => {
                        if let (Some(id), false) = (component, in_loop) {
                            self.interpreter.remove_child(id);
                        }
                        self.snap_check.mark_processed();
                        self.interpreter.unhighlight_point();
                        self.interpreter.hide_points();
                        log::debug!("Draw gesture formed no shape");
                        Some(StepUpdate::Abort)
                    }
                    StepUpdate::Step(mut step) => {
                        step.set_active(false);
                        self.run_live(&mut step);
                        self.finish_gesture();
                        Some(StepUpdate::Step(step))
                    }
                }
            }
        }
    }

    fn handle_transform(&mut self, transform: Transform, event: &GestureEvent) -> Option<StepUpdate> {
        match event.phase() {
            GesturePhase::Start => self.start_transform(transform, &event.payload),
            GesturePhase::Move => {
                let current = self.active_step()?;
                let kind = current.common().info.kind.clone();
                let payload = &event.payload;
                let mut step = match (transform, current) {
                    (Transform::Move, Step::Move(s)) => Step::Move(kind.on_move(s, payload)),
                    (Transform::Scale, Step::Scale(s)) => Step::Scale(kind.on_scale(s, payload)),
                    (Transform::Rotate, Step::Rotate(s)) => Step::Rotate(kind.on_rotate(s, payload)),
                    _ => return None,
                };
                self.run_live(&mut step);
                Some(StepUpdate::Step(step))
            }
            GesturePhase::End => {
                let current = self.active_step()?;
                let id = current.component()?;
                let blacklist = self.snap_blacklist(&current);
                let payload = self.snapped_payload(&event.payload, &blacklist);
                let kind = current.common().info.kind.clone();
                let mut step = match (transform, current) {
                    (Transform::Move, Step::Move(s)) => Step::Move(kind.on_move_end(s, &payload)),
                    (Transform::Scale, Step::Scale(s)) => Step::Scale(kind.on_scale_end(s, &payload)),
                    (Transform::Rotate, Step::Rotate(s)) => Step::Rotate(kind.on_rotate_end(s, &payload)),
                    _ => return None,
                };
                step.set_active(false);
                self.interpreter.remove_snapping_points(id);
                self.run_live(&mut step);
                self.finish_gesture();
                Some(StepUpdate::Step(step))
            }
        }
    }

    /// Grab a snap point of the selected component and open a transform
    /// step on it.
    fn start_transform(&mut self, transform: Transform, payload: &GesturePayload) -> Option<StepUpdate> {
        let selected = self.interpreter.components().selected_ids();
        let grabbed = payload
            .point
            .clone()
            .filter(|p| selected.contains(&p.component))
            .and_then(|p| self.interpreter.snapping().point(&p).map(|position| (p, position)))
            .or_else(|| {
                self.interpreter
                    .closest_point(payload.position, |p| selected.contains(&p.component), self.snap_cycle)
                    .map(|candidate| (candidate.id, candidate.position))
            });
        let Some((point, position)) = grabbed else {
            log::trace!("No control point of the selection under the pointer");
            return None;
        };
        let id = point.component;
        if id.is_root() {
            return None;
        }
        let record = self.interpreter.components().info(id)?;
        let kind = record.kind.clone();
        let props = record.props.clone();
        let info = StepInfo::named(kind.clone(), record.name.clone());

        self.sequence.advance();
        self.interpreter.remove_snapping_points(id);
        self.interpreter.show_points();

        let payload = GesturePayload {
            position,
            delta: payload.delta,
            point: Some(point),
        };
        let common = StepCommon::for_component(id, info);
        let mut step = match transform {
            Transform::Move => Step::Move(kind.on_move_start(
                &props,
                MoveStep {
                    common,
                    delta: Vec2::ZERO,
                },
                &payload,
            )),
            Transform::Scale => Step::Scale(kind.on_scale_start(
                &props,
                ScaleStep {
                    common,
                    scale_x: None,
                    scale_y: None,
                },
                &payload,
            )),
            Transform::Rotate => Step::Rotate(kind.on_rotate_start(
                &props,
                RotateStep { common, angle: 0.0 },
                &payload,
            )),
        };
        step.common_mut().initial_props = Some(props);
        step.set_active(true);
        self.run_live(&mut step);
        Some(StepUpdate::Step(step))
    }

    /// Roll back the gesture in progress. Returns false if none is active.
    pub fn cancel_gesture(&mut self) -> bool {
        let Some(step) = self.sequence.current_step().filter(|s| s.is_active()) else {
            return false;
        };
        if let (Step::Draw(draw), None) = (step, step.loop_index()) {
            if let Some(id) = draw.common.component {
                self.interpreter.remove_child(id);
            }
        }
        self.throttle.reset();
        self.snap_check.mark_processed();
        self.interpreter.unhighlight_point();
        self.interpreter.hide_points();

        let effect = self.sequence.update_current_step(StepUpdate::Abort);
        self.apply(effect);
        log::debug!("Cancelled gesture");
        true
    }

    fn active_step(&self) -> Option<Step> {
        self.sequence.current_step().filter(|s| s.is_active()).cloned()
    }

    fn run_live(&mut self, step: &mut Step) -> Option<ComponentId> {
        let bindings = Bindings::new(&self.data, &self.parameters);
        self.interpreter
            .run_step(step, RunMode::Live, &IdMap::new(), &bindings)
    }

    fn finish_gesture(&mut self) {
        self.snap_check.mark_processed();
        self.interpreter.unhighlight_point();
        self.interpreter.hide_points();
        self.operations.clear();
        self.snap_cycle = 0;
    }

    /// Components a step must not snap onto: its own, and every component
    /// its loop draws.
    fn snap_blacklist(&self, step: &Step) -> Vec<ComponentId> {
        let mut blacklist: Vec<ComponentId> = step.component().into_iter().collect();
        if let Some(loop_step) = step.loop_index().and_then(|l| self.sequence.loop_step(l)) {
            blacklist.extend(
                loop_step
                    .template
                    .iter()
                    .filter(|s| s.is_draw())
                    .filter_map(Step::component),
            );
            blacklist.extend(loop_step.component_map.replica_ids());
        }
        blacklist
    }

    /// Lock the payload onto the closest allowed snap point, if any.
    fn snapped_payload(&self, payload: &GesturePayload, blacklist: &[ComponentId]) -> GesturePayload {
        let mut payload = payload.clone();
        if let Some(candidate) = self.interpreter.closest_point(
            payload.position,
            |p| !blacklist.contains(&p.component),
            self.snap_cycle,
        ) {
            payload.position = candidate.position;
            payload.point = Some(candidate.id);
        }
        payload
    }

    /// Highlight the point an active gesture would snap onto.
    fn detect_snap(&mut self, position: Point) {
        let Some(step) = self.sequence.current_step() else {
            return;
        };
        let active = step.is_active();
        let blacklist = self.snap_blacklist(step);
        let candidate = self.interpreter.closest_point(
            position,
            |p| !blacklist.contains(&p.component),
            self.snap_cycle,
        );
        match candidate {
            Some(candidate) if active => self.interpreter.highlight_point(&candidate),
            _ => self.interpreter.unhighlight_point(),
        }
    }

    // --- History ---

    /// Re-evaluate history up to `index` and re-sync loop bookkeeping.
    pub fn evaluate(&mut self, index: Option<usize>) {
        let bindings = Bindings::new(&self.data, &self.parameters);
        self.interpreter
            .evaluate(self.sequence.steps_mut(), index, &bindings);
        self.sequence.sync_loops();
    }

    fn apply(&mut self, effect: UpdateEffect) {
        match effect {
            UpdateEffect::None => {}
            UpdateEffect::Evaluate(index) => self.evaluate(index),
            UpdateEffect::ExpandLoop {
                loop_index,
                iterations,
                evaluate_to,
            } => {
                let bindings = Bindings::new(&self.data, &self.parameters);
                if let Err(err) =
                    self.sequence
                        .expand_loop(loop_index, iterations, &mut self.interpreter, &bindings)
                {
                    log::warn!("Failed to expand loop {}: {}", loop_index, err);
                }
                self.evaluate(evaluate_to);
            }
        }
    }

    pub fn select_step(&mut self, index: usize) {
        let effect = self.sequence.select_step(index);
        self.apply(effect);
    }

    pub fn extend_selection(&mut self, index: usize) {
        let effect = self.sequence.extend_selection(index);
        self.apply(effect);
    }

    /// Loop the selected steps once per dataset row.
    pub fn loop_selected_steps(&mut self) -> Option<usize> {
        let loop_index = self.sequence.create_loop()?;
        let iterations = self.data.item_count();
        if iterations > 0 {
            self.expand_and_evaluate(loop_index, iterations);
        }
        Some(loop_index)
    }

    /// Re-run a loop with a new iteration count. Zero is ignored.
    pub fn set_loop_iterations(&mut self, loop_index: usize, iterations: usize) -> bool {
        if iterations == 0 {
            return false;
        }
        self.expand_and_evaluate(loop_index, iterations)
    }

    fn expand_and_evaluate(&mut self, loop_index: usize, iterations: usize) -> bool {
        let bindings = Bindings::new(&self.data, &self.parameters);
        if let Err(err) = self
            .sequence
            .expand_loop(loop_index, iterations, &mut self.interpreter, &bindings)
        {
            log::warn!("Failed to expand loop {}: {}", loop_index, err);
            return false;
        }
        let end = self.sequence.loop_step(loop_index).map(|l| l.end);
        self.sequence.set_cursor(end);
        self.evaluate(self.sequence.cursor());
        log::debug!("Loop {} now runs {} times", loop_index, iterations);
        true
    }

    // --- Editing ---

    /// Apply property edits to a component through its DRAW step. Keys the
    /// shape type does not declare, or values of the wrong type, are dropped.
    pub fn edit_properties(&mut self, id: ComponentId, partial: &Props) -> bool {
        if id.is_root() {
            return false;
        }
        let Some(record) = self.interpreter.components().info(id) else {
            return false;
        };
        let kind = record.kind.clone();
        let mut accepted = Props::new();
        for (key, value) in partial.iter() {
            if kind.property_definition(key).accepts(value) {
                accepted.set(key, value.clone());
            } else {
                log::warn!("Rejected property {} for {}", key, kind.name());
            }
        }
        if accepted.is_empty() || !self.sequence.seed_step_props(id, &accepted) {
            return false;
        }
        self.evaluate(self.sequence.cursor());
        true
    }

    /// Select a component, or deselect it if it is already selected.
    pub fn toggle_selection(&mut self, id: ComponentId) -> bool {
        if id.is_root() || !self.interpreter.components().contains(id) {
            return false;
        }
        let selected = (!self.is_selected(id)).then_some(id);
        self.sequence.seed_selection(selected);
        self.interpreter.set_selection_state(selected);
        true
    }

    /// Flip the guide flag of every selected component.
    pub fn toggle_guide(&mut self) -> bool {
        let flags: Vec<(ComponentId, bool)> = self
            .interpreter
            .components()
            .children()
            .filter(|c| c.selected)
            .map(|c| (c.id, c.guide))
            .collect();
        let mut changed = false;
        for (id, guide) in flags {
            changed |= self
                .sequence
                .seed_step_info(id, |info| info.guide = Some(!guide));
        }
        if changed {
            self.evaluate(self.sequence.cursor());
        }
        changed
    }

    // --- Data ---

    pub fn set_data(&mut self, data: DataSet) {
        self.data = data;
        self.evaluate(self.sequence.cursor());
    }

    pub fn set_active_row(&mut self, row: usize) -> bool {
        if !self.data.set_active_row(row) {
            return false;
        }
        self.evaluate(self.sequence.cursor());
        true
    }

    pub fn set_parameter(&mut self, index: usize, name: &str, value: impl Into<Expression>) {
        self.parameters.set(index, name, value);
        self.evaluate(self.sequence.cursor());
    }
}
