//! The ordered step log, the active index and loop bookkeeping.

use crate::data::Bindings;
use crate::error::{LoopError, LoopResult};
use crate::interpreter::Interpreter;
use crate::looping::LoopStep;
use crate::point::ComponentId;
use crate::props::Props;
use crate::step::{Step, StepInfo, StepUpdate};
use std::ops::Range;

/// Follow-up work a sequence mutation requires from the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateEffect {
    /// Nothing beyond what the caller already did.
    None,
    /// History must be re-evaluated up to the given index.
    Evaluate(Option<usize>),
    /// A loop template changed: expand it again, then evaluate.
    ExpandLoop {
        loop_index: usize,
        iterations: usize,
        evaluate_to: Option<usize>,
    },
}

/// Step log with the active index.
///
/// `cursor` is the index of the step the scene currently reflects. When a
/// gesture starts on an occupied slot, the slot is remembered in
/// `next_insert` and the new step is spliced in on its first update, moving
/// the rest of history down.
#[derive(Debug, Clone, Default)]
pub struct StepSequence {
    steps: Vec<Step>,
    cursor: Option<usize>,
    next_insert: Option<usize>,
    selected: Vec<usize>,
    loops: Vec<LoopStep>,
    current_loop: Option<usize>,
}

impl StepSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub(crate) fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn next_insert(&self) -> Option<usize> {
        self.next_insert
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.steps.get(self.cursor?)
    }

    /// Steps in `range`, clamped to the log.
    pub fn get_steps(&self, range: Range<usize>) -> &[Step] {
        let end = range.end.min(self.steps.len());
        let start = range.start.min(end);
        &self.steps[start..end]
    }

    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn loops(&self) -> &[LoopStep] {
        &self.loops
    }

    pub fn loop_step(&self, loop_index: usize) -> Option<&LoopStep> {
        self.loops.get(loop_index)
    }

    pub fn current_loop(&self) -> Option<usize> {
        self.current_loop
    }

    /// Move the active index forward one slot.
    pub fn advance(&mut self) {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.cursor = Some(next);
        self.next_insert = (next < self.steps.len()).then_some(next);
        log::trace!("Cursor advanced to {} (insert pending: {})", next, self.next_insert.is_some());
    }

    /// Record a finished step after the active index.
    pub fn append(&mut self, step: Step) -> UpdateEffect {
        self.advance();
        self.update_current_step(StepUpdate::Step(step))
    }

    /// Apply a gesture update to the step at the active index.
    pub fn update_current_step(&mut self, update: StepUpdate) -> UpdateEffect {
        let Some(cursor) = self.cursor else {
            log::trace!("Ignoring step update with no active index");
            return UpdateEffect::None;
        };
        if let Some(loop_index) = self.current_loop {
            if let Some(effect) = self.update_in_loop(loop_index, cursor, &update) {
                return effect;
            }
        }

        match update {
            StepUpdate::Abort => {
                if self.next_insert.take().is_none() && cursor < self.steps.len() {
                    self.remove_at(cursor);
                }
                self.cursor = cursor.checked_sub(1);
                self.selected.clear();
                log::debug!("Aborted step at {}", cursor);
                UpdateEffect::Evaluate(self.cursor)
            }
            StepUpdate::Step(step) => {
                if let Some(next) = self.next_insert.take() {
                    if next > self.steps.len() {
                        return UpdateEffect::None;
                    }
                    self.insert_at(next, step);
                    self.selected = vec![next];
                    return UpdateEffect::Evaluate(Some(next));
                }
                match cursor.cmp(&self.steps.len()) {
                    std::cmp::Ordering::Less => self.steps[cursor] = step,
                    std::cmp::Ordering::Equal => self.steps.push(step),
                    std::cmp::Ordering::Greater => {
                        log::trace!("Ignoring step update past the end of history");
                    }
                }
                UpdateEffect::None
            }
        }
    }

    /// Route an update made inside a loop into its template. Returns `None`
    /// when the active index turned out not to be inside the loop.
    fn update_in_loop(&mut self, loop_index: usize, cursor: usize, update: &StepUpdate) -> Option<UpdateEffect> {
        let loop_step = self.loops.get_mut(loop_index)?;
        let len = loop_step.template_len();
        // A new step: either a pending insert or one appended right after
        // the loop at the end of history.
        let inserting = self.next_insert.is_some() || cursor > loop_step.end;

        let (iteration, offset) = match (update, inserting) {
            (StepUpdate::Step(_), true) => {
                // Insert after the step preceding the slot in its iteration.
                let slot = self.next_insert.unwrap_or(cursor);
                if slot < loop_step.start || slot > loop_step.end + 1 || len == 0 {
                    return None;
                }
                if slot == loop_step.start {
                    (0, 0)
                } else {
                    let relative = slot - loop_step.start - 1;
                    (relative / len, relative % len + 1)
                }
            }
            (StepUpdate::Abort, true) => return None,
            _ => loop_step.locate(cursor)?,
        };

        let target = match update {
            StepUpdate::Step(step) => {
                let mut step = step.clone();
                step.remap(&loop_step.component_map.inverse());
                step.common_mut().loop_index = Some(loop_step.loop_index);
                if inserting {
                    loop_step.template.insert(offset, step);
                } else {
                    loop_step.template[offset] = step;
                }
                Some(loop_step.index_of(iteration, offset))
            }
            StepUpdate::Abort => {
                if len <= 1 {
                    log::warn!("Refusing to empty loop {}", loop_index);
                    return Some(UpdateEffect::None);
                }
                loop_step.template.remove(offset);
                loop_step.index_of(iteration, offset).checked_sub(1)
            }
        };
        let iterations = loop_step.iterations;

        self.next_insert = None;
        self.cursor = target;
        self.selected = match target {
            Some(t) => self.loop_selection(loop_index, t),
            None => Vec::new(),
        };
        Some(UpdateEffect::ExpandLoop {
            loop_index,
            iterations,
            evaluate_to: target,
        })
    }

    /// The same template offset in every iteration of a loop, computed from
    /// the loop's current template length.
    fn loop_selection(&self, loop_index: usize, index: usize) -> Vec<usize> {
        let Some(loop_step) = self.loops.get(loop_index) else {
            return vec![index];
        };
        let len = loop_step.template_len();
        if len == 0 || index < loop_step.start {
            return vec![index];
        }
        let offset = (index - loop_step.start) % len;
        (0..loop_step.iterations)
            .map(|k| loop_step.index_of(k, offset))
            .collect()
    }

    fn insert_at(&mut self, index: usize, step: Step) {
        self.steps.insert(index, step);
        for loop_step in &mut self.loops {
            if loop_step.start >= index {
                loop_step.shift(1);
            }
        }
    }

    fn remove_at(&mut self, index: usize) {
        self.steps.remove(index);
        for loop_step in &mut self.loops {
            if loop_step.start > index {
                loop_step.shift(-1);
            }
        }
    }

    /// Jump to a step. Selecting the selected step again returns to the end
    /// of history; selecting a step inside a loop enters loop context.
    pub fn select_step(&mut self, index: usize) -> UpdateEffect {
        if index >= self.steps.len() {
            return UpdateEffect::None;
        }
        self.next_insert = None;

        if self.cursor == Some(index) && self.selected.contains(&index) {
            self.selected.clear();
            self.current_loop = None;
            self.cursor = self.steps.len().checked_sub(1);
            return UpdateEffect::Evaluate(self.cursor);
        }

        self.cursor = Some(index);
        match self.steps[index].loop_index().filter(|l| *l < self.loops.len()) {
            Some(loop_index) => {
                self.current_loop = Some(loop_index);
                self.selected = self.loop_selection(loop_index, index);
            }
            None => {
                self.current_loop = None;
                self.selected = vec![index];
            }
        }
        UpdateEffect::Evaluate(self.cursor)
    }

    /// Range selection: toggle `index`, then cover everything between the
    /// lowest and highest selected index.
    pub fn extend_selection(&mut self, index: usize) -> UpdateEffect {
        if index >= self.steps.len() {
            return UpdateEffect::None;
        }
        self.next_insert = None;
        self.current_loop = None;
        match self.selected.iter().position(|i| *i == index) {
            Some(position) => {
                self.selected.remove(position);
            }
            None => self.selected.push(index),
        }
        let (Some(min), Some(max)) = (self.selected.iter().min().copied(), self.selected.iter().max().copied())
        else {
            self.cursor = self.steps.len().checked_sub(1);
            return UpdateEffect::Evaluate(self.cursor);
        };
        self.selected = (min..=max).collect();
        self.cursor = Some(max);
        UpdateEffect::Evaluate(self.cursor)
    }

    /// Turn the selected range into a single-iteration loop. Steps that are
    /// already part of a loop cannot be looped again.
    pub fn create_loop(&mut self) -> Option<usize> {
        let min = self.selected.iter().min().copied()?;
        let max = self.selected.iter().max().copied()?;
        if max >= self.steps.len() {
            return None;
        }
        if self.steps[min..=max].iter().any(|s| s.loop_index().is_some()) {
            log::warn!("Steps {}..={} overlap an existing loop", min, max);
            return None;
        }
        let loop_index = self.loops.len();
        for step in &mut self.steps[min..=max] {
            let common = step.common_mut();
            common.loop_index = Some(loop_index);
            common.iteration = Some(0);
        }
        let template = self.steps[min..=max].to_vec();
        self.loops.push(LoopStep::new(loop_index, min, template));
        log::debug!("Created loop {} over steps {}..={}", loop_index, min, max);
        Some(loop_index)
    }

    /// Re-expand a loop and splice the result over its old range. Loops
    /// after it are shifted by the change in length. Zero iterations leaves
    /// the log and the loop untouched.
    pub fn expand_loop(
        &mut self,
        loop_index: usize,
        iterations: usize,
        interpreter: &mut Interpreter,
        bindings: &Bindings<'_>,
    ) -> LoopResult<()> {
        let loop_step = self
            .loops
            .get_mut(loop_index)
            .ok_or(LoopError::UnknownLoop(loop_index))?;
        if iterations == 0 {
            log::debug!("Ignoring zero-iteration expansion of loop {}", loop_index);
            return Ok(());
        }
        let start = loop_step.start.min(self.steps.len());
        let old_end = loop_step.end.min(self.steps.len().saturating_sub(1));
        let old_span = if start < self.steps.len() {
            (old_end + 1).saturating_sub(start)
        } else {
            0
        };

        let expanded = loop_step.expand(interpreter, &mut self.steps[..start], iterations, bindings)?;
        let new_span = expanded.len();
        let tail = self.steps.split_off(start + old_span);
        self.steps.truncate(start);
        self.steps.extend(expanded);
        self.steps.extend(tail);

        let delta = new_span as isize - old_span as isize;
        for other in &mut self.loops {
            if other.loop_index != loop_index && other.start > old_end {
                other.shift(delta);
            }
        }
        Ok(())
    }

    /// Re-derive loop templates and component maps from the ids now held
    /// by the log.
    pub fn sync_loops(&mut self) {
        for loop_step in &mut self.loops {
            if let Err(err) = loop_step.sync_ids(&self.steps) {
                log::warn!("Loop {} is inconsistent: {}", loop_step.loop_index, err);
            }
        }
    }

    /// Leave loop context, keeping the cursor where it is.
    pub fn exit_loop_context(&mut self) {
        self.current_loop = None;
    }

    /// Move the cursor without evaluating. Out-of-range indices are ignored.
    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        if cursor.is_none_or(|c| c < self.steps.len()) {
            self.cursor = cursor;
            self.next_insert = None;
        }
    }

    /// The DRAW step that created a component.
    pub fn get_component_draw_step(&self, id: ComponentId) -> Option<&Step> {
        self.steps
            .iter()
            .find(|s| s.is_draw() && s.component() == Some(id))
    }

    fn component_draw_step_mut(&mut self, id: ComponentId) -> Option<&mut Step> {
        self.steps
            .iter_mut()
            .find(|s| s.is_draw() && s.component() == Some(id))
    }

    /// Edit the info a component's DRAW step carries into the registry.
    pub fn seed_step_info(&mut self, id: ComponentId, update: impl FnOnce(&mut StepInfo)) -> bool {
        match self.component_draw_step_mut(id) {
            Some(step) => {
                update(&mut step.common_mut().info);
                true
            }
            None => false,
        }
    }

    /// Merge props into a component's DRAW step so they are applied when it
    /// is minted.
    pub fn seed_step_props(&mut self, id: ComponentId, partial: &Props) -> bool {
        match self.component_draw_step_mut(id) {
            Some(step) => {
                let common = step.common_mut();
                let seeded = common.initial_props.get_or_insert_with(Props::new);
                seeded.merge(partial);
                true
            }
            None => false,
        }
    }

    /// Carry the single selection into every DRAW step's info.
    pub fn seed_selection(&mut self, selected: Option<ComponentId>) {
        for step in self.steps.iter_mut().filter(|s| s.is_draw()) {
            let is_selected = step.component().is_some() && step.component() == selected;
            step.common_mut().info.selected = is_selected.then_some(true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::data::{DataSet, Parameters};
    use crate::point::PointSpec;
    use crate::shapes::RectangleShape;
    use kurbo::{Point, Vec2};
    use std::sync::Arc;

    fn drawn(x: f64) -> Step {
        let mut step = Step::draw(StepInfo::new(Arc::new(RectangleShape)));
        if let Step::Draw(draw) = &mut step {
            draw.common.source = Some(PointSpec::literal(Point::new(x, 0.0)));
            draw.delta = Some(Vec2::new(10.0, 10.0));
        }
        step
    }

    fn source_x(step: &Step) -> f64 {
        step.common().source.as_ref().map_or(f64::NAN, |s| s.position.x)
    }

    fn sequence_of(n: usize) -> StepSequence {
        let mut sequence = StepSequence::new();
        for i in 0..n {
            sequence.append(drawn(i as f64 * 20.0));
        }
        sequence
    }

    #[test]
    fn test_append_moves_cursor() {
        let sequence = sequence_of(3);
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.cursor(), Some(2));
        assert!(sequence.next_insert().is_none());
    }

    #[test]
    fn test_insert_in_history_displaces_future() {
        let mut sequence = sequence_of(3);
        sequence.select_step(0);
        sequence.advance();
        assert_eq!(sequence.next_insert(), Some(1));
        let effect = sequence.update_current_step(drawn(500.0).into());
        assert_eq!(effect, UpdateEffect::Evaluate(Some(1)));
        assert_eq!(sequence.len(), 4);
        assert!((source_x(&sequence.steps()[1]) - 500.0).abs() < f64::EPSILON);
        assert!((source_x(&sequence.steps()[2]) - 20.0).abs() < f64::EPSILON);
        assert!(sequence.is_selected(1));

        // Later updates refine the inserted step in place.
        sequence.update_current_step(drawn(600.0).into());
        assert_eq!(sequence.len(), 4);
        assert!((source_x(&sequence.steps()[1]) - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_abort_removes_current_step() {
        let mut sequence = sequence_of(2);
        sequence.advance();
        sequence.update_current_step(drawn(100.0).into());
        assert_eq!(sequence.len(), 3);
        let effect = sequence.update_current_step(StepUpdate::Abort);
        assert_eq!(effect, UpdateEffect::Evaluate(Some(1)));
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.cursor(), Some(1));
    }

    #[test]
    fn test_update_without_cursor_is_noop() {
        let mut sequence = StepSequence::new();
        assert_eq!(sequence.update_current_step(drawn(0.0).into()), UpdateEffect::None);
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_select_same_step_returns_to_end() {
        let mut sequence = sequence_of(3);
        assert_eq!(sequence.select_step(1), UpdateEffect::Evaluate(Some(1)));
        assert_eq!(sequence.select_step(1), UpdateEffect::Evaluate(Some(2)));
        assert!(sequence.selected().is_empty());
        assert_eq!(sequence.select_step(9), UpdateEffect::None);
    }

    #[test]
    fn test_extend_selection_covers_range() {
        let mut sequence = sequence_of(5);
        sequence.select_step(1);
        sequence.extend_selection(3);
        assert_eq!(sequence.selected(), &[1, 2, 3]);
        assert_eq!(sequence.cursor(), Some(3));
    }

    #[test]
    fn test_get_steps_clamps() {
        let sequence = sequence_of(3);
        assert_eq!(sequence.get_steps(1..10).len(), 2);
        assert!(sequence.get_steps(5..10).is_empty());
    }

    #[test]
    fn test_create_loop_rejects_overlap() {
        let mut sequence = sequence_of(3);
        sequence.select_step(1);
        assert_eq!(sequence.create_loop(), Some(0));
        assert_eq!(sequence.steps()[1].loop_index(), Some(0));
        sequence.select_step(0);
        sequence.extend_selection(1);
        assert_eq!(sequence.create_loop(), None);
    }

    #[test]
    fn test_expand_loop_splices_and_keeps_tail() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let data = DataSet::default();
        let params = Parameters::new();
        let bindings = Bindings::new(&data, &params);

        let mut sequence = sequence_of(3);
        interpreter.evaluate(sequence.steps_mut(), Some(2), &bindings);
        sequence.select_step(1);
        let loop_index = sequence.create_loop().unwrap();
        sequence.expand_loop(loop_index, 3, &mut interpreter, &bindings).unwrap();

        assert_eq!(sequence.len(), 5);
        let loop_step = sequence.loop_step(loop_index).unwrap();
        assert_eq!((loop_step.start, loop_step.end), (1, 3));
        // The step after the loop survived.
        assert!((source_x(&sequence.steps()[4]) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_expand_loop_zero_iterations_is_noop() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let data = DataSet::default();
        let params = Parameters::new();
        let bindings = Bindings::new(&data, &params);

        let mut sequence = sequence_of(2);
        interpreter.evaluate(sequence.steps_mut(), Some(1), &bindings);
        sequence.select_step(0);
        let loop_index = sequence.create_loop().unwrap();
        let before = sequence.steps().to_vec();

        sequence.expand_loop(loop_index, 0, &mut interpreter, &bindings).unwrap();

        assert_eq!(sequence.len(), 2);
        let loop_step = sequence.loop_step(loop_index).unwrap();
        assert_eq!((loop_step.start, loop_step.end), (0, 0));
        assert_eq!(loop_step.iterations, 1);
        for (kept, old) in sequence.steps().iter().zip(&before) {
            assert_eq!(kept.component(), old.component());
            assert!((source_x(kept) - source_x(old)).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_update_inside_loop_targets_template() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let data = DataSet::default();
        let params = Parameters::new();
        let bindings = Bindings::new(&data, &params);

        let mut sequence = sequence_of(1);
        interpreter.evaluate(sequence.steps_mut(), Some(0), &bindings);
        sequence.select_step(0);
        let loop_index = sequence.create_loop().unwrap();
        sequence.expand_loop(loop_index, 2, &mut interpreter, &bindings).unwrap();

        // Select the second iteration's copy and edit it.
        sequence.select_step(1);
        assert_eq!(sequence.current_loop(), Some(loop_index));
        assert_eq!(sequence.selected(), &[0, 1]);
        let mut edited = sequence.current_step().unwrap().clone();
        edited.common_mut().source = Some(PointSpec::literal(Point::new(77.0, 0.0)));
        let effect = sequence.update_current_step(edited.into());
        assert_eq!(
            effect,
            UpdateEffect::ExpandLoop {
                loop_index,
                iterations: 2,
                evaluate_to: Some(1)
            }
        );
        let template = &sequence.loop_step(loop_index).unwrap().template[0];
        assert!((source_x(template) - 77.0).abs() < f64::EPSILON);
        // The template speaks in iteration-0 ids.
        assert_eq!(template.component(), sequence.steps()[0].component());
    }

    #[test]
    fn test_seed_step_props() {
        let mut sequence = sequence_of(1);
        sequence.steps_mut()[0].common_mut().component = Some(ComponentId::Child(0));
        assert!(sequence.seed_step_props(ComponentId::Child(0), &Props::new().with("strokeWidth", 3.0)));
        assert!(!sequence.seed_step_props(ComponentId::Child(5), &Props::new()));
        let seeded = sequence.steps()[0].common().initial_props.as_ref().unwrap();
        assert_eq!(seeded.number("strokeWidth"), Some(3.0));
    }
}
