//! Loop blocks: a template of steps replayed once per iteration, with the
//! components drawn by the template re-minted for every iteration after the
//! first.

use crate::data::Bindings;
use crate::error::{LoopError, LoopResult};
use crate::interpreter::{Interpreter, RunMode};
use crate::point::ComponentId;
use crate::step::{IdMap, Step};
use std::collections::BTreeMap;

/// Original (iteration 0) component ids to the replicas minted for each
/// later iteration. Injective: a replica belongs to exactly one original.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentMap {
    replicas: BTreeMap<ComponentId, Vec<ComponentId>>,
    originals: BTreeMap<ComponentId, ComponentId>,
}

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `replica` as the next copy of `original`.
    pub fn insert(&mut self, original: ComponentId, replica: ComponentId) -> LoopResult<()> {
        if let Some(existing) = self.originals.get(&replica) {
            return Err(LoopError::NonInjectiveMap {
                original,
                replica,
                existing: *existing,
            });
        }
        self.originals.insert(replica, original);
        self.replicas.entry(original).or_default().push(replica);
        Ok(())
    }

    /// The original a replica was copied from. Originals map to themselves.
    pub fn original_of(&self, id: ComponentId) -> ComponentId {
        self.originals.get(&id).copied().unwrap_or(id)
    }

    pub fn replicas(&self, original: ComponentId) -> &[ComponentId] {
        self.replicas.get(&original).map_or(&[], |r| r.as_slice())
    }

    /// Copy of `original` made for `iteration` (iteration 0 is the original).
    pub fn replica(&self, original: ComponentId, iteration: usize) -> Option<ComponentId> {
        match iteration {
            0 => Some(original),
            k => self.replicas(original).get(k - 1).copied(),
        }
    }

    pub fn is_replica(&self, id: ComponentId) -> bool {
        self.originals.contains_key(&id)
    }

    pub fn replica_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.originals.keys().copied()
    }

    /// Replica to original translation, for rewriting a step recorded in a
    /// later iteration back into template terms.
    pub fn inverse(&self) -> IdMap {
        self.originals.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }
}

/// A loop block over `steps[start..=end]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopStep {
    pub loop_index: usize,
    pub start: usize,
    pub end: usize,
    pub iterations: usize,
    /// Steps replayed for every iteration, in iteration-0 ids.
    pub template: Vec<Step>,
    pub component_map: ComponentMap,
}

impl LoopStep {
    /// Wrap already-run steps as a single iteration loop.
    pub fn new(loop_index: usize, start: usize, template: Vec<Step>) -> Self {
        let end = start + template.len().saturating_sub(1);
        let template = template
            .into_iter()
            .map(|mut step| {
                step.common_mut().loop_index = Some(loop_index);
                step
            })
            .collect();
        Self {
            loop_index,
            start,
            end,
            iterations: 1,
            template,
            component_map: ComponentMap::new(),
        }
    }

    pub fn template_len(&self) -> usize {
        self.template.len()
    }

    /// Number of steps the loop occupies in the sequence.
    pub fn span(&self) -> usize {
        self.end + 1 - self.start
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..=self.end).contains(&index)
    }

    /// Iteration and template offset of a sequence index inside the loop.
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        let len = self.template.len();
        if len == 0 || !self.contains(index) {
            return None;
        }
        let relative = index - self.start;
        Some((relative / len, relative % len))
    }

    /// Sequence index of template step `offset` in `iteration`.
    pub fn index_of(&self, iteration: usize, offset: usize) -> usize {
        self.start + iteration * self.template.len() + offset
    }

    /// Replay the sequence prefix, then the template once per iteration.
    ///
    /// `prefix` is `steps[..start]`; it is replayed (and its ids rebound) so
    /// the first iteration starts from the state right before the loop.
    /// Returns the expanded steps to splice over `start..=end`. Iteration 0
    /// keeps the template's component ids; later iterations mint new ones
    /// and rewrite their references through a per-iteration map. Zero
    /// iterations is rejected before anything is touched.
    pub fn expand(
        &mut self,
        interpreter: &mut Interpreter,
        prefix: &mut [Step],
        iterations: usize,
        bindings: &Bindings<'_>,
    ) -> LoopResult<Vec<Step>> {
        if iterations == 0 {
            return Err(LoopError::NoIterations);
        }
        if self.template.is_empty() {
            return Err(LoopError::EmptyTemplate);
        }
        interpreter.replay(prefix, bindings);

        let mut expanded = Vec::with_capacity(iterations * self.template.len());
        let mut component_map = ComponentMap::new();
        let mut first_ids: Vec<ComponentId> = Vec::new();
        let mut first_map = IdMap::new();

        for iteration in 0..iterations {
            let mut iteration_map = IdMap::new();
            let mut draw = 0;
            for template_step in &self.template {
                let mut step = template_step.clone();
                let recorded = step.component();
                {
                    let common = step.common_mut();
                    common.iteration = Some(iteration);
                    common.loop_index = Some(self.loop_index);
                }
                let minted = interpreter.run_step(&mut step, RunMode::Replay, &iteration_map, bindings);

                if let (true, Some(recorded), Some(minted)) = (step.is_draw(), recorded, minted) {
                    iteration_map.insert(recorded, minted);
                    if iteration == 0 {
                        first_ids.push(minted);
                        first_map.insert(recorded, minted);
                    } else if let Some(original) = first_ids.get(draw) {
                        component_map.insert(*original, minted)?;
                    }
                    draw += 1;
                }
                expanded.push(step);
            }
        }

        for step in &mut self.template {
            step.remap(&first_map);
        }
        self.iterations = iterations;
        self.end = self.start + expanded.len() - 1;
        self.component_map = component_map;
        log::debug!(
            "Expanded loop {} to {} iterations ({} steps)",
            self.loop_index,
            iterations,
            expanded.len()
        );
        Ok(expanded)
    }

    /// Bring the template and component map in line with the ids the
    /// sequence currently holds for `start..=end`.
    pub fn sync_ids(&mut self, steps: &[Step]) -> LoopResult<()> {
        let len = self.template.len();
        if len == 0 || self.end >= steps.len() {
            return Ok(());
        }
        let mut first = IdMap::new();
        for (offset, template_step) in self.template.iter().enumerate() {
            let placed = &steps[self.start + offset];
            if let (true, Some(old), Some(new)) = (template_step.is_draw(), template_step.component(), placed.component()) {
                if old != new {
                    first.insert(old, new);
                }
            }
        }
        for step in &mut self.template {
            step.remap(&first);
        }

        let mut component_map = ComponentMap::new();
        for iteration in 1..self.iterations {
            for offset in 0..len {
                let index = self.index_of(iteration, offset);
                let (Some(original), Some(replica)) = (
                    steps.get(self.start + offset).filter(|s| s.is_draw()).and_then(Step::component),
                    steps.get(index).filter(|s| s.is_draw()).and_then(Step::component),
                ) else {
                    continue;
                };
                component_map.insert(original, replica)?;
            }
        }
        self.component_map = component_map;
        Ok(())
    }

    /// Shift the loop by `delta` positions.
    pub(crate) fn shift(&mut self, delta: isize) {
        self.start = self.start.saturating_add_signed(delta);
        self.end = self.end.saturating_add_signed(delta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EditorConfig;
    use crate::data::{DataSet, Parameters};
    use crate::point::{PointRef, PointSpec};
    use crate::props::Binding;
    use crate::shapes::RectangleShape;
    use crate::step::StepInfo;
    use kurbo::{Point, Vec2};
    use std::sync::Arc;

    fn drawn(x: f64, y: f64) -> Step {
        let mut step = Step::draw(StepInfo::new(Arc::new(RectangleShape)));
        if let Step::Draw(draw) = &mut step {
            draw.common.source = Some(PointSpec::literal(Point::new(x, y)));
            draw.delta = Some(Vec2::new(20.0, 10.0));
        }
        step
    }

    fn bindings_for<R>(f: impl FnOnce(&Bindings<'_>) -> R) -> R {
        let data = DataSet::default();
        let params = Parameters::new();
        f(&Bindings::new(&data, &params))
    }

    #[test]
    fn test_component_map_rejects_collisions() {
        let mut map = ComponentMap::new();
        map.insert(ComponentId::Child(0), ComponentId::Child(2)).unwrap();
        map.insert(ComponentId::Child(0), ComponentId::Child(3)).unwrap();
        assert_eq!(
            map.insert(ComponentId::Child(1), ComponentId::Child(2)),
            Err(LoopError::NonInjectiveMap {
                original: ComponentId::Child(1),
                replica: ComponentId::Child(2),
                existing: ComponentId::Child(0),
            })
        );
        assert_eq!(map.replica(ComponentId::Child(0), 2), Some(ComponentId::Child(3)));
        assert_eq!(map.original_of(ComponentId::Child(3)), ComponentId::Child(0));
        assert_eq!(map.original_of(ComponentId::Child(9)), ComponentId::Child(9));
    }

    #[test]
    fn test_expand_keeps_first_ids() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let mut steps = vec![drawn(0.0, 0.0), drawn(100.0, 100.0)];
        bindings_for(|b| interpreter.evaluate(&mut steps, Some(1), b));
        let original = steps[1].component().unwrap();

        let mut loop_step = LoopStep::new(0, 1, vec![steps[1].clone()]);
        let expanded = bindings_for(|b| loop_step.expand(&mut interpreter, &mut steps[..1], 3, b)).unwrap();

        assert_eq!(expanded.len(), 3);
        assert_eq!(expanded[0].component(), Some(original));
        assert_eq!(loop_step.template[0].component(), Some(original));
        assert_eq!(loop_step.end - loop_step.start + 1, 3 * loop_step.template_len());

        let ids: Vec<ComponentId> = expanded.iter().filter_map(Step::component).collect();
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        assert_eq!(loop_step.component_map.replicas(original).len(), 2);
        assert_eq!(interpreter.components().len(), 4);
    }

    #[test]
    fn test_expand_rewrites_references_per_iteration() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let first = drawn(10.0, 10.0);
        let mut second = drawn(0.0, 0.0);
        let mut steps = vec![first];
        bindings_for(|b| interpreter.evaluate(&mut steps, Some(0), b));
        let anchor = steps[0].component().unwrap();
        // Second draw starts at the first one's bottom right.
        second.common_mut().source = Some(PointSpec::snapped(
            PointRef::new(anchor, "bottom right"),
            Point::new(30.0, 20.0),
        ));
        steps.push(second);
        bindings_for(|b| interpreter.evaluate(&mut steps, Some(1), b));

        let mut loop_step = LoopStep::new(0, 0, steps.clone());
        let expanded = bindings_for(|b| loop_step.expand(&mut interpreter, &mut [], 2, b)).unwrap();
        assert_eq!(expanded.len(), 4);

        let replica = expanded[2].component().unwrap();
        let source = expanded[3].common().source.as_ref().and_then(|s| s.reference.clone()).unwrap();
        assert_eq!(source.component, replica);
        assert_eq!(source.name, "bottom right");
        assert!(loop_step.component_map.is_replica(replica));
    }

    #[test]
    fn test_row_variables_follow_iteration() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let mut step = drawn(0.0, 0.0);
        step.common_mut().initial_props = Some(crate::props::Props::new().with("strokeWidth", Binding::RowVariable(0)));
        let mut loop_step = LoopStep::new(0, 0, vec![step]);
        let data = DataSet::default();
        let params = Parameters::new();
        let expanded = loop_step
            .expand(&mut interpreter, &mut [], 3, &Bindings::new(&data, &params))
            .unwrap();
        let widths: Vec<f64> = expanded
            .iter()
            .filter_map(|s| interpreter.props(s.component()?)?.number("strokeWidth"))
            .collect();
        assert_eq!(widths, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_template() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let mut loop_step = LoopStep::new(0, 0, Vec::new());
        let result = bindings_for(|b| loop_step.expand(&mut interpreter, &mut [], 2, b));
        assert_eq!(result, Err(LoopError::EmptyTemplate));
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut interpreter = Interpreter::new(EditorConfig::default());
        let mut loop_step = LoopStep::new(0, 0, vec![drawn(0.0, 0.0)]);
        let result = bindings_for(|b| loop_step.expand(&mut interpreter, &mut [], 0, b));
        assert_eq!(result, Err(LoopError::NoIterations));
        assert_eq!((loop_step.start, loop_step.end, loop_step.iterations), (0, 0, 1));
    }

    #[test]
    fn test_locate() {
        let mut loop_step = LoopStep::new(0, 2, vec![drawn(0.0, 0.0), drawn(1.0, 1.0)]);
        loop_step.iterations = 3;
        loop_step.end = 7;
        assert_eq!(loop_step.locate(2), Some((0, 0)));
        assert_eq!(loop_step.locate(5), Some((1, 1)));
        assert_eq!(loop_step.locate(8), None);
        assert_eq!(loop_step.index_of(2, 1), 7);
    }
}
