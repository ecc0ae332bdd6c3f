//! Component registry: the props of every shape produced by replay.

use crate::config::EditorConfig;
use crate::point::{ComponentId, PointRef};
use crate::props::Props;
use crate::shapes::{CanvasShape, PointResolver, ShapeType};
use kurbo::Point;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Name of the root canvas record.
pub const ROOT_NAME: &str = "canvas";

/// A component record.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentId,
    /// Display name, unique per drawing by construction.
    pub name: String,
    pub kind: ShapeType,
    /// Current props, always a superset of the kind's defaults.
    pub props: Props,
    pub selected: bool,
    /// Guides are construction helpers and are not part of the output.
    pub guide: bool,
}

/// Authoritative map from component id to record.
///
/// Components are the memoized output of replaying DRAW steps, so the
/// registry is reset and rebuilt on every evaluation.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    root: ComponentInfo,
    children: BTreeMap<ComponentId, ComponentInfo>,
    /// Insertion order of children.
    order: Vec<ComponentId>,
}

impl ComponentRegistry {
    /// Create a registry holding only the root canvas.
    pub fn new(config: &EditorConfig) -> Self {
        let kind: ShapeType = Arc::new(CanvasShape::new(config.canvas));
        let props = kind.default_props();
        Self {
            root: ComponentInfo {
                id: ComponentId::Root,
                name: ROOT_NAME.to_string(),
                kind,
                props,
                selected: false,
                guide: false,
            },
            children: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    pub fn root(&self) -> &ComponentInfo {
        &self.root
    }

    /// Mint a new child. `props` are merged over the kind's defaults.
    pub fn insert_child(&mut self, kind: ShapeType, name: Option<String>, props: &Props) -> ComponentId {
        let mut ordinal = self.children.len() as u32;
        while self.children.contains_key(&ComponentId::Child(ordinal)) {
            ordinal += 1;
        }
        let id = ComponentId::Child(ordinal);

        let name = name.unwrap_or_else(|| {
            let same_kind = self
                .children
                .values()
                .filter(|c| c.kind.name() == kind.name())
                .count();
            format!("{}{}", kind.name(), same_kind + 1)
        });
        let props = kind.default_props().merged(props);
        log::trace!("Inserted component {} ({})", id, name);

        self.children.insert(
            id,
            ComponentInfo {
                id,
                name,
                kind,
                props,
                selected: false,
                guide: false,
            },
        );
        self.order.push(id);
        id
    }

    /// Remove a child. The root cannot be removed.
    pub fn remove_child(&mut self, id: ComponentId) -> Option<ComponentInfo> {
        let removed = self.children.remove(&id)?;
        self.order.retain(|c| *c != id);
        log::trace!("Removed component {}", id);
        Some(removed)
    }

    /// Drop every child, keeping the root.
    pub fn reset(&mut self) {
        self.children.clear();
        self.order.clear();
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        id.is_root() || self.children.contains_key(&id)
    }

    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        match id {
            ComponentId::Root => Some(&self.root),
            child => self.children.get(&child),
        }
    }

    pub fn info_mut(&mut self, id: ComponentId) -> Option<&mut ComponentInfo> {
        match id {
            ComponentId::Root => Some(&mut self.root),
            child => self.children.get_mut(&child),
        }
    }

    pub fn props(&self, id: ComponentId) -> Option<&Props> {
        self.info(id).map(|info| &info.props)
    }

    /// Shallow-merge `partial` into a component's props. Returns false if
    /// the component does not exist.
    pub fn set_props(&mut self, id: ComponentId, partial: &Props) -> bool {
        match self.info_mut(id) {
            Some(info) => {
                info.props.merge(partial);
                true
            }
            None => false,
        }
    }

    /// Select exactly one component, or clear the selection with `None`.
    pub fn set_selection_state(&mut self, selected: Option<ComponentId>) {
        for info in self.children.values_mut() {
            info.selected = Some(info.id) == selected;
        }
    }

    pub fn is_selected(&self, id: ComponentId) -> bool {
        self.info(id).is_some_and(|info| info.selected)
    }

    pub fn selected_ids(&self) -> Vec<ComponentId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.is_selected(*id))
            .collect()
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.order.iter().filter_map(|id| self.children.get(id))
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Props of every child keyed by id, for comparing evaluations.
    pub fn snapshot(&self) -> BTreeMap<ComponentId, Props> {
        self.children
            .iter()
            .map(|(id, info)| (*id, info.props.clone()))
            .collect()
    }
}

impl PointResolver for ComponentRegistry {
    /// Position of a snap point derived from the owner's current props.
    fn resolve(&self, point: &PointRef) -> Option<Point> {
        let info = self.info(point.component)?;
        info.kind
            .snapping_point(&info.props, &point.name)
            .map(|p| p.position)
    }
}
