//! Region quadtree over named points.
//!
//! Nodes live in an arena (`Vec<Node>`) and refer to their children by
//! index. A side table maps every point id to the leaf currently holding it,
//! so removal never has to search the tree.

use crate::config::{DEFAULT_SPLIT_LIMIT, MAX_TREE_DEPTH};
use crate::point::PointRef;
use kurbo::{Point, Rect};
use std::collections::HashMap;

/// A point stored in the index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedPoint {
    pub id: PointRef,
    pub position: Point,
}

/// A query hit with its Manhattan distance from the query position.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapCandidate {
    pub id: PointRef,
    pub position: Point,
    pub distance: f64,
}

#[derive(Debug, Clone)]
struct Node {
    bounds: Rect,
    depth: usize,
    points: Vec<IndexedPoint>,
    /// Top-left, bottom-left, bottom-right, top-right.
    children: Option<[usize; 4]>,
}

impl Node {
    fn leaf(bounds: Rect, depth: usize) -> Self {
        Self {
            bounds,
            depth,
            points: Vec::new(),
            children: None,
        }
    }

    fn quadrant(&self, position: Point) -> usize {
        let mid = self.bounds.center();
        match (position.x < mid.x, position.y < mid.y) {
            (true, true) => 0,
            (true, false) => 1,
            (false, false) => 2,
            (false, true) => 3,
        }
    }
}

fn contains_inclusive(bounds: Rect, position: Point) -> bool {
    position.x >= bounds.x0
        && position.y >= bounds.y0
        && position.x <= bounds.x1
        && position.y <= bounds.y1
}

/// Spatial index supporting upsert, removal and thresholded nearest-point
/// queries.
#[derive(Debug, Clone)]
pub struct SpatialPointIndex {
    nodes: Vec<Node>,
    registry: HashMap<PointRef, usize>,
    split_limit: usize,
    max_depth: usize,
}

impl SpatialPointIndex {
    /// Create an index with default split policy.
    pub fn new(bounds: Rect) -> Self {
        Self::with_limits(bounds, DEFAULT_SPLIT_LIMIT, MAX_TREE_DEPTH)
    }

    /// Create an index with an explicit split policy.
    pub fn with_limits(bounds: Rect, split_limit: usize, max_depth: usize) -> Self {
        Self {
            nodes: vec![Node::leaf(bounds, 0)],
            registry: HashMap::new(),
            split_limit: split_limit.max(1),
            max_depth,
        }
    }

    /// Bounds of the root node.
    pub fn bounds(&self) -> Rect {
        self.nodes[0].bounds
    }

    /// Insert a point, replacing any previous entry with the same id.
    /// Returns false if the position lies outside the index bounds; the
    /// previous entry is dropped in that case as well.
    pub fn insert(&mut self, id: PointRef, position: Point) -> bool {
        self.remove(&id);
        if !contains_inclusive(self.bounds(), position) {
            log::warn!("Snap point {} at ({}, {}) is outside the canvas", id, position.x, position.y);
            return false;
        }

        let mut current = 0;
        loop {
            if let Some(children) = self.nodes[current].children {
                current = children[self.nodes[current].quadrant(position)];
                continue;
            }
            let node = &self.nodes[current];
            if node.points.len() >= self.split_limit && node.depth < self.max_depth {
                self.split(current);
                continue;
            }
            self.nodes[current].points.push(IndexedPoint {
                id: id.clone(),
                position,
            });
            self.registry.insert(id, current);
            return true;
        }
    }

    /// Subdivide a leaf and push its points into the new children.
    fn split(&mut self, index: usize) {
        let bounds = self.nodes[index].bounds;
        let depth = self.nodes[index].depth + 1;
        let mid = bounds.center();
        let quads = [
            Rect::new(bounds.x0, bounds.y0, mid.x, mid.y),
            Rect::new(bounds.x0, mid.y, mid.x, bounds.y1),
            Rect::new(mid.x, mid.y, bounds.x1, bounds.y1),
            Rect::new(mid.x, bounds.y0, bounds.x1, mid.y),
        ];
        let first = self.nodes.len();
        for quad in quads {
            self.nodes.push(Node::leaf(quad, depth));
        }
        let children = [first, first + 1, first + 2, first + 3];
        let points = std::mem::take(&mut self.nodes[index].points);
        self.nodes[index].children = Some(children);
        log::trace!("Quadtree node {} split at depth {}", index, depth - 1);

        for point in points {
            let child = children[self.nodes[index].quadrant(point.position)];
            self.registry.insert(point.id.clone(), child);
            self.nodes[child].points.push(point);
        }
    }

    /// Remove a point by id. Returns true if it was present.
    pub fn remove(&mut self, id: &PointRef) -> bool {
        match self.registry.remove(id) {
            Some(node) => {
                self.nodes[node].points.retain(|p| &p.id != id);
                true
            }
            None => false,
        }
    }

    /// Current position of a point.
    pub fn get(&self, id: &PointRef) -> Option<Point> {
        let node = self.registry.get(id)?;
        self.nodes[*node]
            .points
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.position)
    }

    pub fn contains(&self, id: &PointRef) -> bool {
        self.registry.contains_key(id)
    }

    /// All points within `threshold` Manhattan distance of `position` that
    /// pass `filter`. Unordered.
    pub fn query(
        &self,
        position: Point,
        threshold: f64,
        filter: impl Fn(&PointRef) -> bool,
    ) -> Vec<SnapCandidate> {
        let mut hits = Vec::new();
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let node = &self.nodes[index];
            if !contains_inclusive(node.bounds.inflate(threshold, threshold), position) {
                continue;
            }
            match node.children {
                Some(children) => stack.extend(children),
                None => {
                    for point in &node.points {
                        let distance =
                            (point.position.x - position.x).abs() + (point.position.y - position.y).abs();
                        if distance <= threshold && filter(&point.id) {
                            hits.push(SnapCandidate {
                                id: point.id.clone(),
                                position: point.position,
                                distance,
                            });
                        }
                    }
                }
            }
        }
        hits
    }

    /// Iterate over every stored point.
    pub fn points(&self) -> impl Iterator<Item = &IndexedPoint> {
        self.nodes.iter().flat_map(|node| node.points.iter())
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Drop every point and collapse back to a single leaf.
    pub fn clear(&mut self) {
        let bounds = self.bounds();
        self.nodes = vec![Node::leaf(bounds, 0)];
        self.registry.clear();
    }

    /// Depth of the deepest node.
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }
}
