//! Axis-aligned rectangles and the quad-tree broad-phase.
//!
//! The [`QuadTree`] is rebuilt from scratch every physics tick, so it has no
//! removal or update operations. An item lands in the deepest node whose
//! region fully contains it; items straddling a split line stay in the
//! parent. [`QuadTree::retrieve`] therefore returns every item whose bounds
//! intersect the query, as long as the root region covers all inserted
//! items (the collision engine sizes the root from the union of all bounds).

use ember_ecs::vector::Vector2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Rect
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle given by its min and max corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Vector2,
    pub max: Vector2,
}

impl Rect {
    /// From the top-left corner and a size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            min: Vector2::new(x, y),
            max: Vector2::new(x + width, y + height),
        }
    }

    pub fn from_min_max(min: Vector2, max: Vector2) -> Self {
        Self { min, max }
    }

    pub fn from_center(center: Vector2, half_extents: Vector2) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> Vector2 {
        self.min.lerp(self.max, 0.5)
    }

    /// Edges touching counts as intersecting.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Strict interpenetration; touching edges do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// `other` lies entirely inside `self` (shared edges allowed).
    pub fn contains(&self, other: &Rect) -> bool {
        other.min.x >= self.min.x
            && other.max.x <= self.max.x
            && other.min.y >= self.min.y
            && other.max.y <= self.max.y
    }

    pub fn contains_point(&self, point: Vector2) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            min: Vector2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Vector2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Grow by `amount` on every side.
    pub fn expand(&self, amount: f64) -> Rect {
        let pad = Vector2::new(amount, amount);
        Rect {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Penetration depth along x: `min(a.right - b.left, b.right - a.left)`.
    pub fn overlap_x(&self, other: &Rect) -> f64 {
        (self.max.x - other.min.x).min(other.max.x - self.min.x)
    }

    /// Penetration depth along y.
    pub fn overlap_y(&self, other: &Rect) -> f64 {
        (self.max.y - other.min.y).min(other.max.y - self.min.y)
    }

    /// The four equal quadrants: NW, NE, SW, SE.
    fn quadrants(&self) -> [Rect; 4] {
        let c = self.center();
        [
            Rect::from_min_max(self.min, c),
            Rect::from_min_max(Vector2::new(c.x, self.min.y), Vector2::new(self.max.x, c.y)),
            Rect::from_min_max(Vector2::new(self.min.x, c.y), Vector2::new(c.x, self.max.y)),
            Rect::from_min_max(c, self.max),
        ]
    }
}

// ---------------------------------------------------------------------------
// QuadTree
// ---------------------------------------------------------------------------

struct Node<T> {
    region: Rect,
    depth: usize,
    items: Vec<(Rect, T)>,
    children: Option<Box<[Node<T>; 4]>>,
}

impl<T: Copy> Node<T> {
    fn new(region: Rect, depth: usize) -> Self {
        Self {
            region,
            depth,
            items: Vec::new(),
            children: None,
        }
    }

    fn insert(&mut self, bounds: Rect, item: T, capacity: usize, max_depth: usize) -> bool {
        if !self.region.intersects(&bounds) {
            return false;
        }
        if self.children.is_none() && self.items.len() < capacity {
            self.items.push((bounds, item));
            return true;
        }
        if self.children.is_none() && self.depth < max_depth {
            let [nw, ne, sw, se] = self.region.quadrants();
            let depth = self.depth + 1;
            self.children = Some(Box::new([
                Node::new(nw, depth),
                Node::new(ne, depth),
                Node::new(sw, depth),
                Node::new(se, depth),
            ]));
        }
        if let Some(children) = self.children.as_mut() {
            for child in children.iter_mut() {
                if child.region.contains(&bounds) {
                    return child.insert(bounds, item, capacity, max_depth);
                }
            }
        }
        self.items.push((bounds, item));
        true
    }

    fn retrieve(&self, query: &Rect, out: &mut Vec<T>) {
        if !self.region.intersects(query) {
            return;
        }
        out.extend(
            self.items
                .iter()
                .filter(|(bounds, _)| bounds.intersects(query))
                .map(|(_, item)| *item),
        );
        if let Some(children) = self.children.as_ref() {
            for child in children.iter() {
                child.retrieve(query, out);
            }
        }
    }

    fn deepest(&self) -> usize {
        match self.children.as_ref() {
            Some(children) => children.iter().map(Node::deepest).max().unwrap_or(self.depth),
            None => self.depth,
        }
    }
}

/// Region quad-tree over `(bounds, item)` pairs.
///
/// # Example
///
/// ```
/// use ember_engine::spatial::{QuadTree, Rect};
///
/// let mut tree = QuadTree::new(Rect::new(0.0, 0.0, 100.0, 100.0), 4, 5);
/// tree.insert(Rect::new(10.0, 10.0, 5.0, 5.0), 1);
/// tree.insert(Rect::new(80.0, 80.0, 5.0, 5.0), 2);
///
/// assert_eq!(tree.retrieve(&Rect::new(0.0, 0.0, 20.0, 20.0)), vec![1]);
/// ```
pub struct QuadTree<T> {
    root: Node<T>,
    capacity: usize,
    max_depth: usize,
    len: usize,
}

impl<T: Copy> QuadTree<T> {
    /// An empty tree covering `region`. A zero capacity is treated as one.
    pub fn new(region: Rect, capacity: usize, max_depth: usize) -> Self {
        Self {
            root: Node::new(region, 0),
            capacity: capacity.max(1),
            max_depth,
            len: 0,
        }
    }

    /// Insert an item. Returns `false` (and stores nothing) when `bounds`
    /// does not touch the tree's region.
    pub fn insert(&mut self, bounds: Rect, item: T) -> bool {
        let inserted = self.root.insert(bounds, item, self.capacity, self.max_depth);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    /// Every item whose bounds intersect `query`, parents before children.
    pub fn retrieve(&self, query: &Rect) -> Vec<T> {
        let mut out = Vec::new();
        self.root.retrieve(query, &mut out);
        out
    }

    /// Drop every item and subdivision, keeping the root region.
    pub fn clear(&mut self) {
        self.root = Node::new(self.root.region, 0);
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn region(&self) -> Rect {
        self.root.region
    }

    /// Depth of the deepest node created so far.
    pub fn depth(&self) -> usize {
        self.root.deepest()
    }
}
