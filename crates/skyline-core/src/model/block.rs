/// Axis-aligned block geometry.
///
/// A block starts at its `origin` and extends `width` along +x, `height`
/// along +y and `depth` toward −z. Children of a directory are stacked on
/// top of it, so a child's origin sits at the parent's `y + height`.
use serde::{Deserialize, Serialize};
use std::ops::Add;

/// Double-precision point in treemap space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Rectangular prism plus the scratch state the layout engine keeps while
/// filling a parent's floor with rows of children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub origin: Point3,
    pub width: f64,
    pub height: f64,
    pub depth: f64,

    /// Fraction (0..=1) of this block's floor already handed out to children.
    #[serde(skip)]
    coverage: f64,

    /// Where the next row of children starts on top of this block.
    #[serde(skip)]
    next_row_origin: Point3,
}

impl Block {
    pub fn new(origin: Point3, width: f64, height: f64, depth: f64) -> Self {
        Self {
            origin,
            width,
            height,
            depth,
            coverage: 0.0,
            next_row_origin: origin + Point3::new(0.0, height, 0.0),
        }
    }

    /// Zero-sized block pinned at `origin`. Valid, never rendered.
    pub fn empty_at(origin: Point3) -> Self {
        Self::new(origin, 0.0, 0.0, 0.0)
    }

    /// `false` when any dimension is zero.
    pub fn has_volume(&self) -> bool {
        self.width != 0.0 && self.height != 0.0 && self.depth != 0.0
    }

    /// Origin for anything stacked on top of this block.
    pub fn next_child_origin(&self) -> Point3 {
        self.origin + Point3::new(0.0, self.height, 0.0)
    }

    pub fn footprint_area(&self) -> f64 {
        self.width * self.depth
    }

    pub fn coverage(&self) -> f64 {
        self.coverage
    }

    pub fn next_row_origin(&self) -> Point3 {
        self.next_row_origin
    }

    pub(crate) fn add_coverage(&mut self, fraction: f64) {
        self.coverage = (self.coverage + fraction).min(1.0);
    }

    pub(crate) fn set_next_row_origin(&mut self, origin: Point3) {
        self.next_row_origin = origin;
    }

    /// Forget any rows laid out on top of this block.
    pub(crate) fn reset_layout_state(&mut self) {
        self.coverage = 0.0;
        self.next_row_origin = self.next_child_origin();
    }

    /// Far corner of the footprint: (max x, min z).
    pub fn far_corner(&self) -> (f64, f64) {
        (self.origin.x + self.width, self.origin.z - self.depth)
    }

    /// `true` if `other`'s footprint lies within this block's footprint.
    pub fn footprint_contains(&self, other: &Block, epsilon: f64) -> bool {
        let (max_x, min_z) = self.far_corner();
        let (other_max_x, other_min_z) = other.far_corner();
        other.origin.x >= self.origin.x - epsilon
            && other_max_x <= max_x + epsilon
            && other.origin.z <= self.origin.z + epsilon
            && other_min_z >= min_z - epsilon
    }

    /// `true` if the two footprints share more than a boundary.
    pub fn footprint_overlaps(&self, other: &Block, epsilon: f64) -> bool {
        let (max_x, min_z) = self.far_corner();
        let (other_max_x, other_min_z) = other.far_corner();
        let x_overlap = max_x.min(other_max_x) - self.origin.x.max(other.origin.x);
        let z_overlap = self.origin.z.min(other.origin.z) - min_z.max(other_min_z);
        x_overlap > epsilon && z_overlap > epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_block_starts_rows_on_its_roof() {
        let block = Block::new(Point3::new(1.0, 2.0, 3.0), 10.0, 4.0, 5.0);
        assert_eq!(block.next_row_origin(), Point3::new(1.0, 6.0, 3.0));
        assert_eq!(block.next_child_origin(), Point3::new(1.0, 6.0, 3.0));
        assert_eq!(block.coverage(), 0.0);
        assert_eq!(block.footprint_area(), 50.0);
    }

    #[test]
    fn volume_requires_every_dimension() {
        assert!(Block::new(Point3::ORIGIN, 1.0, 1.0, 1.0).has_volume());
        assert!(!Block::new(Point3::ORIGIN, 1.0, 0.0, 1.0).has_volume());
        assert!(!Block::empty_at(Point3::new(4.0, 4.0, 4.0)).has_volume());
    }

    #[test]
    fn reset_clears_row_progress() {
        let mut block = Block::new(Point3::ORIGIN, 10.0, 2.0, 10.0);
        block.add_coverage(0.4);
        block.set_next_row_origin(Point3::new(4.0, 2.0, 0.0));
        block.reset_layout_state();
        assert_eq!(block.coverage(), 0.0);
        assert_eq!(block.next_row_origin(), Point3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn footprint_relations() {
        let parent = Block::new(Point3::ORIGIN, 10.0, 1.0, 10.0);
        let left = Block::new(Point3::new(0.0, 1.0, 0.0), 5.0, 1.0, 10.0);
        let right = Block::new(Point3::new(5.0, 1.0, 0.0), 5.0, 1.0, 10.0);
        assert!(parent.footprint_contains(&left, 1e-9));
        assert!(parent.footprint_contains(&right, 1e-9));
        assert!(!left.footprint_overlaps(&right, 1e-9));
        assert!(parent.footprint_overlaps(&left, 1e-9));
    }
}
