use cgmath::{Point3, Vector3};

/// Axis-aligned bounding box used for collisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Point3<f32>,
    /// Maximum corner.
    pub max: Point3<f32>,
}

impl BoundingBox {
    /// Create a new box ensuring min <= max per axis.
    pub fn new(min: Point3<f32>, max: Point3<f32>) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    /// Box of the given size centred on `center`.
    pub fn from_center_size(center: Point3<f32>, size: Vector3<f32>) -> Self {
        let half = size / 2.0;
        Self::new(center - half, center + half)
    }

    /// The unit cube occupied by the block at lattice point `p`.
    pub fn for_block(p: Point3<i32>) -> Self {
        let min = Point3::new(p.x as f32, p.y as f32, p.z as f32);
        Self::new(min, min + Vector3::new(1.0, 1.0, 1.0))
    }

    /// Centre point.
    pub fn center(&self) -> Point3<f32> {
        self.min + (self.max - self.min) / 2.0
    }

    /// Extent along each axis.
    pub fn size(&self) -> Vector3<f32> {
        self.max - self.min
    }

    /// Moves the box by `offset`.
    pub fn translate(&mut self, offset: Vector3<f32>) {
        self.min += offset;
        self.max += offset;
    }

    /// Copy of the box moved by `offset`.
    pub fn translated(mut self, offset: Vector3<f32>) -> Self {
        self.translate(offset);
        self
    }

    /// Moves the box along one axis.
    pub fn translate_axis(&mut self, axis: usize, amount: f32) {
        self.min[axis] += amount;
        self.max[axis] += amount;
    }

    /// Strict overlap: boxes that only share a face do not collide.
    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.overlaps_axis(other, axis))
    }

    /// Strict overlap along one axis.
    pub fn overlaps_axis(&self, other: &Self, axis: usize) -> bool {
        self.min[axis] < other.max[axis] && self.max[axis] > other.min[axis]
    }

    /// Inclusive overlap: boxes sharing a face or an edge count as touching.
    pub fn touches(&self, other: &Self) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.max[axis] && self.max[axis] >= other.min[axis])
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self::new(
            Point3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Point3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// Distance along `direction` at which a ray from `origin` enters the box,
    /// or `None` if it misses. A ray starting inside enters at 0.
    pub fn ray_entry(&self, origin: Point3<f32>, direction: Vector3<f32>) -> Option<f32> {
        let mut enter = 0.0f32;
        let mut exit = f32::INFINITY;
        for axis in 0..3 {
            if direction[axis] == 0.0 {
                if origin[axis] < self.min[axis] || origin[axis] > self.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction[axis];
            let a = (self.min[axis] - origin[axis]) * inv;
            let b = (self.max[axis] - origin[axis]) * inv;
            enter = enter.max(a.min(b));
            exit = exit.min(a.max(b));
        }
        (enter <= exit).then_some(enter)
    }

    /// The inclusive range of lattice points whose unit cubes the box, grown by
    /// `padding` on every side, can touch.
    pub fn lattice_range(&self, padding: f32) -> (Point3<i32>, Point3<i32>) {
        let lo = self.min.map(|c| (c - padding).floor() as i32);
        let hi = self.max.map(|c| (c + padding).floor() as i32);
        (lo, hi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faces_touch_without_intersecting() {
        let a = BoundingBox::for_block(Point3::new(0, 0, 0));
        let b = BoundingBox::for_block(Point3::new(1, 0, 0));
        assert!(!a.intersects(&b));
        assert!(a.touches(&b));
        assert!(!a.touches(&BoundingBox::for_block(Point3::new(2, 0, 0))));
    }

    #[test]
    fn centre_and_size_round_trip() {
        let b = BoundingBox::from_center_size(Point3::new(0.0, 0.0, 1.0), Vector3::new(0.9, 0.9, 2.0));
        assert_eq!(b.min.z, 0.0);
        assert_eq!(b.max.z, 2.0);
        assert_eq!(b.center(), Point3::new(0.0, 0.0, 1.0));
        assert_eq!(b.lattice_range(0.0), (Point3::new(-1, -1, 0), Point3::new(0, 0, 2)));
    }

    #[test]
    fn ray_entry_distances() {
        let b = BoundingBox::new(Point3::new(2.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0));
        let x = Vector3::new(1.0, 0.0, 0.0);
        assert_eq!(b.ray_entry(Point3::new(0.0, 0.5, 0.5), x), Some(2.0));
        assert_eq!(b.ray_entry(Point3::new(3.0, 0.5, 0.5), x), Some(0.0));
        assert_eq!(b.ray_entry(Point3::new(5.0, 0.5, 0.5), x), None);
        assert_eq!(b.ray_entry(Point3::new(0.0, 2.0, 0.5), x), None);
    }
}
