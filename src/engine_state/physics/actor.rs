//! # Actor
//!
//! A box-shaped body integrated at a fixed timestep: gravity pulls along -z,
//! horizontal velocity decays by a constant drag factor, and every tick's motion
//! is passed through the `CollisionResolver` before it is applied.

use cgmath::{Point3, Vector2, Vector3};

use super::{
    bounding_box::BoundingBox,
    collision::{CollisionResolver, CollisionResult, SolidBlocks},
};

/// Downward acceleration, in blocks per second squared.
pub const GRAVITY: f32 = 80.0;
/// Factor applied to horizontal velocity after every tick.
pub const DRAG: f32 = 0.98;
/// Upward speed of a jump, as a fraction of `GRAVITY`.
pub const JUMP_STRENGTH: f32 = 0.18;
/// Width, depth and height of a player-sized actor.
pub const ACTOR_SIZE: Vector3<f32> = Vector3::new(0.9, 0.9, 2.0);

/// A moving body that collides with the world.
#[derive(Debug, Clone)]
pub struct Actor {
    bounds: BoundingBox,
    /// Current velocity, in blocks per second.
    pub velocity: Vector3<f32>,
    grounded: [bool; 3],
    walk: Vector2<f32>,
    jump_requested: bool,
}

impl Actor {
    /// Creates a player-sized actor standing with its feet at `feet`.
    pub fn new(feet: Point3<f32>) -> Self {
        Self::with_size(feet, ACTOR_SIZE)
    }

    /// Creates an actor of the given size with the bottom centre of its box at `feet`.
    pub fn with_size(feet: Point3<f32>, size: Vector3<f32>) -> Self {
        let center = feet + Vector3::new(0.0, 0.0, size.z / 2.0);
        Actor {
            bounds: BoundingBox::from_center_size(center, size),
            velocity: Vector3::new(0.0, 0.0, 0.0),
            grounded: [false; 3],
            walk: Vector2::new(0.0, 0.0),
            jump_requested: false,
        }
    }

    /// Current world-space bounding box.
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Bottom centre of the actor's box.
    pub fn feet(&self) -> Point3<f32> {
        let center = self.bounds.center();
        Point3::new(center.x, center.y, self.bounds.min.z)
    }

    /// Per-axis grounded flags from the last step.
    pub fn grounded(&self) -> [bool; 3] {
        self.grounded
    }

    /// `true` if the actor is standing on something.
    pub fn on_ground(&self) -> bool {
        self.grounded[2]
    }

    /// Sets the horizontal acceleration applied on every following step.
    pub fn set_walk(&mut self, acceleration: Vector2<f32>) {
        self.walk = acceleration;
    }

    /// Requests a jump on the next step. Ignored unless the actor is on the ground then.
    pub fn jump(&mut self) {
        self.jump_requested = true;
    }

    /// Moves the actor's feet to `feet` and stops it.
    pub fn teleport(&mut self, feet: Point3<f32>) {
        let offset = feet - self.feet();
        self.bounds.translate(offset);
        self.velocity = Vector3::new(0.0, 0.0, 0.0);
        self.grounded = [false; 3];
    }

    /// Advances the actor by one tick.
    ///
    /// # Arguments
    /// * `dt` - Tick length in seconds
    /// * `world` - Solid blocks to collide with
    /// * `resolver` - Collision resolver
    ///
    /// # Returns
    /// The collision result of the tick, already applied to the actor.
    pub fn step<W: SolidBlocks + ?Sized>(
        &mut self,
        dt: f32,
        world: &W,
        resolver: &CollisionResolver,
    ) -> CollisionResult {
        self.velocity.x += self.walk.x * dt;
        self.velocity.y += self.walk.y * dt;
        self.velocity.z -= GRAVITY * dt;
        if std::mem::take(&mut self.jump_requested) && self.grounded[2] {
            self.velocity.z = JUMP_STRENGTH * GRAVITY;
        }

        let result = resolver.resolve(world, self.bounds, self.velocity * dt, self.grounded);
        self.bounds = result.resolved;
        for axis in 0..3 {
            if result.grounded[axis] {
                self.velocity[axis] = 0.0;
            }
        }
        self.grounded = result.grounded;

        self.velocity.x *= DRAG;
        self.velocity.y *= DRAG;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Floor;

    impl SolidBlocks for Floor {
        fn solid_blocks_in_box(&self, min: Point3<i32>, max: Point3<i32>) -> Vec<Point3<i32>> {
            if min.z > 0 || max.z < 0 {
                return Vec::new();
            }
            let mut points = Vec::new();
            for x in min.x..=max.x {
                for y in min.y..=max.y {
                    points.push(Point3::new(x, y, 0));
                }
            }
            points
        }
    }

    #[test]
    fn lands_on_the_floor_and_stops() {
        let resolver = CollisionResolver::default();
        let mut actor = Actor::new(Point3::new(0.5, 0.5, 1.05));
        let result = actor.step(0.05, &Floor, &resolver);

        assert!(result.grounded[2]);
        assert!(actor.on_ground());
        assert_eq!(actor.velocity.z, 0.0);
        assert!((actor.feet().z - 1.0).abs() < 1e-4);
    }

    #[test]
    fn falls_and_settles_without_tunnelling() {
        let resolver = CollisionResolver::default();
        let mut actor = Actor::new(Point3::new(0.5, 0.5, 5.0));
        for _ in 0..240 {
            actor.step(1.0 / 60.0, &Floor, &resolver);
        }
        assert!(actor.on_ground());
        assert!((actor.feet().z - 1.0).abs() < 1e-3);
    }

    #[test]
    fn jumps_only_from_the_ground() {
        let resolver = CollisionResolver::default();
        let mut actor = Actor::new(Point3::new(0.5, 0.5, 3.0));
        actor.jump();
        actor.step(0.01, &Floor, &resolver);
        assert!(actor.velocity.z < 0.0);

        actor.teleport(Point3::new(0.5, 0.5, 1.05));
        actor.step(0.05, &Floor, &resolver);
        assert!(actor.on_ground());

        actor.jump();
        actor.step(0.05, &Floor, &resolver);
        assert!(!actor.on_ground());
        assert!(actor.velocity.z > 0.0);
        assert!(actor.feet().z > 1.0);
    }

    #[test]
    fn drag_slows_horizontal_motion() {
        let resolver = CollisionResolver::default();
        let mut actor = Actor::new(Point3::new(0.5, 0.5, 1.0));
        actor.velocity = Vector3::new(10.0, 0.0, 0.0);
        actor.step(0.01, &Floor, &resolver);
        assert!((actor.velocity.x - 10.0 * DRAG).abs() < 1e-4);
        assert!(actor.feet().x > 0.5);
    }
}
