//! Producer-side box state and the lap sampling rules.
//!
//! A particle lives for one lap of [`LAP_LENGTH`] ticks. During a lap its
//! velocity and dimensions are constant, its position integrates linearly and
//! its yaw advances by [`ROTATION_DELTA`]. The last tick of the lap replaces
//! every field except the id with a fresh sample.

use super::snapshot::{Dimensions, EntityState};
use glam::Vec3;
use rand::Rng;
use std::f32::consts::TAU;
use std::ops::Range;

/// Ticks per lap, including the resetting tick.
pub const LAP_LENGTH: u32 = 100;

/// Yaw added on every integration tick (radians).
pub const ROTATION_DELTA: f32 = 0.01;

pub const SPAWN_XZ: Range<f32> = -50.0..50.0;
pub const SPAWN_Y: Range<f32> = 0.0..10.0;
pub const DIMENSION_RANGE: Range<f32> = 1.0..5.0;
pub const ROTATION_RANGE: Range<f32> = 0.0..TAU;
pub const VELOCITY_XZ: Range<f32> = -0.1..0.1;
pub const VELOCITY_Y: Range<f32> = -0.05..0.05;

/// Full kinematic state of one box. Never leaves the simulation thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: u32,
    pub position: Vec3,
    pub dimensions: Dimensions,
    pub rotation_y: f32,
    pub velocity: Vec3,
    /// Tick counter within the current lap (0..LAP_LENGTH).
    pub step: u32,
}

impl Particle {
    /// Sample a fresh particle at the start of a lap.
    pub fn spawn<R: Rng + ?Sized>(id: u32, rng: &mut R) -> Self {
        Self {
            id,
            position: Vec3::new(
                rng.gen_range(SPAWN_XZ),
                rng.gen_range(SPAWN_Y),
                rng.gen_range(SPAWN_XZ),
            ),
            dimensions: Dimensions::new(
                rng.gen_range(DIMENSION_RANGE),
                rng.gen_range(DIMENSION_RANGE),
                rng.gen_range(DIMENSION_RANGE),
            ),
            rotation_y: rng.gen_range(ROTATION_RANGE),
            velocity: Vec3::new(
                rng.gen_range(VELOCITY_XZ),
                rng.gen_range(VELOCITY_Y),
                rng.gen_range(VELOCITY_XZ),
            ),
            step: 0,
        }
    }

    /// Replace every field but the id with a fresh sample.
    pub fn respawn<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Self::spawn(self.id, rng);
    }

    /// Whether the next tick closes the lap.
    pub fn lap_complete(&self) -> bool {
        self.step + 1 >= LAP_LENGTH
    }

    /// Advance one tick. Returns `true` if the particle was reset.
    pub fn advance<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.lap_complete() {
            self.respawn(rng);
            return true;
        }

        self.position += self.velocity;
        self.rotation_y += ROTATION_DELTA;
        self.step += 1;
        false
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.dimensions.as_scale().is_finite()
            && self.rotation_y.is_finite()
    }

    /// Public view of this particle.
    pub fn entity(&self) -> EntityState {
        EntityState {
            id: self.id,
            position: self.position,
            dimensions: self.dimensions,
            rotation_y: self.rotation_y,
        }
    }
}

#[cfg(test)]
pub(crate) fn assert_freshly_sampled(p: &Particle) {
    assert_eq!(p.step, 0);
    assert!(SPAWN_XZ.contains(&p.position.x), "x out of range: {}", p.position.x);
    assert!(SPAWN_Y.contains(&p.position.y), "y out of range: {}", p.position.y);
    assert!(SPAWN_XZ.contains(&p.position.z), "z out of range: {}", p.position.z);
    for d in [p.dimensions.w, p.dimensions.h, p.dimensions.l] {
        assert!(DIMENSION_RANGE.contains(&d), "dimension out of range: {}", d);
    }
    assert!(ROTATION_RANGE.contains(&p.rotation_y));
    assert!(VELOCITY_XZ.contains(&p.velocity.x));
    assert!(VELOCITY_Y.contains(&p.velocity.y));
    assert!(VELOCITY_XZ.contains(&p.velocity.z));
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_advance_integrates_linearly() {
        let mut rng = SmallRng::seed_from_u64(1);
        let mut p = Particle::spawn(3, &mut rng);
        let start = p.clone();

        assert!(!p.advance(&mut rng));
        assert_eq!(p.position, start.position + start.velocity);
        assert_eq!(p.rotation_y, start.rotation_y + ROTATION_DELTA);
        assert_eq!(p.velocity, start.velocity);
        assert_eq!(p.dimensions, start.dimensions);
        assert_eq!(p.step, 1);
    }

    #[test]
    fn test_lap_resets_on_hundredth_tick() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut p = Particle::spawn(42, &mut rng);
        let start = p.clone();

        for tick in 1..LAP_LENGTH {
            assert!(!p.advance(&mut rng), "early reset at tick {}", tick);
        }
        assert_eq!(p.step, LAP_LENGTH - 1);
        assert_eq!(p.dimensions, start.dimensions);

        assert!(p.advance(&mut rng));
        assert_eq!(p.id, 42);
        assert_freshly_sampled(&p);
        assert_ne!(p.velocity, start.velocity);
    }

    #[test]
    fn test_entity_exposes_public_fields() {
        let mut rng = SmallRng::seed_from_u64(3);
        let p = Particle::spawn(9, &mut rng);
        let e = p.entity();

        assert_eq!(e.id, 9);
        assert_eq!(e.position, p.position);
        assert_eq!(e.dimensions, p.dimensions);
        assert_eq!(e.rotation_y, p.rotation_y);
    }

    proptest! {
        #[test]
        fn prop_spawn_within_ranges(seed in any::<u64>(), id in 0u32..10_000) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let p = Particle::spawn(id, &mut rng);
            prop_assert_eq!(p.id, id);
            prop_assert!(p.is_finite());
            assert_freshly_sampled(&p);
        }
    }
}
