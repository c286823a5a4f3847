//! Public per-entity state exchanged between the simulation thread and the
//! render thread.
//!
//! Only the fields a renderer needs cross the boundary. Velocity and the lap
//! step counter stay inside [`super::particle::Particle`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Box extents along X (width), Y (height) and Z (length).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub w: f32,
    pub h: f32,
    pub l: f32,
}

impl Dimensions {
    pub const fn new(w: f32, h: f32, l: f32) -> Self {
        Self { w, h, l }
    }

    /// Dimensions as a scale vector for transform composition.
    pub fn as_scale(self) -> Vec3 {
        Vec3::new(self.w, self.h, self.l)
    }
}

/// Snapshot of one box as seen by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub id: u32,
    #[serde(with = "vec3_xyz")]
    pub position: Vec3,
    pub dimensions: Dimensions,
    #[serde(rename = "rotationY")]
    pub rotation_y: f32,
}

impl EntityState {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.dimensions.as_scale().is_finite()
            && self.rotation_y.is_finite()
    }
}

/// One tick's worth of entities, ordered by id.
pub type Snapshot = Vec<EntityState>;

/// Serializes a `Vec3` as `{ "x": .., "y": .., "z": .. }`.
mod vec3_xyz {
    use glam::Vec3;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Xyz {
        x: f32,
        y: f32,
        z: f32,
    }

    pub fn serialize<S: Serializer>(v: &Vec3, serializer: S) -> Result<S::Ok, S::Error> {
        Xyz { x: v.x, y: v.y, z: v.z }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec3, D::Error> {
        let Xyz { x, y, z } = Xyz::deserialize(deserializer)?;
        Ok(Vec3::new(x, y, z))
    }
}
