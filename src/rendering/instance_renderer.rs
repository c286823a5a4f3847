//! CPU-side instance transform pass.
//!
//! Runs once per display frame. Reads the store's current snapshot, composes
//! one model matrix per entity and writes it to the slot matching the
//! entity's position in the snapshot. The GPU upload of the result is done by
//! [`super::box_renderer::BoxRenderer`].

use super::CAPACITY;
use crate::pipeline::StateStore;
use crate::simulation::EntityState;
use glam::{Mat4, Quat};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("snapshot of {len} entities exceeds instance capacity {capacity}")]
    CapacityExceeded { len: usize, capacity: usize },
    #[error("entity {id} has a non-finite transform")]
    NonFiniteEntity { id: u32 },
}

/// Fixed-capacity array of per-instance model matrices.
pub struct InstanceBuffer {
    transforms: Vec<Mat4>,
    count: usize,
    dirty: bool,
}

impl InstanceBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            transforms: vec![Mat4::IDENTITY; capacity],
            count: 0,
            dirty: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.transforms.len()
    }

    /// Number of instances drawn.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Active transforms (`0..count`).
    pub fn active(&self) -> &[Mat4] {
        &self.transforms[..self.count]
    }

    pub fn set(&mut self, slot: usize, transform: Mat4) {
        self.transforms[slot] = transform;
    }

    pub fn set_count(&mut self, count: usize) {
        debug_assert!(count <= self.capacity());
        self.count = count;
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Hand the active transforms to `upload` if they changed, then reset
    /// the dirty flag. Returns whether an upload happened.
    pub fn flush(&mut self, upload: impl FnOnce(&[Mat4])) -> bool {
        if !self.dirty {
            return false;
        }
        upload(&self.transforms[..self.count]);
        self.dirty = false;
        true
    }
}

/// translation(position) · rotationY(rotation_y) · scale(dimensions)
pub fn compose_transform(entity: &EntityState) -> Mat4 {
    Mat4::from_scale_rotation_translation(
        entity.dimensions.as_scale(),
        Quat::from_rotation_y(entity.rotation_y),
        entity.position,
    )
}

pub struct InstanceRenderer {
    buffer: InstanceBuffer,
}

impl InstanceRenderer {
    pub fn new() -> Self {
        Self::with_capacity(CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: InstanceBuffer::with_capacity(capacity),
        }
    }

    pub fn buffer(&self) -> &InstanceBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut InstanceBuffer {
        &mut self.buffer
    }

    /// Rebuild the instance buffer from the store's current snapshot.
    ///
    /// A snapshot larger than the buffer, or one holding a non-finite entity,
    /// leaves the buffer untouched and is reported as an error.
    pub fn render_frame(&mut self, store: &StateStore) -> Result<usize, RenderError> {
        let snapshot = store.current();
        self.write_snapshot(&snapshot)
    }

    pub fn write_snapshot(&mut self, entities: &[EntityState]) -> Result<usize, RenderError> {
        let capacity = self.buffer.capacity();
        if entities.len() > capacity {
            return Err(RenderError::CapacityExceeded {
                len: entities.len(),
                capacity,
            });
        }
        if let Some(bad) = entities.iter().find(|e| !e.is_finite()) {
            return Err(RenderError::NonFiniteEntity { id: bad.id });
        }

        for (slot, entity) in entities.iter().enumerate() {
            self.buffer.set(slot, compose_transform(entity));
        }
        self.buffer.set_count(entities.len());
        self.buffer.mark_dirty();
        Ok(entities.len())
    }
}

impl Default for InstanceRenderer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::Dimensions;
    use glam::Vec3;
    use proptest::prelude::*;
    use std::f32::consts::{FRAC_PI_2, PI, TAU};

    fn entity(id: u32, x: f32, rotation_y: f32) -> EntityState {
        EntityState {
            id,
            position: Vec3::new(x, 2.0, -3.0),
            dimensions: Dimensions::new(2.0, 3.0, 4.0),
            rotation_y,
        }
    }

    /// Inverse of `compose_transform` for a pure Y rotation.
    /// Returns (translation, rotation_y in (-π, π], scale).
    fn decompose_transform(m: &Mat4) -> (Vec3, f32, Vec3) {
        let translation = m.w_axis.truncate();
        let scale = Vec3::new(
            m.x_axis.truncate().length(),
            m.y_axis.truncate().length(),
            m.z_axis.truncate().length(),
        );
        // Column 0 is (cos θ, 0, −sin θ) · w.
        let rotation_y = (-m.x_axis.z).atan2(m.x_axis.x);
        (translation, rotation_y, scale)
    }

    fn wrap_angle(a: f32) -> f32 {
        let r = a.rem_euclid(TAU);
        if r > PI { r - TAU } else { r }
    }

    #[test]
    fn test_compose_order() {
        let e = entity(0, 1.0, FRAC_PI_2);
        let m = compose_transform(&e);

        // Local +X is scaled by w, then yawed a quarter turn onto -Z, then translated.
        let p = m.transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 2.0, -5.0)).length() < 1e-5, "got {:?}", p);

        // Y stays vertical and scales by h.
        let up = m.transform_vector3(Vec3::Y);
        assert!((up - Vec3::new(0.0, 3.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_slots_follow_snapshot_order() {
        let mut renderer = InstanceRenderer::with_capacity(8);
        // Ids deliberately out of order: slots follow array position.
        let entities = vec![entity(5, 10.0, 0.0), entity(2, 20.0, 0.0)];

        assert_eq!(renderer.write_snapshot(&entities), Ok(2));
        let buffer = renderer.buffer();
        assert_eq!(buffer.count(), 2);
        assert!(buffer.is_dirty());
        assert_eq!(buffer.active()[0].w_axis.x, 10.0);
        assert_eq!(buffer.active()[1].w_axis.x, 20.0);
    }

    #[test]
    fn test_empty_store_draws_nothing() {
        let store = StateStore::new();
        let mut renderer = InstanceRenderer::with_capacity(8);
        renderer.write_snapshot(&[entity(0, 0.0, 0.0)]).unwrap();

        assert_eq!(renderer.render_frame(&store), Ok(0));
        assert_eq!(renderer.buffer().count(), 0);
    }

    #[test]
    fn test_same_snapshot_redrawn() {
        let mut store = StateStore::new();
        store.update(vec![entity(0, 1.0, 0.5), entity(1, 2.0, 0.5)]);
        let mut renderer = InstanceRenderer::with_capacity(8);

        renderer.render_frame(&store).unwrap();
        let first: Vec<Mat4> = renderer.buffer().active().to_vec();
        renderer.render_frame(&store).unwrap();
        assert_eq!(renderer.buffer().active(), first.as_slice());
    }

    #[test]
    fn test_capacity_exceeded_is_reported() {
        let mut renderer = InstanceRenderer::with_capacity(2);
        renderer.write_snapshot(&[entity(0, 7.0, 0.0)]).unwrap();
        assert!(renderer.buffer_mut().flush(|_| {}));

        let too_many: Vec<EntityState> = (0..3).map(|i| entity(i, i as f32, 0.0)).collect();
        assert_eq!(
            renderer.write_snapshot(&too_many),
            Err(RenderError::CapacityExceeded { len: 3, capacity: 2 })
        );

        // Previous frame untouched, nothing new to upload.
        assert_eq!(renderer.buffer().count(), 1);
        assert_eq!(renderer.buffer().active()[0].w_axis.x, 7.0);
        assert!(!renderer.buffer().is_dirty());
    }

    #[test]
    fn test_non_finite_entity_is_rejected() {
        let mut renderer = InstanceRenderer::with_capacity(4);
        renderer.write_snapshot(&[entity(0, 3.0, 0.0)]).unwrap();
        renderer.buffer_mut().flush(|_| {});

        let mut bad = vec![entity(0, 1.0, 0.0), entity(1, 2.0, 0.0)];
        bad[1].position.y = f32::NAN;
        assert_eq!(
            renderer.write_snapshot(&bad),
            Err(RenderError::NonFiniteEntity { id: 1 })
        );
        assert_eq!(renderer.buffer().count(), 1);
        assert_eq!(renderer.buffer().active()[0].w_axis.x, 3.0);
        assert!(!renderer.buffer().is_dirty());
    }

    #[test]
    fn test_flush_only_when_dirty() {
        let mut buffer = InstanceBuffer::with_capacity(4);
        assert!(!buffer.flush(|_| panic!("clean buffer uploaded")));

        buffer.set(0, Mat4::from_translation(Vec3::X));
        buffer.set_count(1);
        buffer.mark_dirty();

        let mut uploaded = 0;
        assert!(buffer.flush(|active| uploaded = active.len()));
        assert_eq!(uploaded, 1);
        assert!(!buffer.is_dirty());
    }

    proptest! {
        #[test]
        fn prop_transform_round_trip(
            x in -60.0f32..60.0,
            y in -10.0f32..20.0,
            z in -60.0f32..60.0,
            w in 1.0f32..5.0,
            h in 1.0f32..5.0,
            l in 1.0f32..5.0,
            rotation_y in 0.0f32..20.0,
        ) {
            let e = EntityState {
                id: 0,
                position: Vec3::new(x, y, z),
                dimensions: Dimensions::new(w, h, l),
                rotation_y,
            };
            let (translation, angle, scale) = decompose_transform(&compose_transform(&e));

            prop_assert_eq!(translation, e.position);
            prop_assert!((scale - e.dimensions.as_scale()).abs().max_element() < 1e-5,
                "scale {:?} vs {:?}", scale, e.dimensions);
            let diff = wrap_angle(angle - rotation_y).abs();
            prop_assert!(diff < 1e-4, "angle {} vs {} (diff {})", angle, rotation_y, diff);
        }
    }
}
