//! Renderer-facing transform abstraction.
//!
//! The engine never touches geometry. It only needs to move, rotate and
//! scale a mesh and map local junction coordinates to world space.

use glam::{DQuat, DVec3, EulerRot};

/// Anything the engine can place in the scene.
pub trait Positionable: std::fmt::Debug {
    fn position(&self) -> DVec3;

    fn set_position(&mut self, position: DVec3);

    fn translate(&mut self, delta: DVec3) {
        let position = self.position();
        self.set_position(position + delta);
    }

    fn rotation(&self) -> DQuat;

    fn set_rotation(&mut self, rotation: DQuat);

    /// Rotate about the local vertical axis.
    fn rotate_y(&mut self, radians: f64) {
        let rotation = self.rotation() * DQuat::from_rotation_y(radians);
        self.set_rotation(rotation);
    }

    /// Replace the orientation with a pure yaw.
    fn set_yaw(&mut self, radians: f64) {
        self.set_rotation(DQuat::from_rotation_y(radians));
    }

    /// Yaw component of the current orientation, in radians.
    fn yaw(&self) -> f64 {
        self.rotation().to_euler(EulerRot::YXZ).0
    }

    fn scale(&self) -> DVec3;

    fn set_scale(&mut self, scale: DVec3);

    /// Map a point from mesh-local space to world space.
    fn local_to_world(&self, local: DVec3) -> DVec3 {
        self.position() + self.rotation() * (self.scale() * local)
    }

    fn set_opacity(&mut self, _opacity: f64) {}

    /// Radius of a sphere enclosing the mesh, in world units.
    fn bounding_radius(&self) -> f64 {
        1.0
    }

    /// Release renderer resources. The mesh is not used afterwards.
    fn dispose(&mut self) {}
}

/// Plain transform used by tests, the CLI and headless hosts.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformMesh {
    pub position: DVec3,
    pub rotation: DQuat,
    pub scale: DVec3,
    pub opacity: f64,
    /// Unscaled bounding radius.
    pub radius: f64,
    pub disposed: bool,
}

impl Default for TransformMesh {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            rotation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            opacity: 1.0,
            radius: 1.0,
            disposed: false,
        }
    }
}

impl TransformMesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_radius(radius: f64) -> Self {
        Self {
            radius,
            ..Self::default()
        }
    }

    pub fn boxed(self) -> Box<dyn Positionable> {
        Box::new(self)
    }
}

impl Positionable for TransformMesh {
    fn position(&self) -> DVec3 {
        self.position
    }

    fn set_position(&mut self, position: DVec3) {
        self.position = position;
    }

    fn rotation(&self) -> DQuat {
        self.rotation
    }

    fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation.normalize();
    }

    fn scale(&self) -> DVec3 {
        self.scale
    }

    fn set_scale(&mut self, scale: DVec3) {
        self.scale = scale;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }

    fn bounding_radius(&self) -> f64 {
        self.radius * self.scale.max_element()
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
