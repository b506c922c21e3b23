//! Camera module for picking rays and framing.

use crate::math::Ray;
use glam::DVec3;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Vertical extent of the orthographic frustum at zoom 1.
pub const ORTHO_FRUSTUM_SIZE: f64 = 1000.0;

/// Margin applied around a framed object.
pub const FRAME_PADDING: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Camera looking from `position` towards `target`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub position: DVec3,
    pub target: DVec3,
    pub up: DVec3,
    /// Vertical field of view in degrees (perspective only)
    pub fov_deg: f64,
    /// Orthographic zoom level
    pub zoom: f64,
    /// Minimum allowed zoom level
    pub min_zoom: f64,
    /// Maximum allowed zoom level
    pub max_zoom: f64,
    pub projection: Projection,
    /// Viewport size in pixels
    pub viewport: Size,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: DVec3::new(0.0, 50.0, 50.0),
            target: DVec3::ZERO,
            up: DVec3::Y,
            fov_deg: 70.0,
            zoom: 50.0,
            min_zoom: 10.0,
            max_zoom: 100.0,
            projection: Projection::Perspective,
            viewport: Size::new(1280.0, 720.0),
        }
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aspect(&self) -> f64 {
        if self.viewport.height > 0.0 {
            self.viewport.width / self.viewport.height
        } else {
            1.0
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn forward(&self) -> DVec3 {
        (self.target - self.position).normalize_or_zero()
    }

    /// Screen-right direction in world space.
    pub fn right(&self) -> DVec3 {
        self.forward().cross(self.up).normalize_or_zero()
    }

    fn screen_up(&self) -> DVec3 {
        self.right().cross(self.forward())
    }

    /// Convert a pixel position to normalized device coordinates.
    ///
    /// X grows to the right and Y grows upwards, both in `[-1, 1]`.
    pub fn screen_to_ndc(&self, screen_point: Point) -> Point {
        let width = self.viewport.width.max(1.0);
        let height = self.viewport.height.max(1.0);
        Point::new(
            screen_point.x / width * 2.0 - 1.0,
            -(screen_point.y / height) * 2.0 + 1.0,
        )
    }

    /// Picking ray through a point in normalized device coordinates.
    pub fn ray_from_ndc(&self, ndc: Point) -> Ray {
        let forward = self.forward();
        let right = self.right();
        let up = self.screen_up();
        match self.projection {
            Projection::Perspective => {
                let half_height = (self.fov_deg.to_radians() / 2.0).tan();
                let half_width = half_height * self.aspect();
                let direction = forward + right * (ndc.x * half_width) + up * (ndc.y * half_height);
                Ray::new(self.position, direction)
            }
            Projection::Orthographic => {
                let half_height = ORTHO_FRUSTUM_SIZE / 2.0 / self.zoom;
                let half_width = half_height * self.aspect();
                let origin = self.position + right * (ndc.x * half_width) + up * (ndc.y * half_height);
                Ray::new(origin, forward)
            }
        }
    }

    /// Zoom the orthographic view by a factor, clamped to the zoom range.
    pub fn zoom_by(&mut self, factor: f64) {
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
    }

    /// Move position and target together.
    pub fn pan(&mut self, delta: DVec3) {
        self.position += delta;
        self.target += delta;
    }

    /// Place the camera at `offset` from the current target.
    pub fn move_to(&mut self, offset: DVec3) {
        self.position = self.target + offset;
    }

    /// Aim at `center` from above and in front, far enough to see `radius`.
    pub fn frame(&mut self, center: DVec3, radius: f64) {
        let half_fov = (self.fov_deg.to_radians() / 2.0).tan();
        let distance = if half_fov > 0.0 { FRAME_PADDING * radius / half_fov } else { radius };
        self.target = center;
        self.position = center + DVec3::new(0.0, distance, distance);
    }

    /// Reset camera to default position and zoom.
    pub fn reset(&mut self) {
        let viewport = self.viewport;
        let projection = self.projection;
        *self = Self {
            viewport,
            projection,
            ..Self::default()
        };
    }
}
