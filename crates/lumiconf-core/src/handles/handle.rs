//! Handle definitions.

use crate::curve::QuadBezier3;
use crate::math::{Ray, angle_helper};
use crate::object::ObjectId;
use glam::DVec3;
use peniko::Color;

/// Sphere radius of a point handle at scale 1.
pub const HANDLE_RADIUS: f64 = 0.5;
/// Tube radius of a line handle.
pub const LINE_HANDLE_RADIUS: f64 = 0.1;
/// Segments used to approximate a line handle tube.
pub const LINE_HANDLE_SEGMENTS: usize = 64;
/// Points in a curve preview.
pub const CURVE_PREVIEW_POINTS: usize = 100;

pub const ENABLED_COLOR: Color = Color::from_rgba8(0xfe, 0xca, 0x0a, 0xff);
pub const HOVER_COLOR: Color = Color::from_rgba8(0xe0, 0xb0, 0x00, 0xff);
pub const DISABLED_COLOR: Color = Color::from_rgba8(0xff, 0x00, 0x00, 0xff);

/// What a click on an enabled handle connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandleTarget {
    /// Scene object carrying the junction.
    pub other: ObjectId,
    /// Junction (or line junction) index on `other`.
    pub other_junction: usize,
    /// Compatible junction index on the object being placed.
    pub selected_junction: Option<usize>,
}

/// A sphere at a point junction.
#[derive(Debug, Clone, PartialEq)]
pub struct PointHandle {
    /// World position of the junction.
    pub position: DVec3,
    /// Multiplier on [`HANDLE_RADIUS`], set from the camera zoom.
    pub scale: f64,
    /// Shown in red, never attaches.
    pub disabled: bool,
    /// Placement preview with no target.
    pub temporary: bool,
    /// What a click connects (`None` for disabled and temporary handles).
    pub target: Option<HandleTarget>,
    /// Current display color.
    pub color: Color,
}

impl PointHandle {
    pub fn new(position: DVec3, target: Option<HandleTarget>) -> Self {
        Self {
            position,
            scale: 1.0,
            disabled: false,
            temporary: false,
            target,
            color: ENABLED_COLOR,
        }
    }

    pub fn disabled(position: DVec3) -> Self {
        Self {
            disabled: true,
            color: DISABLED_COLOR,
            ..Self::new(position, None)
        }
    }

    pub fn radius(&self) -> f64 {
        HANDLE_RADIUS * self.scale
    }

    /// Ray hit distance and point.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, DVec3)> {
        let t = ray.intersect_sphere(self.position, self.radius())?;
        Some((t, ray.at(t)))
    }
}

/// A tube along a line junction.
#[derive(Debug, Clone, PartialEq)]
pub struct LineHandle {
    /// World-space curve of the line junction.
    pub curve: QuadBezier3,
    /// Shown in red, never attaches.
    pub disabled: bool,
    /// Line junction this handle stands for.
    pub target: HandleTarget,
    /// Where the pointer last touched the tube.
    pub clicked_point: Option<DVec3>,
    /// Current display color.
    pub color: Color,
}

impl LineHandle {
    pub fn new(curve: QuadBezier3, target: HandleTarget, disabled: bool) -> Self {
        Self {
            curve,
            disabled,
            target,
            clicked_point: None,
            color: if disabled { DISABLED_COLOR } else { ENABLED_COLOR },
        }
    }

    /// Ray hit distance and the touched point on the curve.
    ///
    /// Neighbouring segments within the tube radius can tie on ray distance,
    /// so the segment passing closest to the ray wins.
    pub fn intersect(&self, ray: &Ray) -> Option<(f64, DVec3)> {
        let points = self.curve.spaced_points(LINE_HANDLE_SEGMENTS);
        points
            .windows(2)
            .map(|pair| ray.closest_to_segment(pair[0], pair[1]))
            .filter(|&(distance, _, _)| distance <= LINE_HANDLE_RADIUS)
            .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
            .map(|(_, t, point)| (t, point))
    }
}

/// Arrow showing a junction direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleArrow {
    pub position: DVec3,
    /// Unit vector on the XZ plane.
    pub direction: DVec3,
    pub visible: bool,
}

impl Default for AngleArrow {
    fn default() -> Self {
        Self {
            position: DVec3::ZERO,
            direction: angle_helper(0.0),
            visible: false,
        }
    }
}

/// Polyline preview of a curve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurvePreview {
    pub points: Vec<DVec3>,
}

impl CurvePreview {
    pub fn from_curve(curve: &QuadBezier3) -> Self {
        Self {
            points: curve.spaced_points(CURVE_PREVIEW_POINTS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rail() -> LineHandle {
        let curve = QuadBezier3::new(DVec3::ZERO, DVec3::new(5.0, 0.0, 0.0), DVec3::new(10.0, 0.0, 0.0));
        let target = HandleTarget { other: ObjectId::nil(), other_junction: 0, selected_junction: Some(0) };
        LineHandle::new(curve, target, false)
    }

    #[test]
    fn test_line_hit_is_under_the_ray() {
        let handle = rail();
        for x in [2.5, 3.95, 4.0, 4.03, 7.3] {
            let ray = Ray::new(DVec3::new(x, 20.0, 0.0), DVec3::NEG_Y);
            let (t, point) = handle.intersect(&ray).unwrap();
            assert!((point.x - x).abs() < 1e-9, "x = {x}, hit = {point:?}");
            assert!((t - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_line_miss_outside_tube() {
        let handle = rail();
        let ray = Ray::new(DVec3::new(4.0, 20.0, 0.5), DVec3::NEG_Y);
        assert!(handle.intersect(&ray).is_none());
    }

    #[test]
    fn test_point_handle_radius_scales() {
        let mut handle = PointHandle::new(DVec3::ZERO, None);
        handle.scale = 2.0;
        let ray = Ray::new(DVec3::new(0.9, 20.0, 0.0), DVec3::NEG_Y);
        assert!(handle.intersect(&ray).is_some());
        handle.scale = 1.0;
        assert!(handle.intersect(&ray).is_none());
    }
}
