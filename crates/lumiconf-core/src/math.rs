//! Angle conventions and ray queries shared by the attachment and picking code.
//!
//! Junction angles are expressed in degrees around the vertical axis. A
//! junction with angle `a` faces the horizontal direction [`angle_helper`]`(a)`.

use glam::DVec3;

/// Wraps an angle in degrees into `[0, 360)`.
pub fn normalize360(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Horizontal unit direction for an angle in degrees: `(-sin a, 0, cos a)`.
pub fn angle_helper(angle: f64) -> DVec3 {
    let radians = angle.to_radians();
    DVec3::new(-radians.sin(), 0.0, radians.cos())
}

/// Inverse of [`angle_helper`]: the angle in degrees a horizontal direction faces.
///
/// Returns `None` when the direction has no horizontal component.
pub fn direction_angle(direction: DVec3) -> Option<f64> {
    if direction.x.abs() < f64::EPSILON && direction.z.abs() < f64::EPSILON {
        return None;
    }
    Some(normalize360((-direction.x).atan2(direction.z).to_degrees()))
}

/// A half-line used for pointer picking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: DVec3,
    /// Unit direction.
    pub direction: DVec3,
}

impl Ray {
    /// Creates a ray, normalizing the direction.
    pub fn new(origin: DVec3, direction: DVec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at parameter `t` along the ray.
    pub fn at(&self, t: f64) -> DVec3 {
        self.origin + self.direction * t
    }

    /// Nearest non-negative hit distance against a sphere.
    pub fn intersect_sphere(&self, center: DVec3, radius: f64) -> Option<f64> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let t0 = -b - sqrt_d;
        let t1 = -b + sqrt_d;
        if t0 >= 0.0 {
            Some(t0)
        } else if t1 >= 0.0 {
            Some(t1)
        } else {
            None
        }
    }

    /// Closest approach between the ray and the segment `a..b`.
    ///
    /// Returns `(distance, ray_t, segment_point)`.
    pub fn closest_to_segment(&self, a: DVec3, b: DVec3) -> (f64, f64, DVec3) {
        let v = b - a;
        let w0 = self.origin - a;
        let bv = self.direction.dot(v);
        let cv = v.length_squared();
        let d = self.direction.dot(w0);
        let e = v.dot(w0);

        if cv < f64::EPSILON {
            let t = (-d).max(0.0);
            return (self.at(t).distance(a), t, a);
        }

        let denom = cv - bv * bv;
        let mut s = if denom.abs() < f64::EPSILON {
            0.0
        } else {
            ((e - bv * d) / denom).clamp(0.0, 1.0)
        };
        let mut t = s * bv - d;
        if t < 0.0 {
            t = 0.0;
            s = (e / cv).clamp(0.0, 1.0);
        }
        let on_segment = a + v * s;
        (self.at(t).distance(on_segment), t, on_segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize360_range() {
        for angle in [-720.0, -360.0, -270.5, -1.0, 0.0, 45.0, 359.9, 360.0, 725.0] {
            let n = normalize360(angle);
            assert!((0.0..360.0).contains(&n), "{angle} -> {n}");
        }
        assert_eq!(normalize360(-90.0), 270.0);
        assert_eq!(normalize360(450.0), 90.0);
    }

    #[test]
    fn test_angle_helper_axes() {
        let forward = angle_helper(0.0);
        assert!((forward - DVec3::Z).length() < 1e-12);
        let left = angle_helper(90.0);
        assert!((left - DVec3::NEG_X).length() < 1e-12);
    }

    #[test]
    fn test_direction_angle_inverts_helper() {
        for angle in [0.0, 30.0, 90.0, 181.0, 270.0] {
            let back = direction_angle(angle_helper(angle)).unwrap();
            assert!((back - angle).abs() < 1e-9);
        }
        assert!(direction_angle(DVec3::Y).is_none());
    }

    #[test]
    fn test_ray_sphere() {
        let ray = Ray::new(DVec3::new(0.0, 0.0, -10.0), DVec3::Z);
        let t = ray.intersect_sphere(DVec3::ZERO, 1.0).unwrap();
        assert!((t - 9.0).abs() < 1e-12);
        assert!(ray.intersect_sphere(DVec3::new(5.0, 0.0, 0.0), 1.0).is_none());
        // Sphere behind the origin
        assert!(ray.intersect_sphere(DVec3::new(0.0, 0.0, -20.0), 1.0).is_none());
    }

    #[test]
    fn test_ray_segment_distance() {
        let ray = Ray::new(DVec3::new(0.0, 1.0, -5.0), DVec3::Z);
        let (distance, t, point) =
            ray.closest_to_segment(DVec3::new(-1.0, 0.0, 0.0), DVec3::new(1.0, 0.0, 0.0));
        assert!((distance - 1.0).abs() < 1e-12);
        assert!((t - 5.0).abs() < 1e-12);
        assert!(point.length() < 1e-12);
    }
}
