//! Sphere visibility against the view frustum
//!
//! The six clip planes are extracted from the combined projection ×
//! model-view matrix, so spheres are given in object space of the current
//! world transform.

use bitflags::bitflags;

use crate::foundation::math::{Mat4, Vec3, Vec4};

/// Result of classifying a sphere against the frustum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SphereVisibility {
    /// Entirely inside every plane
    Inside,
    /// Crosses at least one plane
    Intersecting,
    /// Entirely beyond at least one plane
    Outside,
}

bitflags! {
    /// Frustum planes a sphere is not entirely beyond
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FrustumPlanes: u8 {
        /// Left plane
        const LEFT = 1 << 0;
        /// Right plane
        const RIGHT = 1 << 1;
        /// Bottom plane
        const BOTTOM = 1 << 2;
        /// Top plane
        const TOP = 1 << 3;
        /// Near plane
        const NEAR = 1 << 4;
        /// Far plane
        const FAR = 1 << 5;
    }
}

const PLANE_ORDER: [FrustumPlanes; 6] = [
    FrustumPlanes::LEFT,
    FrustumPlanes::RIGHT,
    FrustumPlanes::BOTTOM,
    FrustumPlanes::TOP,
    FrustumPlanes::NEAR,
    FrustumPlanes::FAR,
];

/// A plane `normal · p + distance = 0`, normal pointing into the frustum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Offset from the origin along the normal
    pub distance: f32,
}

impl Plane {
    fn from_coefficients(coefficients: Vec4) -> Self {
        let normal = Vec3::new(coefficients.x, coefficients.y, coefficients.z);
        let length = normal.norm();
        if length > f32::EPSILON {
            Self { normal: normal / length, distance: coefficients.w / length }
        } else {
            Self { normal, distance: coefficients.w }
        }
    }

    /// Signed distance from a point, positive inside
    pub fn distance_to_point(&self, point: &Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// View frustum as six inward-facing planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the planes of a clip matrix
    pub fn from_clip_matrix(clip: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { clip.row(i).transpose() };
        let (x, y, z, w) = (row(0), row(1), row(2), row(3));

        Self {
            planes: [
                Plane::from_coefficients(w + x),
                Plane::from_coefficients(w - x),
                Plane::from_coefficients(w + y),
                Plane::from_coefficients(w - y),
                Plane::from_coefficients(w + z),
                Plane::from_coefficients(w - z),
            ],
        }
    }

    /// Classify a sphere
    pub fn classify_sphere(&self, center: &Vec3, radius: f32) -> SphereVisibility {
        let mut intersecting = false;
        for plane in &self.planes {
            let distance = plane.distance_to_point(center);
            if distance < -radius {
                return SphereVisibility::Outside;
            }
            if distance < radius {
                intersecting = true;
            }
        }

        if intersecting {
            SphereVisibility::Intersecting
        } else {
            SphereVisibility::Inside
        }
    }

    /// Planes the sphere is not entirely beyond; all six means visible
    pub fn plane_mask(&self, center: &Vec3, radius: f32) -> FrustumPlanes {
        self.planes
            .iter()
            .zip(PLANE_ORDER)
            .filter(|(plane, _)| plane.distance_to_point(center) >= -radius)
            .fold(FrustumPlanes::empty(), |mask, (_, flag)| mask | flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Mat4Ext;
    use approx::assert_relative_eq;

    fn camera_frustum() -> Frustum {
        // camera at the origin looking down -Z, near 1, far 100
        let projection = Mat4::perspective_gl(std::f32::consts::FRAC_PI_2, 1.0, 1.0, 100.0);
        Frustum::from_clip_matrix(&projection)
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in camera_frustum().planes {
            assert_relative_eq!(plane.normal.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_sphere_inside() {
        let frustum = camera_frustum();
        let center = Vec3::new(0.0, 0.0, -50.0);
        assert_eq!(frustum.classify_sphere(&center, 1.0), SphereVisibility::Inside);
        assert_eq!(frustum.plane_mask(&center, 1.0), FrustumPlanes::all());
    }

    #[test]
    fn test_sphere_outside() {
        let frustum = camera_frustum();
        let behind = Vec3::new(0.0, 0.0, 10.0);
        assert_eq!(frustum.classify_sphere(&behind, 1.0), SphereVisibility::Outside);
        assert!(!frustum.plane_mask(&behind, 1.0).contains(FrustumPlanes::NEAR));

        let beyond_far = Vec3::new(0.0, 0.0, -200.0);
        assert_eq!(frustum.classify_sphere(&beyond_far, 5.0), SphereVisibility::Outside);
    }

    #[test]
    fn test_sphere_straddling_one_plane() {
        let frustum = camera_frustum();
        // the far plane sits at z = -100
        let center = Vec3::new(0.0, 0.0, -100.0);
        assert_eq!(frustum.classify_sphere(&center, 2.0), SphereVisibility::Intersecting);
        assert_eq!(frustum.plane_mask(&center, 2.0), FrustumPlanes::all());
    }
}
