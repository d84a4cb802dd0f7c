//! Frustum planes and box tests.
//!
//! Planes are extracted from a camera-relative view-projection matrix, so the
//! boxes tested against them must be relative to the camera as well (see
//! [`Viewport`](super::Viewport)).

use bytemuck::{Pod, Zeroable};

/// A plane in 3D space (Ax + By + Cz + D = 0).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct Plane {
    /// Normal X component.
    pub a: f32,
    /// Normal Y component.
    pub b: f32,
    /// Normal Z component.
    pub c: f32,
    /// Distance from origin.
    pub d: f32,
}

impl Plane {
    /// Creates a new plane.
    #[must_use]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    /// Normalizes the plane.
    #[must_use]
    pub fn normalized(self) -> Self {
        let len = (self.a * self.a + self.b * self.b + self.c * self.c).sqrt();
        if len > 0.0 {
            Self {
                a: self.a / len,
                b: self.b / len,
                c: self.c / len,
                d: self.d / len,
            }
        } else {
            self
        }
    }

    /// Returns the signed distance from a point to the plane.
    #[inline]
    #[must_use]
    pub fn distance_to_point(&self, x: f32, y: f32, z: f32) -> f32 {
        self.a * x + self.b * y + self.c * z + self.d
    }
}

/// View frustum for culling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Left, right, bottom, top, near, far planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Left plane index.
    pub const LEFT: usize = 0;
    /// Right plane index.
    pub const RIGHT: usize = 1;
    /// Bottom plane index.
    pub const BOTTOM: usize = 2;
    /// Top plane index.
    pub const TOP: usize = 3;
    /// Near plane index.
    pub const NEAR: usize = 4;
    /// Far plane index.
    pub const FAR: usize = 5;

    /// A frustum that contains every point.
    ///
    /// Useful for tests and for tools that want distance culling only.
    #[must_use]
    pub const fn infinite() -> Self {
        Self {
            planes: [Plane::new(0.0, 0.0, 0.0, 1.0); 6],
        }
    }

    /// Extracts frustum planes from a view-projection matrix.
    ///
    /// The matrix should be in column-major order (OpenGL/WGPU convention).
    #[must_use]
    pub fn from_view_projection(m: &[[f32; 4]; 4]) -> Self {
        let row = |i: usize| [m[0][i], m[1][i], m[2][i], m[3][i]];
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let combine = |a: [f32; 4], b: [f32; 4], sign: f32| {
            Plane::new(
                a[0] + sign * b[0],
                a[1] + sign * b[1],
                a[2] + sign * b[2],
                a[3] + sign * b[3],
            )
            .normalized()
        };

        let mut planes = [Plane::default(); 6];
        planes[Self::LEFT] = combine(r3, r0, 1.0);
        planes[Self::RIGHT] = combine(r3, r0, -1.0);
        planes[Self::BOTTOM] = combine(r3, r1, 1.0);
        planes[Self::TOP] = combine(r3, r1, -1.0);
        planes[Self::NEAR] = combine(r3, r2, 1.0);
        planes[Self::FAR] = combine(r3, r2, -1.0);

        Self { planes }
    }

    /// Tests a box given by center and half extents.
    #[must_use]
    pub fn test_box(&self, center: [f32; 3], half: [f32; 3]) -> bool {
        for plane in &self.planes {
            // Projection interval radius of the box onto the plane normal.
            let r = half[0] * plane.a.abs() + half[1] * plane.b.abs() + half[2] * plane.c.abs();
            let d = plane.distance_to_point(center[0], center[1], center[2]);

            if d < -r {
                return false;
            }
        }

        true
    }
}

impl Default for Frustum {
    fn default() -> Self {
        Self::infinite()
    }
}
