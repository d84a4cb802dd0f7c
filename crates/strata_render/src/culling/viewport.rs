//! Camera snapshot used by one frame of culling and drawing.

use strata_core::SectionPos;

use super::frustum::Frustum;

/// Camera position split into an integer block and a sub-block offset.
///
/// Geometry is positioned relative to the integer part, and the fractional
/// part is subtracted on the GPU side, so large world coordinates never lose
/// single-precision accuracy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraTransform {
    /// Block X containing the camera.
    pub int_x: i32,
    /// Block Y containing the camera.
    pub int_y: i32,
    /// Block Z containing the camera.
    pub int_z: i32,
    /// Offset inside the block, `0.0..1.0`.
    pub frac_x: f32,
    /// Offset inside the block, `0.0..1.0`.
    pub frac_y: f32,
    /// Offset inside the block, `0.0..1.0`.
    pub frac_z: f32,
}

impl CameraTransform {
    /// Splits a world position.
    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        let (int_x, frac_x) = split(x);
        let (int_y, frac_y) = split(y);
        let (int_z, frac_z) = split(z);

        Self {
            int_x,
            int_y,
            int_z,
            frac_x,
            frac_y,
            frac_z,
        }
    }

    /// Section containing the camera.
    #[inline]
    #[must_use]
    pub const fn section_pos(&self) -> SectionPos {
        SectionPos::from_block(self.int_x, self.int_y, self.int_z)
    }

    /// World position of the camera.
    #[must_use]
    pub fn position(&self) -> [f64; 3] {
        [
            f64::from(self.int_x) + f64::from(self.frac_x),
            f64::from(self.int_y) + f64::from(self.frac_y),
            f64::from(self.int_z) + f64::from(self.frac_z),
        ]
    }
}

#[allow(clippy::cast_possible_truncation)]
fn split(value: f64) -> (i32, f32) {
    let int = value.floor();
    (int as i32, (value - int) as f32)
}

/// Frustum plus camera transform for the current frame.
///
/// The frustum planes are relative to the camera position.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Viewport {
    frustum: Frustum,
    transform: CameraTransform,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(frustum: Frustum, transform: CameraTransform) -> Self {
        Self { frustum, transform }
    }

    /// Camera transform.
    #[inline]
    #[must_use]
    pub const fn transform(&self) -> &CameraTransform {
        &self.transform
    }

    /// Camera-relative frustum.
    #[inline]
    #[must_use]
    pub const fn frustum(&self) -> &Frustum {
        &self.frustum
    }

    /// Section containing the camera.
    #[inline]
    #[must_use]
    pub const fn chunk_coord(&self) -> SectionPos {
        self.transform.section_pos()
    }

    /// Tests a world-space box given by center and half extents.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn is_box_visible(&self, center: [f64; 3], half_x: f32, half_y: f32, half_z: f32) -> bool {
        let t = &self.transform;
        let relative = [
            ((center[0] - f64::from(t.int_x)) as f32) - t.frac_x,
            ((center[1] - f64::from(t.int_y)) as f32) - t.frac_y,
            ((center[2] - f64::from(t.int_z)) as f32) - t.frac_z,
        ];

        self.frustum.test_box(relative, [half_x, half_y, half_z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling::Plane;

    #[test]
    fn test_split_negative_coordinates() {
        let transform = CameraTransform::new(-0.25, 17.5, -16.0);
        assert_eq!(transform.int_x, -1);
        assert!((transform.frac_x - 0.75).abs() < 1e-6);
        assert_eq!(transform.int_y, 17);
        assert_eq!(transform.int_z, -16);
        assert_eq!(transform.frac_z, 0.0);
        assert_eq!(transform.section_pos(), SectionPos::new(-1, 1, -1));
    }

    #[test]
    fn test_box_is_tested_relative_to_camera() {
        // Keep only boxes in front of the camera along +X.
        let mut frustum = Frustum::infinite();
        frustum.planes[Frustum::NEAR] = Plane::new(1.0, 0.0, 0.0, 0.0);

        let viewport = Viewport::new(frustum, CameraTransform::new(1000.5, 64.0, 0.0));
        assert!(viewport.is_box_visible([1010.0, 64.0, 0.0], 1.0, 1.0, 1.0));
        assert!(!viewport.is_box_visible([990.0, 64.0, 0.0], 1.0, 1.0, 1.0));
    }
}
