// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The placement data a source hands to the pipeline.

use crate::error::DecalError;
use mural_core::math::{Aabb, Mat4, Vec3};
use mural_core::renderer::MaterialId;
use serde::{Deserialize, Serialize};

/// Fade parameters of a decal projector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalFade {
    /// Global opacity multiplier, in `[0, 1]`.
    pub fade_factor: f32,
    /// Distance from the camera beyond which this decal is culled.
    pub draw_distance: f32,
    /// Fraction of `draw_distance` over which the decal fades out, in `[0, 1]`.
    pub fade_scale: f32,
    /// Angle in degrees between surface and projection at which fading starts.
    pub start_angle_fade: f32,
    /// Angle in degrees at which the decal is fully faded.
    pub end_angle_fade: f32,
}

impl Default for DecalFade {
    fn default() -> Self {
        Self {
            fade_factor: 1.0,
            draw_distance: 1000.0,
            fade_scale: 0.9,
            start_angle_fade: 180.0,
            end_angle_fade: 180.0,
        }
    }
}

/// A snapshot of everything the pipeline caches about one decal placement.
///
/// The decal projects along its local Z axis through a box of `size`,
/// offset from the placement origin by `pivot`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalDescriptor {
    /// Local-to-world transform of the placement object.
    pub transform: Mat4,
    /// Size of the projection box.
    pub size: Vec3,
    /// Offset of the projection box center in local space.
    pub pivot: Vec3,
    /// The material the decal is drawn with.
    pub material: MaterialId,
    /// Decals with a higher draw order composite over lower ones.
    pub draw_order: i32,
    /// Fade parameters.
    pub fade: DecalFade,
    /// Rendering layers this decal affects.
    pub layer_mask: u32,
}

impl Default for DecalDescriptor {
    fn default() -> Self {
        Self {
            transform: Mat4::IDENTITY,
            size: Vec3::ONE,
            pivot: Vec3::ZERO,
            material: MaterialId(0),
            draw_order: 0,
            fade: DecalFade::default(),
            layer_mask: u32::MAX,
        }
    }
}

impl DecalDescriptor {
    /// Creates a unit-sized decal at `position` using `material`.
    pub fn at(position: Vec3, material: MaterialId) -> Self {
        Self {
            transform: Mat4::from_translation(position),
            material,
            ..Default::default()
        }
    }

    /// Maps the unit cube `[-0.5, 0.5]^3` onto the projection box in world space.
    pub fn decal_to_world(&self) -> Mat4 {
        self.transform * Mat4::from_translation(self.pivot) * Mat4::from_scale(self.size)
    }

    /// The world-space bounding box of the projection volume.
    pub fn world_bounds(&self) -> Aabb {
        Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5))
            .transform(&self.decal_to_world())
    }

    /// Rejects data the pipeline cannot cull or draw.
    pub fn validate(&self) -> Result<(), DecalError> {
        if !self.transform.is_finite() {
            return Err(DecalError::inconsistent("transform has non-finite elements"));
        }
        if !self.size.is_finite() || self.size.x < 0.0 || self.size.y < 0.0 || self.size.z < 0.0 {
            return Err(DecalError::inconsistent(format!(
                "size must be finite and non-negative, got {:?}",
                self.size
            )));
        }
        if !self.pivot.is_finite() {
            return Err(DecalError::inconsistent("pivot has non-finite components"));
        }

        let fade = &self.fade;
        if !(0.0..=1.0).contains(&fade.fade_factor) {
            return Err(DecalError::inconsistent(format!(
                "fade_factor must be in [0, 1], got {}",
                fade.fade_factor
            )));
        }
        if !(fade.draw_distance.is_finite() && fade.draw_distance > 0.0) {
            return Err(DecalError::inconsistent(format!(
                "draw_distance must be positive, got {}",
                fade.draw_distance
            )));
        }
        if !(0.0..=1.0).contains(&fade.fade_scale) {
            return Err(DecalError::inconsistent(format!(
                "fade_scale must be in [0, 1], got {}",
                fade.fade_scale
            )));
        }
        let angles = 0.0..=180.0;
        if !angles.contains(&fade.start_angle_fade)
            || !angles.contains(&fade.end_angle_fade)
            || fade.start_angle_fade > fade.end_angle_fade
        {
            return Err(DecalError::inconsistent(format!(
                "angle fade must satisfy 0 <= start <= end <= 180, got {}..{}",
                fade.start_angle_fade, fade.end_angle_fade
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_world_bounds_follow_pivot_and_size() {
        let descriptor = DecalDescriptor {
            transform: Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)),
            size: Vec3::new(2.0, 4.0, 6.0),
            pivot: Vec3::new(0.0, 0.0, -1.0),
            ..Default::default()
        };
        let bounds = descriptor.world_bounds();
        assert_relative_eq!(bounds.center().x, 10.0);
        assert_relative_eq!(bounds.center().z, -1.0);
        assert_relative_eq!(bounds.half_extents().y, 2.0);
        assert_relative_eq!(bounds.half_extents().z, 3.0);
    }

    #[test]
    fn test_default_descriptor_is_valid() {
        assert!(DecalDescriptor::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_data() {
        let mut d = DecalDescriptor::default();
        d.size = Vec3::new(-1.0, 1.0, 1.0);
        assert!(matches!(d.validate(), Err(DecalError::InconsistentSource { .. })));

        let mut d = DecalDescriptor::default();
        d.transform.cols[3].x = f32::NAN;
        assert!(d.validate().is_err());

        let mut d = DecalDescriptor::default();
        d.fade.draw_distance = 0.0;
        assert!(d.validate().is_err());

        let mut d = DecalDescriptor::default();
        d.fade.start_angle_fade = 90.0;
        d.fade.end_angle_fade = 45.0;
        assert!(d.validate().is_err());
    }
}
