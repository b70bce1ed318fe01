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

//! Provides the axis-aligned bounding box used as the cached decal bounding volume.

use super::{Mat4, Vec3};

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Every decal entity caches the world-space `Aabb` of its projection box so
/// that culling never has to touch the placement transform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Aabb {
    /// The corner of the box with the smallest coordinates on all axes.
    pub min: Vec3,
    /// The corner of the box with the largest coordinates on all axes.
    pub max: Vec3,
}

impl Aabb {
    /// An invalid `Aabb` where `min` is positive infinity and `max` negative infinity.
    pub const INVALID: Self = Self {
        min: Vec3::splat(f32::INFINITY),
        max: Vec3::splat(f32::NEG_INFINITY),
    };

    /// Creates a new `Aabb` from two corner points, in any order.
    #[inline]
    pub fn from_min_max(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Creates a new `Aabb` from a center point and its half-extents.
    ///
    /// Negative half-extents are made positive.
    #[inline]
    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        let half_extents = half_extents.abs();
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Returns the center point of the box.
    #[inline]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Returns the half-extents of the box.
    #[inline]
    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Returns `true` if `min <= max` on every axis.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Returns `true` if `point` is inside or on the boundary of the box.
    #[inline]
    pub fn contains_point(&self, point: Vec3) -> bool {
        (self.min.x..=self.max.x).contains(&point.x)
            && (self.min.y..=self.max.y).contains(&point.y)
            && (self.min.z..=self.max.z).contains(&point.z)
    }

    /// Returns `true` if the two boxes overlap (touching counts).
    #[inline]
    pub fn intersects_aabb(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Returns the point of the box closest to `point`.
    #[inline]
    pub fn closest_point(&self, point: Vec3) -> Vec3 {
        point.clamp(self.min, self.max)
    }

    /// Returns the distance from `point` to the nearest point of the box.
    ///
    /// Zero when `point` is inside the box.
    #[inline]
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        point.distance(self.closest_point(point))
    }

    /// Computes the box enclosing this `Aabb` after an affine transformation.
    ///
    /// The center is transformed directly and the new extents are obtained by
    /// projecting the original extents onto the absolute basis vectors.
    pub fn transform(&self, matrix: &Mat4) -> Self {
        let center = matrix.transform_point(self.center());
        let half = self.half_extents();

        let x_axis = matrix.cols[0].truncate().abs();
        let y_axis = matrix.cols[1].truncate().abs();
        let z_axis = matrix.cols[2].truncate().abs();

        Aabb::from_center_half_extents(center, x_axis * half.x + y_axis * half.y + z_axis * half.z)
    }
}

impl Default for Aabb {
    /// Returns `Aabb::INVALID`.
    #[inline]
    fn default() -> Self {
        Self::INVALID
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{approx_eq, FRAC_PI_4};

    fn vec3_approx_eq(a: Vec3, b: Vec3) -> bool {
        approx_eq(a.x, b.x) && approx_eq(a.y, b.y) && approx_eq(a.z, b.z)
    }

    #[test]
    fn test_aabb_from_min_max_orders_corners() {
        let aabb = Aabb::from_min_max(Vec3::new(1.0, -1.0, 3.0), Vec3::new(-1.0, 1.0, 0.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 3.0));
        assert!(aabb.is_valid());
        assert!(!Aabb::INVALID.is_valid());
    }

    #[test]
    fn test_aabb_distance_to_point() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        assert!(approx_eq(aabb.distance_to_point(Vec3::new(0.5, 0.0, 0.0)), 0.0));
        assert!(approx_eq(aabb.distance_to_point(Vec3::new(4.0, 0.0, 0.0)), 3.0));
        assert!(approx_eq(aabb.distance_to_point(Vec3::new(4.0, 5.0, 1.0)), 5.0));
    }

    #[test]
    fn test_aabb_intersects() {
        let a = Aabb::from_min_max(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_min_max(Vec3::splat(1.0), Vec3::splat(2.0));
        let c = Aabb::from_min_max(Vec3::splat(1.5), Vec3::splat(2.0));
        assert!(a.intersects_aabb(&b));
        assert!(!a.intersects_aabb(&c));
    }

    #[test]
    fn test_aabb_transform_translation_and_rotation() {
        let aabb = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0));

        let moved = aabb.transform(&Mat4::from_translation(Vec3::new(10.0, 0.0, 0.0)));
        assert!(vec3_approx_eq(moved.center(), Vec3::new(10.0, 0.0, 0.0)));
        assert!(vec3_approx_eq(moved.half_extents(), Vec3::ONE));

        // A 45 degree yaw grows the X/Z extents to sqrt(2).
        let rotated = aabb.transform(&Mat4::from_rotation_y(FRAC_PI_4));
        let expected = 2.0_f32.sqrt();
        assert!(vec3_approx_eq(
            rotated.half_extents(),
            Vec3::new(expected, 1.0, expected)
        ));
    }
}
