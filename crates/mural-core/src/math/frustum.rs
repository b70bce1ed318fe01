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

//! View frustum represented as six inward-facing planes.

use super::{Aabb, Mat4, Vec3, Vec4, EPSILON};

/// A plane in Hessian normal form: `normal · p + distance = 0`.
///
/// Points with a positive signed distance lie on the side the normal points to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// The unit normal of the plane.
    pub normal: Vec3,
    /// The signed offset of the plane from the origin.
    pub distance: f32,
}

impl Plane {
    /// Creates a plane from raw coefficients, normalizing them.
    ///
    /// Returns `None` for a degenerate (zero-length) normal.
    pub fn from_coefficients(v: Vec4) -> Option<Self> {
        let normal = v.truncate();
        let len = normal.length();
        if len < EPSILON {
            return None;
        }
        Some(Self {
            normal: normal / len,
            distance: v.w / len,
        })
    }

    /// Creates a plane through `point` facing `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Returns the signed distance from `point` to the plane.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }
}

/// The six planes bounding a camera's visible volume, all facing inwards.
///
/// Plane order is left, right, bottom, top, near, far.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// The inward-facing planes.
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extracts the frustum from a view-projection matrix with a `[0, 1]` clip depth.
    ///
    /// Returns `None` if the matrix is degenerate.
    pub fn from_view_projection(view_projection: &Mat4) -> Option<Self> {
        let r0 = view_projection.get_row(0);
        let r1 = view_projection.get_row(1);
        let r2 = view_projection.get_row(2);
        let r3 = view_projection.get_row(3);

        Some(Self {
            planes: [
                Plane::from_coefficients(r3 + r0)?,
                Plane::from_coefficients(r3 - r0)?,
                Plane::from_coefficients(r3 + r1)?,
                Plane::from_coefficients(r3 - r1)?,
                Plane::from_coefficients(r2)?,
                Plane::from_coefficients(r3 - r2)?,
            ],
        })
    }

    /// Returns `true` if `point` is inside or on the boundary of the frustum.
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|p| p.signed_distance(point) >= 0.0)
    }

    /// Conservative box test: `false` only if the box lies entirely outside one plane.
    ///
    /// For each plane the box corner furthest along the normal is tested; if
    /// even that corner is behind the plane, the whole box is.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        self.planes.iter().all(|plane| {
            let n = plane.normal;
            let positive = Vec3::new(
                if n.x >= 0.0 { aabb.max.x } else { aabb.min.x },
                if n.y >= 0.0 { aabb.max.y } else { aabb.min.y },
                if n.z >= 0.0 { aabb.max.z } else { aabb.min.z },
            );
            plane.signed_distance(positive) >= 0.0
        })
    }
}
