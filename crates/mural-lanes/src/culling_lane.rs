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

//! Defines the lane that computes the visible decals of one camera.

use mural_core::ecs::DecalEntity;
use mural_core::lane::{Lane, LaneKind};
use mural_core::math::{Frustum, Vec3};
use mural_core::renderer::CameraView;
use mural_data::EntityStore;

/// The per-camera inputs of the culling stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CullingView {
    /// The camera frustum.
    pub frustum: Frustum,
    /// The origin distances are measured from.
    pub origin: Vec3,
    /// Layers the camera sees.
    pub layer_mask: u32,
}

impl CullingView {
    /// Creates a view that sees every layer.
    pub fn new(frustum: Frustum, origin: Vec3) -> Self {
        Self {
            frustum,
            origin,
            layer_mask: u32::MAX,
        }
    }

    /// Builds the view of a camera, or `None` if its view-projection is degenerate.
    pub fn from_camera(camera: &CameraView) -> Option<Self> {
        Some(Self {
            frustum: camera.frustum()?,
            origin: camera.position,
            layer_mask: camera.layer_mask,
        })
    }
}

/// One entity that survived culling, with its sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleDecal {
    /// The handle. It may be invalid by the time it is resolved.
    pub entity: DecalEntity,
    /// Primary sort key.
    pub draw_order: i32,
    /// Creation index, the tie-breaker.
    pub sequence: u64,
}

/// The visible set of one camera for one frame.
///
/// Holds handles only, so it can safely outlive changes to the store; the
/// resolve stage revalidates every handle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullingResult {
    frame_index: u64,
    tested: usize,
    visible: Vec<VisibleDecal>,
}

impl CullingResult {
    /// The store frame this result was computed in.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The visible decals, sorted by `(draw_order, sequence)`.
    pub fn visible(&self) -> &[VisibleDecal] {
        &self.visible
    }

    /// The visible handles, in draw order.
    pub fn entities(&self) -> impl Iterator<Item = DecalEntity> + '_ {
        self.visible.iter().map(|v| v.entity)
    }

    /// The number of live entities that were tested.
    pub fn tested(&self) -> usize {
        self.tested
    }

    /// The number of tested entities that were rejected.
    pub fn culled(&self) -> usize {
        self.tested - self.visible.len()
    }

    /// The number of visible decals.
    pub fn len(&self) -> usize {
        self.visible.len()
    }

    /// Returns `true` if nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }
}

/// A lane that performs frustum, distance and layer culling.
///
/// Entities are visited in ascending chunk/slot order and the survivors are
/// stably sorted by `(draw_order, sequence)`, so identical inputs always
/// yield identical results.
#[derive(Debug, Default)]
pub struct CullingLane;

impl CullingLane {
    /// Creates a new `CullingLane`.
    pub fn new() -> Self {
        Self
    }

    /// Returns the entities of `store` visible from `view`.
    ///
    /// An entity is kept when its cached bounds intersect the frustum, the
    /// closest point of its bounds lies within both `max_distance` and its own
    /// draw distance, and it shares a layer with the view.
    pub fn cull(
        &self,
        view: &CullingView,
        max_distance: f32,
        store: &EntityStore,
    ) -> CullingResult {
        let mut tested = 0;
        let mut visible = Vec::new();

        for decal in store.iter_live() {
            tested += 1;

            if decal.layer_mask() & view.layer_mask == 0 {
                continue;
            }
            let bounds = decal.world_bounds();
            let reach = max_distance.min(decal.fade().draw_distance);
            if bounds.distance_to_point(view.origin) > reach {
                continue;
            }
            if !view.frustum.intersects_aabb(bounds) {
                continue;
            }

            visible.push(VisibleDecal {
                entity: decal.entity(),
                draw_order: decal.draw_order(),
                sequence: decal.sequence(),
            });
        }

        visible.sort_by_key(|v| (v.draw_order, v.sequence));

        CullingResult {
            frame_index: store.frame_index(),
            tested,
            visible,
        }
    }
}

impl Lane for CullingLane {
    fn strategy_name(&self) -> &'static str {
        "FrustumDistance"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Culling
    }
}
