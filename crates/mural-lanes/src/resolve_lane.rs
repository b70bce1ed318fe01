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

//! Defines the lane that turns visible handles into GPU instance data.

use std::collections::HashMap;

use crate::culling_lane::CullingResult;
use crate::draw_batch_lane::BatchKey;
use bytemuck::{Pod, Zeroable};
use mural_core::ecs::DecalEntity;
use mural_core::lane::{Lane, LaneKind};
use mural_core::renderer::{DecalTechnique, MaterialId};
use mural_data::{DecalFade, EntityStore};

/// Lower bound of fade ranges, avoids dividing by zero.
const MIN_FADE_RANGE: f32 = 1e-4;

/// The per-instance payload uploaded to the GPU.
///
/// Fades are encoded as `[scale, bias]` pairs so the shader computes
/// `saturate(x * scale + bias)`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DecalInstanceData {
    /// Maps the unit cube `[-0.5, 0.5]^3` to the projection box, column-major.
    pub world_from_decal: [[f32; 4]; 4],
    /// Applied to the view distance.
    pub distance_fade: [f32; 2],
    /// Applied to the angle between surface normal and projection axis.
    pub angle_fade: [f32; 2],
    /// Global opacity.
    pub fade_factor: f32,
    /// Index into the frame's material table.
    pub material_index: u32,
    _padding: [u32; 2],
}

/// Encodes the distance fade of a decal.
///
/// The decal is fully opaque up to `draw_distance * (1 - fade_scale)` and
/// fades out linearly until `draw_distance`.
pub fn distance_fade(fade: &DecalFade) -> [f32; 2] {
    let fade_start = fade.draw_distance * (1.0 - fade.fade_scale);
    let inv_range = 1.0 / (fade.draw_distance - fade_start).max(MIN_FADE_RANGE);
    [-inv_range, fade.draw_distance * inv_range]
}

/// Encodes the angle fade of a decal from its start and end angles in degrees.
pub fn angle_fade(fade: &DecalFade) -> [f32; 2] {
    let start = fade.start_angle_fade / 180.0;
    let end = fade.end_angle_fade / 180.0;
    let range = (end - start).max(MIN_FADE_RANGE);
    [1.0 - (0.25 - start) / range, -0.25 / range]
}

/// Per-frame instance buffer, stored as parallel arrays.
///
/// `instances[i]`, `keys[i]` and `entities[i]` all describe the same decal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedInstances {
    /// The store frame the visible set was computed in.
    pub frame_index: u64,
    /// GPU payloads, in draw order.
    pub instances: Vec<DecalInstanceData>,
    /// Batch key of each instance.
    pub keys: Vec<BatchKey>,
    /// Source entity of each instance.
    pub entities: Vec<DecalEntity>,
    /// The frame's material table; `material_index` points into it.
    pub materials: Vec<MaterialId>,
    /// Visible handles that were no longer valid.
    pub skipped: usize,
}

impl ResolvedInstances {
    /// Appends one instance.
    pub fn push(&mut self, entity: DecalEntity, key: BatchKey, instance: DecalInstanceData) {
        self.entities.push(entity);
        self.keys.push(key);
        self.instances.push(instance);
    }

    /// The number of resolved instances.
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    /// Returns `true` if no instance was resolved.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

/// A lane that resolves a [`CullingResult`] into [`ResolvedInstances`].
///
/// Every handle is revalidated against the store. Handles destroyed since
/// culling are skipped and counted, never read.
#[derive(Debug, Default)]
pub struct CulledResolveLane;

impl CulledResolveLane {
    /// Creates a new `CulledResolveLane`.
    pub fn new() -> Self {
        Self
    }

    /// Resolves the visible set for the given technique.
    pub fn resolve(
        &self,
        culled: &CullingResult,
        store: &EntityStore,
        technique: DecalTechnique,
    ) -> ResolvedInstances {
        if culled.frame_index() != store.frame_index() {
            log::debug!(
                "Resolving a culling result from frame {} in frame {}",
                culled.frame_index(),
                store.frame_index()
            );
        }

        let mut resolved = ResolvedInstances {
            frame_index: culled.frame_index(),
            ..Default::default()
        };
        let mut material_indices: HashMap<MaterialId, u32> = HashMap::new();

        for visible in culled.visible() {
            let entity = visible.entity;
            let Ok(decal) = store.view(entity) else {
                log::trace!("Decal {entity} was destroyed after culling, skipping");
                resolved.skipped += 1;
                continue;
            };

            let material = decal.material();
            let material_index = *material_indices.entry(material).or_insert_with(|| {
                resolved.materials.push(material);
                (resolved.materials.len() - 1) as u32
            });

            let fade = decal.fade();
            let instance = DecalInstanceData {
                world_from_decal: decal.decal_to_world().to_cols_array_2d(),
                distance_fade: distance_fade(fade),
                angle_fade: angle_fade(fade),
                fade_factor: fade.fade_factor,
                material_index,
                _padding: [0; 2],
            };
            let key = BatchKey {
                draw_order: visible.draw_order,
                material,
                technique,
            };
            resolved.push(entity, key, instance);
        }

        resolved
    }
}

impl Lane for CulledResolveLane {
    fn strategy_name(&self) -> &'static str {
        "CopyVisible"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Resolve
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::culling_lane::{CullingLane, CullingView};
    use approx::assert_relative_eq;
    use mural_core::math::{Frustum, Mat4, Vec3, FRAC_PI_2};
    use mural_core::renderer::DecalNormalBlend;
    use mural_data::DecalDescriptor;

    const TECHNIQUE: DecalTechnique = DecalTechnique::ScreenSpace {
        normal_blend: DecalNormalBlend::Low,
    };

    fn view() -> CullingView {
        let projection = Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 500.0);
        CullingView::new(
            Frustum::from_view_projection(&projection).expect("valid projection"),
            Vec3::ZERO,
        )
    }

    fn decal(x: f32, material: u64) -> DecalDescriptor {
        DecalDescriptor::at(Vec3::new(x, 0.0, -10.0), MaterialId(material))
    }

    #[test]
    fn test_instance_payload_is_pod_and_aligned() {
        assert_eq!(std::mem::size_of::<DecalInstanceData>(), 96);
        assert_eq!(std::mem::size_of::<DecalInstanceData>() % 16, 0);
        let zeroed = DecalInstanceData::zeroed();
        assert_eq!(bytemuck::bytes_of(&zeroed).len(), 96);
    }

    #[test]
    fn test_fade_encodings() {
        let fade = DecalFade {
            draw_distance: 100.0,
            fade_scale: 0.5,
            start_angle_fade: 45.0,
            end_angle_fade: 90.0,
            ..Default::default()
        };

        // Opaque until 50, gone at 100.
        let [scale, bias] = distance_fade(&fade);
        assert_relative_eq!(50.0 * scale + bias, 1.0);
        assert_relative_eq!(100.0 * scale + bias, 0.0);

        let [scale, bias] = angle_fade(&fade);
        assert_relative_eq!(scale, 1.0 - (0.25 - 0.25) / 0.25);
        assert_relative_eq!(bias, -1.0);
    }

    #[test]
    fn test_degenerate_fade_ranges_do_not_divide_by_zero() {
        let fade = DecalFade {
            fade_scale: 0.0,
            ..Default::default()
        };
        assert!(distance_fade(&fade).iter().all(|v| v.is_finite()));
        assert!(angle_fade(&DecalFade::default()).iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_material_indices_are_dense_in_first_encounter_order() {
        let mut store = EntityStore::new();
        store.create(decal(-1.0, 30)).unwrap();
        store.create(decal(0.0, 10)).unwrap();
        store.create(decal(1.0, 30)).unwrap();

        let culled = CullingLane::new().cull(&view(), 100.0, &store);
        let resolved = CulledResolveLane::new().resolve(&culled, &store, TECHNIQUE);

        assert_eq!(resolved.materials, vec![MaterialId(30), MaterialId(10)]);
        let indices: Vec<_> = resolved.instances.iter().map(|i| i.material_index).collect();
        assert_eq!(indices, vec![0, 1, 0]);
        assert!(resolved.keys.iter().all(|k| k.technique == TECHNIQUE));
    }

    #[test]
    fn test_payload_copies_transform_and_fade() {
        let mut store = EntityStore::new();
        let mut d = decal(2.0, 1);
        d.size = Vec3::new(2.0, 2.0, 4.0);
        d.fade.fade_factor = 0.5;
        let entity = store.create(d).unwrap();

        let culled = CullingLane::new().cull(&view(), 100.0, &store);
        let resolved = CulledResolveLane::new().resolve(&culled, &store, TECHNIQUE);

        assert_eq!(resolved.entities, vec![entity]);
        let instance = &resolved.instances[0];
        assert_eq!(instance.world_from_decal, d.decal_to_world().to_cols_array_2d());
        assert_relative_eq!(instance.world_from_decal[3][0], 2.0);
        assert_relative_eq!(instance.world_from_decal[2][2], 4.0);
        assert_relative_eq!(instance.fade_factor, 0.5);
    }

    #[test]
    fn test_destroyed_handles_are_skipped() {
        // --- 1. SETUP ---
        let mut store = EntityStore::new();
        let kept = store.create(decal(-1.0, 1)).unwrap();
        let doomed = store.create(decal(1.0, 1)).unwrap();
        store.begin_frame();
        let culled = CullingLane::new().cull(&view(), 100.0, &store);
        assert_eq!(culled.len(), 2);

        // --- 2. ACTION ---
        store.destroy(doomed);
        let resolved = CulledResolveLane::new().resolve(&culled, &store, TECHNIQUE);

        // --- 3. ASSERTIONS ---
        assert_eq!(resolved.entities, vec![kept]);
        assert_eq!(resolved.skipped, 1);
        store.end_frame();
    }
}
