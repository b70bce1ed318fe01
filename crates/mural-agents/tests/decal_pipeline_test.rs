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

use std::collections::HashMap;
use std::sync::Mutex;
use std::thread;

use approx::assert_relative_eq;
use mural_agents::DecalAgent;
use mural_core::ecs::SourceId;
use mural_core::math::{Mat4, Vec3, FRAC_PI_2};
use mural_core::renderer::{
    CameraKind, CameraView, DecalSettings, MaterialId, RendererCapabilities, TechniqueSetting,
};
use mural_core::telemetry::TelemetryEvent;
use mural_data::{DecalDescriptor, DecalState, EntityStore};
use mural_lanes::{
    CulledResolveLane, CullingLane, CullingView, DecalPass, NoPlacements, PlacementSource,
    SourceError,
};

// --- HELPERS ---

/// A camera at the origin looking down -Z.
fn camera() -> CameraView {
    CameraView::new(Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 500.0), Vec3::ZERO)
}

fn decal(x: f32, material: u64) -> DecalDescriptor {
    DecalDescriptor::at(Vec3::new(x, 0.0, -10.0), MaterialId(material))
}

fn agent() -> DecalAgent {
    DecalAgent::new(DecalSettings::default(), RendererCapabilities::default())
        .expect("default settings are valid")
}

/// A placement source backed by a map the test can edit between frames.
#[derive(Default)]
struct Placements(Mutex<HashMap<SourceId, DecalDescriptor>>);

impl Placements {
    fn set(&self, source: SourceId, descriptor: DecalDescriptor) {
        self.0.lock().unwrap().insert(source, descriptor);
    }

    fn remove(&self, source: SourceId) {
        self.0.lock().unwrap().remove(&source);
    }
}

impl PlacementSource for Placements {
    fn placement(&self, source: SourceId) -> Result<DecalDescriptor, SourceError> {
        self.0
            .lock()
            .unwrap()
            .get(&source)
            .copied()
            .ok_or(SourceError::Missing(source))
    }
}

// --- TESTS ---

#[test]
fn test_two_materials_make_two_batches_in_creation_order() {
    // --- 1. ARRANGE ---
    let mut agent = agent();
    let mut store = EntityStore::new();
    let a1 = store.create(decal(-2.0, 1)).unwrap();
    let a2 = store.create(decal(0.0, 1)).unwrap();
    let b = store.create(decal(2.0, 2)).unwrap();

    // --- 2. ACT ---
    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

    // --- 3. ASSERT ---
    let draws = &output.draw_list;
    assert_eq!(draws.batches.len(), 2, "Expected one batch per material");
    assert_eq!(draws.batches[0].key.material, MaterialId(1));
    assert_eq!(draws.batch_entities(&draws.batches[0]), &[a1, a2]);
    assert_eq!(draws.batches[1].key.material, MaterialId(2));
    assert_eq!(draws.batch_entities(&draws.batches[1]), &[b]);

    assert_eq!(output.stats.visible, 3);
    assert_eq!(output.stats.resolved, 3);
    assert_eq!(output.stats.batches, 2);
    assert_eq!(
        output.pass_plan.passes(),
        &[DecalPass::CopyDepth, DecalPass::DBufferRender, DecalPass::ForwardEmissive]
    );
    assert!(!store.is_frame_open());
}

#[test]
fn test_higher_layer_is_submitted_after_lower_layer_of_other_material() {
    // --- 1. ARRANGE ---
    let mut agent = agent();
    let mut store = EntityStore::new();
    let layered = |x: f32, material: u64, draw_order: i32| {
        let mut d = decal(x, material);
        d.draw_order = draw_order;
        d
    };
    let bottom = store.create(layered(-2.0, 1, 0)).unwrap();
    let middle = store.create(layered(0.0, 2, 1)).unwrap();
    let top = store.create(layered(2.0, 1, 2)).unwrap();

    // --- 2. ACT ---
    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

    // --- 3. ASSERT ---
    let draws = &output.draw_list;
    assert_eq!(draws.entities, vec![bottom, middle, top]);
    let batches: Vec<(MaterialId, i32)> = draws
        .batches
        .iter()
        .map(|b| (b.key.material, b.key.draw_order))
        .collect();
    assert_eq!(
        batches,
        vec![(MaterialId(1), 0), (MaterialId(2), 1), (MaterialId(1), 2)]
    );
}

#[test]
fn test_resolve_skips_entity_destroyed_after_culling() {
    // --- 1. ARRANGE ---
    let mut store = EntityStore::new();
    let kept = store.create(decal(-1.0, 1)).unwrap();
    let doomed = store.create(decal(1.0, 1)).unwrap();
    let technique = DecalSettings::default().resolve_technique(&RendererCapabilities::default());

    store.begin_frame();
    let view = CullingView::from_camera(&camera()).unwrap();
    let culled = CullingLane::new().cull(&view, 1000.0, &store);

    // --- 2. ACT ---
    store.destroy(doomed);
    let resolved = CulledResolveLane::new().resolve(&culled, &store, technique);

    // --- 3. ASSERT ---
    assert_eq!(resolved.entities, vec![kept]);
    assert_eq!(resolved.skipped, 1);
    assert_eq!(store.slot_state(doomed.index), Some(DecalState::PendingDestroy));

    store.end_frame();
    assert_eq!(store.slot_state(doomed.index), Some(DecalState::Destroyed));
}

#[test]
fn test_commands_from_other_threads_apply_at_next_frame() {
    // --- 1. ARRANGE ---
    let mut agent = agent();
    let mut store = EntityStore::new();
    let sender = agent.command_sender();

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let sender = sender.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    sender.register(SourceId(t * 10 + i), decal(i as f32 - 2.0, t));
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread panicked");
    }
    assert!(store.is_empty(), "Nothing is applied before the frame boundary");

    // --- 2. ACT ---
    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(output.stats.commands_applied, 20);
    assert_eq!(store.len(), 20);
    assert_eq!(output.stats.visible, 20);
    assert_eq!(output.draw_list.batches.len(), 4);

    sender.unregister(SourceId(0));
    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();
    assert_eq!(store.len(), 19);
    assert_eq!(output.stats.visible, 19);
    assert_eq!(store.entity_for_source(SourceId(0)), None);
}

#[test]
fn test_unregister_during_frame_is_not_recycled_until_frame_end() {
    let mut agent = agent();
    let mut store = EntityStore::new();
    let sender = agent.command_sender();

    sender.register(SourceId(1), decal(0.0, 1));
    agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();
    let first = store.entity_for_source(SourceId(1)).unwrap();

    // Removal and a new registration land in the same frame.
    sender.unregister(SourceId(1));
    sender.register(SourceId(2), decal(0.0, 2));
    agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();
    let second = store.entity_for_source(SourceId(2)).unwrap();

    assert_ne!(second.index, first.index, "The pending slot was recycled mid-frame");
    assert!(!store.is_valid(first));

    // After the frame boundary the slot is reused with a higher generation.
    sender.register(SourceId(3), decal(0.0, 3));
    agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();
    let third = store.entity_for_source(SourceId(3)).unwrap();
    assert_eq!(third.index, first.index);
    assert!(third.generation > first.generation);
}

#[test]
fn test_invalidation_pulls_from_source_and_retries_failures() {
    // --- 1. ARRANGE ---
    let mut agent = agent();
    let mut store = EntityStore::new();
    let placements = Placements::default();
    let sender = agent.command_sender();

    placements.set(SourceId(1), decal(0.0, 1));
    sender.register(SourceId(1), decal(0.0, 1));
    agent.run_frame(&mut store, &placements, &camera()).unwrap();
    let entity = store.entity_for_source(SourceId(1)).unwrap();

    // --- 2. ACT ---
    // The source moves but is unreadable when the invalidation is processed.
    placements.remove(SourceId(1));
    sender.invalidate(SourceId(1));
    let failed = agent.run_frame(&mut store, &placements, &camera()).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(failed.stats.cache_skipped, 1);
    assert_eq!(store.get(entity).unwrap().state, DecalState::CacheStale);
    assert_eq!(failed.stats.visible, 1, "A stale entity is drawn with its last known data");

    placements.set(SourceId(1), decal(3.0, 5));
    let retried = agent.run_frame(&mut store, &placements, &camera()).unwrap();
    assert_eq!(retried.stats.cache_refreshed, 1);
    let record = store.get(entity).unwrap();
    assert_eq!(record.state, DecalState::Live);
    assert_eq!(record.descriptor.material, MaterialId(5));
    assert_relative_eq!(retried.draw_list.instances[0].world_from_decal[3][0], 3.0);
}

#[test]
fn test_frame_stats_are_sent_as_telemetry() {
    let (tx, rx) = crossbeam_channel::unbounded();
    let settings = DecalSettings {
        technique: TechniqueSetting::ScreenSpace,
        ..Default::default()
    };
    let mut agent = DecalAgent::new(settings, RendererCapabilities::default())
        .unwrap()
        .with_telemetry_sender(tx);
    let mut store = EntityStore::new();
    store.create(decal(0.0, 1)).unwrap();

    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

    assert_eq!(output.pass_plan.passes(), &[DecalPass::ScreenSpaceRender]);
    match rx.try_recv() {
        Ok(TelemetryEvent::FrameStats(stats)) => {
            assert_eq!(stats, output.stats);
            assert_eq!(stats.frame_index, 1);
            assert_eq!(stats.live_entities, 1);
        }
        other => panic!("Expected frame stats, got {other:?}"),
    }
    assert_eq!(agent.last_stats(), output.stats);
}

#[test]
fn test_scene_view_camera_runs_pipeline_on_its_layers() {
    // --- 1. ARRANGE ---
    let mut agent = agent();
    let mut store = EntityStore::new();
    let mut game_only = decal(-1.0, 1);
    game_only.layer_mask = 0b01;
    let mut gizmo = decal(1.0, 2);
    gizmo.layer_mask = 0b10;
    store.create(game_only).unwrap();
    let editor_only = store.create(gizmo).unwrap();
    let scene_view = camera()
        .with_kind(CameraKind::SceneView)
        .with_layer_mask(0b10);

    // --- 2. ACT ---
    let output = agent.run_frame(&mut store, &NoPlacements, &scene_view).unwrap();

    // --- 3. ASSERT ---
    assert!(output.pass_plan.runs_entity_pipeline());
    assert_eq!(output.stats.live_entities, 2);
    assert_eq!(output.stats.visible, 1);
    assert_eq!(output.draw_list.entities, vec![editor_only]);
}

#[test]
fn test_max_draw_distance_from_settings_culls() {
    let settings = DecalSettings {
        max_draw_distance: 5.0,
        ..Default::default()
    };
    let mut agent = DecalAgent::new(settings, RendererCapabilities::default()).unwrap();
    let mut store = EntityStore::new();
    store.create(decal(0.0, 1)).unwrap();

    let output = agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

    assert_eq!(output.stats.live_entities, 1);
    assert_eq!(output.stats.visible, 0);
    assert!(output.draw_list.is_empty());
}
