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

// Simulated host for the decal pipeline.
// Run with: RUST_LOG=debug cargo run -p mural-sandbox -- --frames 10

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use std::thread;

use anyhow::{Context, Result};
use clap::Parser;
use mural_agents::{DecalAgent, PlacementRegistry, SharedDecalStore};
use mural_core::ecs::SourceId;
use mural_core::math::{Mat4, Vec3, FRAC_PI_4};
use mural_core::renderer::{
    CameraKind, CameraView, DecalSettings, MaterialId, RendererCapabilities,
};
use mural_core::telemetry::TelemetryEvent;
use mural_data::{DecalCommandSender, DecalDescriptor};
use mural_lanes::{PlacementSource, SourceError};

const GAME_LAYER: u32 = 0b01;
/// Markers only the editor's scene view shows.
const EDITOR_LAYER: u32 = 0b10;

#[derive(Parser, Debug)]
#[command(about = "Runs the decal pipeline over a simulated scene")]
struct Args {
    /// RON file with the decal settings.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Number of frames to simulate.
    #[arg(long, default_value_t = 8)]
    frames: u64,

    /// Number of decal projectors placed before the first frame.
    #[arg(long, default_value_t = 400)]
    decals: u64,

    /// Pretend the host renderer is deferred.
    #[arg(long)]
    deferred: bool,
}

/// The scene's decal projectors: the placement data the pipeline caches.
#[derive(Default)]
struct Scene {
    projectors: RwLock<HashMap<SourceId, DecalDescriptor>>,
}

impl Scene {
    fn projector(index: u64, frame: u64) -> DecalDescriptor {
        let x = (index % 20) as f32 * 3.0 - 30.0 + frame as f32 * 0.5;
        let z = -((index / 20) as f32) * 3.0 - 5.0;
        let mut descriptor = DecalDescriptor::at(Vec3::new(x, 0.0, z), MaterialId(index % 6));
        descriptor.draw_order = (index % 3) as i32;
        descriptor.size = Vec3::new(2.0, 2.0, 1.0);
        if index % 10 == 0 {
            descriptor.layer_mask = EDITOR_LAYER;
        }
        descriptor
    }

    fn place(&self, source: SourceId, descriptor: DecalDescriptor) {
        if let Ok(mut projectors) = self.projectors.write() {
            projectors.insert(source, descriptor);
        }
    }

    fn remove(&self, source: SourceId) {
        if let Ok(mut projectors) = self.projectors.write() {
            projectors.remove(&source);
        }
    }
}

impl PlacementSource for Scene {
    fn placement(&self, source: SourceId) -> Result<DecalDescriptor, SourceError> {
        let projectors = self.projectors.read().map_err(|_| SourceError::Malformed {
            placement: source,
            reason: "scene lock is poisoned".to_string(),
        })?;
        projectors.get(&source).copied().ok_or(SourceError::Missing(source))
    }
}

impl PlacementRegistry for Scene {
    fn placements(&self) -> Vec<(SourceId, DecalDescriptor)> {
        self.projectors
            .read()
            .map(|projectors| projectors.iter().map(|(s, d)| (*s, *d)).collect())
            .unwrap_or_default()
    }
}

fn load_settings(path: Option<&PathBuf>) -> Result<DecalSettings> {
    let Some(path) = path else {
        log::info!("No settings file given, using defaults");
        return Ok(DecalSettings::default());
    };
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;
    let settings = DecalSettings::from_ron_str(&source)
        .with_context(|| format!("Invalid settings file {}", path.display()))?;
    log::info!("Loaded decal settings from {}", path.display());
    Ok(settings)
}

/// Simulates editor activity on another thread: every frame some projectors
/// move (half push their data, half only invalidate), one is removed and one
/// is added.
fn animate_scene(scene: &Scene, sender: &DecalCommandSender, frame: u64, decals: u64) {
    thread::scope(|s| {
        s.spawn(|| {
            for index in (frame % 4..decals).step_by(4) {
                let source = SourceId(index);
                let moved = Scene::projector(index, frame);
                scene.place(source, moved);
                if index % 8 == 0 {
                    sender.update(source, moved);
                } else {
                    sender.invalidate(source);
                }
            }

            let removed = SourceId(frame);
            scene.remove(removed);
            sender.unregister(removed);

            let added = SourceId(decals + frame);
            let descriptor = Scene::projector(frame, frame);
            scene.place(added, descriptor);
            sender.register(added, descriptor);
        });
    });
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = load_settings(args.settings.as_ref())?;
    let capabilities = RendererCapabilities {
        supports_dbuffer: true,
        deferred: args.deferred,
    };

    let scene = Scene::default();
    for index in 0..args.decals {
        scene.place(SourceId(index), Scene::projector(index, 0));
    }

    let shared = SharedDecalStore::new();
    let store = shared.acquire(&scene)?;

    let (telemetry_tx, telemetry_rx) = crossbeam_channel::unbounded();
    let mut agent = DecalAgent::new(settings, capabilities)?.with_telemetry_sender(telemetry_tx);
    let sender = agent.command_sender();

    let eye = Vec3::new(0.0, 15.0, 10.0);
    let view = Mat4::look_at_rh(eye, Vec3::new(0.0, 0.0, -30.0), Vec3::Y)
        .context("Degenerate camera")?;
    let projection = Mat4::perspective_rh_zo(FRAC_PI_4, 16.0 / 9.0, 0.1, 500.0);
    let scene_camera =
        CameraView::new(projection * view, eye).with_kind(CameraKind::SceneView);
    let game_camera = scene_camera
        .with_kind(CameraKind::Game)
        .with_layer_mask(GAME_LAYER);
    let preview_camera = scene_camera.with_kind(CameraKind::Preview);

    for frame in 0..args.frames {
        animate_scene(&scene, &sender, frame, args.decals);

        let output = agent.run_shared_frame(&store, &scene, &game_camera)?;
        let passes: Vec<String> = output
            .pass_plan
            .passes()
            .iter()
            .map(|p| p.to_string())
            .collect();
        log::info!(
            "Frame {}: {} visible of {}, {} batch(es), passes [{}]",
            output.stats.frame_index,
            output.stats.visible,
            output.stats.live_entities,
            output.stats.batches,
            passes.join(", ")
        );
        for batch in &output.draw_list.batches {
            log::debug!(
                "  layer {}: {} x{} ({}) from instance {}",
                batch.key.draw_order,
                batch.key.material,
                batch.instance_count,
                batch.key.technique,
                batch.first_instance
            );
        }

        let editor = agent.run_shared_frame(&store, &scene, &scene_camera)?;
        log::debug!("Scene view: {} visible", editor.stats.visible);

        let preview = agent.run_shared_frame(&store, &scene, &preview_camera)?;
        log::trace!("Preview passes: {:?}", preview.pass_plan.passes());
    }

    let frames_reported = telemetry_rx
        .try_iter()
        .filter(|event| matches!(event, TelemetryEvent::FrameStats(_)))
        .count();
    log::info!("Telemetry received for {frames_reported} frame(s)");

    drop(store);
    shared.release()?;
    Ok(())
}
