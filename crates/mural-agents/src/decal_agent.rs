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

//! The agent that runs the decal pipeline for one render feature.

use std::sync::RwLock;

use crossbeam_channel::Sender;
use mural_core::lane::{Lane, LaneError};
use mural_core::renderer::{
    CameraKind, CameraView, DecalSettings, DecalTechnique, RendererCapabilities,
};
use mural_core::telemetry::{FrameStats, TelemetryEvent};
use mural_data::{
    command_queue, DecalCommand, DecalCommandReceiver, DecalCommandSender, EntityStore,
};
use mural_lanes::{
    CacheUpdateLane, CulledResolveLane, CullingLane, CullingView, DrawBatchLane, DrawList, PassPlan,
    PlacementSource,
};

/// Everything the host needs to render the decals of one camera.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutput {
    /// The passes to enqueue.
    pub pass_plan: PassPlan,
    /// The ordered draws. Empty for preview cameras.
    pub draw_list: DrawList,
    /// Counters of the frame.
    pub stats: FrameStats,
}

/// The composition root of the decal pipeline.
///
/// Owns the four lanes, the resolved technique and the receiving end of the
/// command queue. Each call to [`run_frame`](Self::run_frame) brackets one
/// store frame:
///
/// 1. open the frame and apply queued placement commands,
/// 2. cache update, culling, resolve, batching,
/// 3. close the frame, releasing slots destroyed during it.
pub struct DecalAgent {
    settings: DecalSettings,
    capabilities: RendererCapabilities,
    technique: DecalTechnique,
    cache_update_lane: CacheUpdateLane,
    culling_lane: CullingLane,
    resolve_lane: CulledResolveLane,
    draw_batch_lane: DrawBatchLane,
    command_sender: DecalCommandSender,
    commands: DecalCommandReceiver,
    telemetry_sender: Option<Sender<TelemetryEvent>>,
    last_stats: FrameStats,
}

impl DecalAgent {
    /// Creates an agent, resolving the technique against the renderer's capabilities.
    pub fn new(
        settings: DecalSettings,
        capabilities: RendererCapabilities,
    ) -> Result<Self, LaneError> {
        settings
            .validate()
            .map_err(|e| LaneError::InitializationFailed(Box::new(e)))?;
        let technique = settings.resolve_technique(&capabilities);
        let draw_batch_lane = DrawBatchLane::from_settings(&settings)?;
        let (command_sender, commands) = command_queue();

        log::info!(
            "DecalAgent: technique {technique} (requested {:?}), max draw distance {}",
            settings.technique,
            settings.max_draw_distance
        );

        Ok(Self {
            settings,
            capabilities,
            technique,
            cache_update_lane: CacheUpdateLane::new(),
            culling_lane: CullingLane::new(),
            resolve_lane: CulledResolveLane::new(),
            draw_batch_lane,
            command_sender,
            commands,
            telemetry_sender: None,
            last_stats: FrameStats::default(),
        })
    }

    /// Attaches a sender for telemetry events.
    pub fn with_telemetry_sender(mut self, sender: Sender<TelemetryEvent>) -> Self {
        self.telemetry_sender = Some(sender);
        self
    }

    /// Returns a sender placement sources can use from any thread.
    pub fn command_sender(&self) -> DecalCommandSender {
        self.command_sender.clone()
    }

    /// The technique decals are currently drawn with.
    pub fn technique(&self) -> DecalTechnique {
        self.technique
    }

    /// The active settings.
    pub fn settings(&self) -> &DecalSettings {
        &self.settings
    }

    /// The counters of the last frame that ran the entity pipeline.
    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Replaces the settings and re-resolves the technique.
    pub fn apply_settings(&mut self, settings: DecalSettings) -> Result<(), LaneError> {
        settings
            .validate()
            .map_err(|e| LaneError::InitializationFailed(Box::new(e)))?;
        self.draw_batch_lane = DrawBatchLane::from_settings(&settings)?;
        self.settings = settings;
        self.resolve_technique();
        Ok(())
    }

    /// Updates the renderer capabilities (e.g. after a switch to deferred) and
    /// re-resolves the technique.
    pub fn set_capabilities(&mut self, capabilities: RendererCapabilities) {
        self.capabilities = capabilities;
        self.resolve_technique();
    }

    fn resolve_technique(&mut self) {
        let technique = self.settings.resolve_technique(&self.capabilities);
        if technique != self.technique {
            log::info!("DecalAgent: technique changed from {} to {technique}", self.technique);
            self.technique = technique;
            if let Some(sender) = &self.telemetry_sender {
                let _ = sender.send(TelemetryEvent::TechniqueChanged(technique.name()));
            }
        }
    }

    /// The lanes in execution order.
    pub fn lanes(&self) -> [&dyn Lane; 4] {
        [
            &self.cache_update_lane,
            &self.culling_lane,
            &self.resolve_lane,
            &self.draw_batch_lane,
        ]
    }

    /// Estimated CPU cost of one frame over `entity_count` entities.
    pub fn estimate_cost(&self, entity_count: usize) -> f32 {
        self.lanes().iter().map(|lane| lane.estimate_cost(entity_count)).sum()
    }

    /// Applies every queued command to the store. Returns the number applied.
    ///
    /// Rejected commands are logged and dropped.
    pub fn apply_commands(&self, store: &mut EntityStore) -> usize {
        let commands = self.commands.drain();
        let count = commands.len();
        for command in commands {
            Self::apply_command(store, command);
        }
        count
    }

    fn apply_command(store: &mut EntityStore, command: DecalCommand) {
        let result = match command {
            DecalCommand::Register { source, descriptor } => match store.entity_for_source(source) {
                // A re-registration replaces the data of the existing entity.
                Some(entity) => store.update(entity, descriptor),
                None => store.create_for_source(source, descriptor).map(|_| ()),
            },
            DecalCommand::Update { source, descriptor } => match store.entity_for_source(source) {
                Some(entity) => match descriptor {
                    Some(descriptor) => store.update(entity, descriptor),
                    None => store.mark_stale(entity),
                },
                None => {
                    log::debug!("Ignoring update of unregistered placement {source}");
                    Ok(())
                }
            },
            DecalCommand::Unregister { source } => {
                match store.entity_for_source(source) {
                    Some(entity) => {
                        store.destroy(entity);
                    }
                    None => log::debug!("Ignoring removal of unregistered placement {source}"),
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            log::warn!("Dropping decal command: {e}");
        }
    }

    /// Runs the decal pipeline for one camera.
    ///
    /// Preview cameras only get the preview pass; the store is not touched and
    /// queued commands wait for the next regular frame. A camera with a
    /// degenerate view-projection aborts the frame before the store is opened.
    pub fn run_frame(
        &mut self,
        store: &mut EntityStore,
        placements: &dyn PlacementSource,
        camera: &CameraView,
    ) -> Result<FrameOutput, LaneError> {
        if camera.kind == CameraKind::Preview {
            return Ok(FrameOutput {
                pass_plan: PassPlan::preview(),
                draw_list: DrawList::default(),
                stats: FrameStats::default(),
            });
        }

        let view = CullingView::from_camera(camera)
            .ok_or_else(|| LaneError::execution("camera has a degenerate view-projection matrix"))?;

        // 1. Frame boundary: external changes land before any stage runs.
        let frame_index = store.begin_frame();
        let commands_applied = self.apply_commands(store);

        // 2. Stages.
        let cache = self.cache_update_lane.run(store, placements);
        let culled = self
            .culling_lane
            .cull(&view, self.settings.max_draw_distance, store);
        let resolved = self.resolve_lane.resolve(&culled, store, self.technique);
        let draw_list = self.draw_batch_lane.build_batches(&resolved);

        // 3. Release slots destroyed during the frame.
        store.end_frame();

        let stats = FrameStats {
            frame_index,
            live_entities: culled.tested(),
            commands_applied,
            cache_refreshed: cache.refreshed,
            cache_skipped: cache.skipped,
            visible: culled.len(),
            resolved: resolved.len(),
            resolve_skipped: resolved.skipped,
            batches: draw_list.batches.len(),
        };
        log::debug!("DecalAgent: {stats:?}");
        if let Some(sender) = &self.telemetry_sender {
            let _ = sender.send(TelemetryEvent::FrameStats(stats));
        }
        self.last_stats = stats;

        Ok(FrameOutput {
            pass_plan: PassPlan::for_technique(self.technique),
            draw_list,
            stats,
        })
    }

    /// Runs a frame against a store shared through a lock.
    ///
    /// The write lock is held for the whole frame.
    pub fn run_shared_frame(
        &mut self,
        store: &RwLock<EntityStore>,
        placements: &dyn PlacementSource,
        camera: &CameraView,
    ) -> Result<FrameOutput, LaneError> {
        let mut store = store
            .write()
            .map_err(|_| LaneError::execution("decal entity store lock is poisoned"))?;
        self.run_frame(&mut store, placements, camera)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mural_core::ecs::SourceId;
    use mural_core::math::{Mat4, Vec3, FRAC_PI_2};
    use mural_core::renderer::{MaterialId, TechniqueSetting};
    use mural_data::DecalDescriptor;
    use mural_lanes::{DecalPass, NoPlacements};

    fn camera() -> CameraView {
        CameraView::new(Mat4::perspective_rh_zo(FRAC_PI_2, 1.0, 0.1, 500.0), Vec3::ZERO)
    }

    fn default_agent() -> DecalAgent {
        DecalAgent::new(DecalSettings::default(), RendererCapabilities::default()).unwrap()
    }

    fn decal(material: u64) -> DecalDescriptor {
        DecalDescriptor::at(Vec3::new(0.0, 0.0, -10.0), MaterialId(material))
    }

    #[test]
    fn test_invalid_settings_fail_initialization() {
        let settings = DecalSettings {
            max_draw_distance: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            DecalAgent::new(settings, RendererCapabilities::default()),
            Err(LaneError::InitializationFailed(_))
        ));
    }

    #[test]
    fn test_preview_camera_short_circuits() {
        let mut agent = default_agent();
        let mut store = EntityStore::new();
        agent.command_sender().register(SourceId(1), decal(1));

        let output = agent
            .run_frame(&mut store, &NoPlacements, &camera().with_kind(CameraKind::Preview))
            .unwrap();

        assert_eq!(output.pass_plan.passes(), &[DecalPass::Preview]);
        assert!(output.draw_list.is_empty());
        assert!(store.is_empty(), "Preview frames must not apply commands");
        assert_eq!(store.frame_index(), 0);
    }

    #[test]
    fn test_degenerate_camera_aborts_without_opening_a_frame() {
        let mut agent = default_agent();
        let mut store = EntityStore::new();
        let broken = CameraView::new(Mat4::from_scale(Vec3::ZERO), Vec3::ZERO);

        let result = agent.run_frame(&mut store, &NoPlacements, &broken);

        assert!(matches!(result, Err(LaneError::ExecutionFailed(_))));
        assert!(!store.is_frame_open());
    }

    #[test]
    fn test_technique_change_is_reported() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let settings = DecalSettings {
            technique: TechniqueSetting::ScreenSpace,
            ..Default::default()
        };
        let mut agent = DecalAgent::new(settings, RendererCapabilities::default())
            .unwrap()
            .with_telemetry_sender(tx);
        assert_eq!(agent.technique().name(), "ScreenSpace");

        agent.set_capabilities(RendererCapabilities {
            supports_dbuffer: true,
            deferred: true,
        });

        assert_eq!(agent.technique().name(), "GBuffer");
        assert_eq!(rx.try_recv(), Ok(TelemetryEvent::TechniqueChanged("GBuffer")));
        let plan = agent
            .run_frame(&mut EntityStore::new(), &NoPlacements, &camera())
            .unwrap()
            .pass_plan;
        assert_eq!(plan.passes(), &[DecalPass::GBufferRender]);
    }

    #[test]
    fn test_reregistration_updates_existing_entity() {
        let mut agent = default_agent();
        let mut store = EntityStore::new();
        let sender = agent.command_sender();

        sender.register(SourceId(1), decal(1));
        agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();
        let entity = store.entity_for_source(SourceId(1)).unwrap();

        sender.register(SourceId(1), decal(2));
        agent.run_frame(&mut store, &NoPlacements, &camera()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.entity_for_source(SourceId(1)), Some(entity));
        assert_eq!(store.get(entity).unwrap().descriptor.material, MaterialId(2));
    }

    #[test]
    fn test_cost_covers_every_lane() {
        let agent = default_agent();
        assert_eq!(agent.lanes().len(), 4);
        assert_eq!(agent.estimate_cost(10), 40.0);
    }
}
