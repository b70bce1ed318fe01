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

//! Defines the lane that refreshes the cached data of stale entities.

use mural_core::ecs::{DecalEntity, SourceId};
use mural_core::lane::{Lane, LaneKind};
use mural_data::{DecalDescriptor, DecalError, EntityStore};
use thiserror::Error;

/// Errors a placement source can report when asked for its current data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    /// The placement no longer exists (e.g. it was destroyed mid-update).
    #[error("placement {0} no longer exists")]
    Missing(SourceId),
    /// The placement exists but its data is unusable.
    #[error("placement {placement} returned malformed data: {reason}")]
    Malformed {
        /// The placement.
        placement: SourceId,
        /// What was wrong with the data.
        reason: String,
    },
    /// The store rejected the entity or the data it was given.
    #[error(transparent)]
    Rejected(#[from] DecalError),
}

/// The owner of placement data, queried when an entity's cache goes stale
/// without a pushed snapshot.
pub trait PlacementSource {
    /// Returns the current data of `source`.
    fn placement(&self, source: SourceId) -> Result<DecalDescriptor, SourceError>;
}

impl<F> PlacementSource for F
where
    F: Fn(SourceId) -> Result<DecalDescriptor, SourceError>,
{
    fn placement(&self, source: SourceId) -> Result<DecalDescriptor, SourceError> {
        self(source)
    }
}

/// A source that owns nothing; every pull fails with [`SourceError::Missing`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPlacements;

impl PlacementSource for NoPlacements {
    fn placement(&self, source: SourceId) -> Result<DecalDescriptor, SourceError> {
        Err(SourceError::Missing(source))
    }
}

/// The outcome of one cache update pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheUpdateReport {
    /// Entities moved back to `Live`.
    pub refreshed: usize,
    /// Entities left `CacheStale` for a retry next frame.
    pub skipped: usize,
}

/// A lane that brings every `CacheStale` entity back in sync with its source.
///
/// Snapshots pushed with a change notification are applied directly; other
/// entities pull their data from the [`PlacementSource`]. Entities with no
/// source simply have their bounds recomputed from the cached data. A source
/// that fails is logged and skipped, and the entity stays stale so the next
/// frame retries it.
#[derive(Debug, Default)]
pub struct CacheUpdateLane;

impl CacheUpdateLane {
    /// Creates a new `CacheUpdateLane`.
    pub fn new() -> Self {
        Self
    }

    /// Executes the cache update for one frame.
    pub fn run(
        &self,
        store: &mut EntityStore,
        placements: &dyn PlacementSource,
    ) -> CacheUpdateReport {
        let mut report = CacheUpdateReport::default();

        for entity in store.stale_entities() {
            let refreshed = Self::fetch(store, entity, placements).and_then(|descriptor| {
                store
                    .refresh(entity, &descriptor)
                    .map_err(SourceError::from)
            });

            match refreshed {
                Ok(()) => report.refreshed += 1,
                Err(e) => {
                    log::warn!("Skipping cache update of decal {entity}: {e}");
                    report.skipped += 1;
                }
            }
        }

        report
    }

    fn fetch(
        store: &mut EntityStore,
        entity: DecalEntity,
        placements: &dyn PlacementSource,
    ) -> Result<DecalDescriptor, SourceError> {
        if let Some(descriptor) = store.take_pending(entity)? {
            return Ok(descriptor);
        }
        let record = store.get(entity)?;
        match record.source {
            Some(source) => placements.placement(source),
            None => Ok(record.descriptor),
        }
    }
}

impl Lane for CacheUpdateLane {
    fn strategy_name(&self) -> &'static str {
        "PushThenPull"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::CacheUpdate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mural_core::math::Vec3;
    use mural_core::renderer::MaterialId;
    use mural_data::DecalState;
    use std::cell::Cell;
    use std::collections::HashMap;

    fn decal(x: f32, material: u64) -> DecalDescriptor {
        DecalDescriptor::at(Vec3::new(x, 0.0, 0.0), MaterialId(material))
    }

    #[test]
    fn test_pushed_snapshot_is_applied_without_pulling() {
        let mut store = EntityStore::new();
        let entity = store.create_for_source(SourceId(1), decal(0.0, 1)).unwrap();
        store.update(entity, decal(20.0, 2)).unwrap();

        let pulls = Cell::new(0);
        let source = |s: SourceId| -> Result<DecalDescriptor, SourceError> {
            pulls.set(pulls.get() + 1);
            Err(SourceError::Missing(s))
        };

        let report = CacheUpdateLane::new().run(&mut store, &source);

        assert_eq!(report, CacheUpdateReport { refreshed: 1, skipped: 0 });
        assert_eq!(pulls.get(), 0, "A pushed snapshot must not trigger a pull");
        let record = store.get(entity).unwrap();
        assert_eq!(record.state, DecalState::Live);
        assert_eq!(record.world_bounds.center().x, 20.0);
    }

    #[test]
    fn test_stale_entity_pulls_from_source() {
        let mut store = EntityStore::new();
        let entity = store.create_for_source(SourceId(4), decal(0.0, 1)).unwrap();
        store.mark_stale(entity).unwrap();

        let mut placements = HashMap::new();
        placements.insert(SourceId(4), decal(-3.0, 8));
        let source = |s: SourceId| placements.get(&s).copied().ok_or(SourceError::Missing(s));

        let report = CacheUpdateLane::new().run(&mut store, &source);

        assert_eq!(report.refreshed, 1);
        let record = store.get(entity).unwrap();
        assert_eq!(record.descriptor.material, MaterialId(8));
        assert_eq!(record.world_bounds.center().x, -3.0);
    }

    #[test]
    fn test_failing_source_is_skipped_and_retried() {
        // --- 1. SETUP ---
        let mut store = EntityStore::new();
        let broken = store.create_for_source(SourceId(1), decal(0.0, 1)).unwrap();
        let healthy = store.create_for_source(SourceId(2), decal(0.0, 1)).unwrap();
        store.mark_stale(broken).unwrap();
        store.mark_stale(healthy).unwrap();

        let fixed = Cell::new(false);
        let source = |s: SourceId| {
            if s == SourceId(1) && !fixed.get() {
                Err(SourceError::Malformed {
                    placement: s,
                    reason: "projector destroyed".into(),
                })
            } else {
                Ok(decal(1.0, 3))
            }
        };
        let lane = CacheUpdateLane::new();

        // --- 2. ACTION ---
        let first = lane.run(&mut store, &source);

        // --- 3. ASSERTIONS ---
        assert_eq!(first, CacheUpdateReport { refreshed: 1, skipped: 1 });
        assert_eq!(store.get(broken).unwrap().state, DecalState::CacheStale);
        assert_eq!(store.get(healthy).unwrap().state, DecalState::Live);

        fixed.set(true);
        let second = lane.run(&mut store, &source);
        assert_eq!(second, CacheUpdateReport { refreshed: 1, skipped: 0 });
        assert_eq!(store.get(broken).unwrap().state, DecalState::Live);
    }

    #[test]
    fn test_malformed_pulled_data_is_rejected() {
        let mut store = EntityStore::new();
        let entity = store.create_for_source(SourceId(1), decal(0.0, 1)).unwrap();
        store.mark_stale(entity).unwrap();

        let source = |_: SourceId| {
            let mut bad = decal(0.0, 1);
            bad.fade.draw_distance = -1.0;
            Ok(bad)
        };

        let report = CacheUpdateLane::new().run(&mut store, &source);

        assert_eq!(report.skipped, 1);
        assert_eq!(store.get(entity).unwrap().state, DecalState::CacheStale);
    }

    #[test]
    fn test_sourceless_entity_recomputes_from_cache() {
        let mut store = EntityStore::new();
        let entity = store.create(decal(5.0, 1)).unwrap();
        store.mark_stale(entity).unwrap();

        let report = CacheUpdateLane::new().run(&mut store, &NoPlacements);

        assert_eq!(report.refreshed, 1);
        assert_eq!(store.get(entity).unwrap().world_bounds.center().x, 5.0);
    }
}
