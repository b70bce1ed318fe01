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

//! An explicitly owned, use-counted entity store shared between render features.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use mural_core::ecs::SourceId;
use mural_core::lane::LaneError;
use mural_data::{DecalDescriptor, EntityStore};
use mural_lanes::NoPlacements;

/// Enumerates the placements that already exist when a store is created.
pub trait PlacementRegistry {
    /// Every existing placement with its current data.
    fn placements(&self) -> Vec<(SourceId, DecalDescriptor)>;
}

impl PlacementRegistry for NoPlacements {
    fn placements(&self) -> Vec<(SourceId, DecalDescriptor)> {
        Vec::new()
    }
}

impl PlacementRegistry for Vec<(SourceId, DecalDescriptor)> {
    fn placements(&self) -> Vec<(SourceId, DecalDescriptor)> {
        self.clone()
    }
}

#[derive(Debug, Default)]
struct SharedState {
    store: Option<Arc<RwLock<EntityStore>>>,
    users: usize,
}

/// Shares one [`EntityStore`] between every render feature that acquires it.
///
/// The first [`acquire`](Self::acquire) creates the store and adopts the
/// placements that already exist; later acquires return the same store. The
/// store is dropped by the last [`release`](Self::release). Releases without
/// a matching acquire are ignored.
#[derive(Debug, Default)]
pub struct SharedDecalStore {
    state: Mutex<SharedState>,
}

impl SharedDecalStore {
    /// Creates an empty context. No store exists until the first acquire.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user and returns the shared store, creating it if needed.
    pub fn acquire(
        &self,
        registry: &dyn PlacementRegistry,
    ) -> Result<Arc<RwLock<EntityStore>>, LaneError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LaneError::execution("shared decal store lock is poisoned"))?;

        let store = Arc::clone(
            state
                .store
                .get_or_insert_with(|| Arc::new(RwLock::new(Self::adopt(registry)))),
        );
        state.users += 1;
        log::trace!("Shared decal store acquired ({} user(s))", state.users);
        Ok(store)
    }

    fn adopt(registry: &dyn PlacementRegistry) -> EntityStore {
        let mut store = EntityStore::new();
        for (source, descriptor) in registry.placements() {
            if let Err(e) = store.create_for_source(source, descriptor) {
                log::warn!("Could not adopt existing placement {source}: {e}");
            }
        }
        log::info!("Created shared decal store with {} existing placement(s)", store.len());
        store
    }

    /// Unregisters a user, dropping the store when the last one leaves.
    pub fn release(&self) -> Result<(), LaneError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LaneError::execution("shared decal store lock is poisoned"))?;

        if state.users == 0 {
            log::warn!("Ignoring release of a shared decal store with no users");
            return Ok(());
        }
        state.users -= 1;
        if state.users == 0 {
            state.store = None;
            log::info!("Disposed shared decal store");
        }
        Ok(())
    }

    /// The number of users currently holding the store.
    pub fn use_count(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).users
    }

    /// Returns `true` while at least one user holds the store.
    pub fn is_alive(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .store
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mural_core::math::Vec3;
    use mural_core::renderer::MaterialId;

    #[test]
    fn test_release_without_acquire_is_ignored() {
        let shared = SharedDecalStore::new();
        assert!(shared.release().is_ok());
        assert_eq!(shared.use_count(), 0);
        assert!(!shared.is_alive());
    }

    #[test]
    fn test_adoption_skips_invalid_placements() {
        let mut broken = DecalDescriptor::at(Vec3::ZERO, MaterialId(1));
        broken.fade.fade_factor = 2.0;
        let registry = vec![
            (SourceId(1), DecalDescriptor::at(Vec3::ZERO, MaterialId(1))),
            (SourceId(2), broken),
        ];

        let shared = SharedDecalStore::new();
        let store = shared.acquire(&registry).unwrap();

        let store = store.read().unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.entity_for_source(SourceId(1)).is_some());
        assert!(store.entity_for_source(SourceId(2)).is_none());
    }
}
