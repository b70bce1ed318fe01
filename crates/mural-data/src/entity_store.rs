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

//! Decal entity storage, handle validation and slot recycling.

use std::collections::HashMap;

use crate::chunk::{DecalEntityChunk, DecalState, CHUNK_CAPACITY};
use crate::descriptor::{DecalDescriptor, DecalFade};
use crate::error::DecalError;
use mural_core::ecs::{DecalEntity, SourceId};
use mural_core::math::{Aabb, Mat4};
use mural_core::renderer::MaterialId;

/// Splits a global slot index into `(chunk, row)`.
#[inline]
fn locate(index: u32) -> (usize, usize) {
    let index = index as usize;
    (index / CHUNK_CAPACITY, index % CHUNK_CAPACITY)
}

/// An owned copy of everything the store knows about one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalRecord {
    /// The handle this record was read through.
    pub entity: DecalEntity,
    /// The placement that registered the entity, if any.
    pub source: Option<SourceId>,
    /// Current lifecycle state; always `Live` or `CacheStale`.
    pub state: DecalState,
    /// Monotonic creation index, used as the culling tie-breaker.
    pub sequence: u64,
    /// The cached placement data.
    pub descriptor: DecalDescriptor,
    /// The cached world-space projection volume.
    pub world_bounds: Aabb,
}

/// A borrowed, read-only view of one live entity inside its chunk.
///
/// Views borrow the store immutably, so no entity can be created or
/// destroyed while one is alive.
#[derive(Debug, Clone, Copy)]
pub struct DecalView<'a> {
    chunk: &'a DecalEntityChunk,
    row: usize,
    entity: DecalEntity,
}

impl<'a> DecalView<'a> {
    /// The handle of the viewed entity.
    pub fn entity(&self) -> DecalEntity {
        self.entity
    }

    /// The lifecycle state.
    pub fn state(&self) -> DecalState {
        self.chunk.states[self.row]
    }

    /// The placement that registered the entity.
    pub fn source(&self) -> Option<SourceId> {
        self.chunk.sources[self.row]
    }

    /// The creation sequence number.
    pub fn sequence(&self) -> u64 {
        self.chunk.sequences[self.row]
    }

    /// The cached world-space projection volume.
    pub fn world_bounds(&self) -> &'a Aabb {
        &self.chunk.bounds[self.row]
    }

    /// The placement transform.
    pub fn transform(&self) -> &'a Mat4 {
        &self.chunk.transforms[self.row]
    }

    /// The placement transform with pivot and size applied.
    pub fn decal_to_world(&self) -> Mat4 {
        self.chunk.descriptor(self.row).decal_to_world()
    }

    /// The material snapshot.
    pub fn material(&self) -> MaterialId {
        self.chunk.materials[self.row]
    }

    /// The draw order.
    pub fn draw_order(&self) -> i32 {
        self.chunk.draw_orders[self.row]
    }

    /// The fade parameters.
    pub fn fade(&self) -> &'a DecalFade {
        &self.chunk.fades[self.row]
    }

    /// The rendering layers this decal affects.
    pub fn layer_mask(&self) -> u32 {
        self.chunk.layer_masks[self.row]
    }
}

/// Owns every decal entity and is the only writer of decal data.
///
/// Entities live in boxed, fixed-capacity chunks. Chunks are only ever
/// appended, so growing the store never moves an existing entity: a handle's
/// `index` maps to the same chunk and row for as long as the entity lives.
/// Freed slots are recycled through a free list before a new chunk is
/// allocated, and every reuse bumps the slot generation so that stale handles
/// are rejected instead of aliasing the new occupant. A slot whose generation
/// reaches `u32::MAX` is retired for good rather than wrapping around.
///
/// While a frame is open (between [`begin_frame`](Self::begin_frame) and
/// [`end_frame`](Self::end_frame)), destroyed slots are parked in
/// [`DecalState::PendingDestroy`] and only released at the frame boundary.
#[derive(Debug, Default)]
pub struct EntityStore {
    pub(crate) chunks: Vec<Box<DecalEntityChunk>>,
    /// Slot indices available for reuse, popped LIFO.
    pub(crate) freed_slots: Vec<u32>,
    /// Slots destroyed during the current frame.
    pub(crate) pending_destroy: Vec<u32>,
    by_source: HashMap<SourceId, DecalEntity>,
    next_sequence: u64,
    live_count: usize,
    frame_open: bool,
    frame_index: u64,
    entity_limit: Option<usize>,
}

impl EntityStore {
    /// Creates a new, empty `EntityStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that refuses to hold more than `limit` live entities.
    pub fn with_entity_limit(limit: usize) -> Self {
        Self {
            entity_limit: Some(limit),
            ..Self::default()
        }
    }

    /// Creates an entity that is not tied to any placement source.
    pub fn create(&mut self, descriptor: DecalDescriptor) -> Result<DecalEntity, DecalError> {
        self.allocate(None, descriptor)
    }

    /// Creates an entity for `source` and records the reverse mapping.
    ///
    /// Fails with [`DecalError::InconsistentSource`] if the source already
    /// owns a live entity.
    pub fn create_for_source(
        &mut self,
        source: SourceId,
        descriptor: DecalDescriptor,
    ) -> Result<DecalEntity, DecalError> {
        if self.entity_for_source(source).is_some() {
            return Err(DecalError::InconsistentSource {
                placement: Some(source),
                reason: "source is already registered".to_string(),
            });
        }
        let entity = self.allocate(Some(source), descriptor)?;
        self.by_source.insert(source, entity);
        Ok(entity)
    }

    fn allocate(
        &mut self,
        source: Option<SourceId>,
        descriptor: DecalDescriptor,
    ) -> Result<DecalEntity, DecalError> {
        descriptor.validate().map_err(|e| match source {
            Some(source) => e.with_source(source),
            None => e,
        })?;

        if let Some(limit) = self.entity_limit {
            if self.live_count >= limit {
                return Err(DecalError::CapacityExceeded {
                    requested: self.live_count + 1,
                    limit,
                });
            }
        }

        let sequence = self.next_sequence;

        let entity = if let Some(index) = self.freed_slots.pop() {
            let (chunk, row) = locate(index);
            let generation =
                self.chunks[chunk].recycle_row(row, source, sequence, &descriptor);
            DecalEntity { index, generation }
        } else {
            let chunk = self.writable_chunk()?;
            let row = self.chunks[chunk].push_row(source, sequence, &descriptor);
            DecalEntity {
                index: (chunk * CHUNK_CAPACITY + row) as u32,
                generation: 0,
            }
        };

        self.next_sequence += 1;
        self.live_count += 1;
        log::trace!("Created decal {entity} (sequence {sequence})");
        Ok(entity)
    }

    /// Returns the index of a chunk with a free row, appending one if needed.
    fn writable_chunk(&mut self) -> Result<usize, DecalError> {
        if let Some(last) = self.chunks.last() {
            if !last.is_full() {
                return Ok(self.chunks.len() - 1);
            }
        }

        let capacity = self.capacity();
        let limit = u32::MAX as usize;
        if capacity + CHUNK_CAPACITY > limit {
            return Err(DecalError::CapacityExceeded {
                requested: capacity + 1,
                limit,
            });
        }
        let chunk = DecalEntityChunk::new().map_err(|e| {
            log::error!("Failed to allocate decal chunk {}: {e}", self.chunks.len());
            DecalError::CapacityExceeded {
                requested: capacity + CHUNK_CAPACITY,
                limit: capacity,
            }
        })?;
        self.chunks.push(Box::new(chunk));
        log::debug!(
            "Allocated decal chunk {} (capacity {})",
            self.chunks.len() - 1,
            self.capacity()
        );
        Ok(self.chunks.len() - 1)
    }

    /// Destroys an entity. Returns `false` if the handle was already invalid.
    ///
    /// The handle becomes invalid immediately. If a frame is open the slot is
    /// parked until [`end_frame`](Self::end_frame); otherwise it goes
    /// straight back to the free list.
    pub fn destroy(&mut self, entity: DecalEntity) -> bool {
        if !self.is_valid(entity) {
            return false;
        }
        let (chunk, row) = locate(entity.index);
        let slot = &mut self.chunks[chunk];

        if let Some(source) = slot.sources[row] {
            if self.by_source.get(&source) == Some(&entity) {
                self.by_source.remove(&source);
            }
        }
        slot.pending[row] = None;

        if self.frame_open {
            slot.states[row] = DecalState::PendingDestroy;
            self.pending_destroy.push(entity.index);
        } else {
            slot.states[row] = DecalState::Destroyed;
            self.release_slot(entity.index);
        }
        self.live_count -= 1;
        log::trace!("Destroyed decal {entity}");
        true
    }

    /// Returns a destroyed slot to the free list, unless its generation is exhausted.
    fn release_slot(&mut self, index: u32) {
        let (chunk, row) = locate(index);
        if self.chunks[chunk].generations[row] == u32::MAX {
            log::debug!("Retiring decal slot {index}: generation exhausted");
            return;
        }
        self.freed_slots.push(index);
    }

    /// Returns `true` if the handle refers to a live entity.
    pub fn is_valid(&self, entity: DecalEntity) -> bool {
        self.slot(entity).is_ok()
    }

    fn slot(&self, entity: DecalEntity) -> Result<(&DecalEntityChunk, usize), DecalError> {
        let (chunk, row) = locate(entity.index);
        self.chunks
            .get(chunk)
            .filter(|c| {
                row < c.row_count()
                    && c.generations[row] == entity.generation
                    && c.states[row].is_alive()
            })
            .map(|c| (&**c, row))
            .ok_or(DecalError::InvalidHandle(entity))
    }

    fn slot_mut(
        &mut self,
        entity: DecalEntity,
    ) -> Result<(&mut DecalEntityChunk, usize), DecalError> {
        self.slot(entity)?;
        let (chunk, row) = locate(entity.index);
        Ok((&mut self.chunks[chunk], row))
    }

    /// Returns an owned copy of an entity's data.
    pub fn get(&self, entity: DecalEntity) -> Result<DecalRecord, DecalError> {
        let (chunk, row) = self.slot(entity)?;
        Ok(DecalRecord {
            entity,
            source: chunk.sources[row],
            state: chunk.states[row],
            sequence: chunk.sequences[row],
            descriptor: chunk.descriptor(row),
            world_bounds: chunk.bounds[row],
        })
    }

    /// Returns a borrowed view of an entity.
    pub fn view(&self, entity: DecalEntity) -> Result<DecalView<'_>, DecalError> {
        let (chunk, row) = self.slot(entity)?;
        Ok(DecalView { chunk, row, entity })
    }

    /// Returns the state of a raw slot, whether or not any handle to it is valid.
    ///
    /// `None` for slots that were never allocated.
    pub fn slot_state(&self, index: u32) -> Option<DecalState> {
        let (chunk, row) = locate(index);
        self.chunks
            .get(chunk)
            .and_then(|c| c.states.get(row))
            .copied()
    }

    /// Stores a new placement snapshot and marks the entity [`DecalState::CacheStale`].
    ///
    /// The cached data is left untouched until the cache update refreshes it.
    pub fn update(
        &mut self,
        entity: DecalEntity,
        descriptor: DecalDescriptor,
    ) -> Result<(), DecalError> {
        let (chunk, row) = self.slot_mut(entity)?;
        if let Err(e) = descriptor.validate() {
            return Err(match chunk.sources[row] {
                Some(source) => e.with_source(source),
                None => e,
            });
        }
        chunk.pending[row] = Some(descriptor);
        chunk.states[row] = DecalState::CacheStale;
        Ok(())
    }

    /// Marks the entity [`DecalState::CacheStale`] without a snapshot; the cache
    /// update will pull fresh data from the placement source.
    pub fn mark_stale(&mut self, entity: DecalEntity) -> Result<(), DecalError> {
        let (chunk, row) = self.slot_mut(entity)?;
        chunk.states[row] = DecalState::CacheStale;
        Ok(())
    }

    /// Takes the snapshot pushed by [`update`](Self::update), if any.
    pub fn take_pending(
        &mut self,
        entity: DecalEntity,
    ) -> Result<Option<DecalDescriptor>, DecalError> {
        let (chunk, row) = self.slot_mut(entity)?;
        Ok(chunk.pending[row].take())
    }

    /// Writes fresh placement data into the cache and moves the entity back to
    /// [`DecalState::Live`].
    pub fn refresh(
        &mut self,
        entity: DecalEntity,
        descriptor: &DecalDescriptor,
    ) -> Result<(), DecalError> {
        let (chunk, row) = self.slot_mut(entity)?;
        if let Err(e) = descriptor.validate() {
            return Err(match chunk.sources[row] {
                Some(source) => e.with_source(source),
                None => e,
            });
        }
        chunk.write_descriptor(row, descriptor);
        chunk.pending[row] = None;
        chunk.states[row] = DecalState::Live;
        Ok(())
    }

    /// Returns every entity in [`DecalState::CacheStale`], in ascending slot order.
    pub fn stale_entities(&self) -> Vec<DecalEntity> {
        self.iter_live()
            .filter(|view| view.state() == DecalState::CacheStale)
            .map(|view| view.entity())
            .collect()
    }

    /// Returns the live entity registered for `source`.
    pub fn entity_for_source(&self, source: SourceId) -> Option<DecalEntity> {
        self.by_source
            .get(&source)
            .copied()
            .filter(|&entity| self.is_valid(entity))
    }

    /// Opens a frame. Destroys issued until [`end_frame`](Self::end_frame) are deferred.
    pub fn begin_frame(&mut self) -> u64 {
        if self.frame_open {
            log::warn!(
                "begin_frame called twice without end_frame (frame {})",
                self.frame_index
            );
        } else {
            self.frame_index += 1;
            self.frame_open = true;
        }
        self.frame_index
    }

    /// Closes the frame and releases the slots destroyed during it.
    ///
    /// Returns the number of released slots.
    pub fn end_frame(&mut self) -> usize {
        self.frame_open = false;
        let released = self.pending_destroy.len();
        for index in std::mem::take(&mut self.pending_destroy) {
            let (chunk, row) = locate(index);
            self.chunks[chunk].states[row] = DecalState::Destroyed;
            self.release_slot(index);
        }
        if released > 0 {
            log::trace!(
                "Released {released} decal slot(s) at end of frame {}",
                self.frame_index
            );
        }
        released
    }

    /// Returns `true` while a frame is open.
    pub fn is_frame_open(&self) -> bool {
        self.frame_open
    }

    /// The index of the current (or last) frame. Starts at 0 before the first frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Returns the number of live entities.
    pub fn len(&self) -> usize {
        self.live_count
    }

    /// Returns `true` if no entity is alive.
    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }

    /// Returns the number of allocated chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Returns the number of slots the allocated chunks can hold.
    pub fn capacity(&self) -> usize {
        self.chunks.len() * CHUNK_CAPACITY
    }

    /// Iterates over every live entity in ascending chunk/slot order.
    pub fn iter_live(&self) -> impl Iterator<Item = DecalView<'_>> {
        self.chunks.iter().enumerate().flat_map(|(chunk_index, chunk)| {
            let chunk: &DecalEntityChunk = chunk;
            (0..chunk.row_count())
                .filter(move |&row| chunk.states[row].is_alive())
                .map(move |row| DecalView {
                    chunk,
                    row,
                    entity: DecalEntity {
                        index: (chunk_index * CHUNK_CAPACITY + row) as u32,
                        generation: chunk.generations[row],
                    },
                })
        })
    }
}
