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

use std::collections::TryReserveError;

use crate::descriptor::{DecalDescriptor, DecalFade};
use mural_core::ecs::SourceId;
use mural_core::math::{Aabb, Mat4, Vec3};
use mural_core::renderer::MaterialId;

/// The number of slots in one [`DecalEntityChunk`].
pub const CHUNK_CAPACITY: usize = 128;

/// Lifecycle state of a decal slot.
///
/// ```text
/// Unregistered → Live → (CacheStale → Live)* → PendingDestroy → Destroyed
/// ```
///
/// `Unregistered` is implicit: a slot that was never allocated has no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecalState {
    /// The cached data matches the placement source.
    Live,
    /// The placement source changed; the cache update stage must refresh it.
    CacheStale,
    /// Destroyed while a frame was in flight. The handle is already invalid,
    /// but the slot is held back from the free list until the frame ends.
    PendingDestroy,
    /// The slot is free and waiting to be recycled.
    Destroyed,
}

impl DecalState {
    /// Returns `true` for states whose handle is valid.
    #[inline]
    pub fn is_alive(self) -> bool {
        matches!(self, DecalState::Live | DecalState::CacheStale)
    }
}

/// A fixed-capacity block of decal data in a Structure of Arrays (SoA) layout.
///
/// Every column holds one value per slot; the entity in row `i` owns the
/// `i`-th element of every column. Rows are only ever appended until the
/// chunk is full and are rewritten in place when a slot is recycled, so a
/// row never moves for the lifetime of its entity. Columns are allocated
/// with their final capacity up front and never reallocate.
#[derive(Debug)]
pub(crate) struct DecalEntityChunk {
    pub(crate) generations: Vec<u32>,
    pub(crate) states: Vec<DecalState>,
    pub(crate) sources: Vec<Option<SourceId>>,
    pub(crate) sequences: Vec<u64>,
    pub(crate) transforms: Vec<Mat4>,
    pub(crate) sizes: Vec<Vec3>,
    pub(crate) pivots: Vec<Vec3>,
    pub(crate) materials: Vec<MaterialId>,
    pub(crate) draw_orders: Vec<i32>,
    pub(crate) fades: Vec<DecalFade>,
    pub(crate) layer_masks: Vec<u32>,
    /// Cached world-space projection volume.
    pub(crate) bounds: Vec<Aabb>,
    /// A snapshot pushed with a change notification, consumed by the cache update.
    pub(crate) pending: Vec<Option<DecalDescriptor>>,
}

fn column<T>() -> Result<Vec<T>, TryReserveError> {
    let mut column = Vec::new();
    column.try_reserve_exact(CHUNK_CAPACITY)?;
    Ok(column)
}

impl DecalEntityChunk {
    /// Allocates an empty chunk with room for [`CHUNK_CAPACITY`] slots.
    pub(crate) fn new() -> Result<Self, TryReserveError> {
        Ok(Self {
            generations: column()?,
            states: column()?,
            sources: column()?,
            sequences: column()?,
            transforms: column()?,
            sizes: column()?,
            pivots: column()?,
            materials: column()?,
            draw_orders: column()?,
            fades: column()?,
            layer_masks: column()?,
            bounds: column()?,
            pending: column()?,
        })
    }

    /// Returns the number of rows ever allocated in this chunk.
    pub(crate) fn row_count(&self) -> usize {
        self.generations.len()
    }

    /// Returns `true` once every row has been allocated.
    pub(crate) fn is_full(&self) -> bool {
        self.row_count() == CHUNK_CAPACITY
    }

    /// Appends a new row at generation 0 and returns its index.
    pub(crate) fn push_row(
        &mut self,
        source: Option<SourceId>,
        sequence: u64,
        descriptor: &DecalDescriptor,
    ) -> usize {
        debug_assert!(!self.is_full());
        let row = self.row_count();
        self.generations.push(0);
        self.states.push(DecalState::Live);
        self.sources.push(source);
        self.sequences.push(sequence);
        self.transforms.push(descriptor.transform);
        self.sizes.push(descriptor.size);
        self.pivots.push(descriptor.pivot);
        self.materials.push(descriptor.material);
        self.draw_orders.push(descriptor.draw_order);
        self.fades.push(descriptor.fade);
        self.layer_masks.push(descriptor.layer_mask);
        self.bounds.push(descriptor.world_bounds());
        self.pending.push(None);
        row
    }

    /// Reinitializes a recycled row, bumping its generation. Returns the new generation.
    pub(crate) fn recycle_row(
        &mut self,
        row: usize,
        source: Option<SourceId>,
        sequence: u64,
        descriptor: &DecalDescriptor,
    ) -> u32 {
        debug_assert_eq!(self.states[row], DecalState::Destroyed);
        debug_assert!(self.generations[row] < u32::MAX, "exhausted slots are retired");
        self.generations[row] += 1;
        self.states[row] = DecalState::Live;
        self.sources[row] = source;
        self.sequences[row] = sequence;
        self.pending[row] = None;
        self.write_descriptor(row, descriptor);
        self.generations[row]
    }

    /// Overwrites the cached placement data of a row and recomputes its bounds.
    pub(crate) fn write_descriptor(&mut self, row: usize, descriptor: &DecalDescriptor) {
        self.transforms[row] = descriptor.transform;
        self.sizes[row] = descriptor.size;
        self.pivots[row] = descriptor.pivot;
        self.materials[row] = descriptor.material;
        self.draw_orders[row] = descriptor.draw_order;
        self.fades[row] = descriptor.fade;
        self.layer_masks[row] = descriptor.layer_mask;
        self.bounds[row] = descriptor.world_bounds();
    }

    /// Rebuilds the descriptor currently cached in a row.
    pub(crate) fn descriptor(&self, row: usize) -> DecalDescriptor {
        DecalDescriptor {
            transform: self.transforms[row],
            size: self.sizes[row],
            pivot: self.pivots[row],
            material: self.materials[row],
            draw_order: self.draw_orders[row],
            fade: self.fades[row],
            layer_mask: self.layer_masks[row],
        }
    }
}
