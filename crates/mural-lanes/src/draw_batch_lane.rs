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

//! Defines the lane that groups resolved instances into instanced draws.

use std::collections::HashMap;

use crate::resolve_lane::{DecalInstanceData, ResolvedInstances};
use mural_core::ecs::DecalEntity;
use mural_core::lane::{Lane, LaneError, LaneKind};
use mural_core::renderer::{
    DecalSettings, DecalTechnique, MaterialId, DEFAULT_MAX_INSTANCES_PER_BATCH,
};

/// Instances sharing a key can be drawn with a single instanced call.
///
/// The draw order is part of the key: a batch never spans two layers, so a
/// decal of a higher layer is never submitted before one of a lower layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchKey {
    /// The layer the decal composites in.
    pub draw_order: i32,
    /// The material.
    pub material: MaterialId,
    /// The technique the decal is rendered with.
    pub technique: DecalTechnique,
}

/// One instanced draw: a contiguous range of [`DrawList::instances`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawBatch {
    /// What is drawn.
    pub key: BatchKey,
    /// First instance of the range.
    pub first_instance: u32,
    /// Number of instances in the range.
    pub instance_count: u32,
}

impl DrawBatch {
    /// The instance range of this batch.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.first_instance as usize;
        start..start + self.instance_count as usize
    }
}

/// The ordered draws of one camera for one frame, ready for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    /// The store frame the draws were built in.
    pub frame_index: u64,
    /// Batches, in submission order.
    pub batches: Vec<DrawBatch>,
    /// Instance payloads, reordered so every batch is contiguous.
    pub instances: Vec<DecalInstanceData>,
    /// Source entity of each instance.
    pub entities: Vec<DecalEntity>,
}

impl DrawList {
    /// The entities drawn by `batch`, in instance order.
    pub fn batch_entities(&self, batch: &DrawBatch) -> &[DecalEntity] {
        &self.entities[batch.range()]
    }

    /// The instance payloads of `batch`.
    pub fn batch_instances(&self, batch: &DrawBatch) -> &[DecalInstanceData] {
        &self.instances[batch.range()]
    }

    /// Returns `true` if nothing is drawn.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

/// A lane that groups resolved instances by [`BatchKey`].
///
/// Input is expected in `(draw_order, sequence)` order. Groups are emitted in
/// the order of their first instance and keep their members in input order.
/// A group larger than the instancing limit is split into consecutive batches
/// with the same key. Different keys are never merged.
#[derive(Debug)]
pub struct DrawBatchLane {
    max_instances_per_batch: usize,
}

impl Default for DrawBatchLane {
    fn default() -> Self {
        Self {
            max_instances_per_batch: DEFAULT_MAX_INSTANCES_PER_BATCH,
        }
    }
}

impl DrawBatchLane {
    /// Creates a lane with the given instancing limit.
    pub fn new(max_instances_per_batch: usize) -> Result<Self, LaneError> {
        if max_instances_per_batch == 0 {
            return Err(LaneError::InitializationFailed(
                "max_instances_per_batch must be greater than zero".into(),
            ));
        }
        Ok(Self {
            max_instances_per_batch,
        })
    }

    /// Creates a lane configured from decal settings.
    pub fn from_settings(settings: &DecalSettings) -> Result<Self, LaneError> {
        Self::new(settings.max_instances_per_batch)
    }

    /// The instancing limit.
    pub fn max_instances_per_batch(&self) -> usize {
        self.max_instances_per_batch
    }

    /// Builds the ordered draw list.
    pub fn build_batches(&self, resolved: &ResolvedInstances) -> DrawList {
        // 1. Group instance indices by key, in order of first encounter.
        let mut groups: Vec<(BatchKey, Vec<usize>)> = Vec::new();
        let mut group_of: HashMap<BatchKey, usize> = HashMap::new();
        for (i, key) in resolved.keys.iter().enumerate() {
            let group = *group_of.entry(*key).or_insert_with(|| {
                groups.push((*key, Vec::new()));
                groups.len() - 1
            });
            groups[group].1.push(i);
        }

        // 2. Lay out each group contiguously, splitting at the instancing limit.
        let mut list = DrawList {
            frame_index: resolved.frame_index,
            batches: Vec::with_capacity(groups.len()),
            instances: Vec::with_capacity(resolved.len()),
            entities: Vec::with_capacity(resolved.len()),
        };
        for (key, members) in &groups {
            for run in members.chunks(self.max_instances_per_batch) {
                list.batches.push(DrawBatch {
                    key: *key,
                    first_instance: list.instances.len() as u32,
                    instance_count: run.len() as u32,
                });
                for &i in run {
                    list.instances.push(resolved.instances[i]);
                    list.entities.push(resolved.entities[i]);
                }
            }
        }

        list
    }
}

impl Lane for DrawBatchLane {
    fn strategy_name(&self) -> &'static str {
        "GroupByKey"
    }

    fn lane_kind(&self) -> LaneKind {
        LaneKind::Batching
    }
}
