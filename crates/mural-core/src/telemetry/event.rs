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

//! Event types for decal pipeline telemetry.

/// Counters describing one processed frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// The index of the frame these counters belong to.
    pub frame_index: u64,
    /// Live entities in the store when culling started.
    pub live_entities: usize,
    /// Queued commands applied at the frame boundary.
    pub commands_applied: usize,
    /// Entities whose cache was refreshed this frame.
    pub cache_refreshed: usize,
    /// Stale entities whose source failed and were left for retry.
    pub cache_skipped: usize,
    /// Entities that survived culling.
    pub visible: usize,
    /// Instances materialized by the resolve stage.
    pub resolved: usize,
    /// Visible handles that were invalid by the time they were resolved.
    pub resolve_skipped: usize,
    /// Draw batches produced.
    pub batches: usize,
}

/// A telemetry event produced by the decal agent.
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// Counters of a completed frame.
    FrameStats(FrameStats),
    /// The resolved decal technique changed (carries the new technique name).
    TechniqueChanged(&'static str),
}
