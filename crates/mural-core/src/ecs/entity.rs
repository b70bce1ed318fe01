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

//! Defines the decal entity handle and the identifier of its placement source.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable handle identifying one placed decal instance.
///
/// It combines a slot index with a generation count to solve the "ABA problem".
/// When a decal is destroyed its slot can be recycled for a new decal, but the
/// generation is incremented on reuse. Old handles pointing at the recycled
/// slot no longer match and are reported as invalid instead of aliasing the
/// new decal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DecalEntity {
    /// The global slot index. Chunk and row are derived from it.
    pub index: u32,
    /// A generation counter that is incremented each time the slot is recycled.
    pub generation: u32,
}

impl fmt::Display for DecalEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Identifies the external object (e.g. a decal projector) that owns a decal's placement.
///
/// The pipeline never owns placement data; it only remembers which source to
/// ask when the cached copy goes stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(pub u64);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}
