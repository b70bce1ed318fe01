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

//! # Mural Lanes
//!
//! The hot-path stages of the decal pipeline. Each lane is a small, stateless
//! (or configuration-only) struct with a typed `run`-style method; the
//! [`mural_core::lane::Lane`] trait identifies them to the orchestrating agent.
//!
//! ```text
//! CacheUpdateLane → CullingLane → CulledResolveLane → DrawBatchLane
//! ```
//!
//! Only the cache update writes to the [`EntityStore`](mural_data::EntityStore).
//! The other stages take it by shared reference and produce frame-scoped
//! buffers that hold handles or copies, never references into the store.

#![warn(missing_docs)]

pub mod cache_update_lane;
pub mod culling_lane;
pub mod draw_batch_lane;
pub mod pass_plan;
pub mod resolve_lane;

pub use cache_update_lane::*;
pub use culling_lane::*;
pub use draw_batch_lane::*;
pub use pass_plan::*;
pub use resolve_lane::*;
