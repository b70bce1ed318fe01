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

//! # Mural Agents
//!
//! Agents own and sequence the lanes of the decal pipeline. The
//! [`DecalAgent`] runs one camera frame end to end; the [`SharedDecalStore`]
//! lets several agents share one [`EntityStore`](mural_data::EntityStore)
//! through explicit acquire/release calls.

#![warn(missing_docs)]

pub mod decal_agent;
pub mod shared_store;

pub use decal_agent::{DecalAgent, FrameOutput};
pub use shared_store::{PlacementRegistry, SharedDecalStore};
