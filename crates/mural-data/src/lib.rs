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

//! # Mural Data
//!
//! Storage layer of the decal pipeline. The [`EntityStore`] is the only
//! writer of decal data; it keeps every entity in a fixed-capacity,
//! structure-of-arrays chunk so that culling and resolve can
//! stream over contiguous columns.
//!
//! External code never mutates the store while a frame is being processed:
//! registrations coming from other threads go through a [`DecalCommandSender`]
//! and are applied at the next frame boundary.

#![warn(missing_docs)]

mod chunk;
mod command;
mod descriptor;
mod entity_store;
mod error;

pub use chunk::{DecalState, CHUNK_CAPACITY};
pub use command::{command_queue, DecalCommand, DecalCommandReceiver, DecalCommandSender};
pub use descriptor::{DecalDescriptor, DecalFade};
pub use entity_store::{DecalRecord, DecalView, EntityStore};
pub use error::DecalError;
