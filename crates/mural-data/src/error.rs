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

use mural_core::ecs::{DecalEntity, SourceId};
use thiserror::Error;

/// Errors returned by decal entity storage.
///
/// None of these are fatal to the pipeline: callers log them and carry on
/// with the remaining entities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecalError {
    /// The handle is stale (its slot was destroyed or recycled) or was never issued.
    #[error("invalid decal handle {0}")]
    InvalidHandle(DecalEntity),

    /// Growing the storage failed, either because the configured entity limit
    /// or the handle index space is exhausted, or because the allocator refused.
    #[error("decal storage capacity exceeded: requested {requested}, limit {limit}")]
    CapacityExceeded {
        /// The number of entities that would have been stored.
        requested: usize,
        /// The maximum the store could hold.
        limit: usize,
    },

    /// A placement source supplied data the pipeline cannot use.
    #[error("inconsistent placement data ({placement:?}): {reason}")]
    InconsistentSource {
        /// The placement the data came from, if known.
        placement: Option<SourceId>,
        /// What was wrong with the data.
        reason: String,
    },
}

impl DecalError {
    /// Builds an [`DecalError::InconsistentSource`] without a known source.
    pub(crate) fn inconsistent(reason: impl Into<String>) -> Self {
        DecalError::InconsistentSource {
            placement: None,
            reason: reason.into(),
        }
    }

    /// Attaches the source to an [`DecalError::InconsistentSource`].
    pub fn with_source(self, source: SourceId) -> Self {
        match self {
            DecalError::InconsistentSource { reason, .. } => DecalError::InconsistentSource {
                placement: Some(source),
                reason,
            },
            other => other,
        }
    }
}
