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

//! # Lane Abstraction
//!
//! A **Lane** is one stage of the per-frame decal pipeline. Lanes are owned
//! and sequenced by an agent; each exposes a typed `run` method for its own
//! inputs and outputs, while this trait carries what the agent needs to
//! reason about them generically (identity, classification, cost).
//!
//! ```text
//! CacheUpdate → Culling → Resolve → Batching
//! ```
//!
//! Lanes never keep references to entity storage between calls. Everything
//! they produce is frame-scoped and may be dropped at any point to abort a
//! frame.

use std::fmt;

/// Error type for lane and agent operations.
#[derive(Debug)]
pub enum LaneError {
    /// The configuration handed to a lane or agent was rejected.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A stage could not run at all (e.g. its storage was poisoned).
    ExecutionFailed(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for LaneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneError::InitializationFailed(e) => write!(f, "Lane initialization failed: {e}"),
            LaneError::ExecutionFailed(e) => write!(f, "Lane execution failed: {e}"),
        }
    }
}

impl std::error::Error for LaneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LaneError::ExecutionFailed(e) | LaneError::InitializationFailed(e) => Some(e.as_ref()),
        }
    }
}

impl LaneError {
    /// Convenience constructor for an execution failure described by a message.
    pub fn execution(message: impl Into<String>) -> Self {
        LaneError::ExecutionFailed(message.into().into())
    }
}

/// Classification of the decal pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LaneKind {
    /// Refreshes cached bounds and material snapshots of stale entities.
    CacheUpdate,
    /// Computes the visible subset of entities for one camera.
    Culling,
    /// Materializes per-instance GPU payloads for visible entities.
    Resolve,
    /// Groups resolved instances into draw batches.
    Batching,
}

impl fmt::Display for LaneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneKind::CacheUpdate => write!(f, "CacheUpdate"),
            LaneKind::Culling => write!(f, "Culling"),
            LaneKind::Resolve => write!(f, "Resolve"),
            LaneKind::Batching => write!(f, "Batching"),
        }
    }
}

/// Base trait for every decal pipeline stage.
pub trait Lane: Send + Sync {
    /// Human-readable name identifying this lane's strategy, used for logging.
    fn strategy_name(&self) -> &'static str;

    /// The stage this lane implements.
    fn lane_kind(&self) -> LaneKind;

    /// Estimated CPU cost of running this lane over `entity_count` entities,
    /// in abstract units. Defaults to linear cost.
    fn estimate_cost(&self, entity_count: usize) -> f32 {
        entity_count as f32
    }
}
