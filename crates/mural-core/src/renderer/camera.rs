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

//! Defines what the camera provider hands to the decal pipeline each frame.

use crate::math::{Frustum, Mat4, Vec3};

/// The role of the camera being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CameraKind {
    /// A regular scene or game camera; runs the full decal pipeline.
    #[default]
    Game,
    /// A scene-view camera of the editor host; runs the full decal pipeline.
    SceneView,
    /// An asset preview camera; decals are drawn by the preview pass only.
    Preview,
}

/// A snapshot of one camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraView {
    /// The role of the camera.
    pub kind: CameraKind,
    /// Combined projection * view matrix, `[0, 1]` clip depth.
    pub view_projection: Mat4,
    /// World-space position of the camera, the origin for distance culling.
    pub position: Vec3,
    /// Rendering layers this camera sees. Decals on no shared layer are culled.
    pub layer_mask: u32,
}

impl CameraView {
    /// Creates a game camera that sees every layer.
    pub fn new(view_projection: Mat4, position: Vec3) -> Self {
        Self {
            kind: CameraKind::Game,
            view_projection,
            position,
            layer_mask: u32::MAX,
        }
    }

    /// Returns a copy with a different camera kind.
    pub fn with_kind(mut self, kind: CameraKind) -> Self {
        self.kind = kind;
        self
    }

    /// Returns a copy with a different layer mask.
    pub fn with_layer_mask(mut self, layer_mask: u32) -> Self {
        self.layer_mask = layer_mask;
        self
    }

    /// Extracts the view frustum, or `None` for a degenerate view-projection.
    pub fn frustum(&self) -> Option<Frustum> {
        Frustum::from_view_projection(&self.view_projection)
    }
}
