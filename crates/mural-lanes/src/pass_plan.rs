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

//! The render passes the host enqueues for each decal technique.

use mural_core::renderer::DecalTechnique;
use std::fmt;

/// The point of the host frame a pass is injected at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InjectionPoint {
    /// After depth/normal prepasses, before opaques.
    AfterPrePasses,
    /// After the deferred GBuffer fill.
    AfterGBuffer,
    /// After opaque geometry.
    AfterOpaques,
    /// After the skybox.
    AfterSkybox,
}

/// A render pass of the decal feature. The host owns the GPU side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecalPass {
    /// Copies scene depth for decals to sample.
    CopyDepth,
    /// Renders decals into the DBuffer targets.
    DBufferRender,
    /// Renders the emissive part of DBuffer decals.
    ForwardEmissive,
    /// Projects decals onto the color target.
    ScreenSpaceRender,
    /// Projects decals into the GBuffer.
    GBufferRender,
    /// Draws decal materials for asset previews.
    Preview,
}

impl DecalPass {
    /// Where the host must enqueue this pass.
    pub fn injection_point(self) -> InjectionPoint {
        match self {
            DecalPass::CopyDepth | DecalPass::DBufferRender => InjectionPoint::AfterPrePasses,
            DecalPass::GBufferRender => InjectionPoint::AfterGBuffer,
            DecalPass::ForwardEmissive | DecalPass::Preview => InjectionPoint::AfterOpaques,
            DecalPass::ScreenSpaceRender => InjectionPoint::AfterSkybox,
        }
    }
}

impl fmt::Display for DecalPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DecalPass::CopyDepth => "Copy Depth",
            DecalPass::DBufferRender => "DBuffer Render",
            DecalPass::ForwardEmissive => "Decal Forward Emissive Render",
            DecalPass::ScreenSpaceRender => "Decal Screen Space Render",
            DecalPass::GBufferRender => "Decal GBuffer Render",
            DecalPass::Preview => "Decal Preview Render",
        };
        f.write_str(name)
    }
}

const DBUFFER_PASSES: &[DecalPass] = &[
    DecalPass::CopyDepth,
    DecalPass::DBufferRender,
    DecalPass::ForwardEmissive,
];
const SCREEN_SPACE_PASSES: &[DecalPass] = &[DecalPass::ScreenSpaceRender];
const GBUFFER_PASSES: &[DecalPass] = &[DecalPass::GBufferRender];
const PREVIEW_PASSES: &[DecalPass] = &[DecalPass::Preview];

/// The passes of one camera for one frame, in enqueue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassPlan {
    technique: Option<DecalTechnique>,
    passes: &'static [DecalPass],
}

impl PassPlan {
    /// The plan of a regular camera rendering with `technique`.
    pub fn for_technique(technique: DecalTechnique) -> Self {
        let passes = match technique {
            DecalTechnique::DBuffer { .. } => DBUFFER_PASSES,
            DecalTechnique::ScreenSpace { .. } => SCREEN_SPACE_PASSES,
            DecalTechnique::GBuffer { .. } => GBUFFER_PASSES,
        };
        Self {
            technique: Some(technique),
            passes,
        }
    }

    /// The plan of a preview camera; the entity pipeline does not run.
    pub fn preview() -> Self {
        Self {
            technique: None,
            passes: PREVIEW_PASSES,
        }
    }

    /// The technique decals are drawn with, `None` for previews.
    pub fn technique(&self) -> Option<DecalTechnique> {
        self.technique
    }

    /// The passes, in enqueue order.
    pub fn passes(&self) -> &'static [DecalPass] {
        self.passes
    }

    /// Returns `true` if the plan enqueues `pass`.
    pub fn contains(&self, pass: DecalPass) -> bool {
        self.passes.contains(&pass)
    }

    /// Returns `true` if the plan draws the culled entity set.
    pub fn runs_entity_pipeline(&self) -> bool {
        self.technique.is_some()
    }
}
