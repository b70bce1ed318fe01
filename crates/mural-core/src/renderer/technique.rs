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

//! The concrete rendering technique used for decals in a frame.

use super::settings::{DecalNormalBlend, DecalSettings, DecalSurfaceData, TechniqueSetting};
use std::fmt;

/// What the host renderer can do, used to resolve [`TechniqueSetting::Automatic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RendererCapabilities {
    /// The renderer can allocate the extra DBuffer render targets.
    pub supports_dbuffer: bool,
    /// The renderer runs a deferred (GBuffer) opaque pass.
    pub deferred: bool,
}

impl Default for RendererCapabilities {
    fn default() -> Self {
        Self {
            supports_dbuffer: true,
            deferred: false,
        }
    }
}

/// A resolved decal technique, carrying only the settings that apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecalTechnique {
    /// Decals are rendered into a DBuffer sampled by the opaque pass.
    DBuffer {
        /// The attributes written to the DBuffer.
        surface_data: DecalSurfaceData,
    },
    /// Decals are projected onto the depth buffer after opaques.
    ScreenSpace {
        /// Normal reconstruction quality.
        normal_blend: DecalNormalBlend,
    },
    /// Screen-space decals written straight into the deferred GBuffer.
    GBuffer {
        /// Normal reconstruction quality.
        normal_blend: DecalNormalBlend,
    },
}

impl DecalTechnique {
    /// A short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecalTechnique::DBuffer { .. } => "DBuffer",
            DecalTechnique::ScreenSpace { .. } => "ScreenSpace",
            DecalTechnique::GBuffer { .. } => "GBuffer",
        }
    }
}

impl fmt::Display for DecalTechnique {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl DecalSettings {
    /// Resolves the requested technique against the renderer's capabilities.
    ///
    /// `Automatic` prefers the DBuffer and falls back to screen space.
    /// Screen-space decals go to the GBuffer when the renderer is deferred and
    /// `use_gbuffer` is set.
    pub fn resolve_technique(&self, caps: &RendererCapabilities) -> DecalTechnique {
        let screen_space = || {
            let normal_blend = self.screen_space.normal_blend;
            if self.screen_space.use_gbuffer && caps.deferred {
                DecalTechnique::GBuffer { normal_blend }
            } else {
                DecalTechnique::ScreenSpace { normal_blend }
            }
        };

        match self.technique {
            TechniqueSetting::DBuffer => DecalTechnique::DBuffer {
                surface_data: self.dbuffer.surface_data,
            },
            TechniqueSetting::ScreenSpace => screen_space(),
            TechniqueSetting::Automatic if caps.supports_dbuffer => DecalTechnique::DBuffer {
                surface_data: self.dbuffer.surface_data,
            },
            TechniqueSetting::Automatic => screen_space(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(technique: TechniqueSetting, use_gbuffer: bool) -> DecalSettings {
        let mut settings = DecalSettings {
            technique,
            ..Default::default()
        };
        settings.screen_space.use_gbuffer = use_gbuffer;
        settings
    }

    #[test]
    fn test_automatic_prefers_dbuffer() {
        let technique = settings(TechniqueSetting::Automatic, true)
            .resolve_technique(&RendererCapabilities::default());
        assert_eq!(
            technique,
            DecalTechnique::DBuffer {
                surface_data: DecalSurfaceData::AlbedoNormalMask
            }
        );
    }

    #[test]
    fn test_automatic_falls_back_to_screen_space() {
        let caps = RendererCapabilities {
            supports_dbuffer: false,
            deferred: false,
        };
        let technique = settings(TechniqueSetting::Automatic, true).resolve_technique(&caps);
        assert_eq!(technique.name(), "ScreenSpace");
    }

    #[test]
    fn test_screen_space_uses_gbuffer_only_when_deferred() {
        let deferred = RendererCapabilities {
            supports_dbuffer: true,
            deferred: true,
        };
        let forward = RendererCapabilities::default();

        assert_eq!(
            settings(TechniqueSetting::ScreenSpace, true)
                .resolve_technique(&deferred)
                .name(),
            "GBuffer"
        );
        assert_eq!(
            settings(TechniqueSetting::ScreenSpace, false)
                .resolve_technique(&deferred)
                .name(),
            "ScreenSpace"
        );
        assert_eq!(
            settings(TechniqueSetting::ScreenSpace, true)
                .resolve_technique(&forward)
                .name(),
            "ScreenSpace"
        );
    }

    #[test]
    fn test_explicit_dbuffer_ignores_capabilities() {
        let caps = RendererCapabilities {
            supports_dbuffer: false,
            deferred: true,
        };
        let technique = settings(TechniqueSetting::DBuffer, true).resolve_technique(&caps);
        assert_eq!(technique.to_string(), "DBuffer");
    }
}
