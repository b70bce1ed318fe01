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

//! Renderer-facing contracts of the decal pipeline: settings, techniques,
//! cameras and material identities.

pub mod camera;
pub mod material;
pub mod settings;
pub mod technique;

pub use camera::{CameraKind, CameraView};
pub use material::MaterialId;
pub use settings::{
    DBufferSettings, DecalNormalBlend, DecalSettings, DecalSurfaceData, ScreenSpaceSettings,
    SettingsError, TechniqueSetting, DEFAULT_MAX_INSTANCES_PER_BATCH,
};
pub use technique::{DecalTechnique, RendererCapabilities};
