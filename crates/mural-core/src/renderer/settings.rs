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

//! Settings of the decal render feature.
//!
//! Settings are plain data with serde derives so they can be authored in a
//! RON file. Missing fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The default instancing limit of a single decal draw call.
pub const DEFAULT_MAX_INSTANCES_PER_BATCH: usize = 250;

/// The technique requested by the user. `Automatic` is resolved against the
/// renderer's capabilities, see [`DecalSettings::resolve_technique`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TechniqueSetting {
    /// Pick the best technique the renderer supports.
    #[default]
    Automatic,
    /// Render decals into a DBuffer before the opaque pass.
    DBuffer,
    /// Project decals in screen space after the opaque pass.
    ScreenSpace,
}

/// Which surface attributes a DBuffer decal writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecalSurfaceData {
    /// Albedo only.
    Albedo,
    /// Albedo and normal.
    AlbedoNormal,
    /// Albedo, normal and the metallic/occlusion/smoothness mask.
    #[default]
    AlbedoNormalMask,
}

/// Quality of normal reconstruction for screen-space decals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DecalNormalBlend {
    /// Normals are not blended.
    Off,
    /// One depth tap.
    #[default]
    Low,
    /// Three depth taps.
    Medium,
    /// Five depth taps.
    High,
}

/// Settings of the DBuffer technique.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DBufferSettings {
    /// The attributes written to the DBuffer.
    pub surface_data: DecalSurfaceData,
}

/// Settings of the screen-space technique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenSpaceSettings {
    /// Normal reconstruction quality.
    pub normal_blend: DecalNormalBlend,
    /// Write directly into the GBuffer when the renderer is deferred.
    pub use_gbuffer: bool,
}

impl Default for ScreenSpaceSettings {
    fn default() -> Self {
        Self {
            normal_blend: DecalNormalBlend::default(),
            use_gbuffer: true,
        }
    }
}

/// A collection of settings for the decal render feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalSettings {
    /// The requested technique.
    pub technique: TechniqueSetting,
    /// Decals further away from the camera than this are culled.
    pub max_draw_distance: f32,
    /// DBuffer technique settings.
    pub dbuffer: DBufferSettings,
    /// Screen-space technique settings.
    pub screen_space: ScreenSpaceSettings,
    /// The largest number of instances a single draw batch may hold.
    pub max_instances_per_batch: usize,
}

impl Default for DecalSettings {
    fn default() -> Self {
        Self {
            technique: TechniqueSetting::Automatic,
            max_draw_distance: 1000.0,
            dbuffer: DBufferSettings::default(),
            screen_space: ScreenSpaceSettings::default(),
            max_instances_per_batch: DEFAULT_MAX_INSTANCES_PER_BATCH,
        }
    }
}

/// An error raised while loading or validating [`DecalSettings`].
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
    /// The RON source could not be parsed.
    Parse(String),
    /// A field holds a value outside its valid range.
    InvalidValue {
        /// The name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::Parse(details) => write!(f, "Failed to parse decal settings: {details}"),
            SettingsError::InvalidValue { field, reason } => {
                write!(f, "Invalid decal setting '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for SettingsError {}

impl DecalSettings {
    /// Parses and validates settings from a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, SettingsError> {
        let settings: DecalSettings =
            ron::from_str(source).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every field is within its valid range.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.max_draw_distance.is_finite() && self.max_draw_distance > 0.0) {
            return Err(SettingsError::InvalidValue {
                field: "max_draw_distance",
                reason: format!("must be a positive finite number, got {}", self.max_draw_distance),
            });
        }
        if self.max_instances_per_batch == 0 {
            return Err(SettingsError::InvalidValue {
                field: "max_instances_per_batch",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DecalSettings::default();
        assert_eq!(settings.technique, TechniqueSetting::Automatic);
        assert_eq!(settings.max_draw_distance, 1000.0);
        assert!(settings.screen_space.use_gbuffer);
        assert_eq!(settings.max_instances_per_batch, 250);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_from_ron_with_partial_fields() {
        let settings = DecalSettings::from_ron_str(
            "(technique: ScreenSpace, max_draw_distance: 250.0, screen_space: (use_gbuffer: false))",
        )
        .expect("settings should parse");
        assert_eq!(settings.technique, TechniqueSetting::ScreenSpace);
        assert_eq!(settings.max_draw_distance, 250.0);
        assert!(!settings.screen_space.use_gbuffer);
        assert_eq!(settings.screen_space.normal_blend, DecalNormalBlend::Low);
        assert_eq!(settings.dbuffer.surface_data, DecalSurfaceData::AlbedoNormalMask);
    }

    #[test]
    fn test_from_ron_rejects_invalid_values() {
        let err = DecalSettings::from_ron_str("(max_draw_distance: -1.0)").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                field: "max_draw_distance",
                ..
            }
        ));

        let err = DecalSettings::from_ron_str("(max_instances_per_batch: 0)").unwrap_err();
        assert!(matches!(
            err,
            SettingsError::InvalidValue {
                field: "max_instances_per_batch",
                ..
            }
        ));
    }

    #[test]
    fn test_from_ron_reports_parse_errors() {
        let err = DecalSettings::from_ron_str("(technique: Sideways)").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
