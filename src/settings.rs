// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};
use thiserror::Error;

/// Tunable tolerances of the collision queries.
///
/// The defaults are the values the movement code is tuned against; changing them
/// changes how the actor feels, not just how precise the queries are.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollisionSettings {
    /// Wall query radii above this are clamped.
    pub max_wall_radius: f32,
    /// Edge pushes whose alignment with the wall normal falls below this fraction
    /// of the penetration are treated as corner misses.
    pub corner_threshold: f32,
    /// Subtracted from the query radius for edge and corner checks.
    pub edge_margin: f32,
    /// Added to the edge radius after every edge push within one list.
    pub edge_margin_growth: f32,
    /// Horizontal distance non-hangable ceiling vertices are moved outward.
    pub ceiling_margin: f32,
    /// Ceilings up to this far below the probe still count.
    pub ceiling_buffer: f32,
    /// Floors up to this far above the probe still count.
    pub floor_buffer: f32,
    /// How far below an intangible floor the search for the real floor restarts.
    pub intangible_drop: f32,
}

impl Default for CollisionSettings {
    fn default() -> Self {
        Self {
            max_wall_radius: 200.0,
            corner_threshold: -0.9,
            edge_margin: 1.0,
            edge_margin_growth: 0.01,
            ceiling_margin: 1.5,
            ceiling_buffer: 78.0,
            floor_buffer: 78.0,
            intangible_drop: 200.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization/Deserialization Error: {0}")]
    Serde(#[from] toml::de::Error),

    #[error("Serialization Error: {0}")]
    SerdeSer(#[from] toml::ser::Error),
}

impl CollisionSettings {
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Loads settings from a specified file path.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Saves settings to a specified file path, ensuring the directory exists.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Loads settings from `path`, falling back to the defaults when the file is
    /// missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::debug!(
                "Collision settings {} not found, using defaults",
                path.display()
            );
            return Self::default();
        }

        match Self::load_from_file(path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Failed to load collision settings {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }
}
