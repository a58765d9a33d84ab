//! PPU configuration, loadable from JSON.
//!
//! ```json
//! { "model": "cgb", "dmg_shades": [4294967295, 4291611852, 4285098345, 4278190080] }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ppu::palette::DEFAULT_SHADES;
use crate::GbError;

/// Which hardware the PPU behaves as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareModel {
    /// Monochrome Game Boy
    #[default]
    Dmg,
    /// Game Boy Color in color mode
    Cgb,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PpuConfig {
    pub model: HardwareModel,
    /// ARGB for DMG shades 0 (lightest) to 3 (darkest)
    pub dmg_shades: [u32; 4],
    /// Present all 256 composited columns instead of the visible 160
    pub present_full_width: bool,
}

impl Default for PpuConfig {
    fn default() -> Self {
        Self {
            model: HardwareModel::Dmg,
            dmg_shades: DEFAULT_SHADES,
            present_full_width: false,
        }
    }
}

impl PpuConfig {
    pub fn from_json_str(text: &str) -> Result<Self, GbError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GbError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
