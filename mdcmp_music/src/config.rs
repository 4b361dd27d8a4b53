// Tunable parameters for encoding and conversion.
//
// All structs deserialize from JSON with `#[serde(default)]`, so a config
// file only needs the keys it changes:
//
//   { "seed": 42, "encode": { "velocity_jitter": 10 }, "convert": { "tempo": 100 } }

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Options applied while rendering a grid to MDC text.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Each velocity is offset by a uniform draw from
    /// `[-velocity_jitter, velocity_jitter]`. 0 disables jitter.
    pub velocity_jitter: u8,
    /// Draw a small random timing padding per event instead of `0`.
    pub humanize: bool,
    /// Start offset, in quarter notes, written into every track line.
    pub base_offset: f64,
}

/// Converter setup: tempo and the first output track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Quarter notes per minute.
    pub tempo: u32,
    pub start_track: usize,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            tempo: 120,
            start_track: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MdcConfig {
    /// Seed for jitter, humanize and shuffled chord spreads.
    pub seed: u64,
    pub encode: EncodeOptions,
    pub convert: ConverterConfig,
}

impl MdcConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
