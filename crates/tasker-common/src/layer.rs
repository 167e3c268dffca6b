//! Source layer definitions.

use serde::{Deserialize, Serialize};

use crate::footprint::Footprint;

/// One contributing raster layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSource {
    /// Layer identifier
    pub id: String,
    /// Path of the layer's tiles in the tile storage
    pub tiles_path: String,
    /// Geographic coverage
    pub footprint: Footprint,
}

impl LayerSource {
    pub fn new(id: impl Into<String>, tiles_path: impl Into<String>, footprint: Footprint) -> Self {
        Self {
            id: id.into(),
            tiles_path: tiles_path.into(),
            footprint,
        }
    }
}
