//! Ingestion request payloads.

use serde::{Deserialize, Serialize};
use tasker_common::{Footprint, LayerSource};

/// Identification of the product a layer belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInfo {
    pub product_id: String,
    pub product_version: String,
    pub product_type: String,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ProductInfo {
    /// Display name, falling back to the product id.
    pub fn display_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(&self.product_id)
    }

    /// Relative tile path of the product's layer, `<id>/<type>`.
    pub fn layer_relative_path(&self) -> String {
        format!("{}/{}", self.product_id, self.product_type)
    }
}

/// Request to tile a brand-new layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLayerRequest {
    #[serde(flatten)]
    pub product: ProductInfo,
    /// Ground resolution in degrees per pixel
    pub resolution: f64,
    pub origin_directory: String,
    pub footprint: Footprint,
}

/// Request to merge an update into an existing layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLayerRequest {
    #[serde(flatten)]
    pub product: ProductInfo,
    /// Ground resolution of the update in degrees per pixel
    pub resolution: f64,
    /// The published layer; its tiles are the merge destination.
    pub existing_layer: LayerSource,
    pub update_layer: LayerSource,
}

/// Either kind of request, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IngestionRequest {
    New(NewLayerRequest),
    Update(UpdateLayerRequest),
}

impl IngestionRequest {
    pub fn product(&self) -> &ProductInfo {
        match self {
            IngestionRequest::New(request) => &request.product,
            IngestionRequest::Update(request) => &request.product,
        }
    }
}
