use crate::assets::AssetRecord;
use crate::error::SheetError;
use crate::geometry::MmRect;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;

/// One resolved rectangle from the upstream packer, in millimeters,
/// origin at the top-left of the sheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    #[serde(alias = "assetId", deserialize_with = "id_string")]
    pub design_id: String,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
}

fn default_width() -> f64 {
    50.0
}

fn default_height() -> f64 {
    30.0
}

impl Placement {
    pub fn new(design_id: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            design_id: design_id.into(),
            x,
            y,
            width,
            height,
        }
    }

    pub fn bounds(&self) -> MmRect {
        MmRect::new(self.x, self.y, self.width, self.height)
    }

    fn validate(&self, index: usize) -> Result<(), SheetError> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(SheetError::InvalidRequest(format!(
                "arrangement {} ({}) has a non-finite position",
                index + 1,
                self.design_id
            )));
        }
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(SheetError::InvalidRequest(format!(
                "arrangement {} ({}) must have a positive size, got {}x{}",
                index + 1,
                self.design_id,
                self.width,
                self.height
            )));
        }
        Ok(())
    }
}

/// The unit of work: everything needed to render one sheet.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[serde(rename = "arrangements")]
    pub placements: Vec<Placement>,
    #[serde(rename = "designFiles", default)]
    pub assets: Vec<AssetRecord>,
    pub output_path: PathBuf,
    /// Informational name of the packing algorithm that produced the placements.
    #[serde(default)]
    pub algorithm: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl RenderRequest {
    pub fn new(
        placements: Vec<Placement>,
        assets: Vec<AssetRecord>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            placements,
            assets,
            output_path: output_path.into(),
            algorithm: None,
            title: None,
        }
    }

    /// Decodes and validates a JSON payload.
    pub fn from_json(payload: &str) -> Result<Self, SheetError> {
        let request: RenderRequest = serde_json::from_str(payload)?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), SheetError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(SheetError::InvalidRequest(
                "outputPath must not be empty".to_string(),
            ));
        }
        for (index, placement) in self.placements.iter().enumerate() {
            placement.validate(index)?;
        }
        Ok(())
    }
}

/// Accepts identifiers sent either as JSON strings or numbers.
pub(crate) fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Int(value) => value.to_string(),
        RawId::Float(value) => value.to_string(),
    })
}
