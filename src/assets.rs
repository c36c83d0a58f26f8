use crate::request::Placement;
use serde::Deserialize;
use std::path::Path;

/// Closed set of asset families the embedder knows how to handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    VectorDocument,
    VectorImage,
    RasterImage,
    Unknown,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::VectorDocument => "vector_document",
            AssetKind::VectorImage => "vector_image",
            AssetKind::RasterImage => "raster_image",
            AssetKind::Unknown => "unknown",
        }
    }

    /// Classifies by file extension, case-insensitively.
    pub fn from_path(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|v| v.to_str()) else {
            return AssetKind::Unknown;
        };
        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "ai" => AssetKind::VectorDocument,
            "svg" => AssetKind::VectorImage,
            "png" | "jpg" | "jpeg" => AssetKind::RasterImage,
            _ => AssetKind::Unknown,
        }
    }
}

/// One source file on durable storage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    #[serde(deserialize_with = "crate::request::id_string")]
    pub id: String,
    pub file_path: String,
    #[serde(default)]
    name: Option<String>,
}

impl AssetRecord {
    pub fn new(id: impl Into<String>, file_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            name: Some(name.into()),
        }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.file_path)
    }

    pub fn kind(&self) -> AssetKind {
        AssetKind::from_path(self.path())
    }

    /// Display name; falls back to the file stem, then the id.
    pub fn display_name(&self) -> &str {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name;
        }
        self.path()
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(self.id.as_str())
    }

    /// File name shown inside vector-document placeholders.
    pub fn file_name(&self) -> &str {
        self.path()
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(self.file_path.as_str())
    }
}

/// Linear lookup by id. First match wins when ids repeat.
pub fn resolve<'a>(placement: &Placement, assets: &'a [AssetRecord]) -> Option<&'a AssetRecord> {
    assets.iter().find(|asset| asset.id == placement.design_id)
}
