use std::fmt;
use std::path::PathBuf;

/// Fatal errors: any of these aborts the whole sheet.
#[derive(Debug)]
pub enum SheetError {
    InvalidRequest(String),
    InvalidConfiguration(String),
    Json(serde_json::Error),
    Output { path: PathBuf, source: std::io::Error },
    Io(std::io::Error),
}

impl fmt::Display for SheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetError::InvalidRequest(message) => write!(f, "invalid request: {}", message),
            SheetError::InvalidConfiguration(message) => {
                write!(f, "invalid configuration: {}", message)
            }
            SheetError::Json(err) => write!(f, "invalid request payload: {}", err),
            SheetError::Output { path, source } => {
                write!(f, "cannot write output {}: {}", path.display(), source)
            }
            SheetError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Json(err) => Some(err),
            SheetError::Output { source, .. } => Some(source),
            SheetError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SheetError {
    fn from(value: std::io::Error) -> Self {
        SheetError::Io(value)
    }
}

impl From<serde_json::Error> for SheetError {
    fn from(value: serde_json::Error) -> Self {
        SheetError::Json(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedErrorCode {
    AssetIo,
    AssetDecode,
    RasterizerUnavailable,
    SvgParse,
    RasterTooLarge,
    PdfParse,
    PdfEncrypted,
    PdfNoPages,
    DegenerateGeometry,
}

impl EmbedErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedErrorCode::AssetIo => "ASSET_IO",
            EmbedErrorCode::AssetDecode => "ASSET_DECODE",
            EmbedErrorCode::RasterizerUnavailable => "RASTERIZER_UNAVAILABLE",
            EmbedErrorCode::SvgParse => "SVG_PARSE_FAILED",
            EmbedErrorCode::RasterTooLarge => "RASTER_TOO_LARGE",
            EmbedErrorCode::PdfParse => "PDF_PARSE_FAILED",
            EmbedErrorCode::PdfEncrypted => "PDF_ENCRYPTED_UNSUPPORTED",
            EmbedErrorCode::PdfNoPages => "PDF_EMPTY_OR_NO_PAGES",
            EmbedErrorCode::DegenerateGeometry => "DEGENERATE_GEOMETRY",
        }
    }
}

/// A recoverable, per-placement failure. Never crosses the placement boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedError {
    pub code: EmbedErrorCode,
    pub message: String,
}

impl EmbedError {
    pub fn new(code: EmbedErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EmbedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for EmbedError {}

impl From<std::io::Error> for EmbedError {
    fn from(value: std::io::Error) -> Self {
        EmbedError::new(EmbedErrorCode::AssetIo, value.to_string())
    }
}

impl From<image::ImageError> for EmbedError {
    fn from(value: image::ImageError) -> Self {
        EmbedError::new(EmbedErrorCode::AssetDecode, value.to_string())
    }
}
