use crate::error::{EmbedError, EmbedErrorCode};
use lopdf::{Dictionary as LoDictionary, Document as LoDocument, Object as LoObject};
use std::path::Path;

// Page-tree depth guard when walking /Parent for inherited boxes.
const MAX_PARENT_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfEmptyOrNoPages,
    PdfInvalidPageBox,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfEmptyOrNoPages => "PDF_EMPTY_OR_NO_PAGES",
            PdfInspectErrorCode::PdfInvalidPageBox => "PDF_INVALID_PAGE_BOX",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

impl std::fmt::Display for PdfInspectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for PdfInspectError {}

impl From<PdfInspectError> for EmbedError {
    fn from(value: PdfInspectError) -> Self {
        let code = match value.code {
            PdfInspectErrorCode::PdfParseFailed => EmbedErrorCode::PdfParse,
            PdfInspectErrorCode::PdfEncryptedUnsupported => EmbedErrorCode::PdfEncrypted,
            PdfInspectErrorCode::PdfEmptyOrNoPages => EmbedErrorCode::PdfNoPages,
            PdfInspectErrorCode::PdfInvalidPageBox => EmbedErrorCode::DegenerateGeometry,
            PdfInspectErrorCode::PdfIoError => EmbedErrorCode::AssetIo,
        };
        EmbedError::new(code, value.message)
    }
}

/// Visible box of the first page, in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstPageBox {
    pub width_pt: f64,
    pub height_pt: f64,
    pub page_count: usize,
}

pub fn inspect_first_page_bytes(bytes: &[u8]) -> Result<FirstPageBox, PdfInspectError> {
    let pdf = LoDocument::load_mem(bytes).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: err.to_string(),
    })?;
    if pdf.is_encrypted() {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEncryptedUnsupported,
            message: "encrypted pdf assets are not supported".to_string(),
        });
    }

    let pages = pdf.get_pages();
    let Some((_, first_id)) = pages.iter().next() else {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfEmptyOrNoPages,
            message: "pdf has no pages".to_string(),
        });
    };
    let page = pdf.get_dictionary(*first_id).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfParseFailed,
        message: format!("first page unreadable: {err}"),
    })?;

    let (llx, lly, urx, ury) = effective_page_box(&pdf, page).ok_or_else(|| PdfInspectError {
        code: PdfInspectErrorCode::PdfInvalidPageBox,
        message: "first page has no usable CropBox or MediaBox".to_string(),
    })?;
    let mut width_pt = (urx - llx).abs();
    let mut height_pt = (ury - lly).abs();
    if matches!(page_rotation(&pdf, page), 90 | 270) {
        std::mem::swap(&mut width_pt, &mut height_pt);
    }
    if !(width_pt > 0.0 && height_pt > 0.0) {
        return Err(PdfInspectError {
            code: PdfInspectErrorCode::PdfInvalidPageBox,
            message: format!("degenerate page box {width_pt}x{height_pt}pt"),
        });
    }

    Ok(FirstPageBox {
        width_pt,
        height_pt,
        page_count: pages.len(),
    })
}

pub fn inspect_first_page_path(path: &Path) -> Result<FirstPageBox, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_first_page_bytes(&data)
}

/// CropBox wins over MediaBox; both may be inherited from the page tree.
fn effective_page_box(doc: &LoDocument, page: &LoDictionary) -> Option<(f64, f64, f64, f64)> {
    inherited_box(doc, page, b"CropBox").or_else(|| inherited_box(doc, page, b"MediaBox"))
}

fn inherited_box(
    doc: &LoDocument,
    page: &LoDictionary,
    key: &[u8],
) -> Option<(f64, f64, f64, f64)> {
    let mut current = page;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(obj) = current.get(key) {
            return rect_from_object(doc, obj);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Inherited `/Rotate` in degrees, normalized into `0..360`.
fn page_rotation(doc: &LoDocument, page: &LoDictionary) -> i64 {
    let mut current = page;
    for _ in 0..MAX_PARENT_DEPTH {
        if let Ok(obj) = current.get(b"Rotate") {
            return resolve(doc, obj)
                .and_then(|o| o.as_i64().ok())
                .map(|deg| deg.rem_euclid(360))
                .unwrap_or(0);
        }
        let Some(parent) = current
            .get(b"Parent")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|id| doc.get_dictionary(id).ok())
        else {
            return 0;
        };
        current = parent;
    }
    0
}

fn rect_from_object(doc: &LoDocument, obj: &LoObject) -> Option<(f64, f64, f64, f64)> {
    let obj = resolve(doc, obj)?;
    let arr = obj.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let num = |o: &LoObject| -> Option<f64> {
        let v = resolve(doc, o)?.as_float().ok()? as f64;
        v.is_finite().then_some(v)
    };
    Some((num(&arr[0])?, num(&arr[1])?, num(&arr[2])?, num(&arr[3])?))
}

fn resolve<'a>(doc: &'a LoDocument, obj: &'a LoObject) -> Option<&'a LoObject> {
    match obj {
        LoObject::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}
