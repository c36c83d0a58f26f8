//! Mapping between the logical placement space (millimeters, origin top-left,
//! y down) and canvas space (points, origin bottom-left, y up).

use crate::types::{Pt, Rect, SHEET_HEIGHT_MM, pt_to_mm};

/// Axis-aligned rectangle in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MmRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Mirrors the rectangle across the sheet's horizontal midline.
    /// Top-left-origin in, bottom-left-origin out, and vice versa.
    pub fn reflect(&self, sheet_height_mm: f64) -> MmRect {
        MmRect {
            x: self.x,
            y: sheet_height_mm - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }

    fn to_pt(self) -> Rect {
        Rect::new(
            Pt::from_mm(self.x),
            Pt::from_mm(self.y),
            Pt::from_mm(self.width),
            Pt::from_mm(self.height),
        )
    }
}

/// Maps a logical rectangle onto the canvas of a sheet `sheet_height_mm` tall.
pub fn logical_to_canvas(logical: MmRect, sheet_height_mm: f64) -> Rect {
    logical.reflect(sheet_height_mm).to_pt()
}

/// Inverse of [`logical_to_canvas`], up to the canvas's 0.001pt resolution.
pub fn canvas_to_logical(rect: Rect, sheet_height_mm: f64) -> MmRect {
    MmRect::new(
        rect.x.to_mm(),
        rect.y.to_mm(),
        rect.width.to_mm(),
        rect.height.to_mm(),
    )
    .reflect(sheet_height_mm)
}

/// Maps onto the fixed 480 mm tall sheet.
pub fn to_sheet_canvas(logical: MmRect) -> Rect {
    logical_to_canvas(logical, SHEET_HEIGHT_MM)
}

/// Physical size in millimeters of a source box measured in points.
pub fn source_size_mm(width_pt: f64, height_pt: f64) -> (f64, f64) {
    (pt_to_mm(width_pt), pt_to_mm(height_pt))
}

/// Largest uniform scale that fits `source` inside `target` without distortion.
/// Returns `None` for degenerate (zero, negative, or non-finite) source sizes.
pub fn uniform_scale(source: (f64, f64), target: (f64, f64)) -> Option<f64> {
    let (sw, sh) = source;
    let (tw, th) = target;
    if !(sw.is_finite() && sh.is_finite()) || sw <= 0.0 || sh <= 0.0 {
        return None;
    }
    let scale = (tw / sw).min(th / sh);
    if scale.is_finite() && scale > 0.0 {
        Some(scale)
    } else {
        None
    }
}
