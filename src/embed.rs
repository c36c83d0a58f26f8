use crate::assets::{self, AssetKind, AssetRecord};
use crate::bitmap;
use crate::canvas::{Canvas, Paint};
use crate::error::{EmbedError, EmbedErrorCode};
use crate::font;
use crate::geometry::{self, source_size_mm, uniform_scale};
use crate::pdfinspect;
use crate::request::Placement;
use crate::svg;
use crate::types::{Color, Pt, Rect};

pub(crate) const CUTTING_MARGIN_MM: f64 = 3.0;

const LABEL_FONT_SIZE: f32 = 8.0;
const PLACEHOLDER_FONT_SIZE: f32 = 7.0;
const LABEL_PAD: f32 = 2.0;
const BORDER_WIDTH: f32 = 1.0;
const MARGIN_LINE_WIDTH: f32 = 0.5;
const MARGIN_DASH: f32 = 3.0;

const BORDER_STROKE: Color = Color {
    r: 0.2,
    g: 0.4,
    b: 0.8,
};
const MARGIN_STROKE: Color = Color {
    r: 0.8,
    g: 0.8,
    b: 0.8,
};

/// Fill family used for placeholders and fallback boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tint {
    Blue,
    Green,
    Red,
    Gray,
}

impl Tint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tint::Blue => "blue",
            Tint::Green => "green",
            Tint::Red => "red",
            Tint::Gray => "gray",
        }
    }

    fn for_kind(kind: AssetKind) -> Tint {
        match kind {
            AssetKind::VectorDocument => Tint::Blue,
            AssetKind::VectorImage => Tint::Green,
            AssetKind::RasterImage => Tint::Red,
            AssetKind::Unknown => Tint::Gray,
        }
    }

    fn fill(&self) -> Color {
        match self {
            Tint::Blue => Color::rgb(0.9, 0.95, 1.0),
            Tint::Green => Color::rgb(0.9, 1.0, 0.9),
            Tint::Red => Color::rgb(1.0, 0.9, 0.9),
            Tint::Gray => Color::rgb(0.93, 0.93, 0.93),
        }
    }

    fn stroke(&self) -> Color {
        match self {
            Tint::Blue => BORDER_STROKE,
            Tint::Green => Color::rgb(0.2, 0.6, 0.3),
            Tint::Red => Color::rgb(0.8, 0.2, 0.2),
            Tint::Gray => Color::rgb(0.5, 0.5, 0.5),
        }
    }
}

/// What happened to one placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementOutcome {
    /// The primary strategy for the asset's kind succeeded.
    Embedded,
    /// A tinted box stands in for the asset; `None` when no read was attempted.
    Fallback(Option<EmbedErrorCode>),
    /// No asset record carries the placement's id.
    Miss,
    /// The asset file does not exist and missing files are configured to be skipped.
    Skipped,
}

impl PlacementOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementOutcome::Embedded => "embedded",
            PlacementOutcome::Fallback(_) => "fallback",
            PlacementOutcome::Miss => "miss",
            PlacementOutcome::Skipped => "skipped",
        }
    }

    pub fn code(&self) -> Option<EmbedErrorCode> {
        match self {
            PlacementOutcome::Fallback(code) => *code,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementReport {
    pub kind: Option<AssetKind>,
    pub outcome: PlacementOutcome,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct EmbedOptions {
    pub svg_dpi: u32,
    pub skip_missing_files: bool,
}

impl Default for EmbedOptions {
    fn default() -> Self {
        Self {
            svg_dpi: svg::DEFAULT_SVG_DPI,
            skip_missing_files: false,
        }
    }
}

pub(crate) fn label_text(index: usize, name: &str, width_mm: f64, height_mm: f64) -> String {
    format!("{}. {} ({:.1}x{:.1}mm)", index + 1, name, width_mm, height_mm)
}

/// Draws one placement region: cutting margin, content, border and label.
///
/// All styling happens inside a save/restore pair, and no embedding failure
/// escapes this call.
pub(crate) fn render_placement(
    canvas: &mut Canvas,
    index: usize,
    placement: &Placement,
    records: &[AssetRecord],
    options: &EmbedOptions,
) -> PlacementReport {
    let target = geometry::to_sheet_canvas(placement.bounds());
    canvas.scoped(|canvas| {
        canvas.meta("placement", (index + 1).to_string());
        draw_cutting_margin(canvas, target);

        let asset = assets::resolve(placement, records);
        let report = match asset {
            None => PlacementReport {
                kind: None,
                outcome: PlacementOutcome::Miss,
            },
            Some(asset) => {
                let kind = asset.kind();
                PlacementReport {
                    kind: Some(kind),
                    outcome: embed_asset(canvas, index, asset, kind, placement, target, options),
                }
            }
        };

        let name = asset
            .map(|a| a.display_name())
            .unwrap_or(placement.design_id.as_str());
        draw_border(canvas, target);
        draw_label(
            canvas,
            target,
            &label_text(index, name, placement.width, placement.height),
        );
        report
    })
}

fn embed_asset(
    canvas: &mut Canvas,
    index: usize,
    asset: &AssetRecord,
    kind: AssetKind,
    placement: &Placement,
    target: Rect,
    options: &EmbedOptions,
) -> PlacementOutcome {
    if kind != AssetKind::Unknown && options.skip_missing_files && !asset.path().exists() {
        log::info!(
            "placement {} ({}): skipping missing file {}",
            index + 1,
            placement.design_id,
            asset.file_path
        );
        return PlacementOutcome::Skipped;
    }

    let result = match kind {
        AssetKind::VectorDocument => embed_vector_document(canvas, asset, target),
        AssetKind::VectorImage => embed_vector_image(canvas, index, asset, placement, target, options),
        AssetKind::RasterImage => embed_raster_image(canvas, index, asset, target),
        AssetKind::Unknown => {
            draw_fallback(canvas, target, Tint::Gray);
            return PlacementOutcome::Fallback(None);
        }
    };
    match result {
        Ok(()) => PlacementOutcome::Embedded,
        Err(err) => {
            log::warn!(
                "placement {} ({}): {} fallback for {}: {}",
                index + 1,
                placement.design_id,
                kind.as_str(),
                asset.file_path,
                err
            );
            draw_fallback(canvas, target, Tint::for_kind(kind));
            PlacementOutcome::Fallback(Some(err.code))
        }
    }
}

/// Scaled, centered placeholder carrying the source's file name and physical size.
fn embed_vector_document(
    canvas: &mut Canvas,
    asset: &AssetRecord,
    target: Rect,
) -> Result<(), EmbedError> {
    let page = pdfinspect::inspect_first_page_path(asset.path())?;
    let scale = uniform_scale(
        (page.width_pt, page.height_pt),
        (target.width.to_f64(), target.height.to_f64()),
    )
    .ok_or_else(|| {
        EmbedError::new(
            EmbedErrorCode::DegenerateGeometry,
            format!("cannot fit {}x{}pt page", page.width_pt, page.height_pt),
        )
    })?;

    let placeholder = target.centered(
        Pt::from_f32((page.width_pt * scale) as f32),
        Pt::from_f32((page.height_pt * scale) as f32),
    );
    let tint = Tint::Blue;
    canvas.set_fill_color(tint.fill());
    canvas.set_stroke_color(tint.stroke());
    canvas.set_line_width(Pt::from_f32(MARGIN_LINE_WIDTH));
    canvas.draw_rect(placeholder, Paint::FillStroke);

    let (width_mm, height_mm) = source_size_mm(page.width_pt, page.height_pt);
    let center_x = placeholder.x + placeholder.width / 2;
    let center_y = placeholder.y + placeholder.height / 2;
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(font::HELVETICA, Pt::from_f32(PLACEHOLDER_FONT_SIZE));
    canvas.draw_centered_string(center_x, center_y + Pt::from_f32(1.0), asset.file_name());
    canvas.draw_centered_string(
        center_x,
        center_y - Pt::from_f32(PLACEHOLDER_FONT_SIZE + 1.0),
        format!("{:.1}x{:.1}mm", width_mm, height_mm),
    );
    Ok(())
}

fn embed_vector_image(
    canvas: &mut Canvas,
    index: usize,
    asset: &AssetRecord,
    placement: &Placement,
    target: Rect,
    options: &EmbedOptions,
) -> Result<(), EmbedError> {
    let data = std::fs::read(asset.path())?;
    let (width_px, height_px) = svg::raster_size_px(placement.width, placement.height, options.svg_dpi);
    let image = svg::rasterize_svg(&data, width_px, height_px)?;
    let resource_id = image_resource_id(index);
    canvas.register_image(resource_id.clone(), image);
    canvas.draw_image(target, resource_id);
    Ok(())
}

fn embed_raster_image(
    canvas: &mut Canvas,
    index: usize,
    asset: &AssetRecord,
    target: Rect,
) -> Result<(), EmbedError> {
    let data = std::fs::read(asset.path())?;
    let image = bitmap::decode_image_bytes(&data)?;
    let resource_id = image_resource_id(index);
    canvas.register_image(resource_id.clone(), image);
    canvas.draw_image(target, resource_id);
    Ok(())
}

fn image_resource_id(index: usize) -> String {
    format!("placement-{}", index + 1)
}

fn draw_cutting_margin(canvas: &mut Canvas, target: Rect) {
    canvas.set_stroke_color(MARGIN_STROKE);
    canvas.set_line_width(Pt::from_f32(MARGIN_LINE_WIDTH));
    canvas.set_dash(
        vec![Pt::from_f32(MARGIN_DASH), Pt::from_f32(MARGIN_DASH)],
        Pt::ZERO,
    );
    canvas.draw_rect(target.outset(Pt::from_mm(CUTTING_MARGIN_MM)), Paint::Stroke);
    canvas.set_dash(Vec::new(), Pt::ZERO);
}

fn draw_fallback(canvas: &mut Canvas, target: Rect, tint: Tint) {
    canvas.meta("fallback", tint.as_str());
    canvas.set_fill_color(tint.fill());
    canvas.set_stroke_color(tint.stroke());
    canvas.set_line_width(Pt::from_f32(MARGIN_LINE_WIDTH));
    canvas.draw_rect(target, Paint::FillStroke);
}

fn draw_border(canvas: &mut Canvas, target: Rect) {
    canvas.set_stroke_color(BORDER_STROKE);
    canvas.set_line_width(Pt::from_f32(BORDER_WIDTH));
    canvas.draw_rect(target, Paint::Stroke);
}

fn draw_label(canvas: &mut Canvas, target: Rect, text: &str) {
    let size = Pt::from_f32(LABEL_FONT_SIZE);
    canvas.set_fill_color(Color::BLACK);
    canvas.set_font(font::HELVETICA, size);
    canvas.draw_string(
        target.x + Pt::from_f32(LABEL_PAD),
        target.top() - size - Pt::from_f32(LABEL_PAD),
        text,
    );
}
