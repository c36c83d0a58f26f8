use crate::bitmap::ImageData;
use crate::error::{EmbedError, EmbedErrorCode};
use crate::types::MM_PER_INCH;

pub const DEFAULT_SVG_DPI: u32 = 150;
pub(crate) const MAX_RASTER_SIDE_PX: u32 = 16_384;

// 16 Mpx, 64 MiB of RGBA before compression.
pub(crate) const MAX_RASTER_PIXELS: u64 = 16 * 1024 * 1024;

/// Pixel dimensions for a target box of `width_mm` x `height_mm` at `dpi`.
/// Both sides are at least 1px; oversize requests are scaled down uniformly
/// until the longer side fits [`MAX_RASTER_SIDE_PX`] and the area fits
/// [`MAX_RASTER_PIXELS`].
pub(crate) fn raster_size_px(width_mm: f64, height_mm: f64, dpi: u32) -> (u32, u32) {
    let per_mm = dpi as f64 / MM_PER_INCH;
    let mut w = (width_mm * per_mm).round().max(1.0);
    let mut h = (height_mm * per_mm).round().max(1.0);
    let longest = w.max(h);
    let side_cap = MAX_RASTER_SIDE_PX as f64;
    let area_cap = MAX_RASTER_PIXELS as f64;
    let shrink = (side_cap / longest).min((area_cap / (w * h)).sqrt());
    if shrink < 1.0 {
        // Nudge before flooring so an exact fit does not lose a pixel to rounding.
        w = (w * shrink + 1e-6).floor().max(1.0);
        h = (h * shrink + 1e-6).floor().max(1.0);
    }
    (w as u32, h as u32)
}

#[cfg(feature = "svg_raster")]
pub(crate) fn rasterize_svg(data: &[u8], width_px: u32, height_px: u32) -> Result<ImageData, EmbedError> {
    use resvg::{tiny_skia, usvg};

    let tree = usvg::Tree::from_data(data, &usvg::Options::default())
        .map_err(|err| EmbedError::new(EmbedErrorCode::SvgParse, err.to_string()))?;

    let size = tree.size();
    let (src_w, src_h) = (size.width(), size.height());
    if !(src_w > 0.0 && src_h > 0.0) {
        return Err(EmbedError::new(
            EmbedErrorCode::DegenerateGeometry,
            format!("svg has an empty canvas {src_w}x{src_h}"),
        ));
    }

    let mut pixmap = tiny_skia::Pixmap::new(width_px, height_px).ok_or_else(|| {
        EmbedError::new(
            EmbedErrorCode::RasterTooLarge,
            format!("cannot allocate a {width_px}x{height_px} pixmap"),
        )
    })?;
    let transform =
        tiny_skia::Transform::from_scale(width_px as f32 / src_w, height_px as f32 / src_h);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    // tiny-skia stores premultiplied RGBA; the PDF side wants straight alpha.
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgba.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Ok(ImageData::from_rgba8(width_px, height_px, &rgba))
}

#[cfg(not(feature = "svg_raster"))]
pub(crate) fn rasterize_svg(_data: &[u8], _width_px: u32, _height_px: u32) -> Result<ImageData, EmbedError> {
    Err(EmbedError::new(
        EmbedErrorCode::RasterizerUnavailable,
        "built without the svg_raster feature",
    ))
}
