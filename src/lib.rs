mod assets;
mod bitmap;
mod canvas;
mod debug;
mod embed;
mod error;
mod font;
mod geometry;
mod metrics;
mod pdf;
mod pdfinspect;
mod request;
mod sheet;
mod svg;
mod types;

pub use assets::{AssetKind, AssetRecord, resolve};
pub use bitmap::ImageData;
pub use canvas::{Canvas, Command, Document, Page, Paint};
use debug::DebugLogger;
pub use embed::{PlacementOutcome, PlacementReport, Tint};
use embed::EmbedOptions;
pub use error::{EmbedError, EmbedErrorCode, SheetError};
pub use font::{HELVETICA, HELVETICA_BOLD};
pub use geometry::{
    MmRect, canvas_to_logical, logical_to_canvas, source_size_mm, to_sheet_canvas, uniform_scale,
};
pub use metrics::SheetMetrics;
use pdf::PdfOptions;
pub use pdfinspect::{
    FirstPageBox, PdfInspectError, PdfInspectErrorCode, inspect_first_page_bytes,
    inspect_first_page_path,
};
pub use request::{Placement, RenderRequest};
use sheet::SheetFinisher;
pub use sheet::{DEFAULT_ALGORITHM_NAME, DEFAULT_TITLE};
pub use svg::DEFAULT_SVG_DPI;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
pub use types::{
    Color, ColorSpace, MM_PER_INCH, PT_PER_INCH, Pt, Rect, SHEET_HEIGHT_MM, SHEET_WIDTH_MM, Size,
    mm_to_pt, pt_to_mm,
};

/// Renders placement lists onto the fixed 330 x 480 mm cutting sheet.
pub struct SheetRenderer {
    title: String,
    algorithm_name: String,
    pdf_color_space: ColorSpace,
    embed_options: EmbedOptions,
    debug: Option<Arc<DebugLogger>>,
}

#[derive(Clone)]
pub struct SheetRendererBuilder {
    title: String,
    algorithm_name: String,
    color_space: ColorSpace,
    svg_raster_dpi: u32,
    skip_missing_files: bool,
    debug_path: Option<PathBuf>,
}

impl SheetRenderer {
    pub fn builder() -> SheetRendererBuilder {
        SheetRendererBuilder::new()
    }

    /// Decodes `payload`, renders it, and writes the PDF to its `outputPath`.
    pub fn render_json(&self, payload: &str) -> Result<SheetMetrics, SheetError> {
        let request = RenderRequest::from_json(payload)?;
        self.render(&request)
    }

    /// Renders `request` into the file at `request.output_path`.
    ///
    /// The output file is created before anything is drawn, so an unwritable
    /// target fails fast. Per-placement problems never fail the render.
    pub fn render(&self, request: &RenderRequest) -> Result<SheetMetrics, SheetError> {
        request.validate()?;
        let output_error = |source: std::io::Error| SheetError::Output {
            path: request.output_path.clone(),
            source,
        };
        let file = std::fs::File::create(&request.output_path).map_err(output_error)?;
        let mut writer = std::io::BufWriter::new(file);

        let (document, mut metrics) = self.build_document(request);
        metrics.bytes_written = self
            .write_document(request, &document, &mut writer)
            .map_err(output_error)?;
        writer.flush().map_err(output_error)?;

        log::info!(
            "wrote {} ({} placements, {} bytes)",
            request.output_path.display(),
            metrics.placements,
            metrics.bytes_written
        );
        self.emit_debug_summary("render");
        Ok(metrics)
    }

    /// Renders `request` to an arbitrary writer; `request.output_path` is only reported.
    pub fn render_to_writer<W: Write>(
        &self,
        request: &RenderRequest,
        writer: &mut W,
    ) -> Result<SheetMetrics, SheetError> {
        request.validate()?;
        let (document, mut metrics) = self.build_document(request);
        metrics.bytes_written = self.write_document(request, &document, writer)?;
        self.emit_debug_summary("render_to_writer");
        Ok(metrics)
    }

    pub fn render_to_bytes(
        &self,
        request: &RenderRequest,
    ) -> Result<(Vec<u8>, SheetMetrics), SheetError> {
        request.validate()?;
        let (document, mut metrics) = self.build_document(request);
        let options = self.pdf_options(request);
        let bytes = pdf::document_to_pdf(&document, &options)?;
        metrics.bytes_written = bytes.len();
        Ok((bytes, metrics))
    }

    /// Draws the sheet without serializing it.
    pub fn render_to_document(
        &self,
        request: &RenderRequest,
    ) -> Result<(Document, SheetMetrics), SheetError> {
        request.validate()?;
        Ok(self.build_document(request))
    }

    fn build_document(&self, request: &RenderRequest) -> (Document, SheetMetrics) {
        let finisher = SheetFinisher {
            title: self.title_for(request),
            algorithm_name: request
                .algorithm
                .as_deref()
                .unwrap_or(self.algorithm_name.as_str()),
            placement_count: request.placements.len(),
        };
        let mut metrics = SheetMetrics {
            output_path: request.output_path.clone(),
            ..SheetMetrics::default()
        };

        let mut canvas = Canvas::new(Size::sheet());
        finisher.draw_header(&mut canvas);
        for (index, placement) in request.placements.iter().enumerate() {
            let report = embed::render_placement(
                &mut canvas,
                index,
                placement,
                &request.assets,
                &self.embed_options,
            );
            if let Some(logger) = self.debug.as_deref() {
                logger.log_placement(
                    index + 1,
                    &placement.design_id,
                    report.kind.map(|kind| kind.as_str()),
                    report.outcome.as_str(),
                    report.outcome.code().map(|code| code.as_str()),
                );
            }
            if report.outcome == PlacementOutcome::Miss {
                log::debug!(
                    "placement {}: no asset record for {}",
                    index + 1,
                    placement.design_id
                );
            }
            metrics.record(report.outcome);
        }
        finisher.draw_statistics(&mut canvas);
        (canvas.finish(), metrics)
    }

    fn write_document<W: Write>(
        &self,
        request: &RenderRequest,
        document: &Document,
        writer: &mut W,
    ) -> std::io::Result<usize> {
        let options = self.pdf_options(request);
        pdf::document_to_pdf_writer(document, &options, writer, self.debug.as_deref())
    }

    fn pdf_options(&self, request: &RenderRequest) -> PdfOptions {
        PdfOptions {
            color_space: self.pdf_color_space,
            document_title: Some(self.title_for(request).to_string()),
        }
    }

    fn title_for<'a>(&'a self, request: &'a RenderRequest) -> &'a str {
        request
            .title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
            .unwrap_or(self.title.as_str())
    }

    fn emit_debug_summary(&self, context: &str) {
        if let Some(logger) = self.debug.as_deref() {
            logger.emit_summary(context);
            logger.flush();
        }
    }
}

impl SheetRendererBuilder {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            algorithm_name: DEFAULT_ALGORITHM_NAME.to_string(),
            color_space: ColorSpace::Rgb,
            svg_raster_dpi: DEFAULT_SVG_DPI,
            skip_missing_files: false,
            debug_path: None,
        }
    }

    /// Sheet title used when the request carries none.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Packing algorithm name shown when the request carries none.
    pub fn algorithm_name(mut self, name: impl Into<String>) -> Self {
        self.algorithm_name = name.into();
        self
    }

    pub fn color_space(mut self, color_space: ColorSpace) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn svg_raster_dpi(mut self, dpi: u32) -> Self {
        self.svg_raster_dpi = dpi;
        self
    }

    // Skip embedding (no fallback box) when an asset file does not exist.
    pub fn skip_missing_files(mut self, skip: bool) -> Self {
        self.skip_missing_files = skip;
        self
    }

    // Enable placement/outcome logging to a JSONL file.
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SheetRenderer, SheetError> {
        if self.svg_raster_dpi == 0 {
            return Err(SheetError::InvalidConfiguration(
                "svg_raster_dpi must be > 0".to_string(),
            ));
        }
        if self.title.trim().is_empty() {
            return Err(SheetError::InvalidConfiguration(
                "title cannot be empty".to_string(),
            ));
        }
        let debug = if let Some(path) = self.debug_path {
            Some(Arc::new(DebugLogger::new(path)?))
        } else {
            None
        };
        Ok(SheetRenderer {
            title: self.title,
            algorithm_name: self.algorithm_name,
            pdf_color_space: self.color_space,
            embed_options: EmbedOptions {
                svg_dpi: self.svg_raster_dpi,
                skip_missing_files: self.skip_missing_files,
            },
            debug,
        })
    }
}

impl Default for SheetRendererBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document as LoDocument;
    use std::path::Path;

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock")
            .as_nanos();
        std::env::temp_dir().join(format!(
            "cutsheet_{}_{}_{}.{}",
            tag,
            std::process::id(),
            nanos,
            ext
        ))
    }

    fn renderer() -> SheetRenderer {
        SheetRenderer::builder().build().expect("renderer")
    }

    fn json_path(path: &Path) -> String {
        serde_json::to_string(&path.to_string_lossy()).expect("json string")
    }

    fn drawn_strings(doc: &Document) -> Vec<&str> {
        doc.page
            .commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn assert_sheet_media_box(pdf: &LoDocument) {
        let pages = pdf.get_pages();
        assert_eq!(pages.len(), 1);
        let (_, page_id) = pages.iter().next().expect("page");
        let page = pdf.get_dictionary(*page_id).expect("page dict");
        let media = page
            .get(b"MediaBox")
            .and_then(|obj| obj.as_array())
            .expect("media box");
        let values: Vec<f32> = media
            .iter()
            .map(|obj| obj.as_float().expect("number"))
            .collect();
        assert_eq!(values.len(), 4);
        assert!((values[2] - 935.433).abs() < 1e-3);
        assert!((values[3] - 1360.63).abs() < 1e-3);
    }

    #[test]
    fn missing_png_renders_red_fallback_with_label() {
        let out = temp_path("missing_png", "pdf");
        let payload = format!(
            r#"{{"arrangements":[{{"designId":"a","x":0,"y":0,"width":50,"height":30}}],
                "designFiles":[{{"id":"a","filePath":"/missing.png","name":"A"}}],
                "outputPath":{}}}"#,
            json_path(&out)
        );
        let metrics = renderer().render_json(&payload).expect("render");
        assert_eq!(metrics.placements, 1);
        assert_eq!(metrics.fallbacks, 1);
        assert_eq!(metrics.output_path, out);

        let bytes = std::fs::read(&out).expect("read output");
        let _ = std::fs::remove_file(&out);
        assert_eq!(metrics.bytes_written, bytes.len());
        let pdf = LoDocument::load_mem(&bytes).expect("valid pdf");
        assert_sheet_media_box(&pdf);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(1. A \\(50.0x30.0mm\\)) Tj"));

        let request = RenderRequest::from_json(&payload).expect("request");
        let (doc, _) = renderer().render_to_document(&request).expect("document");
        assert_eq!(doc.meta_values("fallback").collect::<Vec<_>>(), vec!["red"]);
        // Top-left placement: bottom edge 450 mm above the canvas origin.
        assert!(doc.page.commands.contains(&Command::DrawRect {
            x: Pt::ZERO,
            y: Pt::from_mm(450.0),
            width: Pt::from_mm(50.0),
            height: Pt::from_mm(30.0),
            paint: Paint::Stroke,
        }));
    }

    #[test]
    fn empty_arrangements_still_produce_a_finished_sheet() {
        let out = temp_path("empty", "pdf");
        let payload = format!(
            r#"{{"arrangements":[],"designFiles":[],"outputPath":{}}}"#,
            json_path(&out)
        );
        let metrics = renderer().render_json(&payload).expect("render");
        assert_eq!(metrics, SheetMetrics {
            output_path: out.clone(),
            bytes_written: metrics.bytes_written,
            ..SheetMetrics::default()
        });

        let bytes = std::fs::read(&out).expect("read output");
        let _ = std::fs::remove_file(&out);
        let pdf = LoDocument::load_mem(&bytes).expect("valid pdf");
        assert_sheet_media_box(&pdf);
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("(Total: 0) Tj"));
        assert!(text.contains("(Placements: 0) Tj"));
        assert!(text.contains(&format!("/Title ({})", DEFAULT_TITLE)));
    }

    #[test]
    fn one_region_per_placement() {
        let png = temp_path("regions", "png");
        std::fs::write(&png, bitmap::tests::png_bytes(4, 4, 255)).expect("write png");
        let placements: Vec<Placement> = (0..5)
            .map(|i| Placement::new(format!("p{i}"), 10.0 + 60.0 * i as f64, 40.0, 50.0, 30.0))
            .collect();
        let assets = vec![
            AssetRecord::new("p0", png.to_string_lossy(), "Art"),
            AssetRecord::new("p1", "/definitely/missing.png", "Gone"),
            AssetRecord::new("p2", "/art/notes.txt", "Notes"),
            AssetRecord::new("p3", png.to_string_lossy(), "Art again"),
        ];
        let request = RenderRequest::new(placements, assets, "unused.pdf");
        let (doc, metrics) = renderer().render_to_document(&request).expect("document");
        let _ = std::fs::remove_file(&png);

        assert_eq!(metrics.placements, 5);
        assert_eq!(metrics.embedded, 2);
        assert_eq!(metrics.fallbacks, 2);
        assert_eq!(metrics.misses, 1);
        assert_eq!(
            doc.meta_values("placement").collect::<Vec<_>>(),
            vec!["1", "2", "3", "4", "5"]
        );
        assert_eq!(doc.meta_values("fallback").count(), 2);
        let images = doc
            .page
            .commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::DrawImage { .. }))
            .count();
        assert_eq!(images, 2);
        let borders = doc
            .page
            .commands
            .iter()
            .filter(|cmd| {
                matches!(cmd, Command::DrawRect { paint: Paint::Stroke, height, .. }
                    if *height == Pt::from_mm(30.0))
            })
            .count();
        assert_eq!(borders, 5);
    }

    #[test]
    fn miss_is_distinguished_from_failure() {
        let request = RenderRequest::new(
            vec![
                Placement::new("absent", 0.0, 0.0, 50.0, 30.0),
                Placement::new("broken", 60.0, 0.0, 50.0, 30.0),
            ],
            vec![AssetRecord::new("broken", "/definitely/missing.jpg", "Broken")],
            "unused.pdf",
        );
        let (doc, metrics) = renderer().render_to_document(&request).expect("document");
        assert_eq!((metrics.misses, metrics.fallbacks), (1, 1));
        assert_eq!(doc.meta_values("fallback").collect::<Vec<_>>(), vec!["red"]);
        let strings = drawn_strings(&doc);
        assert!(strings.contains(&"1. absent (50.0x30.0mm)"));
        assert!(strings.contains(&"2. Broken (50.0x30.0mm)"));
    }

    #[test]
    fn fallback_tints_follow_asset_kind() {
        let bad_svg = temp_path("bad", "svg");
        std::fs::write(&bad_svg, b"<svg><unclosed").expect("write svg");
        let request = RenderRequest::new(
            vec![
                Placement::new("v", 0.0, 0.0, 40.0, 40.0),
                Placement::new("u", 50.0, 0.0, 40.0, 40.0),
                Placement::new("d", 100.0, 0.0, 40.0, 40.0),
            ],
            vec![
                AssetRecord::new("v", bad_svg.to_string_lossy(), "Vector"),
                AssetRecord::new("u", "/anywhere/readme.txt", "Text"),
                AssetRecord::new("d", "/definitely/missing.pdf", "Doc"),
            ],
            "unused.pdf",
        );
        let (doc, metrics) = renderer().render_to_document(&request).expect("document");
        let _ = std::fs::remove_file(&bad_svg);
        assert_eq!(metrics.fallbacks, 3);
        assert_eq!(
            doc.meta_values("fallback").collect::<Vec<_>>(),
            vec!["green", "gray", "blue"]
        );
    }

    #[test]
    fn request_title_and_algorithm_override_builder_defaults() {
        let renderer = SheetRenderer::builder()
            .title("Builder Title")
            .algorithm_name("Shelf")
            .build()
            .expect("renderer");
        let mut request = RenderRequest::new(Vec::new(), Vec::new(), "unused.pdf");
        let (doc, _) = renderer.render_to_document(&request).expect("document");
        let strings = drawn_strings(&doc);
        assert!(strings.contains(&"Builder Title"));
        assert!(strings.contains(&"Algorithm: Shelf"));

        request.title = Some("Run 7".to_string());
        request.algorithm = Some("MaxRects".to_string());
        let (doc, _) = renderer.render_to_document(&request).expect("document");
        let strings = drawn_strings(&doc);
        assert!(strings.contains(&"Run 7"));
        assert!(strings.contains(&"Algorithm: MaxRects"));
    }

    #[test]
    fn skip_missing_files_leaves_slot_empty() {
        let renderer = SheetRenderer::builder()
            .skip_missing_files(true)
            .build()
            .expect("renderer");
        let request = RenderRequest::new(
            vec![Placement::new("a", 0.0, 0.0, 50.0, 30.0)],
            vec![AssetRecord::new("a", "/missing.png", "A")],
            "unused.pdf",
        );
        let (doc, metrics) = renderer.render_to_document(&request).expect("document");
        assert_eq!(metrics.skipped, 1);
        assert_eq!(doc.meta_values("fallback").count(), 0);
        assert!(drawn_strings(&doc).contains(&"1. A (50.0x30.0mm)"));
    }

    #[test]
    fn embedded_png_is_written_as_image_xobject() {
        let png = temp_path("ok", "png");
        std::fs::write(&png, bitmap::tests::png_bytes(4, 4, 255)).expect("write png");
        let request = RenderRequest::new(
            vec![Placement::new("a", 5.0, 5.0, 20.0, 20.0)],
            vec![AssetRecord::new("a", png.to_string_lossy(), "Pic")],
            "unused.pdf",
        );
        let mut bytes = Vec::new();
        let metrics = renderer()
            .render_to_writer(&request, &mut bytes)
            .expect("render");
        let _ = std::fs::remove_file(&png);
        assert_eq!(metrics.embedded, 1);
        assert_eq!(metrics.bytes_written, bytes.len());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Subtype /Image"));
        assert!(text.contains("/Im1 Do"));
        LoDocument::load_mem(&bytes).expect("valid pdf");
    }

    #[test]
    fn cmyk_renderer_writes_k_operators() {
        let renderer = SheetRenderer::builder()
            .color_space(ColorSpace::Cmyk)
            .build()
            .expect("renderer");
        let request = RenderRequest::new(
            vec![Placement::new("a", 0.0, 0.0, 50.0, 30.0)],
            Vec::new(),
            "unused.pdf",
        );
        let (bytes, metrics) = renderer.render_to_bytes(&request).expect("render");
        assert_eq!(metrics.bytes_written, bytes.len());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains(" K\n"));
        assert!(!text.contains(" RG\n"));
    }

    #[test]
    fn unwritable_output_is_fatal() {
        let out = temp_path("no_such_dir", "d").join("sheet.pdf");
        let request = RenderRequest::new(Vec::new(), Vec::new(), &out);
        let err = renderer().render(&request).expect_err("cannot create");
        match err {
            SheetError::Output { path, .. } => assert_eq!(path, out),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_payload_is_fatal() {
        let err = renderer().render_json(r#"{"designFiles":[]}"#).expect_err("invalid");
        assert!(matches!(err, SheetError::Json(_)));
        let err = renderer()
            .render_json(r#"{"arrangements":[{"designId":"a","height":-1}],"outputPath":"x.pdf"}"#)
            .expect_err("negative");
        assert!(matches!(err, SheetError::InvalidRequest(_)));
    }

    #[test]
    fn zero_dpi_is_rejected_at_build() {
        let err = SheetRenderer::builder()
            .svg_raster_dpi(0)
            .build()
            .err()
            .expect("invalid dpi");
        assert!(matches!(err, SheetError::InvalidConfiguration(_)));
    }

    #[test]
    fn debug_log_records_each_placement_and_summary() {
        let log_path = temp_path("debug", "jsonl");
        let renderer = SheetRenderer::builder()
            .debug_log(&log_path)
            .build()
            .expect("renderer");
        let request = RenderRequest::new(
            vec![
                Placement::new("a", 0.0, 0.0, 50.0, 30.0),
                Placement::new("b", 60.0, 0.0, 50.0, 30.0),
            ],
            vec![AssetRecord::new("a", "/missing.png", "A")],
            "unused.pdf",
        );
        let mut sink = Vec::new();
        renderer.render_to_writer(&request, &mut sink).expect("render");
        let log = std::fs::read_to_string(&log_path).expect("read log");
        let _ = std::fs::remove_file(&log_path);

        let events: Vec<serde_json::Value> = log
            .lines()
            .map(|line| serde_json::from_str(line).expect("json line"))
            .collect();
        let placements: Vec<&serde_json::Value> =
            events.iter().filter(|e| e["type"] == "placement").collect();
        assert_eq!(placements.len(), 2);
        assert_eq!(placements[0]["outcome"], "fallback");
        assert_eq!(placements[0]["code"], "ASSET_IO");
        assert_eq!(placements[1]["outcome"], "miss");
        assert!(placements[1]["kind"].is_null());
        let write = events
            .iter()
            .find(|e| e["type"] == "pdf.write")
            .expect("pdf.write event");
        assert_eq!(write["bytes"], sink.len());
        let summary = events
            .iter()
            .find(|e| e["type"] == "sheet.summary")
            .expect("summary");
        assert_eq!(summary["counts"]["placement.fallback"], 1);
        assert_eq!(summary["counts"]["placement.miss"], 1);
    }
}
