use crate::bitmap::{AlphaData, ImageData};
use crate::canvas::{Command, Document, Paint};
use crate::debug::DebugLogger;
use crate::font;
use crate::types::{Color, ColorSpace, Pt};
use fixed::types::I32F32;
use std::collections::BTreeMap;
use std::io::{self, Write};

#[derive(Debug, Clone)]
pub(crate) struct PdfOptions {
    pub color_space: ColorSpace,
    pub document_title: Option<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            color_space: ColorSpace::Rgb,
            document_title: None,
        }
    }
}

const PDF_CATALOG_ID: usize = 1;
const PDF_PAGES_ID: usize = 2;
const PDF_RESOURCES_ID: usize = 3;

const FONT_RESOURCES: [(&str, &str); 2] = [("F1", font::HELVETICA), ("F2", font::HELVETICA_BOLD)];

struct PdfWriter<'a, W: Write> {
    writer: &'a mut W,
    offset: usize,
    offsets: Vec<usize>, // index by object id; 0 is the free object.
    next_id: usize,
    options: &'a PdfOptions,
    replaced_chars: usize,
}

impl<'a, W: Write> PdfWriter<'a, W> {
    fn new(writer: &'a mut W, options: &'a PdfOptions) -> io::Result<Self> {
        let mut offset: usize = 0;
        write_bytes(writer, b"%PDF-1.7\n", &mut offset)?;
        write_bytes(writer, b"%\xE2\xE3\xCF\xD3\n", &mut offset)?;
        Ok(Self {
            writer,
            offset,
            offsets: vec![0; PDF_RESOURCES_ID + 1],
            next_id: PDF_RESOURCES_ID + 1,
            options,
            replaced_chars: 0,
        })
    }

    fn alloc_ids(&mut self, count: usize) -> usize {
        let start = self.next_id;
        self.next_id = self.next_id.saturating_add(count);
        if self.offsets.len() < self.next_id {
            self.offsets.resize(self.next_id, 0);
        }
        start
    }

    fn write_object(&mut self, obj_id: usize, body: &str) -> io::Result<()> {
        write_pdf_object(
            self.writer,
            &mut self.offset,
            &mut self.offsets,
            obj_id,
            body,
        )
    }

    fn write_document(&mut self, document: &Document) -> io::Result<()> {
        // 1) Fonts.
        let mut font_entries: Vec<(String, usize)> = Vec::new();
        for (resource, name) in FONT_RESOURCES {
            let id = self.alloc_ids(1);
            self.write_object(id, &font_object(name))?;
            font_entries.push((resource.to_string(), id));
        }

        // 2) Images, in resource-id order so output is deterministic.
        let mut image_entries: Vec<(String, usize)> = Vec::new();
        let mut image_names: BTreeMap<&str, String> = BTreeMap::new();
        for (index, (resource_id, image)) in document.images.iter().enumerate() {
            let smask_id = match image.alpha.as_ref() {
                Some(alpha) => {
                    let id = self.alloc_ids(1);
                    self.write_object(id, &image_smask_object(alpha))?;
                    Some(id)
                }
                None => None,
            };
            let obj_id = self.alloc_ids(1);
            self.write_object(obj_id, &image_object(image, smask_id))?;
            let name = format!("Im{}", index + 1);
            image_entries.push((name.clone(), obj_id));
            image_names.insert(resource_id.as_str(), name);
        }

        // 3) Resources shared by the page.
        let mut resources = vec![format!("/Font {}", named_resources(&font_entries))];
        if !image_entries.is_empty() {
            resources.push(format!("/XObject {}", named_resources(&image_entries)));
        }
        self.write_object(PDF_RESOURCES_ID, &format!("<< {} >>", resources.join(" ")))?;

        // 4) Content + page + page tree.
        let content = self.render_commands(&document.page.commands, &image_names);
        let content_id = self.alloc_ids(1);
        self.write_object(content_id, &stream_object(&content))?;
        let page_id = self.alloc_ids(1);
        let page_obj = format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [0 0 {} {}] /TrimBox [0 0 {} {}] /Resources {} 0 R /Contents {} 0 R >>",
            PDF_PAGES_ID,
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            fmt_pt(document.page_size.width),
            fmt_pt(document.page_size.height),
            PDF_RESOURCES_ID,
            content_id,
        );
        self.write_object(page_id, &page_obj)?;
        self.write_object(
            PDF_PAGES_ID,
            &format!("<< /Type /Pages /Count 1 /Kids [{} 0 R] >>", page_id),
        )?;

        // 5) Info + catalog.
        let info_id = self.alloc_ids(1);
        self.write_object(
            info_id,
            &info_object(self.options.document_title.as_deref()),
        )?;
        let mut catalog = format!("<< /Type /Catalog /Pages {} 0 R", PDF_PAGES_ID);
        if self.options.document_title.is_some() {
            catalog.push_str(" /ViewerPreferences << /DisplayDocTitle true >>");
        }
        catalog.push_str(" >>");
        self.write_object(PDF_CATALOG_ID, &catalog)?;

        // 6) XRef + trailer.
        let total_objects = self.next_id.saturating_sub(1);
        let xref_start = self.offset;
        write_str(
            self.writer,
            &format!("xref\n0 {}\n", total_objects + 1),
            &mut self.offset,
        )?;
        write_bytes(self.writer, b"0000000000 65535 f \n", &mut self.offset)?;
        for id in 1..=total_objects {
            let obj_offset = self.offsets.get(id).copied().unwrap_or(0);
            write_str(
                self.writer,
                &format!("{:010} 00000 n \n", obj_offset),
                &mut self.offset,
            )?;
        }
        let trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF",
            total_objects + 1,
            PDF_CATALOG_ID,
            info_id,
            xref_start
        );
        write_str(self.writer, &trailer, &mut self.offset)?;
        Ok(())
    }

    fn render_commands(
        &mut self,
        commands: &[Command],
        image_names: &BTreeMap<&str, String>,
    ) -> String {
        let space = self.options.color_space;
        let mut out = String::new();
        let mut current_font_size = Pt::from_f32(12.0);
        let mut current_font = "F1";
        let mut state_stack: Vec<(Pt, &'static str)> = Vec::new();

        for cmd in commands {
            match cmd {
                Command::SaveState => {
                    state_stack.push((current_font_size, current_font));
                    out.push_str("q\n");
                }
                Command::RestoreState => {
                    if let Some((size, font)) = state_stack.pop() {
                        current_font_size = size;
                        current_font = font;
                    }
                    out.push_str("Q\n");
                }
                Command::Meta { .. } => {}
                Command::SetFillColor(color) => {
                    out.push_str(&color_to_pdf_fill(*color, space));
                }
                Command::SetStrokeColor(color) => {
                    out.push_str(&color_to_pdf_stroke(*color, space));
                }
                Command::SetLineWidth(width) => {
                    out.push_str(&format!("{} w\n", fmt_pt(*width)));
                }
                Command::SetDash { pattern, phase } => {
                    let pat = pattern
                        .iter()
                        .map(|v| fmt_pt(*v))
                        .collect::<Vec<_>>()
                        .join(" ");
                    out.push_str(&format!("[{}] {} d\n", pat, fmt_pt(*phase)));
                }
                Command::SetFontName(name) => {
                    current_font = if font::is_bold(name) { "F2" } else { "F1" };
                }
                Command::SetFontSize(size) => {
                    current_font_size = *size;
                }
                Command::DrawRect {
                    x,
                    y,
                    width,
                    height,
                    paint,
                } => {
                    let op = match paint {
                        Paint::Fill => "f",
                        Paint::Stroke => "S",
                        Paint::FillStroke => "B",
                    };
                    out.push_str(&format!(
                        "{} {} {} {} re\n{}\n",
                        fmt_pt(*x),
                        fmt_pt(*y),
                        fmt_pt(*width),
                        fmt_pt(*height),
                        op
                    ));
                }
                Command::DrawString { x, y, text } => {
                    let encoded = encode_winansi_pdf_string(text);
                    self.replaced_chars += encoded.replaced;
                    out.push_str("BT\n");
                    out.push_str(&format!(
                        "/{} {} Tf\n",
                        current_font,
                        fmt_pt(current_font_size)
                    ));
                    out.push_str(&format!("{} {} Td\n", fmt_pt(*x), fmt_pt(*y)));
                    out.push_str(&format!("({}) Tj\n", encoded.text));
                    out.push_str("ET\n");
                }
                Command::DrawImage {
                    x,
                    y,
                    width,
                    height,
                    resource_id,
                } => {
                    if let Some(name) = image_names.get(resource_id.as_str()) {
                        out.push_str("q\n");
                        out.push_str(&format!(
                            "{} 0 0 {} {} {} cm\n",
                            fmt_pt(*width),
                            fmt_pt(*height),
                            fmt_pt(*x),
                            fmt_pt(*y)
                        ));
                        out.push_str(&format!("/{} Do\n", name));
                        out.push_str("Q\n");
                    }
                }
            }
        }

        out
    }
}

pub(crate) fn document_to_pdf(document: &Document, options: &PdfOptions) -> io::Result<Vec<u8>> {
    let mut bytes: Vec<u8> = Vec::new();
    document_to_pdf_writer(document, options, &mut bytes, None)?;
    Ok(bytes)
}

pub(crate) fn document_to_pdf_writer<W: Write>(
    document: &Document,
    options: &PdfOptions,
    writer: &mut W,
    debug: Option<&DebugLogger>,
) -> io::Result<usize> {
    let t_write = std::time::Instant::now();
    let mut pdf = PdfWriter::new(writer, options)?;
    pdf.write_document(document)?;
    let bytes_written = pdf.offset;
    if let Some(logger) = debug {
        logger.log_event(&serde_json::json!({
            "type": "pdf.write",
            "ms": t_write.elapsed().as_secs_f64() * 1000.0,
            "bytes": bytes_written,
            "commands": document.page.commands.len(),
            "images": document.images.len(),
            "replaced_chars": pdf.replaced_chars,
        }));
    }
    Ok(bytes_written)
}

fn image_object(image: &ImageData, smask_id: Option<usize>) -> String {
    let stream_data = encode_stream_data(&image.data);
    let filters = match image.filter {
        "/DCTDecode" => "[/ASCIIHexDecode /DCTDecode]",
        _ => "[/ASCIIHexDecode /FlateDecode]",
    };
    let smask = smask_id
        .map(|id| format!(" /SMask {} 0 R", id))
        .unwrap_or_default();
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} /BitsPerComponent {} /Length {} /Filter {}{} >>
stream
{}
endstream",
        image.width,
        image.height,
        image.color_space,
        image.bits_per_component,
        stream_data.len(),
        filters,
        smask,
        stream_data
    )
}

fn image_smask_object(alpha: &AlphaData) -> String {
    let stream_data = encode_stream_data(&alpha.data);
    format!(
        "<< /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace /DeviceGray /BitsPerComponent {} /Length {} /Filter [/ASCIIHexDecode {}] >>
stream
{}
endstream",
        alpha.width,
        alpha.height,
        alpha.bits_per_component,
        stream_data.len(),
        alpha.filter,
        stream_data
    )
}

fn encode_stream_data(data: &[u8]) -> String {
    let mut hex = ascii_hex_encode(data);
    hex.push('>');
    hex
}

fn ascii_hex_encode(data: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(data.len() * 2 + data.len() / 32);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 && i % 32 == 0 {
            out.push('\n');
        }
        out.push(HEX[(byte >> 4) as usize] as char);
        out.push(HEX[(byte & 0x0F) as usize] as char);
    }
    out
}

fn font_object(name: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        name
    )
}

fn named_resources(entries: &[(String, usize)]) -> String {
    let entries = entries
        .iter()
        .map(|(resource, id)| format!("/{} {} 0 R", resource, id))
        .collect::<Vec<_>>();
    format!("<< {} >>", entries.join(" "))
}

fn stream_object(content: &str) -> String {
    let length = content.len();
    format!("<< /Length {} >>\nstream\n{}\nendstream", length, content)
}

fn info_object(title: Option<&str>) -> String {
    let mut entries = vec!["/Producer (cutsheet)".to_string()];
    if let Some(title) = title {
        entries.push(format!("/Title ({})", escape_pdf_string(title)));
    }
    format!("<< {} >>", entries.join(" "))
}

fn write_pdf_object<W: Write>(
    writer: &mut W,
    offset: &mut usize,
    offsets: &mut [usize],
    obj_id: usize,
    body: &str,
) -> io::Result<()> {
    if let Some(slot) = offsets.get_mut(obj_id) {
        *slot = *offset;
    }
    write_str(writer, &format!("{} 0 obj\n", obj_id), offset)?;
    write_bytes(writer, body.as_bytes(), offset)?;
    write_bytes(writer, b"\nendobj\n", offset)?;
    Ok(())
}

fn write_bytes<W: Write>(writer: &mut W, data: &[u8], offset: &mut usize) -> io::Result<()> {
    writer.write_all(data)?;
    *offset += data.len();
    Ok(())
}

fn write_str<W: Write>(writer: &mut W, data: &str, offset: &mut usize) -> io::Result<()> {
    write_bytes(writer, data.as_bytes(), offset)
}

fn escape_pdf_string(input: &str) -> String {
    let mut out = String::new();
    for ch in input.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ch if ch.is_ascii() => out.push(ch),
            _ => out.push('?'),
        }
    }
    out
}

struct WinAnsiEncoded {
    text: String,
    replaced: usize,
}

fn encode_winansi_pdf_string(input: &str) -> WinAnsiEncoded {
    let mut out = String::new();
    let mut replaced = 0usize;
    for ch in input.chars() {
        let byte = match ch {
            // ASCII
            '\u{0000}'..='\u{007F}' => ch as u8,
            // Latin-1
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            // WinAnsi extensions (cp1252)
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            // Turkish letters outside cp1252 degrade to their ASCII base.
            '\u{0131}' => b'i',
            '\u{0130}' => b'I',
            '\u{011F}' => b'g',
            '\u{011E}' => b'G',
            '\u{015F}' => b's',
            '\u{015E}' => b'S',
            _ => {
                replaced += 1;
                b'?'
            }
        };

        match byte {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b if b < 0x20 || b >= 0x7f => out.push_str(&format!("\\{:03o}", b)),
            b => out.push(b as char),
        }
    }

    WinAnsiEncoded {
        text: out,
        replaced,
    }
}

fn fmt(value: f32) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let fixed = I32F32::from_num(value);
    let scaled = (fixed * I32F32::from_num(1000)).round();
    let milli: i64 = scaled.to_num();
    format_milli(milli)
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

fn fmt_pt(value: Pt) -> String {
    format_milli(value.to_milli_i64())
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

fn rgb_to_cmyk(color: Color) -> (f32, f32, f32, f32) {
    let r = clamp_unit(color.r);
    let g = clamp_unit(color.g);
    let b = clamp_unit(color.b);
    let k = 1.0 - r.max(g).max(b);
    if k >= 1.0 - 1e-6 {
        return (0.0, 0.0, 0.0, 1.0);
    }
    let c = (1.0 - r - k) / (1.0 - k);
    let m = (1.0 - g - k) / (1.0 - k);
    let y = (1.0 - b - k) / (1.0 - k);
    (clamp_unit(c), clamp_unit(m), clamp_unit(y), clamp_unit(k))
}

fn color_to_pdf_fill(color: Color, space: ColorSpace) -> String {
    match space {
        ColorSpace::Rgb => format!("{} {} {} rg\n", fmt(color.r), fmt(color.g), fmt(color.b)),
        ColorSpace::Cmyk => {
            let (c, m, y, k) = rgb_to_cmyk(color);
            format!("{} {} {} {} k\n", fmt(c), fmt(m), fmt(y), fmt(k))
        }
    }
}

fn color_to_pdf_stroke(color: Color, space: ColorSpace) -> String {
    match space {
        ColorSpace::Rgb => format!("{} {} {} RG\n", fmt(color.r), fmt(color.g), fmt(color.b)),
        ColorSpace::Cmyk => {
            let (c, m, y, k) = rgb_to_cmyk(color);
            format!("{} {} {} {} K\n", fmt(c), fmt(m), fmt(y), fmt(k))
        }
    }
}
