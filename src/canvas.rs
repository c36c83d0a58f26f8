use crate::bitmap::ImageData;
use crate::font;
use crate::types::{Color, Pt, Rect, Size};
use std::collections::BTreeMap;

/// How a rectangle is painted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Paint {
    Fill,
    Stroke,
    FillStroke,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SaveState,
    RestoreState,
    // Non-rendered metadata used for sheet-aware reporting. Ignored by the PDF writer.
    Meta {
        key: String,
        value: String,
    },
    SetFillColor(Color),
    SetStrokeColor(Color),
    SetLineWidth(Pt),
    SetDash {
        pattern: Vec<Pt>,
        phase: Pt,
    },
    SetFontName(String),
    SetFontSize(Pt),
    DrawRect {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        paint: Paint,
    },
    DrawString {
        x: Pt,
        y: Pt,
        text: String,
    },
    DrawImage {
        x: Pt,
        y: Pt,
        width: Pt,
        height: Pt,
        resource_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct Page {
    pub commands: Vec<Command>,
}

/// A finalized sheet: one page of commands plus the image resources it draws.
#[derive(Debug, Clone)]
pub struct Document {
    pub page_size: Size,
    pub page: Page,
    pub images: BTreeMap<String, ImageData>,
}

impl Document {
    pub fn meta_values<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.page.commands.iter().filter_map(move |cmd| match cmd {
            Command::Meta { key: k, value } if k == key => Some(value.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    fill_color: Color,
    stroke_color: Color,
    line_width: Pt,
    dashed: bool,
    font_size: Pt,
    font_name: String,
}

impl GraphicsState {
    fn initial() -> Self {
        Self {
            fill_color: Color::BLACK,
            stroke_color: Color::BLACK,
            line_width: Pt::from_f32(1.0),
            dashed: false,
            font_size: Pt::from_f32(12.0),
            font_name: font::HELVETICA.to_string(),
        }
    }
}

/// Single-page drawing surface in PDF points, origin at the bottom-left.
///
/// The canvas never flips coordinates; callers map into its space first
/// (see [`crate::geometry`]). [`Canvas::finish`] consumes the canvas, so a sheet
/// can only be finalized once.
pub struct Canvas {
    page_size: Size,
    current: Page,
    images: BTreeMap<String, ImageData>,
    state_stack: Vec<GraphicsState>,
    current_state: GraphicsState,
}

impl Canvas {
    pub fn new(page_size: Size) -> Self {
        Self {
            page_size,
            current: Page::default(),
            images: BTreeMap::new(),
            state_stack: Vec::new(),
            current_state: GraphicsState::initial(),
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn save_state(&mut self) {
        self.state_stack.push(self.current_state.clone());
        self.current.commands.push(Command::SaveState);
    }

    pub fn restore_state(&mut self) {
        if let Some(state) = self.state_stack.pop() {
            self.current_state = state;
            self.current.commands.push(Command::RestoreState);
        }
    }

    /// Runs `draw` inside a save/restore pair so styling cannot leak out.
    pub fn scoped<R>(&mut self, draw: impl FnOnce(&mut Canvas) -> R) -> R {
        self.save_state();
        let out = draw(self);
        self.restore_state();
        out
    }

    pub fn meta(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.current.commands.push(Command::Meta {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn set_fill_color(&mut self, color: Color) {
        if self.current_state.fill_color == color {
            return;
        }
        self.current_state.fill_color = color;
        self.current.commands.push(Command::SetFillColor(color));
    }

    pub fn set_stroke_color(&mut self, color: Color) {
        if self.current_state.stroke_color == color {
            return;
        }
        self.current_state.stroke_color = color;
        self.current.commands.push(Command::SetStrokeColor(color));
    }

    pub fn set_line_width(&mut self, width: Pt) {
        let width = if width < Pt::ZERO { Pt::ZERO } else { width };
        if self.current_state.line_width == width {
            return;
        }
        self.current_state.line_width = width;
        self.current.commands.push(Command::SetLineWidth(width));
    }

    /// Sets a dash pattern; an empty pattern restores solid strokes.
    pub fn set_dash(&mut self, pattern: Vec<Pt>, phase: Pt) {
        let dashed = !pattern.is_empty();
        if !dashed && !self.current_state.dashed {
            return;
        }
        self.current_state.dashed = dashed;
        self.current
            .commands
            .push(Command::SetDash { pattern, phase });
    }

    pub fn set_font_name(&mut self, name: &str) {
        if self.current_state.font_name == name {
            return;
        }
        self.current_state.font_name = name.to_string();
        self.current
            .commands
            .push(Command::SetFontName(self.current_state.font_name.clone()));
    }

    pub fn set_font_size(&mut self, size: Pt) {
        if self.current_state.font_size == size {
            return;
        }
        self.current_state.font_size = size;
        self.current.commands.push(Command::SetFontSize(size));
    }

    pub fn set_font(&mut self, name: &str, size: Pt) {
        self.set_font_name(name);
        self.set_font_size(size);
    }

    pub fn draw_rect(&mut self, rect: Rect, paint: Paint) {
        self.current.commands.push(Command::DrawRect {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            paint,
        });
    }

    /// Draws text with its baseline starting at (`x`, `y`).
    pub fn draw_string(&mut self, x: Pt, y: Pt, text: impl Into<String>) {
        self.current.commands.push(Command::DrawString {
            x,
            y,
            text: text.into(),
        });
    }

    /// Draws text horizontally centered on `center_x`, baseline at `y`.
    pub fn draw_centered_string(&mut self, center_x: Pt, y: Pt, text: impl Into<String>) {
        let text = text.into();
        let width = self.text_width(&text);
        self.draw_string(center_x - width / 2, y, text);
    }

    pub fn text_width(&self, text: &str) -> Pt {
        font::measure_text_width(
            &self.current_state.font_name,
            self.current_state.font_size,
            text,
        )
    }

    /// Registers decoded pixels under `resource_id`. Re-registering an id keeps the first image.
    pub fn register_image(&mut self, resource_id: impl Into<String>, image: ImageData) {
        self.images.entry(resource_id.into()).or_insert(image);
    }

    /// Draws a registered image stretched to fill `rect` exactly.
    pub fn draw_image(&mut self, rect: Rect, resource_id: impl Into<String>) {
        self.current.commands.push(Command::DrawImage {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            resource_id: resource_id.into(),
        });
    }

    pub fn current_command_count(&self) -> usize {
        self.current.commands.len()
    }

    pub fn finish(self) -> Document {
        Document {
            page_size: self.page_size,
            page: self.current,
            images: self.images,
        }
    }
}
