use crate::canvas::{Canvas, Paint};
use crate::embed::CUTTING_MARGIN_MM;
use crate::font;
use crate::types::{Color, Pt, Rect};

pub const DEFAULT_TITLE: &str = "Layout Sheet";
pub const DEFAULT_ALGORITHM_NAME: &str = "unspecified";

const TEXT_LEFT_MM: f64 = 10.0;
const TITLE_TOP_MM: f64 = 10.0;
const SUMMARY_TOP_MM: f64 = 15.0;
const SHEET_BORDER_INSET_MM: f64 = 5.0;
const STATS_BOTTOM_MM: f64 = 10.0;
const TITLE_FONT_SIZE: f32 = 12.0;
const BODY_FONT_SIZE: f32 = 8.0;
const STATS_LEADING: f32 = 10.0;

/// Sheet-level annotations: header before the placements, statistics after.
#[derive(Debug, Clone)]
pub(crate) struct SheetFinisher<'a> {
    pub title: &'a str,
    pub algorithm_name: &'a str,
    pub placement_count: usize,
}

impl SheetFinisher<'_> {
    /// Title, summary line and the sheet border inset 5 mm from every edge.
    pub fn draw_header(&self, canvas: &mut Canvas) {
        let page = canvas.page_size();
        canvas.scoped(|canvas| {
            canvas.meta("sheet", "header");
            let left = Pt::from_mm(TEXT_LEFT_MM);
            canvas.set_fill_color(Color::BLACK);
            canvas.set_font(font::HELVETICA_BOLD, Pt::from_f32(TITLE_FONT_SIZE));
            canvas.draw_string(left, page.height - Pt::from_mm(TITLE_TOP_MM), self.title);
            canvas.set_font(font::HELVETICA, Pt::from_f32(BODY_FONT_SIZE));
            canvas.draw_string(
                left,
                page.height - Pt::from_mm(SUMMARY_TOP_MM),
                summary_line(self.placement_count),
            );

            canvas.set_stroke_color(Color::BLACK);
            canvas.set_line_width(Pt::from_f32(1.0));
            let full = Rect::new(Pt::ZERO, Pt::ZERO, page.width, page.height);
            canvas.draw_rect(full.inset(Pt::from_mm(SHEET_BORDER_INSET_MM)), Paint::Stroke);
        });
    }

    /// Statistics block stacked upward from the bottom margin.
    pub fn draw_statistics(&self, canvas: &mut Canvas) {
        canvas.scoped(|canvas| {
            canvas.meta("sheet", "statistics");
            canvas.set_fill_color(Color::BLACK);
            canvas.set_font(font::HELVETICA, Pt::from_f32(BODY_FONT_SIZE));
            let left = Pt::from_mm(TEXT_LEFT_MM);
            let mut baseline = Pt::from_mm(STATS_BOTTOM_MM);
            for line in self.statistics_lines().iter().rev() {
                canvas.draw_string(left, baseline, line.as_str());
                baseline = baseline + Pt::from_f32(STATS_LEADING);
            }
        });
    }

    fn statistics_lines(&self) -> [String; 3] {
        [
            format!("Placements: {}", self.placement_count),
            format!("Cutting margin: {} mm", CUTTING_MARGIN_MM),
            format!("Algorithm: {}", self.algorithm_name),
        ]
    }
}

pub(crate) fn summary_line(count: usize) -> String {
    format!("Total: {count}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Command;
    use crate::types::Size;

    fn strings(commands: &[Command]) -> Vec<(Pt, String)> {
        commands
            .iter()
            .filter_map(|cmd| match cmd {
                Command::DrawString { y, text, .. } => Some((*y, text.clone())),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn header_has_bold_title_summary_and_inset_border() {
        let finisher = SheetFinisher {
            title: "Run 42",
            algorithm_name: "MaxRects",
            placement_count: 7,
        };
        let mut canvas = Canvas::new(Size::sheet());
        finisher.draw_header(&mut canvas);
        let doc = canvas.finish();

        let texts = strings(&doc.page.commands);
        assert_eq!(texts[0].1, "Run 42");
        assert_eq!(texts[1].1, "Total: 7");
        assert!(texts[0].0 > texts[1].0);
        assert!(
            doc.page
                .commands
                .contains(&Command::SetFontName(font::HELVETICA_BOLD.to_string()))
        );

        let inset = Pt::from_mm(5.0);
        let sheet = Size::sheet();
        assert!(doc.page.commands.contains(&Command::DrawRect {
            x: inset,
            y: inset,
            width: sheet.width - inset - inset,
            height: sheet.height - inset - inset,
            paint: Paint::Stroke,
        }));
    }

    #[test]
    fn statistics_block_names_margin_and_algorithm() {
        let finisher = SheetFinisher {
            title: DEFAULT_TITLE,
            algorithm_name: "Guillotine",
            placement_count: 3,
        };
        let mut canvas = Canvas::new(Size::sheet());
        finisher.draw_statistics(&mut canvas);
        let doc = canvas.finish();

        let texts = strings(&doc.page.commands);
        let lines: Vec<&str> = texts.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(
            lines,
            vec!["Algorithm: Guillotine", "Cutting margin: 3 mm", "Placements: 3"]
        );
        // Drawn bottom-up, so the last line sits on the bottom margin.
        assert_eq!(texts[0].0, Pt::from_mm(10.0));
        assert!(texts.iter().all(|(y, _)| *y < Pt::from_mm(30.0)));
    }
}
