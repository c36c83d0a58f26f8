use crate::types::Pt;

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

// Advance widths (1/1000 em) for ASCII 0x20..=0x7E from the standard Helvetica AFM.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

// Helvetica-Bold runs roughly 5% wider than regular for the label alphabet.
const BOLD_EXTRA_PER_MILLE: i64 = 50;

const FALLBACK_WIDTH: u16 = 556;

/// The two base-14 faces the sheet uses. Unknown names resolve to regular Helvetica.
pub(crate) fn is_bold(name: &str) -> bool {
    name.eq_ignore_ascii_case(HELVETICA_BOLD)
}

fn char_width(ch: char) -> u16 {
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

pub(crate) fn measure_text_width(name: &str, font_size: Pt, text: &str) -> Pt {
    let mut units: i64 = text.chars().map(|ch| char_width(ch) as i64).sum();
    if is_bold(name) {
        units += units * BOLD_EXTRA_PER_MILLE / 1000;
    }
    let milli = font_size.to_milli_i64() as i128 * units as i128;
    Pt::from_milli_i64(((milli + 500) / 1000) as i64)
}
