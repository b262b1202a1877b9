//! A4 page geometry for stamped documents, in millimetres measured from the
//! top-left corner. Conversion to PDF points happens at render time.

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 10.0;
pub const BAND_GAP_MM: f32 = 5.0;
pub const TEXT_BAND_HEIGHT_MM: f32 = 25.0;
pub const IMAGE_BAND_HEIGHT_MM: f32 = 35.0;

const POINT_MM: f32 = 25.4 / 72.0;

pub const HEADER_LABEL: &str = "CERTIFIED DOCUMENT";
pub const HEADER_SIZE_PT: f32 = 14.0;
pub const FIELD_SIZE_PT: f32 = 9.0;
pub const SENTENCE_SIZE_PT: f32 = 8.0;
const SENTENCE_LINE_MM: f32 = 3.0;

pub const BAND_FILL: Rgb = Rgb(240, 255, 240);
pub const BAND_BORDER: Rgb = Rgb(0, 128, 0);
pub const BAND_BORDER_MM: f32 = 1.0;
pub const RULE_MM: f32 = 0.3;
const FIELD_COLOR: Rgb = Rgb(50, 50, 50);
const SENTENCE_COLOR: Rgb = Rgb(80, 80, 80);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandKind {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub image_area: Rect,
    pub band: Rect,
}

impl PageLayout {
    pub fn a4(kind: BandKind) -> Self {
        let band_height = match kind {
            BandKind::Text => TEXT_BAND_HEIGHT_MM,
            BandKind::Image => IMAGE_BAND_HEIGHT_MM,
        };
        let width = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
        let band = Rect {
            x: MARGIN_MM,
            y: PAGE_HEIGHT_MM - MARGIN_MM - band_height,
            width,
            height: band_height,
        };
        let image_area = Rect {
            x: MARGIN_MM,
            y: MARGIN_MM,
            width,
            height: band.y - BAND_GAP_MM - MARGIN_MM,
        };
        Self { image_area, band }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Bold,
    Regular,
    Italic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
    pub size_pt: f32,
    pub style: FontStyle,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub x1: f32,
    pub x2: f32,
    pub y: f32,
}

/// Everything drawn inside the band for a text stamp.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStamp {
    pub header: TextLine,
    pub rule: Rule,
    pub fields: [TextLine; 2],
    pub sentence: Vec<TextLine>,
}

impl TextStamp {
    pub fn new(band: Rect, document_type: &str, certified_at: &str, issuer: &str) -> Self {
        let header_width = text_width_mm(HEADER_LABEL, HEADER_SIZE_PT);
        let header = TextLine {
            text: HEADER_LABEL.to_string(),
            x: band.x + (band.width - header_width) / 2.0,
            baseline: baseline(band.y + 3.0, 6.0, HEADER_SIZE_PT),
            size_pt: HEADER_SIZE_PT,
            style: FontStyle::Bold,
            color: BAND_BORDER,
        };

        let rule = Rule {
            x1: band.x + 5.0,
            x2: band.x + band.width - 5.0,
            y: band.y + 10.0,
        };

        let field_baseline = baseline(band.y + 12.0, 5.0, FIELD_SIZE_PT);
        let field = |text: String, x: f32| TextLine {
            text,
            x,
            baseline: field_baseline,
            size_pt: FIELD_SIZE_PT,
            style: FontStyle::Regular,
            color: FIELD_COLOR,
        };
        let fields = [
            field(format!("Document Type: {document_type}"), band.x + 5.0),
            field(format!("Certified: {certified_at}"), band.x + band.width / 2.0),
        ];

        let sentence_left = band.x + 3.0;
        let sentence_width = band.width - 6.0;
        let sentence = wrap_words(&verification_sentence(issuer), sentence_width, SENTENCE_SIZE_PT)
            .into_iter()
            .enumerate()
            .map(|(index, text)| {
                let width = text_width_mm(&text, SENTENCE_SIZE_PT);
                TextLine {
                    x: sentence_left + (sentence_width - width).max(0.0) / 2.0,
                    baseline: baseline(
                        band.y + 17.0 + index as f32 * SENTENCE_LINE_MM,
                        SENTENCE_LINE_MM,
                        SENTENCE_SIZE_PT,
                    ),
                    text,
                    size_pt: SENTENCE_SIZE_PT,
                    style: FontStyle::Italic,
                    color: SENTENCE_COLOR,
                }
            })
            .collect();

        Self {
            header,
            rule,
            fields,
            sentence,
        }
    }
}

pub fn verification_sentence(issuer: &str) -> String {
    format!("This document has been verified and certified as authentic by the {issuer}")
}

/// Baseline that vertically centres a line of `size_pt` inside a cell.
fn baseline(cell_top: f32, cell_height: f32, size_pt: f32) -> f32 {
    let cap_height = size_pt * POINT_MM * 0.7;
    cell_top + (cell_height + cap_height) / 2.0
}

/// Approximate Helvetica advance widths as a fraction of the em size.
fn glyph_em(ch: char) -> f32 {
    match ch {
        ' ' | 'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '-' => 0.33,
        'm' | 'w' => 0.83,
        'M' | 'W' => 0.89,
        c if c.is_ascii_uppercase() => 0.69,
        c if c.is_ascii_digit() => 0.56,
        _ => 0.54,
    }
}

pub fn text_width_mm(text: &str, size_pt: f32) -> f32 {
    let em_mm = size_pt * POINT_MM;
    text.chars().map(glyph_em).sum::<f32>() * em_mm
}

/// Greedy word wrap. A single word wider than the limit gets its own line.
pub fn wrap_words(text: &str, max_width_mm: f32, size_pt: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if text_width_mm(&candidate, size_pt) <= max_width_mm {
            current = candidate;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

pub fn points(mm: f32) -> f32 {
    mm / POINT_MM
}
