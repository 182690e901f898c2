use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Rgb,
};

use tracing::debug;

use super::field_extractor::profile_paragraphs;
use super::models::{non_blank, non_empty_list, CandidateRecord};

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const PT_TO_MM: f32 = 0.352_778;
const MARGIN_PT: f32 = 72.0;
const BOTTOM_MARGIN_PT: f32 = 54.0;
const LINE_SPACING: f32 = 1.35;
// Helvetica averages roughly half an em per glyph.
const AVERAGE_GLYPH_EM: f32 = 0.5;

const TITLE_RGB: (u8, u8, u8) = (0x25, 0x63, 0xeb);
const HEADING_RGB: (u8, u8, u8) = (0x37, 0x41, 0x51);
const BODY_RGB: (u8, u8, u8) = (0x11, 0x18, 0x27);

#[derive(Debug, Clone, Copy)]
struct TextStyle {
    size: f32,
    bold: bool,
    rgb: (u8, u8, u8),
}

const TITLE: TextStyle = TextStyle {
    size: 18.0,
    bold: true,
    rgb: TITLE_RGB,
};
const HEADING: TextStyle = TextStyle {
    size: 14.0,
    bold: true,
    rgb: HEADING_RGB,
};
const BODY: TextStyle = TextStyle {
    size: 10.5,
    bold: false,
    rgb: BODY_RGB,
};
const BODY_BOLD: TextStyle = TextStyle {
    size: 10.5,
    bold: true,
    rgb: BODY_RGB,
};

impl TextStyle {
    fn color(&self) -> Color {
        let (r, g, b) = self.rgb;
        Color::Rgb(Rgb::new(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            None,
        ))
    }

    fn max_chars(&self) -> usize {
        let usable_pt = PAGE_WIDTH_MM / PT_TO_MM - 2.0 * MARGIN_PT;
        (usable_pt / (self.size * AVERAGE_GLYPH_EM)).floor().max(10.0) as usize
    }
}

/// Renders a one-candidate CV as a US Letter PDF.
pub fn render_pdf_cv(candidate: &CandidateRecord) -> anyhow::Result<Vec<u8>> {
    let name = non_blank(&candidate.full_name).unwrap_or("Unknown Candidate");
    let mut writer = PdfPageWriter::new(&format!("{name} CV"))?;

    writer.paragraph(name, TITLE);
    writer.gap(18.0);

    if let Some(headline) = non_blank(&candidate.headline) {
        writer.paragraph(headline, BODY_BOLD);
        writer.gap(12.0);
    }

    let email = non_blank(&candidate.email);
    let linkedin = non_blank(&candidate.linkedin_url);
    if email.is_some() || linkedin.is_some() {
        writer.heading("Contact Information");
        if let Some(email) = email {
            writer.paragraph(&format!("Email: {email}"), BODY);
        }
        if let Some(linkedin) = linkedin {
            writer.paragraph(&format!("LinkedIn: {linkedin}"), BODY);
        }
        writer.gap(12.0);
    }

    if let Some(skills) = non_empty_list(&candidate.skills) {
        writer.heading("Skills & Expertise");
        writer.paragraph(&skills.join(" • "), BODY);
        writer.gap(12.0);
    }

    let years = non_blank(&candidate.years_experience).filter(|v| *v != "0");
    let regions = non_empty_list(&candidate.regions);
    if years.is_some() || regions.is_some() {
        writer.heading("Professional Background");
        if let Some(years) = years {
            writer.paragraph(&format!("Years of Experience: {years}"), BODY);
        }
        if let Some(regions) = regions {
            writer.paragraph(&format!("Regional Experience: {}", regions.join(", ")), BODY);
        }
        writer.gap(12.0);
    }

    if let Some(text) = non_blank(&candidate.combined_text) {
        writer.heading("Detailed Profile");
        for para in profile_paragraphs(text) {
            writer.paragraph(&para, BODY);
            writer.gap(6.0);
        }
    }

    writer.finish()
}

struct PdfPageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    cursor_pt: f32,
    pages: usize,
}

impl PdfPageWriter {
    fn new(title: &str) -> anyhow::Result<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor_pt: page_top_pt(),
            pages: 1,
        })
    }

    fn heading(&mut self, text: &str) {
        self.paragraph(text, HEADING);
        self.gap(6.0);
    }

    fn paragraph(&mut self, text: &str, style: TextStyle) {
        for line in wrap_text(&pdf_safe(text), style.max_chars()) {
            self.line(&line, style);
        }
    }

    fn line(&mut self, text: &str, style: TextStyle) {
        let height = style.size * LINE_SPACING;
        self.ensure_room(height);
        self.cursor_pt -= height;

        let font = if style.bold { &self.bold } else { &self.regular };
        self.layer.set_fill_color(style.color());
        self.layer.use_text(
            text,
            style.size,
            Mm(MARGIN_PT * PT_TO_MM),
            Mm(self.cursor_pt * PT_TO_MM),
            font,
        );
    }

    fn gap(&mut self, pt: f32) {
        self.cursor_pt -= pt;
    }

    fn ensure_room(&mut self, height_pt: f32) {
        if self.cursor_pt - height_pt >= BOTTOM_MARGIN_PT {
            return;
        }

        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor_pt = page_top_pt();
        self.pages += 1;
    }

    fn finish(self) -> anyhow::Result<Vec<u8>> {
        debug!("Rendered PDF with {} page(s)", self.pages);
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

fn page_top_pt() -> f32 {
    PAGE_HEIGHT_MM / PT_TO_MM - MARGIN_PT
}

fn pdf_error<E: std::fmt::Debug>(err: E) -> anyhow::Error {
    anyhow::anyhow!("PDF rendering failed: {err:?}")
}

/// Maps text onto what the built-in (WinAnsi) fonts can draw.
pub fn pdf_safe(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '•' | '–' | '—' => Some('-'),
            '‘' | '’' => Some('\''),
            '“' | '”' => Some('"'),
            '\t' | '\r' | '\n' => Some(' '),
            c if c.is_control() => None,
            c if (c as u32) < 0x100 => Some(c),
            _ => Some('?'),
        })
        .collect()
}

/// Greedy word wrap; words longer than a line are split.
pub fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }

    if current_len > 0 {
        lines.push(current);
    }

    lines
}
