//! Markdown to paginated PDF rendering.
//!
//! The generated documentation is simple markdown: headings, paragraphs,
//! lists, block quotes, fenced code and horizontal rules. Blocks are laid out
//! top to bottom on fixed-size pages with the PDF builtin fonts (Helvetica for
//! prose, Courier for code). Inline markup is reduced to its text.
//!
//! Page size, margins, font sizes and colours come from [`RenderTheme`].

use printpdf::{
    BuiltinFont, Color, Line, LinePoint, Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, Point, Pt,
    Rgb, TextItem,
};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, info};

use crate::error::{Result, ZenError};

const PT_PER_MM: f32 = 72.0 / 25.4;

/// Visual configuration of rendered documents.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderTheme {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
    pub body_size_pt: f32,
    pub code_size_pt: f32,
    /// Font sizes for heading levels 1 to 6.
    pub heading_sizes_pt: [f32; 6],
    /// Line height as a multiple of the font size.
    pub line_spacing: f32,
    pub text_color: [f32; 3],
    pub heading_color: [f32; 3],
    pub code_color: [f32; 3],
    pub rule_color: [f32; 3],
}

impl Default for RenderTheme {
    fn default() -> Self {
        // A4 with 40px/30px print margins plus the body padding of the web theme.
        Self {
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            margin_top_mm: 21.2,
            margin_bottom_mm: 21.2,
            margin_left_mm: 15.9,
            margin_right_mm: 15.9,
            body_size_pt: 10.5,
            code_size_pt: 9.0,
            heading_sizes_pt: [26.0, 20.0, 16.0, 14.0, 12.0, 12.0],
            line_spacing: 1.5,
            text_color: [0.17, 0.24, 0.31],
            heading_color: [0.15, 0.39, 0.92],
            code_color: [0.22, 0.25, 0.32],
            rule_color: [0.23, 0.51, 0.96],
        }
    }
}

/// One markdown block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: usize, text: String },
    Paragraph(String),
    ListItem { marker: String, text: String },
    Quote(String),
    Code(Vec<String>),
    Rule,
}

fn heading_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*#*\s*$").expect("valid regex"))
}

fn bullet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid regex"))
}

fn ordered_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(\d+)[.)]\s+(.*)$").expect("valid regex"))
}

fn inline_res() -> &'static [(Regex, &'static str)] {
    static RES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RES.get_or_init(|| {
        [
            (r"!?\[([^\]]*)\]\([^)]*\)", "$1"),
            (r"`([^`]*)`", "$1"),
            (r"\*\*(.+?)\*\*", "$1"),
            (r"__(.+?)__", "$1"),
            (r"\*([^*\s][^*]*)\*", "$1"),
            (r"<[^>]+>", ""),
        ]
        .into_iter()
        .map(|(p, r)| (Regex::new(p).expect("valid regex"), r))
        .collect()
    })
}

fn is_rule(line: &str) -> bool {
    let compact: String = line.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= 3
        && ['-', '*', '_']
            .iter()
            .any(|m| compact.chars().all(|c| c == *m))
}

/// Strips inline markup, keeping the visible text.
pub fn strip_inline(text: &str) -> String {
    let mut out = text.to_string();
    for (re, rep) in inline_res() {
        out = re.replace_all(&out, *rep).into_owned();
    }
    out
}

/// Splits markdown into blocks. Consecutive text lines form one paragraph.
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut paragraph: Vec<String> = Vec::new();
    let mut code: Option<Vec<String>> = None;

    fn flush(paragraph: &mut Vec<String>, blocks: &mut Vec<Block>) {
        if !paragraph.is_empty() {
            blocks.push(Block::Paragraph(strip_inline(&paragraph.join(" "))));
            paragraph.clear();
        }
    }

    for raw in markdown.lines() {
        if raw.trim_start().starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines)),
                None => {
                    flush(&mut paragraph, &mut blocks);
                    code = Some(Vec::new());
                }
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(raw.replace('\t', "    "));
            continue;
        }

        let line = raw.trim_end();
        if line.trim().is_empty() {
            flush(&mut paragraph, &mut blocks);
        } else if let Some(caps) = heading_re().captures(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Heading {
                level: caps[1].len(),
                text: strip_inline(&caps[2]),
            });
        } else if is_rule(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Rule);
        } else if let Some(caps) = bullet_re().captures(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem {
                marker: "-".to_string(),
                text: strip_inline(&caps[1]),
            });
        } else if let Some(caps) = ordered_re().captures(line) {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::ListItem {
                marker: format!("{}.", &caps[1]),
                text: strip_inline(&caps[2]),
            });
        } else if let Some(rest) = line.trim_start().strip_prefix('>') {
            flush(&mut paragraph, &mut blocks);
            blocks.push(Block::Quote(strip_inline(rest.trim())));
        } else {
            paragraph.push(line.trim().to_string());
        }
    }
    flush(&mut paragraph, &mut blocks);
    if let Some(lines) = code {
        blocks.push(Block::Code(lines));
    }
    blocks
}

/// Maps text onto what the builtin (WinAnsi) fonts can show.
fn pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{20}'..='\u{7e}' | '\u{a0}'..='\u{ff}' => out.push(c),
            '\t' => out.push_str("    "),
            '\u{2013}' | '\u{2014}' | '\u{2022}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201c}' | '\u{201d}' => out.push('"'),
            '\u{2026}' => out.push_str("..."),
            '\u{26a0}' => out.push('!'),
            '\u{fe0f}' | '\u{200b}' => {}
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap to at most `width` characters per line.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Hard wrap preserving leading whitespace, for code.
fn wrap_hard(line: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(width.max(1))
        .map(|c| c.iter().collect())
        .collect()
}

fn rgb(c: [f32; 3]) -> Color {
    Color::Rgb(Rgb::new(c[0], c[1], c[2], None))
}

/// Approximate average glyph width as a fraction of the font size.
fn glyph_factor(font: BuiltinFont) -> f32 {
    match font {
        BuiltinFont::Courier
        | BuiltinFont::CourierBold
        | BuiltinFont::CourierOblique
        | BuiltinFont::CourierBoldOblique => 0.6,
        BuiltinFont::HelveticaBold | BuiltinFont::HelveticaBoldOblique => 0.56,
        _ => 0.5,
    }
}

/// Accumulates page operations, opening a new page when the cursor runs out.
struct Layout<'a> {
    theme: &'a RenderTheme,
    pages: Vec<Vec<Op>>,
    ops: Vec<Op>,
    y: f32,
}

impl<'a> Layout<'a> {
    fn new(theme: &'a RenderTheme) -> Self {
        Self {
            theme,
            pages: Vec::new(),
            ops: Vec::new(),
            y: theme.page_height_mm * PT_PER_MM - theme.margin_top_mm * PT_PER_MM,
        }
    }

    fn left(&self) -> f32 {
        self.theme.margin_left_mm * PT_PER_MM
    }

    fn usable_width(&self) -> f32 {
        (self.theme.page_width_mm - self.theme.margin_left_mm - self.theme.margin_right_mm)
            * PT_PER_MM
    }

    fn bottom(&self) -> f32 {
        self.theme.margin_bottom_mm * PT_PER_MM
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.ops));
        self.y = (self.theme.page_height_mm - self.theme.margin_top_mm) * PT_PER_MM;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < self.bottom() && !self.ops.is_empty() {
            self.new_page();
        }
    }

    fn space(&mut self, pt: f32) {
        self.y -= pt;
        if self.y < self.bottom() {
            self.new_page();
        }
    }

    fn chars_per_line(&self, font: BuiltinFont, size: f32, indent: f32) -> usize {
        ((self.usable_width() - indent) / (size * glyph_factor(font))).floor() as usize
    }

    fn text_line(
        &mut self,
        text: &str,
        font: BuiltinFont,
        size: f32,
        indent: f32,
        color: [f32; 3],
    ) {
        let line_height = size * self.theme.line_spacing;
        self.ensure(line_height);
        self.y -= line_height;
        let pos = Point {
            x: Pt(self.left() + indent),
            y: Pt(self.y + (line_height - size)),
        };
        self.ops.extend([
            Op::StartTextSection,
            Op::SetFillColor { col: rgb(color) },
            Op::SetFontSizeBuiltinFont { size: Pt(size), font },
            Op::SetTextCursor { pos },
            Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(pdf_safe(text))],
                font,
            },
            Op::EndTextSection,
        ]);
    }

    fn rule(&mut self, color: [f32; 3], thickness: f32) {
        self.space(6.0);
        let y = self.y;
        let left = self.left();
        let right = left + self.usable_width();
        self.ops.extend([
            Op::SetOutlineColor { col: rgb(color) },
            Op::SetOutlineThickness { pt: Pt(thickness) },
            Op::DrawLine {
                line: Line {
                    points: vec![
                        LinePoint {
                            p: Point { x: Pt(left), y: Pt(y) },
                            bezier: false,
                        },
                        LinePoint {
                            p: Point { x: Pt(right), y: Pt(y) },
                            bezier: false,
                        },
                    ],
                    is_closed: false,
                },
            },
        ]);
        self.space(8.0);
    }

    fn block(&mut self, block: &Block) {
        let theme = self.theme;
        match block {
            Block::Heading { level, text } => {
                let size = theme.heading_sizes_pt[level.saturating_sub(1).min(5)];
                let font = BuiltinFont::HelveticaBold;
                self.space(size * 0.5);
                let width = self.chars_per_line(font, size, 0.0);
                for line in wrap(text, width) {
                    self.text_line(&line, font, size, 0.0, theme.heading_color);
                }
                if *level <= 2 {
                    self.rule(theme.rule_color, if *level == 1 { 1.5 } else { 0.5 });
                } else {
                    self.space(size * 0.25);
                }
            }
            Block::Paragraph(text) => {
                let (font, size) = (BuiltinFont::Helvetica, theme.body_size_pt);
                let width = self.chars_per_line(font, size, 0.0);
                for line in wrap(text, width) {
                    self.text_line(&line, font, size, 0.0, theme.text_color);
                }
                self.space(size * 0.6);
            }
            Block::ListItem { marker, text } => {
                let (font, size) = (BuiltinFont::Helvetica, theme.body_size_pt);
                let indent = size * 2.0;
                let width = self.chars_per_line(font, size, indent);
                for (i, line) in wrap(text, width).into_iter().enumerate() {
                    if i == 0 {
                        let marker_x =
                            indent - size * glyph_factor(font) * (marker.len() as f32 + 1.0);
                        self.text_line(marker, font, size, marker_x.max(0.0), theme.heading_color);
                        // Put the item text on the marker's baseline.
                        self.y += size * theme.line_spacing;
                    }
                    self.text_line(&line, font, size, indent, theme.text_color);
                }
                self.space(size * 0.2);
            }
            Block::Quote(text) => {
                let (font, size) = (BuiltinFont::HelveticaOblique, theme.body_size_pt);
                let indent = size * 1.5;
                let width = self.chars_per_line(font, size, indent);
                for line in wrap(text, width) {
                    self.text_line(&line, font, size, indent, theme.code_color);
                }
                self.space(size * 0.6);
            }
            Block::Code(lines) => {
                let (font, size) = (BuiltinFont::Courier, theme.code_size_pt);
                let indent = size;
                let width = self.chars_per_line(font, size, indent);
                self.space(size * 0.3);
                for line in lines {
                    for part in wrap_hard(line, width) {
                        self.text_line(&part, font, size, indent, theme.code_color);
                    }
                }
                self.space(size);
            }
            Block::Rule => self.rule(theme.rule_color, 1.0),
        }
    }

    fn finish(mut self) -> Vec<Vec<Op>> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.ops);
        }
        self.pages
    }
}

/// Renders `markdown` to PDF bytes.
pub fn render_markdown(markdown: &str, theme: &RenderTheme) -> Result<Vec<u8>> {
    let blocks = parse_blocks(markdown);
    debug!(blocks = blocks.len(), "Parsed markdown blocks");

    let mut layout = Layout::new(theme);
    for block in &blocks {
        layout.block(block);
    }
    let pages: Vec<PdfPage> = layout
        .finish()
        .into_iter()
        .map(|ops| PdfPage::new(Mm(theme.page_width_mm), Mm(theme.page_height_mm), ops))
        .collect();
    let page_count = pages.len();

    let mut doc = PdfDocument::new("Generated Docs");
    let mut warnings = Vec::new();
    let bytes = doc
        .with_pages(pages)
        .save(&PdfSaveOptions::default(), &mut warnings);

    if !bytes.starts_with(b"%PDF") {
        return Err(ZenError::Render("PDF writer produced no document".into()));
    }
    info!(
        pages = page_count,
        size = bytes.len(),
        warnings = warnings.len(),
        "Rendered documentation to PDF"
    );
    Ok(bytes)
}
