//! Minimal PDF 1.4 serialiser for text-only documents.
//!
//! Supports exactly what invoices need: letter-sized pages carrying
//! positioned text runs in the two base-14 faces Helvetica and
//! Helvetica-Bold, uncompressed content streams, and an info dictionary.
//! Text is encoded as `WinAnsiEncoding`; see [`encode_text`].
//!
//! Output depends only on the input, so identical documents serialise to
//! identical bytes.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

/// US letter width in points.
pub const PAGE_WIDTH: f64 = 612.0;
/// US letter height in points.
pub const PAGE_HEIGHT: f64 = 792.0;

/// One of the two faces every document declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    const fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
        }
    }

    const fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
        }
    }

    /// Advance width of an encoded byte in 1/1000 em.
    fn glyph_width(self, byte: u8) -> u16 {
        let table = match self {
            Self::Regular => &HELVETICA_WIDTHS,
            Self::Bold => &HELVETICA_BOLD_WIDTHS,
        };
        match byte {
            32..=126 => table[usize::from(byte - 32)],
            _ => 556,
        }
    }

    /// Rendered width of `text` at `size` points.
    #[must_use]
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        let units: u32 = encode_text(text)
            .into_iter()
            .map(|b| u32::from(self.glyph_width(b)))
            .sum();
        f64::from(units) * size / 1000.0
    }
}

/// A string drawn with its baseline starting at `(x, y)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub font: Font,
    pub size: f64,
    pub x: f64,
    pub y: f64,
    pub text: String,
}

/// One page of text runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub runs: Vec<TextRun>,
}

/// Document-level metadata.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

/// Encode text for a `WinAnsiEncoding` font.
///
/// ASCII and Latin-1 map to themselves, `₹` (absent from the base-14 fonts)
/// becomes `Rs.`, control characters become spaces and anything else `?`.
#[must_use]
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{20B9}' => out.extend_from_slice(b"Rs."),
            c if c.is_control() => out.push(b' '),
            // Latin-1 coincides with WinAnsi above 0xA0 and in ASCII
            c if (' '..='~').contains(&c) || ('\u{A0}'..='\u{FF}').contains(&c) => {
                out.push(u8::try_from(u32::from(c)).unwrap_or(b'?'));
            }
            _ => out.push(b'?'),
        }
    }
    out
}

/// Write encoded text as a PDF literal string body.
fn push_literal(buf: &mut Vec<u8>, text: &str) {
    buf.push(b'(');
    for byte in encode_text(text) {
        match byte {
            b'(' | b')' | b'\\' => {
                buf.push(b'\\');
                buf.push(byte);
            }
            32..=126 => buf.push(byte),
            _ => buf.extend_from_slice(format!("\\{byte:03o}").as_bytes()),
        }
    }
    buf.push(b')');
}

fn content_stream(page: &Page) -> Vec<u8> {
    let mut stream = Vec::new();
    for run in &page.runs {
        stream.extend_from_slice(
            format!(
                "BT\n/{} {:.2} Tf\n{:.2} {:.2} Td\n",
                run.font.resource_name(),
                run.size,
                run.x,
                run.y
            )
            .as_bytes(),
        );
        push_literal(&mut stream, &run.text);
        stream.extend_from_slice(b" Tj\nET\n");
    }
    stream
}

/// Accumulates numbered objects and remembers where each one starts.
struct Writer {
    buf: Vec<u8>,
    offsets: Vec<usize>,
}

impl Writer {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, body: &[u8]) {
        self.offsets.push(self.buf.len());
        let number = self.offsets.len();
        self.buf
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.buf.extend_from_slice(body);
        self.buf.extend_from_slice(b"\nendobj\n");
    }

    fn finish(mut self, root: usize, info: usize) -> Vec<u8> {
        let xref_at = self.buf.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", self.offsets.len() + 1);
        for offset in &self.offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref_at}\n%%EOF\n",
            self.offsets.len() + 1
        );
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}

const CATALOG: usize = 1;
const PAGES: usize = 2;
const FONT_REGULAR: usize = 3;
const FONT_BOLD: usize = 4;
const INFO: usize = 5;
const FIRST_PAGE: usize = 6;

/// Serialise pages into a complete PDF file.
///
/// Object layout: catalog, page tree, the two fonts, the info dictionary,
/// then a page object and its content stream for every page.
#[must_use]
pub fn write_document(info: &DocumentInfo, pages: &[Page]) -> Vec<u8> {
    let mut w = Writer::new();

    w.object(format!("<< /Type /Catalog /Pages {PAGES} 0 R >>").as_bytes());

    let kids: Vec<String> = (0..pages.len())
        .map(|i| format!("{} 0 R", FIRST_PAGE + 2 * i))
        .collect();
    w.object(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );

    for font in [Font::Regular, Font::Bold] {
        w.object(
            format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            )
            .as_bytes(),
        );
    }

    let mut info_body = b"<< /Title ".to_vec();
    push_literal(&mut info_body, &info.title);
    info_body.extend_from_slice(b" /Author ");
    push_literal(&mut info_body, &info.author);
    info_body.extend_from_slice(b" /Producer (parlour) /CreationDate ");
    push_literal(
        &mut info_body,
        &info.created_at.format("D:%Y%m%d%H%M%SZ").to_string(),
    );
    info_body.extend_from_slice(b" >>");
    w.object(&info_body);

    for (i, page) in pages.iter().enumerate() {
        let content_id = FIRST_PAGE + 2 * i + 1;
        w.object(
            format!(
                "<< /Type /Page /Parent {PAGES} 0 R /MediaBox [0 0 {PAGE_WIDTH:.0} {PAGE_HEIGHT:.0}] \
                 /Resources << /Font << /F1 {FONT_REGULAR} 0 R /F2 {FONT_BOLD} 0 R >> >> \
                 /Contents {content_id} 0 R >>"
            )
            .as_bytes(),
        );

        let stream = content_stream(page);
        let mut body = format!("<< /Length {} >>\nstream\n", stream.len()).into_bytes();
        body.extend_from_slice(&stream);
        body.extend_from_slice(b"\nendstream");
        w.object(&body);
    }

    w.finish(CATALOG, INFO)
}

/// Helvetica advance widths for bytes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold advance widths for bytes 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
