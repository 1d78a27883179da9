//! Minimal single-page PDF writer.
//!
//! Supports the two standard Helvetica faces in WinAnsi encoding, filled
//! and stroked rectangles, and one embedded JPEG. That is all the expense
//! report needs.

use std::fmt::Write as _;

use crate::shared::errors::RenderError;

pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// Points per centimetre.
pub const CM: f32 = 28.346_457;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            Font::Regular => &HELVETICA_WIDTHS,
            Font::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of `text` at `size`, in points.
    pub fn measure(self, text: &str, size: f32) -> f32 {
        let widths = self.widths();
        let units: u32 = text
            .chars()
            .map(|c| match c as u32 {
                code @ 32..=126 => widths[(code - 32) as usize] as u32,
                _ => 556,
            })
            .sum();
        units as f32 * size / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub f32, pub f32, pub f32);

impl Color {
    pub const BLACK: Color = Color(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color(1.0, 1.0, 1.0);

    /// Parse `#rrggbb`; anything else is black.
    pub fn hex(value: &str) -> Color {
        let digits = value.trim_start_matches('#');
        let channel = |i: usize| {
            digits
                .get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .map(|v| v as f32 / 255.0)
        };
        match (digits.len(), channel(0), channel(2), channel(4)) {
            (6, Some(r), Some(g), Some(b)) => Color(r, g, b),
            _ => Color::BLACK,
        }
    }
}

/// Baseline JPEG accepted for embedding.
#[derive(Debug, Clone)]
pub struct JpegImage {
    pub width: u32,
    pub height: u32,
    components: u8,
    data: Vec<u8>,
}

impl JpegImage {
    /// Read the frame header out of a JPEG stream.
    pub fn parse(data: Vec<u8>) -> Result<Self, RenderError> {
        if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
            return Err(RenderError::Image("not a JPEG file".into()));
        }

        let mut pos = 2;
        while pos + 4 <= data.len() {
            if data[pos] != 0xFF {
                return Err(RenderError::Image("corrupt marker stream".into()));
            }
            let marker = data[pos + 1];
            if marker == 0xFF {
                pos += 1;
                continue;
            }
            let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;

            // SOF0..SOF15 minus DHT, JPG and DAC
            if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
                let frame = data
                    .get(pos + 4..pos + 10)
                    .ok_or_else(|| RenderError::Image("truncated frame header".into()))?;
                let height = u16::from_be_bytes([frame[1], frame[2]]) as u32;
                let width = u16::from_be_bytes([frame[3], frame[4]]) as u32;
                let components = frame[5];
                if width == 0 || height == 0 || !matches!(components, 1 | 3 | 4) {
                    return Err(RenderError::Image("unsupported frame layout".into()));
                }
                return Ok(Self {
                    width,
                    height,
                    components,
                    data,
                });
            }
            pos += 2 + length;
        }
        Err(RenderError::Image("no frame header found".into()))
    }

    fn color_space(&self) -> &'static str {
        match self.components {
            1 => "/DeviceGray",
            4 => "/DeviceCMYK",
            _ => "/DeviceRGB",
        }
    }
}

/// Drawing surface for one A4 page. Coordinates are PDF points from the
/// bottom-left corner.
#[derive(Default)]
pub struct Page {
    ops: String,
    image: Option<JpegImage>,
}

impl Page {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, color: Color, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT {} {} {} rg /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            fmt_num(color.0),
            fmt_num(color.1),
            fmt_num(color.2),
            font.resource(),
            fmt_num(size),
            x,
            y,
            encode_text(text)
        );
    }

    /// Draw `text` horizontally centred on `center_x`.
    pub fn text_centered(
        &mut self,
        center_x: f32,
        y: f32,
        font: Font,
        size: f32,
        color: Color,
        text: &str,
    ) {
        let width = font.measure(text, size);
        self.text(center_x - width / 2.0, y, font, size, color, text);
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Color) {
        let _ = writeln!(
            self.ops,
            "{} {} {} rg {:.2} {:.2} {:.2} {:.2} re f",
            fmt_num(color.0),
            fmt_num(color.1),
            fmt_num(color.2),
            x,
            y,
            w,
            h
        );
    }

    pub fn stroke_rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32, color: Color) {
        let _ = writeln!(
            self.ops,
            "{} {} {} RG {} w {:.2} {:.2} {:.2} {:.2} re S",
            fmt_num(color.0),
            fmt_num(color.1),
            fmt_num(color.2),
            fmt_num(width),
            x,
            y,
            w,
            h
        );
    }

    /// Place the page's single image. A second call replaces the first.
    pub fn image(&mut self, image: JpegImage, x: f32, y: f32, w: f32, h: f32) {
        let _ = writeln!(
            self.ops,
            "q {:.2} 0 0 {:.2} {:.2} {:.2} cm /Im1 Do Q",
            w, h, x, y
        );
        self.image = Some(image);
    }

    /// Serialize the page as a complete PDF file.
    pub fn finish(self) -> Vec<u8> {
        let mut out: Vec<u8> = Vec::with_capacity(self.ops.len() + 2048);
        let mut offsets: Vec<usize> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let xobject = if self.image.is_some() {
            " /XObject << /Im1 7 0 R >>"
        } else {
            ""
        };
        let objects: Vec<Vec<u8>> = {
            let mut objs = vec![
                b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
                b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
                format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                     /Resources << /Font << /F1 5 0 R /F2 6 0 R >>{} >> /Contents 4 0 R >>",
                    fmt_num(A4_WIDTH),
                    fmt_num(A4_HEIGHT),
                    xobject
                )
                .into_bytes(),
                stream(b"", self.ops.as_bytes()),
                font_object("Helvetica"),
                font_object("Helvetica-Bold"),
            ];
            if let Some(image) = &self.image {
                let dict = format!(
                    " /Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                     /BitsPerComponent 8 /Filter /DCTDecode",
                    image.width,
                    image.height,
                    image.color_space()
                );
                objs.push(stream(dict.as_bytes(), &image.data));
            }
            objs
        };

        for (index, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_at = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in &offsets {
            let _ = writeln!(xref, "{:010} 00000 n ", offset);
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

fn stream(extra_dict: &[u8], data: &[u8]) -> Vec<u8> {
    let mut obj = Vec::with_capacity(data.len() + 64);
    obj.extend_from_slice(b"<<");
    obj.extend_from_slice(extra_dict);
    obj.extend_from_slice(format!(" /Length {} >>\nstream\n", data.len()).as_bytes());
    obj.extend_from_slice(data);
    obj.extend_from_slice(b"\nendstream");
    obj
}

fn font_object(base: &str) -> Vec<u8> {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base
    )
    .into_bytes()
}

fn fmt_num(value: f32) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Escape `text` for a literal string in WinAnsi encoding. Characters the
/// encoding lacks become `?`.
pub fn encode_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => match win_ansi_code(c) {
                Some(code) => {
                    let _ = write!(out, "\\{:03o}", code);
                }
                None => out.push('?'),
            },
        }
    }
    out
}

fn win_ansi_code(c: char) -> Option<u8> {
    match c {
        '€' => Some(0x80),
        '‚' => Some(0x82),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        '™' => Some(0x99),
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        _ => None,
    }
}

/// Greedy word wrap to `max_width` points.
pub fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if font.measure(&candidate, size) > max_width && !current.is_empty() {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_jpeg() -> Vec<u8> {
        // SOI, APP0 stub, SOF0 for a 2x3 RGB frame, EOI
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x03, 0x00, 0x02, 0x03]);
        data.extend_from_slice(&[0u8; 9]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    #[test]
    fn euro_and_accents_use_win_ansi_codes() {
        assert_eq!(encode_text("4,50 €"), "4,50 \\200");
        assert_eq!(encode_text("émis (TVAC)"), "\\351mis \\(TVAC\\)");
        assert_eq!(encode_text("→"), "?");
    }

    #[test]
    fn measure_uses_font_metrics() {
        assert_eq!(Font::Regular.measure("ii", 10.0), 4.44);
        assert!(Font::Bold.measure("Total", 12.0) > Font::Regular.measure("Total", 12.0));
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("one two three four five six", Font::Regular, 10.0, 60.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Regular.measure(line, 10.0) <= 60.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), "one two three four five six");
    }

    #[test]
    fn jpeg_frame_header_is_read() {
        let image = JpegImage::parse(tiny_jpeg()).unwrap();
        assert_eq!((image.width, image.height), (2, 3));
        assert_eq!(image.color_space(), "/DeviceRGB");
        assert!(JpegImage::parse(b"\x89PNG\r\n".to_vec()).is_err());
    }

    #[test]
    fn finished_document_has_consistent_xref() {
        let mut page = Page::new();
        page.text(50.0, 800.0, Font::Bold, 18.0, Color::hex("#98C0A3"), "Hello");
        page.image(JpegImage::parse(tiny_jpeg()).unwrap(), 10.0, 10.0, 20.0, 30.0);
        let bytes = page.finish();
        let text = String::from_utf8_lossy(&bytes);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/Filter /DCTDecode"));
        assert!(text.contains("/XObject << /Im1 7 0 R >>"));

        let start = text.rfind("startxref\n").unwrap() + "startxref\n".len();
        let xref_at: usize = text[start..].lines().next().unwrap().parse().unwrap();
        assert_eq!(&bytes[xref_at..xref_at + 4], b"xref");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::hex("#ffffff"), Color::WHITE);
        assert_eq!(Color::hex("bogus"), Color::BLACK);
    }
}
