//! Expense report layout and persistence.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::pdf::{wrap, Color, Font, JpegImage, Page, A4_HEIGHT, A4_WIDTH, CM};
use crate::application::ports::ReportRenderer;
use crate::domain::report::TARIFF_NOTE;
use crate::domain::MonthlyReport;
use crate::shared::errors::RenderError;

const SAGE_GREEN: &str = "#98C0A3";
const DARK_GREY: &str = "#4a4a4a";
const LIGHT_GREY: &str = "#f5f5f5";
const SUBTITLE_GREY: &str = "#555555";
const GRID_GREY: &str = "#cccccc";

const LOGO_WIDTH: f32 = 3.64 * CM;
const LOGO_HEIGHT: f32 = 1.5 * CM;

const MARGIN_TOP: f32 = 1.0 * CM;
const MARGIN_SIDE: f32 = 2.0 * CM;
const MARGIN_BOTTOM: f32 = 2.0 * CM;

const COLUMN_WIDTHS: [f32; 3] = [6.0 * CM, 4.0 * CM, 4.0 * CM];
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Draws the monthly report on a single A4 page and stores it under
/// `output_dir`.
pub struct PdfReportRenderer {
    output_dir: PathBuf,
    logo_path: Option<PathBuf>,
}

impl PdfReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, logo_path: Option<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            logo_path,
        }
    }

    fn load_logo(&self) -> Option<JpegImage> {
        let path = self.logo_path.as_ref()?;
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Logo not readable, skipping");
                return None;
            }
        };
        match JpegImage::parse(data) {
            Ok(image) => Some(image),
            Err(e) => {
                info!(path = %path.display(), error = %e, "Logo is not an embeddable JPEG, skipping");
                None
            }
        }
    }

    fn layout(&self, report: &MonthlyReport) -> Page {
        let green = Color::hex(SAGE_GREEN);
        let content_width = A4_WIDTH - 2.0 * MARGIN_SIDE;
        let center = A4_WIDTH / 2.0;
        let mut page = Page::new();
        let mut y = A4_HEIGHT - MARGIN_TOP;

        if let Some(logo) = self.load_logo() {
            let scale = (LOGO_WIDTH / logo.width as f32).min(LOGO_HEIGHT / logo.height as f32);
            let (w, h) = (logo.width as f32 * scale, logo.height as f32 * scale);
            page.image(logo, MARGIN_SIDE, y - h, w, h);
            y -= h + 0.5 * CM;
        }

        y -= 18.0;
        page.text_centered(center, y, Font::Bold, 18.0, green, &report.title);
        y -= 26.0;
        page.text_centered(
            center,
            y,
            Font::Regular,
            12.0,
            Color::hex(SUBTITLE_GREY),
            &report.period_label,
        );
        y -= 32.0;
        page.text(MARGIN_SIDE, y, Font::Regular, 10.0, Color::BLACK, &report.issued_label());
        y -= 0.6 * CM + 12.0;

        let applied = "Applied tariff: ";
        page.text(MARGIN_SIDE, y, Font::Bold, 10.0, Color::BLACK, applied);
        page.text(
            MARGIN_SIDE + Font::Bold.measure(applied, 10.0),
            y,
            Font::Regular,
            10.0,
            Color::BLACK,
            &format!("CREG tariff {}", report.quarter),
        );
        for line in wrap(TARIFF_NOTE, Font::Regular, 10.0, content_width) {
            y -= 12.0;
            page.text(MARGIN_SIDE, y, Font::Regular, 10.0, Color::BLACK, &line);
        }
        y -= 0.8 * CM;

        y = heading(&mut page, y, "Applied CREG tariff");
        page.text(MARGIN_SIDE, y, Font::Regular, 10.0, Color::BLACK, &report.rate_label());
        y -= 0.8 * CM;

        for (index, line) in report.lines.iter().enumerate() {
            if y < MARGIN_BOTTOM + 4.0 * CM {
                warn!(
                    omitted = report.lines.len() - index,
                    "Report page full, remaining vehicle tables omitted"
                );
                break;
            }
            y = heading(&mut page, y, &format!("Amount to reimburse - {}", line.vehicle));
            y = table(
                &mut page,
                y,
                [
                    line.description.clone(),
                    format!("{:.3}", line.energy_kwh),
                    format!("{:.2} €", line.cost),
                ],
            );
            y -= 0.8 * CM;
        }

        for text in wrap(&report.summary(), Font::Regular, 10.0, content_width) {
            page.text(MARGIN_SIDE, y, Font::Regular, 10.0, Color::BLACK, &text);
            y -= 12.0;
        }
        page
    }
}

fn heading(page: &mut Page, y: f32, text: &str) -> f32 {
    let y = y - 16.0 - 13.0;
    page.text(MARGIN_SIDE, y, Font::Bold, 13.0, Color::hex(SAGE_GREEN), text);
    y - 12.0 - 10.0
}

/// Header row plus one data row, centred on the page. Returns the y below it.
fn table(page: &mut Page, top: f32, values: [String; 3]) -> f32 {
    let headers = ["Description", "Consumption (kWh)", "Amount (EUR)"];
    let total: f32 = COLUMN_WIDTHS.iter().sum();
    let left = (A4_WIDTH - total) / 2.0;
    let header_h = 30.0;
    let row_h = 22.0;
    let grid = Color::hex(GRID_GREY);

    let header_y = top - header_h;
    let row_y = header_y - row_h;
    page.fill_rect(left, header_y, total, header_h, Color::hex(DARK_GREY));
    page.fill_rect(left, row_y, total, row_h, Color::hex(LIGHT_GREY));

    let mut x = left;
    for (i, width) in COLUMN_WIDTHS.iter().enumerate() {
        let mid = x + width / 2.0;
        page.text_centered(mid, header_y + 11.0, Font::Bold, 10.0, Color::WHITE, headers[i]);
        page.text_centered(mid, row_y + 8.0, Font::Regular, 9.0, Color::BLACK, &values[i]);
        page.stroke_rect(x, header_y, *width, header_h, 0.5, grid);
        page.stroke_rect(x, row_y, *width, row_h, 0.5, grid);
        x += width;
    }
    row_y
}

/// Create `<stem>.pdf` in `dir`, or `<stem>_1.pdf`, `<stem>_2.pdf`, ... when
/// the name is taken.
async fn create_unique(dir: &Path, stem: &str) -> Result<(PathBuf, tokio::fs::File), RenderError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let name = if attempt == 0 {
            format!("{}.pdf", stem)
        } else {
            format!("{}_{}.pdf", stem, attempt)
        };
        let path = dir.join(name);
        match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(RenderError::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        format!("no free file name for {}", stem),
    )))
}

#[async_trait]
impl ReportRenderer for PdfReportRenderer {
    fn render(&self, report: &MonthlyReport) -> Result<Vec<u8>, RenderError> {
        Ok(self.layout(report).finish())
    }

    async fn render_to_file(&self, report: &MonthlyReport) -> Result<PathBuf, RenderError> {
        let bytes = self.render(report)?;
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let stem = format!(
            "expense_report_{}_{}_{}",
            report.period.start,
            report.period.end,
            Local::now().format("%Y%m%d_%H%M%S")
        );
        let (path, mut file) = create_unique(&self.output_dir, &stem).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(RenderError::Missing(path));
        }
        info!(path = %path.display(), bytes = bytes.len(), "📄 Report written");
        Ok(path)
    }
}
