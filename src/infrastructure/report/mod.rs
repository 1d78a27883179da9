//! PDF report rendering

pub mod pdf;
pub mod renderer;

pub use renderer::PdfReportRenderer;
