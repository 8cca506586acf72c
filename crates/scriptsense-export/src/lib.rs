use std::path::{Path, PathBuf};

use scriptsense_core::api::TextArea;
use thiserror::Error;

pub mod doc;
pub mod fonts;
pub mod pdf;
pub mod ttf;

pub use doc::export_doc;
pub use fonts::{FontLibrary, PdfFont};
pub use pdf::export_pdf;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no font for '{lang}' at {}", path.display())]
    FontNotFound { lang: String, path: PathBuf },
    #[error("unusable font {}: {source}", path.display())]
    InvalidFont {
        path: PathBuf,
        #[source]
        source: ttf::TtfError,
    },
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-side export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    /// HTML saved with a `.doc` extension.
    Doc,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Doc => "doc",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(ExportFormat::Pdf),
            "doc" => Some(ExportFormat::Doc),
            _ => None,
        }
    }
}

/// `translated_text_ta.pdf`, `extracted_text.doc`, ...
pub fn default_filename(area: TextArea, lang: &str, format: ExportFormat) -> String {
    match format {
        ExportFormat::Pdf => format!("{area}_text_{lang}.pdf"),
        ExportFormat::Doc => format!("{area}_text.doc"),
    }
}

/// Render `text` in `format`.
pub fn render(
    text: &str,
    lang: &str,
    format: ExportFormat,
    fonts: &FontLibrary,
) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Pdf => export_pdf(text, lang, fonts),
        ExportFormat::Doc => Ok(export_doc(text).into_bytes()),
    }
}

/// Render and write to `path`.
pub fn export_to_file(
    path: &Path,
    text: &str,
    lang: &str,
    format: ExportFormat,
    fonts: &FontLibrary,
) -> Result<(), ExportError> {
    let bytes = render(text, lang, format, fonts)?;
    std::fs::write(path, &bytes)?;
    log::info!("exported {} bytes to {}", bytes.len(), path.display());
    Ok(())
}
