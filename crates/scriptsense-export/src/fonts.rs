//! Script font selection for PDF export.

use std::path::{Path, PathBuf};

use scriptsense_core::Language;

use crate::ExportError;
use crate::ttf::TrueTypeFont;

/// PDF base font used for English and unrecognized language codes.
pub const BUILTIN_FONT: &str = "Times-Roman";

/// Font to render one export with.
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// One of the standard 14 PDF fonts; nothing is embedded.
    Builtin(&'static str),
    /// A TrueType font embedded in the document.
    Embedded { name: String, font: TrueTypeFont },
}

/// Locates the Noto Sans font file for each script.
#[derive(Debug, Clone, Default)]
pub struct FontLibrary {
    dir: Option<PathBuf>,
}

impl FontLibrary {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// File name of the script font for `lang`, or `None` for the builtin font.
    pub fn font_file(lang: &str) -> Option<&'static str> {
        match Language::from_code(lang)? {
            Language::English => None,
            Language::Tamil => Some("NotoSansTamil-Regular.ttf"),
            Language::Hindi => Some("NotoSansDevanagari-Regular.ttf"),
            Language::Malayalam => Some("NotoSansMalayalam-Regular.ttf"),
            Language::Telugu => Some("NotoSansTelugu-Regular.ttf"),
            Language::Kannada => Some("NotoSansKannada-Regular.ttf"),
        }
    }

    /// Load the font for `lang`. A recognized script whose file is missing is
    /// [`ExportError::FontNotFound`]; there is no fallback to the builtin font.
    pub fn resolve(&self, lang: &str) -> Result<PdfFont, ExportError> {
        let Some(file) = Self::font_file(lang) else {
            return Ok(PdfFont::Builtin(BUILTIN_FONT));
        };

        let path = match &self.dir {
            Some(dir) => dir.join(file),
            None => PathBuf::from(file),
        };
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ExportError::FontNotFound {
                    lang: lang.to_string(),
                    path,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let font = TrueTypeFont::parse(data).map_err(|source| ExportError::InvalidFont {
            path: path.clone(),
            source,
        })?;
        log::debug!("loaded {} for {}", path.display(), lang);

        let name = file.trim_end_matches(".ttf").to_string();
        Ok(PdfFont::Embedded { name, font })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ttf::testfont;

    #[test]
    fn english_and_unknown_codes_use_builtin() {
        let fonts = FontLibrary::default();
        assert!(matches!(fonts.resolve("en").unwrap(), PdfFont::Builtin("Times-Roman")));
        assert!(matches!(fonts.resolve("fr").unwrap(), PdfFont::Builtin(_)));
        assert!(matches!(fonts.resolve("").unwrap(), PdfFont::Builtin(_)));
    }

    #[test]
    fn script_files_by_language() {
        assert_eq!(FontLibrary::font_file("ta"), Some("NotoSansTamil-Regular.ttf"));
        assert_eq!(FontLibrary::font_file("hi-IN"), Some("NotoSansDevanagari-Regular.ttf"));
        assert_eq!(FontLibrary::font_file("kn"), Some("NotoSansKannada-Regular.ttf"));
        assert_eq!(FontLibrary::font_file("en"), None);
    }

    #[test]
    fn missing_script_font_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let fonts = FontLibrary::new(Some(dir.path().to_path_buf()));
        let err = fonts.resolve("ml").unwrap_err();
        assert!(matches!(err, ExportError::FontNotFound { ref lang, .. } if lang == "ml"));
    }

    #[test]
    fn loads_script_font_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("NotoSansTelugu-Regular.ttf"),
            testfont::build(&[('A', 1)], &[500, 600]),
        )
        .unwrap();
        let fonts = FontLibrary::new(Some(dir.path().to_path_buf()));
        match fonts.resolve("te").unwrap() {
            PdfFont::Embedded { name, font } => {
                assert_eq!(name, "NotoSansTelugu-Regular");
                assert_eq!(font.glyph_id('A'), 1);
            }
            other => panic!("expected embedded font, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_font_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NotoSansTamil-Regular.ttf"), b"junk").unwrap();
        let fonts = FontLibrary::new(Some(dir.path().to_path_buf()));
        assert!(matches!(
            fonts.resolve("ta").unwrap_err(),
            ExportError::InvalidFont { .. }
        ));
    }
}
