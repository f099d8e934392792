use crate::error::ExtractError;
use std::path::Path;

use super::source::TextSource;

const PAGE_BREAK: char = '\u{c}';
const BOM: char = '\u{feff}';

/// Reads UTF-8 text dumps. Form feeds separate pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextSource;

impl PlainTextSource {
    pub fn new() -> Self {
        Self
    }
}

impl TextSource for PlainTextSource {
    fn extract_pages(&self, path: &Path, bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|_| ExtractError::InvalidEncoding(path.to_path_buf()))?;
        let text = text.strip_prefix(BOM).unwrap_or(text);

        let mut pages: Vec<String> = text.split(PAGE_BREAK).map(str::to_string).collect();
        // pdftotext ends every page, including the last, with a form feed
        if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
            pages.pop();
        }
        Ok(pages)
    }

    fn name(&self) -> &str {
        "plain-text"
    }

    fn supports_file_type(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("txt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn pages_split_on_form_feed() {
        let source = PlainTextSource::new();
        let pages = source
            .extract_pages(Path::new("a.txt"), "\u{feff}página um\u{c}página dois\u{c}".as_bytes())
            .unwrap();
        assert_eq!(pages, vec!["página um", "página dois"]);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = PlainTextSource
            .extract_pages(Path::new("a.txt"), &[0x66, 0xff, 0x6f])
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidEncoding(_)));
    }

    #[test]
    fn load_joins_pages_with_newline() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        write!(file, "um\u{c}dois").unwrap();
        let document = PlainTextSource.load_document(file.path()).unwrap();
        assert_eq!(document.text, "um\ndois");
    }

    #[test]
    fn other_extensions_are_unsupported() {
        let err = PlainTextSource.load_document(Path::new("acordo.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedSource(_)));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = PlainTextSource.load_document(Path::new("/nonexistent/acordo.txt")).unwrap_err();
        assert!(matches!(err, ExtractError::SourceUnreadable { .. }));
    }
}
