use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Sentinel written when the employee-side union cannot be found.
pub const UNION_NOT_IDENTIFIED: &str = "SINDICATO NÃO IDENTIFICADO";

/// Sentinel written when the agreement period cannot be found.
pub const PERIOD_NOT_IDENTIFIED: &str = "ANO NÃO IDENTIFICADO";

// ===== SOURCE DOCUMENT =====

/// Raw extracted text of one agreement plus the identifier it came from.
///
/// Pages are joined with a single newline. Nothing mutates a document once
/// it has been extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Filename or path of the source, used as a fallback hint for the period
    pub source: String,
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }

    /// Build a document from per-page text in reading order.
    pub fn from_pages<S: AsRef<str>>(source: impl Into<String>, pages: &[S]) -> Self {
        let text = pages
            .iter()
            .map(|page| page.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(source, text)
    }

    /// Final path component of the source, e.g. `acordo_2025_2026.pdf`.
    pub fn file_name(&self) -> &str {
        Path::new(&self.source)
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or(&self.source)
    }
}

// ===== AGREEMENT METADATA =====

/// Union name and validity period shared by every clause of one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementMetadata {
    pub union_name: String,
    pub period: String,
}

impl AgreementMetadata {
    pub fn unidentified() -> Self {
        Self {
            union_name: UNION_NOT_IDENTIFIED.to_string(),
            period: PERIOD_NOT_IDENTIFIED.to_string(),
        }
    }

    pub fn has_union(&self) -> bool {
        self.union_name != UNION_NOT_IDENTIFIED
    }

    pub fn has_period(&self) -> bool {
        self.period != PERIOD_NOT_IDENTIFIED
    }
}

/// Two-year validity span, always stored in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    first: u16,
    last: u16,
}

impl Period {
    pub fn new(a: u16, b: u16) -> Self {
        Self {
            first: a.min(b),
            last: a.max(b),
        }
    }

    /// A lone year `YYYY` is read as the span `YYYY-(YYYY+1)`.
    pub fn starting(year: u16) -> Self {
        Self::new(year, year.saturating_add(1))
    }

    /// Parse two year tokens; `None` unless both are exactly four digits.
    pub fn from_tokens(a: &str, b: &str) -> Option<Self> {
        Some(Self::new(parse_year(a)?, parse_year(b)?))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:04}", self.first, self.last)
    }
}

pub(crate) fn parse_year(token: &str) -> Option<u16> {
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) {
        token.parse().ok()
    } else {
        None
    }
}

// ===== CLAUSE SPANS =====

/// Region of the document text owned by one clause heading.
///
/// Offsets are byte offsets into `Document::text`. The heading line itself is
/// not part of `start_offset..end_offset`; content begins on the next line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseSpan {
    pub heading_text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

impl ClauseSpan {
    pub fn content<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start_offset..self.end_offset).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.start_offset >= self.end_offset
    }

    pub fn len(&self) -> usize {
        self.end_offset.saturating_sub(self.start_offset)
    }
}

// ===== CLAUSE RECORDS =====

/// One output row. Serialized names are the table's column headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClauseRecord {
    #[serde(rename = "Sindicato")]
    pub union_name: String,
    #[serde(rename = "Convenção")]
    pub period: String,
    #[serde(rename = "Título da Cláusula")]
    pub title: String,
    #[serde(rename = "Resumo")]
    pub summary: String,
    #[serde(rename = "Cláusula Completa")]
    pub body: String,
}

impl ClauseRecord {
    /// De-duplication key used when merging tables.
    pub fn key(&self) -> (&str, &str, &str) {
        (&self.union_name, &self.period, &self.title)
    }

    pub fn fields(&self) -> [&str; 5] {
        [
            &self.union_name,
            &self.period,
            &self.title,
            &self.summary,
            &self.body,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn period_is_always_ascending() {
        assert_eq!(Period::new(2026, 2025).to_string(), "2025-2026");
        assert_eq!(Period::from_tokens("2026", "2025").unwrap().to_string(), "2025-2026");
    }

    #[test]
    fn single_year_spans_into_the_next() {
        assert_eq!(Period::starting(2024).to_string(), "2024-2025");
    }

    #[test]
    fn year_tokens_must_be_four_digits() {
        assert!(Period::from_tokens("202", "2025").is_none());
        assert!(Period::from_tokens("2O25", "2026").is_none());
    }

    #[test]
    fn document_joins_pages_with_newlines() {
        let doc = Document::from_pages("dir/acordo_2025_2026.pdf", &["um", "dois"]);
        assert_eq!(doc.text, "um\ndois");
        assert_eq!(doc.file_name(), "acordo_2025_2026.pdf");
    }

    #[test]
    fn span_content_excludes_out_of_range_offsets() {
        let span = ClauseSpan {
            heading_text: "CLÁUSULA PRIMEIRA".into(),
            start_offset: 4,
            end_offset: 99,
        };
        assert_eq!(span.content("abc"), "");
    }
}
