use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading a document or building the pipeline.
///
/// Missing entities, empty clauses and summarizer failures are not errors:
/// they degrade inside the component that meets them.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read source document {path}: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source document {0} is not valid UTF-8 text")]
    InvalidEncoding(PathBuf),

    #[error("unsupported source file type: {0}")]
    UnsupportedSource(PathBuf),

    #[error("invalid pattern `{pattern}` in {rule_set}: {source}")]
    InvalidPattern {
        rule_set: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unexpected table header: {0:?}")]
    UnexpectedHeader(Vec<String>),
}

#[derive(Debug, Error)]
pub enum SummarizerError {
    #[error("no summarizer configured")]
    NotConfigured,

    #[error("summarizer request failed: {0}")]
    Request(String),

    #[error("summarizer returned an empty response")]
    EmptyResponse,

    #[error("malformed summarizer response: {0}")]
    Malformed(String),
}
