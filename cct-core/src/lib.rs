// CCT Extractor Core Library
//
// Turns the extracted text of Brazilian collective bargaining agreements into
// one row per clause: union, period, title, summary and full text.

pub mod config;
pub mod error;
pub mod processor;
pub mod rules;
pub mod sources;
pub mod summarizer;
pub mod table;
pub mod types;

// Re-export main types and functions for easy use
pub use config::{CorrectionRule, ExtractionConfig, ExtractionProfile};
pub use error::{ExtractError, SummarizerError, TableError};
pub use processor::{BatchReport, DocumentExtraction, DocumentOutcome, DocumentProcessor, PipelineStages};
pub use sources::{PlainTextSource, TextSource};
pub use summarizer::{NoopSummarizer, Summarizer};
pub use table::{ClauseTable, MergeSummary};
pub use types::*;
