use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::rules::{ClauseSegmenter, EntityIdentifier, RecordBuilder, TextNormalizer};
use crate::sources::{PlainTextSource, TextSource};
use crate::summarizer::{NoopSummarizer, Summarizer};
use crate::types::*;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Captured intermediate outputs from each pipeline stage.
/// Written as JSON by `--dump-stages` to inspect each boundary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStages {
    pub source: String,
    pub captured_at: DateTime<Utc>,
    pub metadata: AgreementMetadata,
    pub spans: Vec<CapturedSpan>,
    pub records: Vec<ClauseRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapturedSpan {
    #[serde(flatten)]
    pub span: ClauseSpan,
    pub content: String,
}

/// Result of running one document through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentExtraction {
    pub metadata: AgreementMetadata,
    pub records: Vec<ClauseRecord>,
    pub spans_found: usize,
    /// Spans whose body was empty after cleaning
    pub spans_dropped: usize,
}

/// Per-input outcome of a batch run.
#[derive(Debug)]
pub enum DocumentOutcome {
    Extracted {
        path: PathBuf,
        extraction: DocumentExtraction,
    },
    Failed {
        path: PathBuf,
        error: ExtractError,
    },
}

impl DocumentOutcome {
    pub fn path(&self) -> &Path {
        match self {
            DocumentOutcome::Extracted { path, .. } | DocumentOutcome::Failed { path, .. } => path,
        }
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<DocumentOutcome>,
}

impl BatchReport {
    /// Records of every successful document, in input order.
    pub fn records(&self) -> impl Iterator<Item = &ClauseRecord> {
        self.outcomes.iter().flat_map(|outcome| match outcome {
            DocumentOutcome::Extracted { extraction, .. } => extraction.records.as_slice(),
            DocumentOutcome::Failed { .. } => &[][..],
        })
    }

    pub fn into_records(self) -> Vec<ClauseRecord> {
        self.outcomes
            .into_iter()
            .flat_map(|outcome| match outcome {
                DocumentOutcome::Extracted { extraction, .. } => extraction.records,
                DocumentOutcome::Failed { .. } => Vec::new(),
            })
            .collect()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, DocumentOutcome::Extracted { .. }))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.succeeded() == 0
    }
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        println!("⏱️  {}: {:.2}ms", step_name, elapsed.as_secs_f64() * 1000.0);

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn print_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        println!("\n📊 Performance Summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            println!(
                "   {:.<35} {:.2}ms ({:.1}%)",
                step,
                duration.as_secs_f64() * 1000.0,
                percentage
            );
        }
        println!("   {:.<35} {:.2}ms", "Total", total.as_secs_f64() * 1000.0);
    }
}

/// Wires text source, extraction rules and summarizer together.
///
/// All rule sets are compiled in the constructor; processing a document never
/// fails on configuration.
pub struct DocumentProcessor {
    source: Box<dyn TextSource>,
    summarizer: Box<dyn Summarizer>,
    entities: EntityIdentifier,
    segmenter: ClauseSegmenter,
    records: RecordBuilder,
    profiling: bool,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new(
        config: &ExtractionConfig,
        source: Box<dyn TextSource>,
        summarizer: Box<dyn Summarizer>,
    ) -> Result<Self, ExtractError> {
        let normalizer = TextNormalizer::new(config)?;
        Ok(Self {
            source,
            summarizer,
            entities: EntityIdentifier::new(config, normalizer.clone())?,
            segmenter: ClauseSegmenter::new(config)?,
            records: RecordBuilder::new(config, normalizer)?,
            profiling: false,
        })
    }

    /// Plain-text source, extractive summaries only
    pub fn with_defaults(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::new(config, Box::new(PlainTextSource::new()), Box::new(NoopSummarizer))
    }

    pub fn with_profiling(mut self, enabled: bool) -> Self {
        self.profiling = enabled;
        self
    }

    pub fn summarizer_name(&self) -> &str {
        self.summarizer.name()
    }

    /// Identify entities, segment, build one record per non-empty clause.
    pub fn process_document(&self, document: &Document) -> DocumentExtraction {
        let mut profiler = StepProfiler::new(self.profiling);

        let metadata = profiler.time_step("1. Entity Identification", || {
            self.entities.identify(document)
        });
        let spans = profiler.time_step("2. Clause Segmentation", || {
            self.segmenter.segment(&document.text)
        });
        let records: Vec<ClauseRecord> = profiler.time_step("3. Record Building", || {
            spans
                .iter()
                .filter_map(|span| {
                    self.records.build(
                        span,
                        &document.text,
                        &metadata,
                        Some(self.summarizer.as_ref()),
                    )
                })
                .collect()
        });
        profiler.print_summary();

        if spans.is_empty() {
            tracing::warn!(source = %document.source, "no clause headings found");
        }
        tracing::info!(
            source = %document.source,
            union = %metadata.union_name,
            period = %metadata.period,
            clauses = records.len(),
            "document processed"
        );

        DocumentExtraction {
            spans_found: spans.len(),
            spans_dropped: spans.len() - records.len(),
            metadata,
            records,
        }
    }

    /// Load through the text source, then process.
    pub fn process_file(&self, path: &Path) -> Result<DocumentExtraction, ExtractError> {
        let document = self.source.load_document(path)?;
        Ok(self.process_document(&document))
    }

    /// Sequential; a failing input is recorded and the rest still run.
    pub fn process_batch<P: AsRef<Path>>(&self, paths: &[P]) -> BatchReport {
        let outcomes = paths
            .iter()
            .map(|path| {
                let path = path.as_ref().to_path_buf();
                match self.process_file(&path) {
                    Ok(extraction) => DocumentOutcome::Extracted { path, extraction },
                    Err(error) => {
                        tracing::error!(path = %path.display(), error = %error, "document failed");
                        DocumentOutcome::Failed { path, error }
                    }
                }
            })
            .collect();
        BatchReport { outcomes }
    }

    /// Same flow as `process_document`, keeping every intermediate output.
    pub fn capture_stages(&self, document: &Document) -> PipelineStages {
        let metadata = self.entities.identify(document);
        let spans = self.segmenter.segment(&document.text);
        let records = spans
            .iter()
            .filter_map(|span| {
                self.records
                    .build(span, &document.text, &metadata, Some(self.summarizer.as_ref()))
            })
            .collect();

        PipelineStages {
            source: document.source.clone(),
            captured_at: Utc::now(),
            spans: spans
                .into_iter()
                .map(|span| CapturedSpan {
                    content: span.content(&document.text).to_string(),
                    span,
                })
                .collect(),
            metadata,
            records,
        }
    }

    pub fn load_document(&self, path: &Path) -> Result<Document, ExtractError> {
        self.source.load_document(path)
    }
}
