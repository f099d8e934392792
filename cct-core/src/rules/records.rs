use crate::config::{ExtractionConfig, SummaryConfig};
use crate::error::{ExtractError, SummarizerError};
use crate::summarizer::{finalize_summary, Summarizer};
use crate::types::{AgreementMetadata, ClauseRecord, ClauseSpan};
use regex::Regex;
use std::sync::LazyLock;

use super::engine::{collapse_whitespace, compile_pattern, compile_patterns, take_chars, RuleSet};
use super::normalizer::TextNormalizer;

// Separator dash between clause number and subject. A bare hyphen inside a
// word ("VALE-TRANSPORTE") is not a separator.
static TITLE_DASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[–—]+\s*|\s+-+\s*|-+\s+").unwrap());

/// Turns a clause span into an output row: title, cleaned body, summary.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    normalizer: TextNormalizer,
    title_corrections: RuleSet,
    noise_line: Regex,
    min_line_chars: usize,
    footer_patterns: Vec<Regex>,
    summary: SummaryConfig,
}

impl RecordBuilder {
    pub fn new(config: &ExtractionConfig, normalizer: TextNormalizer) -> Result<Self, ExtractError> {
        let records = &config.records;
        Ok(Self {
            normalizer,
            title_corrections: RuleSet::compile("title_corrections", &records.title_corrections)?,
            noise_line: compile_pattern("noise_line_pattern", &records.noise_line_pattern)?,
            min_line_chars: records.min_line_chars,
            footer_patterns: compile_patterns("footer_patterns", &records.footer_patterns)?,
            summary: config.summary.clone(),
        })
    }

    /// `None` when the cleaned body is empty.
    pub fn build(
        &self,
        span: &ClauseSpan,
        text: &str,
        metadata: &AgreementMetadata,
        summarizer: Option<&dyn Summarizer>,
    ) -> Option<ClauseRecord> {
        let title = self.build_title(&span.heading_text);
        let body = self.clean_body(span.content(text));
        if body.is_empty() {
            tracing::debug!(title = %title, "dropping clause with empty body");
            return None;
        }

        let summary = self.summarize(&title, &body, summarizer);
        Some(ClauseRecord {
            union_name: metadata.union_name.clone(),
            period: metadata.period.clone(),
            title,
            summary,
            body,
        })
    }

    pub fn build_title(&self, heading: &str) -> String {
        let upper = collapse_whitespace(&self.normalizer.normalize(heading)).to_uppercase();
        let corrected = self.title_corrections.apply(&upper);
        TITLE_DASH.replace(&corrected, " - ").trim().to_string()
    }

    pub fn clean_body(&self, raw: &str) -> String {
        let kept: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| self.keep_line(line))
            .collect();
        if kept.is_empty() {
            return String::new();
        }

        // Normalize with line breaks intact so hyphenation repairs can see
        // them, then again once the body is a single line.
        let normalized = self.normalizer.normalize(&kept.join("\n"));
        self.normalizer
            .normalize(&collapse_whitespace(&normalized))
            .trim()
            .to_string()
    }

    fn keep_line(&self, line: &str) -> bool {
        line.chars().count() >= self.min_line_chars
            && !self.noise_line.is_match(line)
            && !self.footer_patterns.iter().any(|p| p.is_match(line))
    }

    /// External summary when available, extractive otherwise.
    pub fn summarize(&self, title: &str, body: &str, summarizer: Option<&dyn Summarizer>) -> String {
        if let Some(summarizer) = summarizer {
            let prompt_body = take_chars(body, self.summary.prompt_body_chars);
            match summarizer.summarize(title, prompt_body) {
                Ok(raw) => match finalize_summary(&raw) {
                    Some(summary) => return summary,
                    None => tracing::warn!(summarizer = summarizer.name(), title, "empty summary, using extractive fallback"),
                },
                Err(SummarizerError::NotConfigured) => {}
                Err(e) => {
                    tracing::warn!(summarizer = summarizer.name(), title, error = %e, "summarizer failed, using extractive fallback")
                }
            }
        }
        self.extractive_summary(body)
    }

    /// Text up to the first sentence terminator inside the window; otherwise
    /// the whole body when short, or a word-boundary cut plus ellipsis.
    pub fn extractive_summary(&self, body: &str) -> String {
        let body = body.trim();
        let window = self.summary.terminator_window_chars;

        let mut chars = body.char_indices().peekable();
        let mut position = 0;
        while let Some((index, c)) = chars.next() {
            if position >= window {
                break;
            }
            let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
            if matches!(c, '.' | '!' | '?') && at_boundary {
                return body[..index + c.len_utf8()].to_string();
            }
            position += 1;
        }

        let limit = self.summary.fallback_chars;
        if body.chars().count() <= limit {
            return body.to_string();
        }

        let prefix = take_chars(body, limit);
        let cut_mid_word = body[prefix.len()..]
            .chars()
            .next()
            .is_some_and(|next| !next.is_whitespace());
        let prefix = match prefix.rfind(char::is_whitespace) {
            Some(space) if cut_mid_word => &prefix[..space],
            _ => prefix,
        };
        format!("{}{}", prefix.trim_end(), self.summary.ellipsis)
    }
}
