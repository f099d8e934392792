use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::types::ClauseSpan;
use regex::Regex;

use super::engine::compile_patterns;

/// Splits document text into clause spans at heading lines.
///
/// A heading only counts at the start of a trimmed line, so a clause cited
/// mid-sentence ("conforme a Cláusula Quinta") never opens a new span.
#[derive(Debug, Clone)]
pub struct ClauseSegmenter {
    heading_patterns: Vec<Regex>,
}

impl ClauseSegmenter {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            heading_patterns: compile_patterns(
                "heading_patterns",
                &config.segmentation.heading_patterns,
            )?,
        })
    }

    pub fn is_heading(&self, line: &str) -> bool {
        let trimmed = line.trim();
        self.heading_patterns.iter().any(|p| p.is_match(trimmed))
    }

    pub fn segment(&self, text: &str) -> Vec<ClauseSpan> {
        // (heading line start, content start, heading text)
        let mut headings: Vec<(usize, usize, &str)> = Vec::new();
        let mut offset = 0;

        for line in text.split_inclusive('\n') {
            let line_start = offset;
            offset += line.len();
            if self.is_heading(line) {
                headings.push((line_start, offset, line.trim()));
            }
        }

        let spans: Vec<ClauseSpan> = headings
            .iter()
            .enumerate()
            .map(|(i, &(_, content_start, heading))| ClauseSpan {
                heading_text: heading.to_string(),
                start_offset: content_start,
                end_offset: headings
                    .get(i + 1)
                    .map(|&(next_start, _, _)| next_start)
                    .unwrap_or(text.len()),
            })
            .collect();

        tracing::debug!(spans = spans.len(), "segmented clauses");
        spans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> ClauseSegmenter {
        ClauseSegmenter::new(&ExtractionConfig::default()).unwrap()
    }

    #[test]
    fn spans_run_until_the_next_heading() {
        let text = "Preâmbulo\nCLÁUSULA PRIMEIRA - REAJUSTE\nLinha um.\nLinha dois.\n  Cláusula segunda - PISO\nValor.";
        let spans = segmenter().segment(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].heading_text, "CLÁUSULA PRIMEIRA - REAJUSTE");
        assert_eq!(spans[0].content(text), "Linha um.\nLinha dois.\n");
        assert_eq!(spans[1].heading_text, "Cláusula segunda - PISO");
        assert_eq!(spans[1].content(text), "Valor.");
    }

    #[test]
    fn ocr_spellings_are_headings() {
        let s = segmenter();
        assert!(s.is_heading("CLAUSULA TERCEIRA"));
        assert!(s.is_heading("CÚUSULA QUARTA"));
        assert!(s.is_heading("clausula 5ª"));
    }

    #[test]
    fn mid_sentence_mentions_are_ignored() {
        let s = segmenter();
        assert!(!s.is_heading("conforme a CLÁUSULA QUINTA desta convenção"));
        assert!(!s.is_heading("CLÁUSULAS"));
        assert!(!s.is_heading("CLÁUSULA"));
    }

    #[test]
    fn no_headings_no_spans() {
        assert!(segmenter().segment("texto sem cláusulas\noutra linha").is_empty());
        assert!(segmenter().segment("").is_empty());
    }

    #[test]
    fn back_to_back_headings_give_empty_span() {
        let text = "CLÁUSULA PRIMEIRA\nCLÁUSULA SEGUNDA\ncorpo";
        let spans = segmenter().segment(text);
        assert_eq!(spans.len(), 2);
        assert!(spans[0].is_empty());
        assert_eq!(spans[1].content(text), "corpo");
    }

    #[test]
    fn crlf_input_is_segmented() {
        let text = "CLÁUSULA PRIMEIRA\r\ncorpo\r\n";
        let spans = segmenter().segment(text);
        assert_eq!(spans[0].heading_text, "CLÁUSULA PRIMEIRA");
        assert_eq!(spans[0].content(text), "corpo\r\n");
    }
}
