use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::types::{parse_year, AgreementMetadata, Document, Period};
use regex::Regex;
use std::collections::HashSet;

use super::engine::{collapse_whitespace, compile_pattern, compile_patterns, take_chars, RuleSet};
use super::normalizer::TextNormalizer;

/// Finds the employee-side union and the validity period in the header of an
/// agreement. Every field degrades to its sentinel independently.
#[derive(Debug, Clone)]
pub struct EntityIdentifier {
    normalizer: TextNormalizer,
    header_window_chars: usize,
    employee_union_patterns: Vec<Regex>,
    generic_union_pattern: Regex,
    union_corrections: RuleSet,
    period_pattern: Regex,
    header_year_pattern: Regex,
    filename_range_pattern: Regex,
    filename_year_pattern: Regex,
}

impl EntityIdentifier {
    pub fn new(config: &ExtractionConfig, normalizer: TextNormalizer) -> Result<Self, ExtractError> {
        let entities = &config.entities;
        Ok(Self {
            normalizer,
            header_window_chars: entities.header_window_chars,
            employee_union_patterns: compile_patterns(
                "employee_union_patterns",
                &entities.employee_union_patterns,
            )?,
            generic_union_pattern: compile_pattern(
                "generic_union_pattern",
                &entities.generic_union_pattern,
            )?,
            union_corrections: RuleSet::compile("union_corrections", &entities.union_corrections)?,
            period_pattern: compile_pattern("period_pattern", &entities.period_pattern)?,
            header_year_pattern: compile_pattern(
                "header_year_pattern",
                &entities.header_year_pattern,
            )?,
            filename_range_pattern: compile_pattern(
                "filename_range_pattern",
                &entities.filename_range_pattern,
            )?,
            filename_year_pattern: compile_pattern(
                "filename_year_pattern",
                &entities.filename_year_pattern,
            )?,
        })
    }

    pub fn identify(&self, document: &Document) -> AgreementMetadata {
        self.identify_text(&document.text, document.file_name())
    }

    pub fn identify_text(&self, text: &str, filename_hint: &str) -> AgreementMetadata {
        let header = self.normalizer.normalize(take_chars(text, self.header_window_chars));
        let mut metadata = AgreementMetadata::unidentified();

        match self.identify_union(&header) {
            Some(union_name) => metadata.union_name = union_name,
            None => tracing::warn!(filename = filename_hint, "employee union not identified"),
        }
        match self.identify_period(&header, filename_hint) {
            Some(period) => metadata.period = period.to_string(),
            None => tracing::warn!(filename = filename_hint, "agreement period not identified"),
        }

        metadata
    }

    /// Ordered fallback chain over an already-normalized header.
    pub fn identify_union(&self, header: &str) -> Option<String> {
        for pattern in &self.employee_union_patterns {
            let candidate = pattern
                .captures(header)
                .and_then(|caps| caps.get(1))
                .map(|m| self.normalize_union_name(m.as_str()))
                .filter(|name| !name.is_empty());
            if candidate.is_some() {
                return candidate;
            }
        }

        // Positional heuristic: the first distinct SINDICATO mention is
        // conventionally the employer side, the second the employee side.
        let mut seen = HashSet::new();
        let distinct: Vec<String> = self
            .generic_union_pattern
            .captures_iter(header)
            .filter_map(|caps| caps.get(1))
            .map(|m| self.normalize_union_name(m.as_str()))
            .filter(|name| !name.is_empty() && seen.insert(name.clone()))
            .collect();

        if distinct.len() > 2 {
            tracing::debug!(count = distinct.len(), "header names more than two unions");
        }
        distinct.into_iter().nth(1)
    }

    /// Normalize, upper-case, apply union corrections, collapse whitespace.
    pub fn normalize_union_name(&self, raw: &str) -> String {
        let normalized = self.normalizer.normalize(raw).to_uppercase();
        let corrected = self.union_corrections.apply(&normalized);
        collapse_whitespace(&corrected)
            .trim_end_matches(|c: char| matches!(c, ',' | '.' | ';' | ':' | '-' | '–' | '—') || c.is_whitespace())
            .to_string()
    }

    pub fn identify_period(&self, header: &str, filename_hint: &str) -> Option<Period> {
        if let Some(period) = self
            .period_pattern
            .captures(header)
            .and_then(|caps| Period::from_tokens(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
        {
            return Some(period);
        }

        let mut years: Vec<u16> = Vec::with_capacity(2);
        for caps in self.header_year_pattern.captures_iter(header) {
            if let Some(year) = caps.get(1).and_then(|m| parse_year(m.as_str())) {
                if !years.contains(&year) {
                    years.push(year);
                }
            }
            if years.len() == 2 {
                return Some(Period::new(years[0], years[1]));
            }
        }

        self.period_from_filename(filename_hint)
    }

    fn period_from_filename(&self, filename: &str) -> Option<Period> {
        if let Some(period) = self
            .filename_range_pattern
            .captures(filename)
            .and_then(|caps| Period::from_tokens(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
        {
            return Some(period);
        }
        self.filename_year_pattern
            .captures(filename)
            .and_then(|caps| parse_year(caps.get(1)?.as_str()))
            .map(Period::starting)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PERIOD_NOT_IDENTIFIED, UNION_NOT_IDENTIFIED};

    fn identifier() -> EntityIdentifier {
        let config = ExtractionConfig::default();
        let normalizer = TextNormalizer::new(&config).unwrap();
        EntityIdentifier::new(&config, normalizer).unwrap()
    }

    #[test]
    fn other_side_phrase_wins() {
        let header = "CONVENÇÃO COLETIVA DE TRABALHO 2025/2026\n\
            Firmada entre o SINDICATO DO COMÉRCIO VAREJISTA DE FARMÁCIAS, CNPJ 00.000.000/0001-00, \
            e do outro lado, o Sindicato dos Empregados em Farmácias, sito à Rua X.";
        let metadata = identifier().identify_text(header, "qualquer.pdf");
        assert_eq!(metadata.union_name, "SINDICATO DOS EMPREGADOS EM FARMÁCIAS");
        assert_eq!(metadata.period, "2025-2026");
    }

    #[test]
    fn represented_by_phrase_is_second_choice() {
        let header = "Os trabalhadores representados pelo SINDICATO DOS TRABALHADORES EM SAUDE, \
            com sede nesta capital.";
        assert_eq!(
            identifier().identify_union(header).as_deref(),
            Some("SINDICATO DOS TRABALHADORES EM SAÚDE")
        );
    }

    #[test]
    fn second_distinct_generic_mention_is_taken() {
        let header = "SINDICATO DOS HOSPITAIS DA BAHTA - SINDHOSBA\n\
            SINDICATO DOS HOSPITAIS DA BAHTA\n\
            SINDICATO DOS ENFERMEIROS DA BAHTA, CNPJ 1";
        assert_eq!(
            identifier().identify_union(header).as_deref(),
            Some("SINDICATO DOS ENFERMEIROS DA BAHIA")
        );
    }

    #[test]
    fn second_of_three_distinct_mentions_is_taken() {
        let header = "SINDICATO DOS HOSPITAIS DO ESTADO DA BAHIA, CNPJ 1\n\
            SINDICATO DOS ENFERMEIROS DO ESTADO DA BAHIA, CNPJ 2\n\
            SINDICATO DOS MÉDICOS DO ESTADO DA BAHIA, CNPJ 3\n\
            SINDICATO DOS ENFERMEIROS DO ESTADO DA BAHIA";
        assert_eq!(
            identifier().identify_union(header).as_deref(),
            Some("SINDICATO DOS ENFERMEIROS DO ESTADO DA BAHIA")
        );
    }

    #[test]
    fn single_generic_mention_is_not_enough() {
        let metadata = identifier().identify_text("SINDICATO DOS BANCÁRIOS, sede", "x.pdf");
        assert_eq!(metadata.union_name, UNION_NOT_IDENTIFIED);
    }

    #[test]
    fn header_years_are_sorted() {
        let period = identifier().identify_period("vigência até 2026, iniciada em 2025", "x.pdf");
        assert_eq!(period.unwrap().to_string(), "2025-2026");
    }

    #[test]
    fn ocr_dash_between_years_is_accepted() {
        let period = identifier().identify_period("CONVENÇÃO COLETIVA DE TRABALHO 2024t2025", "x.pdf");
        assert_eq!(period.unwrap().to_string(), "2024-2025");
    }

    #[test]
    fn filename_is_the_last_resort() {
        let id = identifier();
        assert_eq!(id.identify_period("", "cct_2023-2024.pdf").unwrap().to_string(), "2023-2024");
        assert_eq!(id.identify_period("", "cct_2023.pdf").unwrap().to_string(), "2023-2024");
        assert!(id.identify_period("", "cct.pdf").is_none());
    }

    #[test]
    fn nothing_found_yields_sentinels() {
        let metadata = identifier().identify(&Document::new("sem_data.pdf", ""));
        assert_eq!(metadata, AgreementMetadata::unidentified());
        assert_eq!(metadata.period, PERIOD_NOT_IDENTIFIED);
    }

    #[test]
    fn header_window_limits_the_search() {
        let mut config = ExtractionConfig::default();
        config.entities.header_window_chars = 10;
        let normalizer = TextNormalizer::new(&config).unwrap();
        let id = EntityIdentifier::new(&config, normalizer).unwrap();
        let text = format!("{}vigência 2025 a 2026", "x".repeat(50));
        assert!(!id.identify_text(&text, "x.pdf").has_period());
    }
}
