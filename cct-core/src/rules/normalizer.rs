use crate::config::{CorrectionRule, ExtractionConfig};
use crate::error::ExtractError;
use regex::Regex;
use std::sync::LazyLock;

use super::engine::RuleSet;

static LINE_ENDINGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r\n?").unwrap());
static HORIZONTAL_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());
static BLANK_LINE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

// Correction tables are small and every rule only removes confusions, so a
// handful of passes always reaches a fixed point on real documents.
const MAX_PASSES: usize = 8;

/// Repairs extraction artifacts: control characters, OCR letter/digit
/// confusions in dates, known misspellings and spacing.
///
/// `normalize` is idempotent: it repeats the full pass until the text stops
/// changing.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    corrections: RuleSet,
}

impl TextNormalizer {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Self::from_rules(&config.ocr_corrections)
    }

    pub fn from_rules(rules: &[CorrectionRule]) -> Result<Self, ExtractError> {
        Ok(Self {
            corrections: RuleSet::compile("ocr_corrections", rules)?,
        })
    }

    pub fn normalize(&self, text: &str) -> String {
        let mut current = self.single_pass(text);
        for _ in 1..MAX_PASSES {
            let next = self.single_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
        tracing::debug!("normalizer did not settle after {MAX_PASSES} passes");
        current
    }

    fn single_pass(&self, text: &str) -> String {
        let stripped = strip_control_chars(text);
        let unified = LINE_ENDINGS.replace_all(&stripped, "\n");
        let corrected = self.corrections.apply(&unified);
        let spaced = HORIZONTAL_RUNS.replace_all(&corrected, " ");
        BLANK_LINE_RUNS.replace_all(&spaced, "\n\n").into_owned()
    }
}

/// Drop C0 controls except tab, newline and carriage return; non-breaking
/// spaces become plain spaces.
fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\t' | '\n' | '\r' => Some(c),
            '\u{a0}' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionProfile;
    use proptest::prelude::*;

    fn native() -> TextNormalizer {
        TextNormalizer::new(&ExtractionConfig::default()).unwrap()
    }

    fn ocr() -> TextNormalizer {
        TextNormalizer::new(&ExtractionConfig::for_profile(ExtractionProfile::Ocr)).unwrap()
    }

    #[test]
    fn month_glued_to_year_gets_a_slash() {
        let n = native();
        assert_eq!(n.normalize("vigência a partir de abril2025"), "vigência a partir de abril/2025");
        assert_eq!(n.normalize("Maiol2024"), "Maio/2024");
        assert_eq!(n.normalize("em março/2025"), "em março/2025");
    }

    #[test]
    fn letter_o_in_years_becomes_zero() {
        let n = native();
        assert_eq!(n.normalize("ano de 2O25"), "ano de 2025");
        assert_eq!(n.normalize("em 15/O3/2025"), "em 15/03/2025");
        assert_eq!(n.normalize("até 3l/l2/2025"), "até 31/12/2025");
    }

    #[test]
    fn dates_made_only_of_confused_digits_are_repaired() {
        let n = native();
        assert_eq!(n.normalize("O1/O1/2O24"), "01/01/2024");
        assert_eq!(n.normalize("de 01/O1/2O24 a 31/l2/2O25"), "de 01/01/2024 a 31/12/2025");
        assert_eq!(n.normalize("ano 2O2O e 20O5"), "ano 2020 e 2005");
        assert_eq!(n.normalize("desde l9OO"), "desde 1900");
    }

    #[test]
    fn glued_month_with_confused_year_is_split_and_repaired() {
        let n = native();
        assert_eq!(n.normalize("em março2O25"), "em março/2025");
        assert_eq!(n.normalize("Maiol2O24"), "Maio/2024");
    }

    #[test]
    fn letters_outside_dates_are_untouched() {
        let n = native();
        assert_eq!(n.normalize("O salário será pago"), "O salário será pago");
        assert_eq!(n.normalize("2Ox"), "2Ox");
        assert_eq!(n.normalize("Olá, lI anos"), "Olá, lI anos");
    }

    #[test]
    fn known_misspellings_are_fixed() {
        let n = native();
        assert_eq!(n.normalize("na íorma da lei"), "na forma da lei");
        assert_eq!(n.normalize("o perÍodo de essês"), "o período de esses");
        assert_eq!(n.normalize("a trânsferência"), "a transferência");
    }

    #[test]
    fn space_before_punctuation_is_removed() {
        assert_eq!(native().normalize("texto , outro ; fim ."), "texto, outro; fim.");
    }

    #[test]
    fn whitespace_runs_collapse() {
        let n = native();
        assert_eq!(n.normalize("a   b\t\tc"), "a b c");
        assert_eq!(n.normalize("a\r\n\r\n\r\n\r\nb"), "a\n\nb");
        assert_eq!(n.normalize("a\u{0}b\u{7}c"), "abc");
    }

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(native().normalize(""), "");
    }

    #[test]
    fn ocr_profile_joins_hyphenated_words() {
        let n = ocr();
        assert_eq!(n.normalize("trabalha-\ndores"), "trabalhadores");
        assert_eq!(n.normalize("S|NDICATO"), "SINDICATO");
        // Native profile leaves both alone
        assert_eq!(native().normalize("trabalha-\ndores"), "trabalha-\ndores");
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(text in "[a-zA-Z0-9Ool|/ ,.;:\\n\\t\\ráçÍ-]{0,80}") {
            let n = native();
            let once = n.normalize(&text);
            prop_assert_eq!(n.normalize(&once), once);
        }

        #[test]
        fn ocr_normalize_is_idempotent(text in "(abril|maio|2O|l2|[a-z0-9Oo|/ ,.\\n-]){0,30}") {
            let n = ocr();
            let once = n.normalize(&text);
            prop_assert_eq!(n.normalize(&once), once);
        }
    }
}
