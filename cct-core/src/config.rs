use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in presets. `Native` targets text taken from a PDF text layer,
/// `Ocr` adds the heavier character-confusion tables needed for scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionProfile {
    #[default]
    Native,
    Ocr,
}

impl fmt::Display for ExtractionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractionProfile::Native => write!(f, "native"),
            ExtractionProfile::Ocr => write!(f, "ocr"),
        }
    }
}

/// One `(pattern, replacement)` pair of a correction table.
///
/// Replacements use `${n}` group references. With `within` set, the pattern
/// only rewrites text inside matches of that context pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub case_insensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub within: Option<String>,
}

impl CorrectionRule {
    pub fn new(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            case_insensitive: false,
            within: None,
        }
    }

    pub fn within(context: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            within: Some(context.to_string()),
            ..Self::new(pattern, replacement)
        }
    }

    pub fn ignore_case(pattern: &str, replacement: &str) -> Self {
        Self {
            case_insensitive: true,
            ..Self::new(pattern, replacement)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub profile: ExtractionProfile,
    /// Applied in order by the text normalizer to every body and entity
    #[serde(default = "default_ocr_corrections")]
    pub ocr_corrections: Vec<CorrectionRule>,
    #[serde(default)]
    pub entities: EntityConfig,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub records: RecordConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    /// Only this many leading characters are searched for header entities
    pub header_window_chars: usize,
    /// Ordered patterns for the employee-side union; capture group 1 is the name
    pub employee_union_patterns: Vec<String>,
    /// Generic union mention; the second distinct match is taken as the
    /// employee side when the explicit patterns fail
    pub generic_union_pattern: String,
    /// Applied to the upper-cased union name
    pub union_corrections: Vec<CorrectionRule>,
    /// Explicit `YYYY<sep>YYYY` span near the agreement title (groups 1 and 2)
    pub period_pattern: String,
    /// Loose year tokens in the header (group 1)
    pub header_year_pattern: String,
    /// `YYYY[-_]YYYY` in the source filename (groups 1 and 2)
    pub filename_range_pattern: String,
    /// Single `YYYY` in the source filename (group 1)
    pub filename_year_pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentationConfig {
    /// Matched against each trimmed line; any match starts a new clause
    pub heading_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Applied to the upper-cased heading
    pub title_corrections: Vec<CorrectionRule>,
    /// Lines made only of digits and separators
    pub noise_line_pattern: String,
    /// Lines shorter than this (in characters, after trimming) are dropped
    pub min_line_chars: usize,
    /// Signature blocks, city+date lines, page footers
    pub footer_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// A sentence terminator must start within this many characters
    pub terminator_window_chars: usize,
    /// Cut length when no terminator is found
    pub fallback_chars: usize,
    pub ellipsis: String,
    /// Body characters sent to an external summarizer
    pub prompt_body_chars: usize,
}

const MONTHS: [&str; 12] = [
    "janeiro",
    "fevereiro",
    "março",
    "abril",
    "maio",
    "junho",
    "julho",
    "agosto",
    "setembro",
    "outubro",
    "novembro",
    "dezembro",
];

// Every digit slot accepts the letters OCR confuses with 0 and 1
const DATE_TOKEN: &str = r"\b[0-9OolI]{1,2}/[0-9OolI]{1,2}/[0-9OolI]{4}\b";
const YEAR_TOKEN: &str = r"\b(?:2[0Oo]|[1lI]9)[0-9OolI]{2}\b";

fn default_ocr_corrections() -> Vec<CorrectionRule> {
    let mut rules = vec![
        // Ligatures left by PDF text layers
        CorrectionRule::new("ﬁ", "fi"),
        CorrectionRule::new("ﬂ", "fl"),
    ];

    // "abril2025" / "abrill2025" / "março2O25" -> "abril/2025"
    rules.extend(MONTHS.iter().map(|month| {
        CorrectionRule::ignore_case(&format!(r"\b({month})l?([12lI][0-9OolI]{{3}})\b"), "${1}/${2}")
    }));

    rules.extend([
        // Letter/digit confusions, only inside dd/mm/yyyy and year tokens
        CorrectionRule::within(DATE_TOKEN, "[Oo]", "0"),
        CorrectionRule::within(DATE_TOKEN, "[lI]", "1"),
        CorrectionRule::within(YEAR_TOKEN, "[Oo]", "0"),
        CorrectionRule::within(YEAR_TOKEN, "[lI]", "1"),
        // Known misspelled domain words
        CorrectionRule::new(r"\bíorma\b", "forma"),
        CorrectionRule::new(r"\bperÍodo\b", "período"),
        CorrectionRule::new(r"\btrânsferência\b", "transferência"),
        CorrectionRule::new(r"\bessês\b", "esses"),
        // Stray space before punctuation
        CorrectionRule::new(r"[ \t]+([,.;:!?])", "${1}"),
    ]);

    rules
}

fn ocr_profile_corrections() -> Vec<CorrectionRule> {
    let mut rules = vec![
        // Words hyphenated across a line break
        CorrectionRule::new(r"(\p{L})-\n(\p{Ll})", "${1}${2}"),
        // Pipe read for a capital I between capitals: "S|NDICATO"
        CorrectionRule::new(r"(\p{Lu})\|(\p{Lu})", "${1}I${2}"),
        // Detached ordinal indicators: "1 º" -> "1º"
        CorrectionRule::new(r"(\d)[ \t]+([ºª°])", "${1}${2}"),
    ];
    rules.extend(default_ocr_corrections());
    rules
}

fn default_union_corrections() -> Vec<CorrectionRule> {
    vec![
        CorrectionRule::new(r"S[LI1|]N[DO][LI1|T][CG][AÀÁ][TÍ][OQ0]", "SINDICATO"),
        CorrectionRule::new(r"TRABAI-HADORES|TRABALHA-DORES|TRABAL-HADORES", "TRABALHADORES"),
        CorrectionRule::new(r"\b[MN][ÉE][DO][TÍI1][CG][OQ0]S\b", "MÉDICOS"),
        CorrectionRule::new(r"ENT[|L]DADES", "ENTIDADES"),
        CorrectionRule::new(r"ESÍABELECIMENTOS|ESTABELEC[L1]MENTOS", "ESTABELECIMENTOS"),
        CorrectionRule::new(r"\bSERVICOS\b", "SERVIÇOS"),
        CorrectionRule::new(r"BENEFLCENTES", "BENEFICENTES"),
        CorrectionRule::new(r"\bSAUDE\b", "SAÚDE"),
        CorrectionRule::new(r"\bBAHTA\b", "BAHIA"),
        CorrectionRule::new(r"S\|ND[IL1]MED", "SINDIMED"),
        CorrectionRule::new(r"S\|NDISA[UÚ]DE|\bSINDISAUDE\b", "SINDISAÚDE"),
    ]
}

fn default_title_corrections() -> Vec<CorrectionRule> {
    vec![
        CorrectionRule::new(
            r"^(?:CLAUSULA|CLÀUSULA|CLÂUSULA|CLÃUSULA|CLÚUSULA|CLUUSULA|CÚUSULA|CUUSULA|CÁUSULA)\s+",
            "CLÁUSULA ",
        ),
        CorrectionRule::new(r"\bOUARTA\b", "QUARTA"),
        CorrectionRule::new(r"\bOUINTA\b", "QUINTA"),
        CorrectionRule::new(r"\bSETIMA\b", "SÉTIMA"),
        CorrectionRule::new(r"\bD[ÉE]C[IL1]MA\b", "DÉCIMA"),
        CorrectionRule::new(r"\bVIGESIMA\b", "VIGÉSIMA"),
        CorrectionRule::new(r"\bTRIGESIMA\b", "TRIGÉSIMA"),
        CorrectionRule::new(r"\bQUADRAGESIMA\b", "QUADRAGÉSIMA"),
        CorrectionRule::new(r"\bQUINQUAGESIMA\b", "QUINQUAGÉSIMA"),
        CorrectionRule::new(r"\bSEXAGESIMA\b", "SEXAGÉSIMA"),
        CorrectionRule::new(r"\bUNICA\b", "ÚNICA"),
        CorrectionRule::new(r"\s*\.\s*-", " -"),
    ]
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            header_window_chars: 8000,
            employee_union_patterns: vec![
                r"(?is)do\s+outro\s+lado\s*,?\s*(?:(?:o|a|pelo|pela)\s+)?(.{3,300}?)\s*,\s*(?:sito|situad[oa]|CNPJ|inscrit[oa]|neste)".to_string(),
                r"(?is)representad[oa]s?\s+(?:neste\s+ato\s+)?pel[oa]\s+((?:SINDICATO|S[lI1|]NDICATO|FEDERA[ÇC][ÃA]O)\b.{0,300}?)\s*,\s*(?:sito|situad[oa]|CNPJ|inscrit[oa]|neste|com|na|para)".to_string(),
            ],
            generic_union_pattern:
                r"(?i)\b(SINDICATO[ \t]+D[OA]S?[ \t]+[\p{L} \t]+?)[ \t]*(?:[^\p{L}\s]|\n|\bCNPJ\b|\bsito\b|\bneste\b|$)"
                    .to_string(),
            union_corrections: default_union_corrections(),
            period_pattern: r"(?is)CONVEN[ÇC][ÃA]O\s+COLETIVA.{0,300}?\b((?:19|20)\d{2})\s*[-/–—_tl]\s*((?:19|20)\d{2})\b".to_string(),
            header_year_pattern: r"\b(20\d{2})\b".to_string(),
            filename_range_pattern: r"((?:19|20)\d{2})[-_]?((?:19|20)\d{2})".to_string(),
            filename_year_pattern: r"((?:19|20)\d{2})".to_string(),
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            heading_patterns: vec![
                r"(?i)^CL[ÁAÀÂÃÚU]USULA\s".to_string(),
                r"(?i)^C[ÚUÁ]USULA\s".to_string(),
            ],
        }
    }
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            title_corrections: default_title_corrections(),
            noise_line_pattern: r"^[\d\s\-–—_.,/|]+$".to_string(),
            min_line_chars: 3,
            footer_patterns: vec![
                // Line opening with a signer title
                r"(?i)^(?:vice-)?(?:presidente|diretor[a]?|tesoureir[oa]|secret[áa]ri[oa]|procurador[a]?)\b.{0,60}$".to_string(),
                // "Fulano de Tal - Presidente"
                r"(?i)[-–—,]\s*(?:vice-)?(?:presidente|diretor[a]?|tesoureir[oa]|secret[áa]ri[oa]|procurador[a]?)\s*$".to_string(),
                // "Salvador, 10 de março de 2025"
                r"(?i)^[\p{L} .'-]{2,40},\s*\d{1,2}\s+de\s+\p{L}+\s+de\s+\d{4}\.?$".to_string(),
                r"(?i)^p[áa]gina\s+\d+(?:\s*(?:de|/)\s*\d+)?$".to_string(),
                r"(?i)^(?:cpf|cnpj|rg)\s*[:nº.]*\s*[\d./-]+$".to_string(),
            ],
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            terminator_window_chars: 300,
            fallback_chars: 150,
            ellipsis: "...".to_string(),
            prompt_body_chars: 1500,
        }
    }
}

impl ExtractionConfig {
    /// Preset for the given profile.
    pub fn for_profile(profile: ExtractionProfile) -> Self {
        match profile {
            ExtractionProfile::Native => Self::default(),
            ExtractionProfile::Ocr => Self {
                profile,
                ocr_corrections: ocr_profile_corrections(),
                ..Self::default()
            },
        }
    }

    /// Load config from a YAML file. Omitted sections take the native defaults.
    pub fn load_from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ExtractionConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config with fallback to the preset for `profile`
    pub fn load_with_fallback(path: Option<&str>, profile: ExtractionProfile) -> Self {
        match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                tracing::warn!(path = p, error = %e, "failed to load config, using {profile} defaults");
                Self::for_profile(profile)
            }),
            None => Self::for_profile(profile),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            profile: ExtractionProfile::Native,
            ocr_corrections: default_ocr_corrections(),
            entities: EntityConfig::default(),
            segmentation: SegmentationConfig::default(),
            records: RecordConfig::default(),
            summary: SummaryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ocr_profile_extends_native_table() {
        let native = ExtractionConfig::for_profile(ExtractionProfile::Native);
        let ocr = ExtractionConfig::for_profile(ExtractionProfile::Ocr);
        assert_eq!(ocr.profile, ExtractionProfile::Ocr);
        assert!(ocr.ocr_corrections.len() > native.ocr_corrections.len());
        assert!(ocr.ocr_corrections.ends_with(&native.ocr_corrections));
    }

    #[test]
    fn yaml_round_trip_keeps_tables() {
        let config = ExtractionConfig::for_profile(ExtractionProfile::Ocr);
        let yaml = config.to_yaml().unwrap();
        let parsed: ExtractionConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.ocr_corrections, config.ocr_corrections);
        assert_eq!(parsed.segmentation.heading_patterns, config.segmentation.heading_patterns);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let yaml = "summary:\n  terminator_window_chars: 200\n  fallback_chars: 100\n  ellipsis: \"…\"\n  prompt_body_chars: 800\n";
        let parsed: ExtractionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.summary.fallback_chars, 100);
        assert_eq!(parsed.entities.header_window_chars, 8000);
        assert!(!parsed.ocr_corrections.is_empty());
    }

    #[test]
    fn missing_file_falls_back_to_profile() {
        let config = ExtractionConfig::load_with_fallback(
            Some("/nonexistent/cct-config.yaml"),
            ExtractionProfile::Ocr,
        );
        assert_eq!(config.profile, ExtractionProfile::Ocr);
    }
}
