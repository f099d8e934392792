use crate::error::SummarizerError;

/// System message sent alongside every summarization prompt.
pub const SYSTEM_PROMPT: &str =
    "Você é especialista em direito trabalhista. Gere resumos concisos de cláusulas de CCTs.";

/// External collaborator producing a one-sentence summary of a clause.
///
/// Implementations may fail for any reason; the record builder always falls
/// back to the extractive summary.
pub trait Summarizer: Send + Sync {
    fn name(&self) -> &str;

    /// `body` is already truncated to the configured prompt size.
    fn summarize(&self, title: &str, body: &str) -> Result<String, SummarizerError>;
}

/// Null summarizer used when no external service is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSummarizer;

impl Summarizer for NoopSummarizer {
    fn name(&self) -> &str {
        "none"
    }

    fn summarize(&self, _title: &str, _body: &str) -> Result<String, SummarizerError> {
        Err(SummarizerError::NotConfigured)
    }
}

pub fn build_prompt(title: &str, body: &str) -> String {
    format!(
        "Analise a seguinte cláusula de CCT e gere um resumo conciso em uma frase (máximo 200 caracteres).\n\n\
         Título: {title}\n\
         Conteúdo: {body}\n\n\
         Resumo:"
    )
}

/// Trim, strip surrounding quotes and make sure the summary ends with a period.
///
/// Returns `None` when nothing is left, which callers treat as a failure.
pub fn finalize_summary(raw: &str) -> Option<String> {
    const QUOTES: &[char] = &['"', '\'', '“', '”', '«', '»', '`'];

    let stripped = raw.trim().trim_matches(QUOTES).trim();
    if stripped.is_empty() {
        return None;
    }

    let mut summary = stripped.to_string();
    if !summary.ends_with('.') {
        summary.push('.');
    }
    Some(summary)
}
