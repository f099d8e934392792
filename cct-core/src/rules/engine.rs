use crate::config::CorrectionRule;
use crate::error::ExtractError;
use regex::{Captures, Regex, RegexBuilder};
use std::borrow::Cow;

/// An ordered, compiled correction table.
///
/// Rules run one after another; each sees the output of the previous one.
#[derive(Debug, Clone)]
pub struct RuleSet {
    name: &'static str,
    rules: Vec<CompiledRule>,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    pattern: Regex,
    replacement: String,
    within: Option<Regex>,
}

impl CompiledRule {
    fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        match &self.within {
            Some(context) => context.replace_all(text, |caps: &Captures| {
                self.pattern
                    .replace_all(&caps[0], self.replacement.as_str())
                    .into_owned()
            }),
            None => self.pattern.replace_all(text, self.replacement.as_str()),
        }
    }
}

impl RuleSet {
    /// Compile every rule up front so a bad pattern is reported before any
    /// document is touched.
    pub fn compile(name: &'static str, rules: &[CorrectionRule]) -> Result<Self, ExtractError> {
        let build = |pattern: &str, case_insensitive: bool| {
            RegexBuilder::new(pattern)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|source| ExtractError::InvalidPattern {
                    rule_set: name,
                    pattern: pattern.to_string(),
                    source,
                })
        };

        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            compiled.push(CompiledRule {
                pattern: build(&rule.pattern, rule.case_insensitive)?,
                replacement: rule.replacement.clone(),
                within: rule
                    .within
                    .as_deref()
                    .map(|context| build(context, rule.case_insensitive))
                    .transpose()?,
            });
        }
        Ok(Self {
            name,
            rules: compiled,
        })
    }

    /// One pass over the table.
    pub fn apply(&self, text: &str) -> String {
        let mut current = Cow::Borrowed(text);
        for rule in &self.rules {
            if let Cow::Owned(replaced) = rule.apply(&current) {
                current = Cow::Owned(replaced);
            }
        }
        current.into_owned()
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub fn compile_pattern(rule_set: &'static str, pattern: &str) -> Result<Regex, ExtractError> {
    Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
        rule_set,
        pattern: pattern.to_string(),
        source,
    })
}

pub fn compile_patterns(
    rule_set: &'static str,
    patterns: &[String],
) -> Result<Vec<Regex>, ExtractError> {
    patterns
        .iter()
        .map(|pattern| compile_pattern(rule_set, pattern))
        .collect()
}

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The first `max_chars` characters of `text`, never splitting a code point.
pub fn take_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
