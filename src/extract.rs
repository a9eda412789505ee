//! Fact extraction from knowledge sentences.
//!
//! The extractor is a pure function over text: it turns each knowledge line
//! into one [`Fact`] or one recorded [`ParseFailure`], never aborting the
//! run. The sentence grammar is an explicit regex contract and mention
//! boundaries are validated through a pluggable [`EntityClassifier`], so the
//! extractor is testable without any NLP dependency.
//!
//! # Grammar
//!
//! ```text
//! <Disease> has symptoms <S1>, <S2>[, ...][ and <Sn>].
//! ```
//!
//! Accepted template phrases (case-insensitive): `has symptoms`,
//! `has symptom`, `symptoms include`.
//!
//! Normalization rules, documented and tested:
//! - blank and whitespace-only lines are skipped, not errors
//! - one trailing period is stripped from the symptom list
//! - symptom lists split on commas; the token `and` additionally splits the
//!   final comma fragment once, at its last occurrence, so `A, B and C`
//!   yields three symptoms
//! - every mention is whitespace-collapsed; dedup keys are lowercased
//! - symptom aliases (e.g. `tired` -> `fatigue`) apply after case
//!   normalization

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::entity::{display_name, normalize_name, Entity, EntityKind};
use crate::fact::Fact;

fn template_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Disease span, template phrase, symptom list span.
        Regex::new(r"(?i)^\s*(.+?)\s+(?:has\s+symptoms?|symptoms\s+include)\s+(.+?)\s*$")
            .unwrap_or_else(|e| unreachable!("template regex is statically valid: {e}"))
    })
}

/// Verdict of an [`EntityClassifier`] for one candidate mention span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionKind {
    /// The span names a disease.
    Disease,
    /// The span names a symptom.
    Symptom,
    /// The span is a well-formed mention of undetermined kind; the sentence
    /// grammar's role decides.
    Ambiguous,
    /// The span is not a usable mention at all.
    Invalid,
}

/// Entity-classification capability used to validate mention boundaries.
///
/// The sentence template determines each span's grammatical role; the
/// classifier confirms the span itself. A boundary-only tagger returns
/// [`MentionKind::Ambiguous`] for anything well-formed, while a
/// lexicon-backed classifier may return definite kinds, which must then
/// agree with the grammar role.
pub trait EntityClassifier: Send + Sync {
    /// Classifies a candidate mention span.
    fn classify(&self, span: &str) -> MentionKind;
}

/// Default boundary-only classifier.
///
/// Accepts any span that is non-empty, contains at least one alphabetic
/// character, carries no sentence punctuation and does not exceed the
/// length cap. Everything accepted is [`MentionKind::Ambiguous`].
#[derive(Debug, Clone)]
pub struct ShapeClassifier {
    max_len: usize,
}

impl ShapeClassifier {
    /// Creates the classifier with the default mention length cap.
    #[must_use]
    pub fn new() -> Self {
        Self { max_len: 128 }
    }
}

impl Default for ShapeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityClassifier for ShapeClassifier {
    fn classify(&self, span: &str) -> MentionKind {
        let span = span.trim();
        if span.is_empty() || span.len() > self.max_len {
            return MentionKind::Invalid;
        }
        if !span.chars().any(char::is_alphabetic) {
            return MentionKind::Invalid;
        }
        if span.chars().any(|c| matches!(c, '.' | ';' | ':' | '?' | '!')) {
            return MentionKind::Invalid;
        }
        MentionKind::Ambiguous
    }
}

/// Lexicon-backed classifier over curated vocabularies.
///
/// Known names classify definitely; unknown well-formed spans are
/// [`MentionKind::Ambiguous`] unless `strict` is set, in which case they
/// are rejected.
#[derive(Debug, Clone)]
pub struct LexiconClassifier {
    diseases: HashSet<String>,
    symptoms: HashSet<String>,
    strict: bool,
    shape: ShapeClassifier,
}

impl LexiconClassifier {
    /// Builds a classifier from disease and symptom vocabularies.
    #[must_use]
    pub fn new<I, J, S>(diseases: I, symptoms: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            diseases: diseases
                .into_iter()
                .map(|s| normalize_name(s.as_ref()))
                .collect(),
            symptoms: symptoms
                .into_iter()
                .map(|s| normalize_name(s.as_ref()))
                .collect(),
            strict: false,
            shape: ShapeClassifier::new(),
        }
    }

    /// Rejects spans outside the vocabularies instead of deferring to the
    /// grammar role.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

impl EntityClassifier for LexiconClassifier {
    fn classify(&self, span: &str) -> MentionKind {
        if self.shape.classify(span) == MentionKind::Invalid {
            return MentionKind::Invalid;
        }
        let key = normalize_name(span);
        let is_disease = self.diseases.contains(&key);
        let is_symptom = self.symptoms.contains(&key);
        match (is_disease, is_symptom) {
            (true, true) => MentionKind::Ambiguous,
            (true, false) => MentionKind::Disease,
            (false, true) => MentionKind::Symptom,
            (false, false) => {
                if self.strict {
                    MentionKind::Invalid
                } else {
                    MentionKind::Ambiguous
                }
            }
        }
    }
}

/// Why a line failed to parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseReason {
    /// The line does not match the sentence template.
    TemplateMismatch,
    /// A span was rejected by the classifier.
    InvalidMention {
        /// The rejected span.
        span: String,
    },
    /// The classifier's definite kind disagrees with the grammar role.
    KindDisagreement {
        /// The disputed span.
        span: String,
        /// Kind required by the span's position in the template.
        expected: EntityKind,
    },
    /// The symptom list was empty after splitting.
    EmptySymptomList,
}

impl fmt::Display for ParseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TemplateMismatch => write!(f, "line does not match the sentence template"),
            Self::InvalidMention { span } => write!(f, "invalid mention '{span}'"),
            Self::KindDisagreement { span, expected } => {
                write!(f, "'{span}' is not a {expected} mention")
            }
            Self::EmptySymptomList => write!(f, "empty symptom list"),
        }
    }
}

/// One malformed line, recovered and recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseFailure {
    /// 1-based line number in the source corpus.
    pub line_no: usize,
    /// The offending line, as read.
    pub line: String,
    /// Why it was rejected.
    pub reason: ParseReason,
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line_no, self.reason)
    }
}

/// Batch summary of one extraction run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Extracted facts, in input order.
    pub facts: Vec<Fact>,
    /// Recovered parse failures, in input order.
    pub failures: Vec<ParseFailure>,
    /// Total lines seen, including blank lines.
    pub lines_seen: usize,
}

impl ExtractionReport {
    /// Returns true if every non-blank line parsed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// One-line load summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} facts from {} lines ({} failures)",
            self.facts.len(),
            self.lines_seen,
            self.failures.len()
        )
    }
}

/// Extractor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Symptom alias table, keyed by normalized variant, mapping to the
    /// canonical symptom name.
    pub symptom_aliases: BTreeMap<String, String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let mut symptom_aliases = BTreeMap::new();
        for (variant, canonical) in [
            ("difficulty breathing", "shortness of breath"),
            ("cant breathe", "shortness of breath"),
            ("tired", "fatigue"),
            ("exhausted", "fatigue"),
        ] {
            symptom_aliases.insert(variant.to_string(), canonical.to_string());
        }
        Self { symptom_aliases }
    }
}

impl ExtractorConfig {
    /// A configuration with no aliasing at all.
    #[must_use]
    pub fn without_aliases() -> Self {
        Self {
            symptom_aliases: BTreeMap::new(),
        }
    }
}

/// Turns knowledge sentences into validated facts.
pub struct FactExtractor {
    config: ExtractorConfig,
    classifier: Box<dyn EntityClassifier>,
}

impl fmt::Debug for FactExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactExtractor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for FactExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FactExtractor {
    /// Creates an extractor with the default config and shape classifier.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ExtractorConfig::default(),
            classifier: Box::new(ShapeClassifier::new()),
        }
    }

    /// Replaces the extractor configuration.
    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the entity classifier.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Box<dyn EntityClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Extracts facts from a sequence of lines.
    ///
    /// Blank lines are skipped. Malformed lines are recorded as failures
    /// and the run continues; the report aggregates both outcomes in input
    /// order.
    pub fn extract_lines<I, S>(&self, lines: I) -> ExtractionReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut facts = Vec::new();
        let mut failures = Vec::new();
        let mut lines_seen = 0usize;

        for (idx, line) in lines.into_iter().enumerate() {
            lines_seen += 1;
            let line = line.as_ref();
            if line.trim().is_empty() {
                continue;
            }
            match self.extract_line(line) {
                Ok(fact) => facts.push(fact),
                Err(reason) => {
                    let failure = ParseFailure {
                        line_no: idx + 1,
                        line: line.to_string(),
                        reason,
                    };
                    warn!(line_no = failure.line_no, reason = %failure.reason, "skipping malformed knowledge line");
                    failures.push(failure);
                }
            }
        }

        let report = ExtractionReport {
            facts,
            failures,
            lines_seen,
        };
        info!(summary = %report.summary(), "extraction complete");
        report
    }

    /// Extracts one fact from one non-blank line.
    ///
    /// # Errors
    /// Returns the [`ParseReason`] describing why the line was rejected.
    pub fn extract_line(&self, line: &str) -> Result<Fact, ParseReason> {
        let caps = template_regex()
            .captures(line)
            .ok_or(ParseReason::TemplateMismatch)?;

        let disease_span = caps
            .get(1)
            .map(|m| m.as_str())
            .ok_or(ParseReason::TemplateMismatch)?;
        let list_span = caps
            .get(2)
            .map(|m| m.as_str())
            .ok_or(ParseReason::TemplateMismatch)?;

        let disease = self.mention(disease_span, EntityKind::Disease)?;

        let mut symptoms = Vec::new();
        for span in split_symptom_list(list_span) {
            symptoms.push(self.mention(&span, EntityKind::Symptom)?);
        }
        if symptoms.is_empty() {
            return Err(ParseReason::EmptySymptomList);
        }

        Fact::new(disease, symptoms).map_err(|_| ParseReason::EmptySymptomList)
    }

    /// Extracts facts from a UTF-8 newline-delimited knowledge file.
    ///
    /// # Errors
    /// Returns the underlying I/O error if the file cannot be read.
    pub fn extract_file(&self, path: impl AsRef<Path>) -> io::Result<ExtractionReport> {
        let lines = read_knowledge_file(path)?;
        Ok(self.extract_lines(lines))
    }

    fn mention(&self, span: &str, role: EntityKind) -> Result<Entity, ParseReason> {
        let span = span.trim().trim_end_matches('.').trim();
        let span = if role == EntityKind::Symptom {
            self.apply_alias(span)
        } else {
            span.to_string()
        };

        match self.classifier.classify(&span) {
            MentionKind::Invalid => {
                return Err(ParseReason::InvalidMention {
                    span: span.to_string(),
                })
            }
            MentionKind::Ambiguous => {}
            MentionKind::Disease if role == EntityKind::Disease => {}
            MentionKind::Symptom if role == EntityKind::Symptom => {}
            MentionKind::Disease | MentionKind::Symptom => {
                return Err(ParseReason::KindDisagreement {
                    span: span.to_string(),
                    expected: role,
                })
            }
        }

        Entity::new(&span, role).map_err(|_| ParseReason::InvalidMention {
            span: span.to_string(),
        })
    }

    fn apply_alias(&self, span: &str) -> String {
        let key = normalize_name(span);
        match self.config.symptom_aliases.get(&key) {
            Some(canonical) => canonical.clone(),
            None => display_name(span),
        }
    }
}

/// Splits the symptom-list span into individual mention spans.
///
/// Commas are the primary separator. The final comma fragment is split once
/// at the last ` and `, and a leading `and ` (Oxford comma) is stripped.
fn split_symptom_list(list: &str) -> Vec<String> {
    let list = list.trim().trim_end_matches('.').trim();

    let mut parts: Vec<String> = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    let Some(last) = parts.pop() else {
        return parts;
    };

    let lower = last.to_ascii_lowercase();
    let tail = lower.strip_prefix("and ").map_or(last.as_str(), |_| last[4..].trim());
    let tail_lower = tail.to_ascii_lowercase();

    if let Some(pos) = tail_lower.rfind(" and ") {
        let head = tail[..pos].trim();
        let rest = tail[pos + 5..].trim();
        if !head.is_empty() {
            parts.push(head.to_string());
        }
        if !rest.is_empty() {
            parts.push(rest.to_string());
        }
    } else if !tail.trim().is_empty() {
        parts.push(tail.trim().to_string());
    }

    parts
}

/// Reads a newline-delimited UTF-8 knowledge corpus.
///
/// # Errors
/// Returns the underlying I/O error if the file cannot be read.
pub fn read_knowledge_file(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text.lines().map(String::from).collect())
}
