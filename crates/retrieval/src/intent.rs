//! Intent classification
//!
//! Two independent signals drive the query path. The classifier asks the
//! generation capability to pick one label from a closed set and parses the
//! first known label out of the reply, falling back to `Other` on any
//! failure. `should_use_graph` is a cheap lexical pre-filter that runs on
//! every query and decides whether graph retrieval is attempted at all; a
//! query can trigger graph search even under intent `Other`.

use regex_lite::Regex;
use scholargraph_common::generation::{GenerationOptions, Generator};
use std::sync::{Arc, OnceLock};

/// Closed label set for query classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentLabel {
    PapersByAuthor,
    TopicsByAuthor,
    Collaborations,
    PapersByTopic,
    ListAuthors,
    ListTopics,
    ConceptQuestion,
    Other,
}

impl IntentLabel {
    pub const ALL: [IntentLabel; 8] = [
        IntentLabel::PapersByAuthor,
        IntentLabel::TopicsByAuthor,
        IntentLabel::Collaborations,
        IntentLabel::PapersByTopic,
        IntentLabel::ListAuthors,
        IntentLabel::ListTopics,
        IntentLabel::ConceptQuestion,
        IntentLabel::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentLabel::PapersByAuthor => "PAPERS_BY_AUTHOR",
            IntentLabel::TopicsByAuthor => "TOPICS_BY_AUTHOR",
            IntentLabel::Collaborations => "COLLABORATIONS",
            IntentLabel::PapersByTopic => "PAPERS_BY_TOPIC",
            IntentLabel::ListAuthors => "LIST_AUTHORS",
            IntentLabel::ListTopics => "LIST_TOPICS",
            IntentLabel::ConceptQuestion => "CONCEPT_QUESTION",
            IntentLabel::Other => "OTHER",
        }
    }

    /// First known label appearing in free text, at a word boundary.
    /// Ties on position go to the longer label.
    pub fn parse_first(text: &str) -> Option<IntentLabel> {
        let upper = text.to_uppercase();
        let mut best: Option<(usize, IntentLabel)> = None;

        for label in Self::ALL {
            let name = label.as_str();
            let mut from = 0;
            while let Some(rel) = upper[from..].find(name) {
                let start = from + rel;
                let end = start + name.len();
                if boundary_before(&upper, start) && boundary_after(&upper, end) {
                    let better = match best {
                        None => true,
                        Some((pos, prev)) => {
                            start < pos || (start == pos && name.len() > prev.as_str().len())
                        }
                    };
                    if better {
                        best = Some((start, label));
                    }
                    break;
                }
                from = end;
            }
        }

        best.map(|(_, label)| label)
    }
}

fn is_label_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

fn boundary_before(text: &str, index: usize) -> bool {
    index == 0 || !is_label_char(text.as_bytes()[index - 1])
}

fn boundary_after(text: &str, index: usize) -> bool {
    index >= text.len() || !is_label_char(text.as_bytes()[index])
}

/// Lexical pre-filter deciding whether graph retrieval is worth attempting.
/// Must stay cheap (no generation call): it runs on every query.
pub fn should_use_graph(query: &str) -> bool {
    let lower = query.to_lowercase();

    // "about ..." alone stays on the vector path; the topic re-rank in the
    // retriever applies only when another trigger routes the query here.
    const TRIGGERS: [&str; 12] = [
        "author",
        "wrote",
        "written",
        "collaborat",
        "co-author",
        "coauthor",
        "papers by",
        "works by",
        "same author",
        "multiple papers",
        "keyword",
        "topic",
    ];
    if TRIGGERS.iter().any(|t| lower.contains(t)) {
        return true;
    }

    // Two quoted names read as "collaboration between two specific people".
    quoted_mentions(query).len() >= 2
}

/// Quoted substrings in a query, treated as explicit entity mentions.
/// Compiled once: this runs on every query through the pre-filter.
pub fn quoted_mentions(query: &str) -> Vec<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap());
    pattern
        .captures_iter(query)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Generative classifier over the closed label set.
pub struct IntentClassifier {
    generator: Arc<dyn Generator>,
    options: GenerationOptions,
}

impl IntentClassifier {
    pub fn new(generator: Arc<dyn Generator>, options: GenerationOptions) -> Self {
        // Label replies are short; cap tokens below the answer settings.
        let options = GenerationOptions {
            max_tokens: 16,
            temperature: 0.0,
            ..options
        };
        Self { generator, options }
    }

    /// Classify a query. Never fails: generation errors and unparseable
    /// replies both map to `Other`.
    pub async fn classify(&self, query: &str) -> IntentLabel {
        let prompt = format!(
            "Classify the question into exactly one of these labels:\n\
             PAPERS_BY_AUTHOR, TOPICS_BY_AUTHOR, COLLABORATIONS, PAPERS_BY_TOPIC, \
             LIST_AUTHORS, LIST_TOPICS, CONCEPT_QUESTION, OTHER\n\n\
             Question: {query}\n\n\
             Reply with the label only.\nLabel:"
        );

        match self.generator.invoke(&prompt, &self.options).await {
            Ok(reply) => IntentLabel::parse_first(&reply).unwrap_or(IntentLabel::Other),
            Err(e) => {
                tracing::debug!(error = %e, "Intent classification failed, defaulting to OTHER");
                IntentLabel::Other
            }
        }
    }
}
