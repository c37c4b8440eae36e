//! Entity extraction
//!
//! Approximate, regex-layered extraction of author names and topic phrases
//! from query text. This sits behind a trait so the heuristic can be swapped
//! for a real NER model without touching the retrieval state machine. False
//! negatives fall through to vector-only handling, not a crash.

use crate::intent::quoted_mentions;
use regex_lite::Regex;

/// Entity mentions pulled out of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedEntities {
    pub authors: Vec<String>,
    pub topics: Vec<String>,
}

/// Pluggable entity-extraction capability.
pub trait EntityExtractor: Send + Sync {
    fn extract(&self, text: &str) -> ExtractedEntities;
}

const STOPWORDS: [&str; 14] = [
    "which", "who", "what", "when", "where", "paper", "papers", "author", "authors", "show",
    "list", "find", "give", "the",
];

/// Layered regex heuristic:
/// 1. quoted substrings are explicit author mentions;
/// 2. capitalized run after `by/from/of/with`;
/// 3. capitalized subject between `does` and `write/research/work/study`;
/// 4. first capitalized run not in the stopword set.
/// Topics are the phrase after `about/on/regarding`, cut before a trailing
/// ` by ...` author clause.
pub struct RegexEntityExtractor {
    after_preposition: Regex,
    does_subject: Regex,
    topic_marker: Regex,
}

impl Default for RegexEntityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl RegexEntityExtractor {
    pub fn new() -> Self {
        let name = r"[A-Z][a-zA-Z'\-]*(?:[,.]?\s+[A-Z][a-zA-Z'.\-]*)*";
        Self {
            after_preposition: Regex::new(&format!(r"\b(?:by|from|of|with)\s+({name})")).unwrap(),
            does_subject: Regex::new(&format!(
                r"\bdoes\s+({name})\s+(?:write|research|work|study)"
            ))
            .unwrap(),
            topic_marker: Regex::new(r"\b(?:about|on|regarding)\s+(.+)").unwrap(),
        }
    }

    fn capitalized_fallback(&self, text: &str) -> Option<String> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let mut i = 0;
        while i < words.len() {
            let word = words[i].trim_matches(|c: char| c.is_ascii_punctuation());
            let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());
            if capitalized && !STOPWORDS.contains(&word.to_lowercase().as_str()) {
                // Collect the consecutive capitalized run as one name.
                let mut parts = vec![word];
                let mut j = i + 1;
                while j < words.len() {
                    let next = words[j].trim_matches(|c: char| c.is_ascii_punctuation());
                    if next.chars().next().is_some_and(|c| c.is_uppercase()) {
                        parts.push(next);
                        j += 1;
                    } else {
                        break;
                    }
                }
                return Some(parts.join(" "));
            }
            i += 1;
        }
        None
    }

    fn extract_topics(&self, text: &str) -> Vec<String> {
        let Some(capture) = self.topic_marker.captures(text).and_then(|c| c.get(1)) else {
            return Vec::new();
        };
        let mut phrase = capture.as_str();
        let lower = phrase.to_lowercase();
        if let Some(idx) = lower.find(" by ") {
            phrase = &phrase[..idx];
        }
        let phrase = phrase.trim_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());
        if phrase.is_empty() {
            Vec::new()
        } else {
            vec![phrase.to_string()]
        }
    }
}

impl EntityExtractor for RegexEntityExtractor {
    fn extract(&self, text: &str) -> ExtractedEntities {
        let mut authors = quoted_mentions(text);

        if authors.is_empty() {
            let matched = self
                .after_preposition
                .captures(text)
                .or_else(|| self.does_subject.captures(text))
                .and_then(|c| c.get(1))
                // Keep trailing periods: they belong to initials ("Smith, J.").
                .map(|m| m.as_str().trim_end_matches(['?', ',']).to_string())
                .or_else(|| self.capitalized_fallback(text));
            if let Some(name) = matched {
                authors.push(name);
            }
        }

        ExtractedEntities {
            authors,
            topics: self.extract_topics(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractedEntities {
        RegexEntityExtractor::new().extract(text)
    }

    #[test]
    fn test_author_after_by() {
        let entities = extract("Which papers were written by Klaus Mueller?");
        assert_eq!(entities.authors, vec!["Klaus Mueller".to_string()]);
    }

    #[test]
    fn test_author_in_last_comma_first_form() {
        let entities = extract("papers by Smith, J.");
        assert_eq!(entities.authors, vec!["Smith, J.".to_string()]);
    }

    #[test]
    fn test_does_subject_pattern() {
        let entities = extract("What does Maklan research?");
        assert_eq!(entities.authors, vec!["Maklan".to_string()]);
    }

    #[test]
    fn test_capitalized_fallback_skips_stopwords() {
        let entities = extract("Which papers mention Porter?");
        assert_eq!(entities.authors, vec!["Porter".to_string()]);
    }

    #[test]
    fn test_quoted_mentions_win() {
        let entities = extract(r#"collaborations between "Smith, J." and "Doe, A.""#);
        assert_eq!(
            entities.authors,
            vec!["Smith, J.".to_string(), "Doe, A.".to_string()]
        );
    }

    #[test]
    fn test_topic_phrase_cut_before_author_clause() {
        let entities = extract("papers about dynamic capabilities by Teece");
        assert_eq!(entities.topics, vec!["dynamic capabilities".to_string()]);
        assert_eq!(entities.authors, vec!["Teece".to_string()]);
    }

    #[test]
    fn test_nothing_extractable() {
        let entities = extract("anything interesting lately?");
        assert!(entities.authors.is_empty());
        assert!(entities.topics.is_empty());
    }
}
