//! Query normalization and tokenization.

use crate::layout::layout_variants;
use crate::stopwords::default_stopwords;
use std::collections::HashSet;

/// Outcome of running a raw query through the processor.
#[derive(Debug, Clone)]
pub struct ProcessedQuery {
    pub raw: String,
    pub normalized: String,
    pub tokens: Vec<String>,
    /// Alternate renderings under the EN<->RU key-position map.
    pub layout_variants: Vec<String>,
}

/// Normalizes, tokenizes and strips stop-words.
///
/// The same processor instance feeds both the indexer (over product fields)
/// and the search engine (over user queries), so both sides agree on token
/// surface forms.
#[derive(Debug, Clone)]
pub struct QueryProcessor {
    stopwords: HashSet<String>,
}

impl Default for QueryProcessor {
    fn default() -> Self {
        Self {
            stopwords: default_stopwords(),
        }
    }
}

impl QueryProcessor {
    /// Processor with the baseline stop-word set plus deployment extras.
    pub fn with_extra_stopwords<I: IntoIterator<Item = String>>(extra: I) -> Self {
        let mut stopwords = default_stopwords();
        stopwords.extend(extra.into_iter().map(|w| w.to_lowercase()));
        Self { stopwords }
    }

    /// Full processing pipeline: normalize, tokenize, layout variants.
    pub fn process(&self, query: &str) -> ProcessedQuery {
        let normalized = self.normalize(query);
        let tokens = self.tokenize(&normalized);
        let layout_variants = layout_variants(&normalized);
        ProcessedQuery {
            raw: query.to_string(),
            normalized,
            tokens,
            layout_variants,
        }
    }

    /// Lowercase, fold `ё` to `е`, replace anything outside
    /// letters/digits/whitespace/hyphen with a space, collapse whitespace.
    pub fn normalize(&self, query: &str) -> String {
        let mapped: String = query
            .chars()
            .flat_map(|c| c.to_lowercase())
            .map(|c| if c == 'ё' { 'е' } else { c })
            .map(|c| {
                if c.is_alphanumeric() || c.is_whitespace() || c == '-' {
                    c
                } else {
                    ' '
                }
            })
            .collect();
        mapped.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Splits on whitespace, drops one-char tokens and stop-words.
    ///
    /// Hyphenated tokens additionally yield the joined concatenation and
    /// every part of length >= 2 that is not a stop-word, preserving
    /// first-seen order without duplicates.
    pub fn tokenize(&self, normalized: &str) -> Vec<String> {
        let mut tokens: Vec<String> = Vec::new();

        for raw in normalized.split_whitespace() {
            if self.stopwords.contains(raw) {
                continue;
            }
            if raw.chars().count() > 1 && !tokens.iter().any(|t| t == raw) {
                tokens.push(raw.to_string());
            }
            if raw.contains('-') {
                let parts: Vec<&str> = raw.split('-').collect();
                let joined: String = parts.concat();
                if joined.chars().count() > 1 && !tokens.iter().any(|t| *t == joined) {
                    tokens.push(joined);
                }
                for part in parts {
                    if part.chars().count() >= 2
                        && !self.stopwords.contains(part)
                        && !tokens.iter().any(|t| t == part)
                    {
                        tokens.push(part.to_string());
                    }
                }
            }
        }

        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_case_and_yo_and_punctuation() {
        let p = QueryProcessor::default();
        assert_eq!(p.normalize("  Ёлки,  зелёные!  "), "елки зеленые");
        assert_eq!(p.normalize("iPhone 15 Pro (256GB)"), "iphone 15 pro 256gb");
        assert_eq!(p.normalize("Wi-Fi роутер"), "wi-fi роутер");
    }

    #[test]
    fn tokenize_drops_stopwords_and_short_forms() {
        let p = QueryProcessor::default();
        assert_eq!(
            p.tokenize("чехол для iphone и планшета"),
            vec!["чехол", "iphone", "планшета"]
        );
        assert!(p.tokenize("и в на").is_empty());
        assert!(p.tokenize("я б ы").is_empty());
    }

    #[test]
    fn hyphenated_tokens_expand_to_joined_and_parts() {
        let p = QueryProcessor::default();
        assert_eq!(p.tokenize("wi-fi"), vec!["wi-fi", "wifi", "wi", "fi"]);
        // Single-letter parts are dropped, the joined form is kept.
        assert_eq!(p.tokenize("5-w30"), vec!["5-w30", "5w30", "w30"]);
    }

    #[test]
    fn tokens_are_deduplicated_in_first_seen_order() {
        let p = QueryProcessor::default();
        assert_eq!(p.tokenize("iphone iphone pro"), vec!["iphone", "pro"]);
    }

    #[test]
    fn process_emits_layout_variants_when_they_differ() {
        let p = QueryProcessor::default();
        let q = p.process("шзрщту");
        assert_eq!(q.tokens, vec!["шзрщту"]);
        assert!(q.layout_variants.contains(&"iphone".to_string()));
    }

    #[test]
    fn tokens_are_subsets_of_normalized_surface_forms() {
        let p = QueryProcessor::default();
        let q = p.process("Красные КРОССОВКИ nike-air");
        for token in &q.tokens {
            let dehyphenated = q.normalized.replace('-', "");
            assert!(
                q.normalized.contains(token.trim_matches('-'))
                    || dehyphenated.contains(&token.replace('-', ""))
            );
        }
    }

    #[test]
    fn extra_stopwords_extend_the_baseline() {
        let p = QueryProcessor::with_extra_stopwords(vec!["купить".to_string()]);
        assert_eq!(p.tokenize("купить iphone"), vec!["iphone"]);
    }
}
