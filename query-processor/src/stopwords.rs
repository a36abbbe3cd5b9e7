//! Baseline Russian stop-word set.
//!
//! Stored in normalized form (`ё` already folded to `е`), since tokenization
//! always runs after normalization.

use std::collections::HashSet;

const BASELINE_RU: &[&str] = &[
    "и", "в", "во", "не", "что", "он", "на", "я", "с", "со", "как", "а", "то",
    "все", "она", "так", "его", "но", "да", "ты", "к", "у", "же", "вы", "за",
    "бы", "по", "только", "ее", "мне", "было", "вот", "от", "меня", "еще",
    "нет", "о", "из", "ему", "теперь", "когда", "уже", "вам", "ни", "быть",
    "был", "для", "мы", "их", "без", "том", "более", "всего",
];

/// The fixed baseline set; callers may extend it per deployment.
pub fn default_stopwords() -> HashSet<String> {
    BASELINE_RU.iter().map(|w| w.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_is_normalized() {
        let words = default_stopwords();
        assert!(words.contains("для"));
        assert!(words.contains("ее"));
        assert!(!words.contains("её"));
    }
}
