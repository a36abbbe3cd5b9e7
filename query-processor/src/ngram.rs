//! Fixed-width character n-grams for fuzzy token matching.

use std::collections::HashSet;

/// Sliding-window n-gram generator (character based, so Cyrillic tokens
/// produce the expected windows).
#[derive(Debug, Clone, Copy)]
pub struct NGramGenerator {
    n: usize,
}

impl Default for NGramGenerator {
    fn default() -> Self {
        Self::new(3)
    }
}

impl NGramGenerator {
    pub fn new(n: usize) -> Self {
        Self { n: n.max(1) }
    }

    pub fn width(&self) -> usize {
        self.n
    }

    /// All consecutive `n`-char windows of `token`, left to right.
    /// Tokens shorter than `n` yield the token itself.
    pub fn generate(&self, token: &str) -> Vec<String> {
        let chars: Vec<char> = token.chars().collect();
        if chars.len() < self.n {
            return vec![token.to_string()];
        }
        chars
            .windows(self.n)
            .map(|window| window.iter().collect())
            .collect()
    }

    /// Jaccard similarity of the two tokens' n-gram sets, in `[0, 1]`.
    /// Identical tokens short-circuit to `1.0`.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        let grams_a: HashSet<String> = self.generate(a).into_iter().collect();
        let grams_b: HashSet<String> = self.generate(b).into_iter().collect();
        let intersection = grams_a.intersection(&grams_b).count();
        let union = grams_a.union(&grams_b).count();
        if union == 0 {
            return 0.0;
        }
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_cover_the_token() {
        let generator = NGramGenerator::new(3);
        assert_eq!(
            generator.generate("кроссовки"),
            vec!["кро", "рос", "осс", "ссо", "сов", "овк", "вки"]
        );
    }

    #[test]
    fn short_tokens_pass_through() {
        let generator = NGramGenerator::new(3);
        assert_eq!(generator.generate("ab"), vec!["ab"]);
    }

    #[test]
    fn generation_is_deterministic() {
        let generator = NGramGenerator::new(3);
        assert_eq!(generator.generate("наушники"), generator.generate("наушники"));
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let generator = NGramGenerator::new(3);
        let s = generator.similarity("кроссвки", "кроссовки");
        assert!(s > 0.0 && s < 1.0);
        assert_eq!(s, generator.similarity("кроссовки", "кроссвки"));
        assert_eq!(generator.similarity("same", "same"), 1.0);
    }
}
