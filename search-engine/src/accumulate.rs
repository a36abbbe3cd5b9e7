//! Score accumulation with stable encounter order.

use std::collections::HashMap;

/// Accumulates per-product scores while remembering the order in which
/// products were first seen, so equal scores rank deterministically.
#[derive(Debug, Default)]
pub struct ScoreAccumulator {
    order: Vec<String>,
    scores: HashMap<String, f64>,
}

impl ScoreAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `score` to the product's running total.
    pub fn add(&mut self, product_id: &str, score: f64) {
        match self.scores.get_mut(product_id) {
            Some(total) => *total += score,
            None => {
                self.order.push(product_id.to_string());
                self.scores.insert(product_id.to_string(), score);
            }
        }
    }

    /// Inserts only products not seen yet; fallback paths must never
    /// overwrite or inflate primary-path scores.
    pub fn add_if_absent(&mut self, product_id: &str, score: f64) {
        if !self.scores.contains_key(product_id) {
            self.add(product_id, score);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Entries in encounter order with their accumulated totals.
    pub fn into_entries(self) -> Vec<(String, f64)> {
        let Self { order, scores } = self;
        order
            .into_iter()
            .map(|id| {
                let score = scores[&id];
                (id, score)
            })
            .collect()
    }

    /// Entries sorted by score descending; ties keep encounter order
    /// (the sort is stable).
    pub fn ranked(&self) -> Vec<(String, f64)> {
        let mut entries: Vec<(String, f64)> = self
            .order
            .iter()
            .map(|id| (id.clone(), self.scores[id]))
            .collect();
        entries.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_keep_encounter_order() {
        let mut acc = ScoreAccumulator::new();
        acc.add("b", 2.0);
        acc.add("a", 2.0);
        acc.add("c", 5.0);
        let ranked: Vec<String> = acc.ranked().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ranked, vec!["c", "b", "a"]);
    }

    #[test]
    fn add_if_absent_never_overwrites() {
        let mut acc = ScoreAccumulator::new();
        acc.add("a", 3.0);
        acc.add_if_absent("a", 100.0);
        acc.add_if_absent("b", 1.0);
        assert_eq!(acc.ranked(), vec![("a".to_string(), 3.0), ("b".to_string(), 1.0)]);
    }

    #[test]
    fn duplicate_adds_accumulate() {
        let mut acc = ScoreAccumulator::new();
        acc.add("a", 1.5);
        acc.add("a", 2.0);
        assert_eq!(acc.ranked()[0].1, 3.5);
    }
}
