//! EN<->RU keyboard-position mapping.
//!
//! A query typed with the wrong layout active ("шзрщту" for "iphone") maps
//! key-for-key onto its intended form. Both conversion directions are
//! produced; the search engine uses whichever variants differ from the
//! normalized query as a retrieval fallback.

use std::collections::HashMap;
use std::sync::OnceLock;

const EN_TO_RU: &[(char, char)] = &[
    ('q', 'й'), ('w', 'ц'), ('e', 'у'), ('r', 'к'), ('t', 'е'), ('y', 'н'),
    ('u', 'г'), ('i', 'ш'), ('o', 'щ'), ('p', 'з'), ('[', 'х'), (']', 'ъ'),
    ('a', 'ф'), ('s', 'ы'), ('d', 'в'), ('f', 'а'), ('g', 'п'), ('h', 'р'),
    ('j', 'о'), ('k', 'л'), ('l', 'д'), (';', 'ж'), ('\'', 'э'), ('z', 'я'),
    ('x', 'ч'), ('c', 'с'), ('v', 'м'), ('b', 'и'), ('n', 'т'), ('m', 'ь'),
    (',', 'б'), ('.', 'ю'), ('/', '.'),
];

fn en_to_ru() -> &'static HashMap<char, char> {
    static MAP: OnceLock<HashMap<char, char>> = OnceLock::new();
    MAP.get_or_init(|| EN_TO_RU.iter().copied().collect())
}

fn ru_to_en() -> &'static HashMap<char, char> {
    static MAP: OnceLock<HashMap<char, char>> = OnceLock::new();
    MAP.get_or_init(|| EN_TO_RU.iter().map(|&(en, ru)| (ru, en)).collect())
}

/// Remaps every character through the key-position table; characters outside
/// the table pass through unchanged.
pub fn convert_layout(text: &str, to_russian: bool) -> String {
    let mapping = if to_russian { en_to_ru() } else { ru_to_en() };
    text.chars()
        .flat_map(|c| c.to_lowercase())
        .map(|c| mapping.get(&c).copied().unwrap_or(c))
        .collect()
}

/// Alternate renderings of `text` in the other layout, keeping only the ones
/// that actually differ (and differ from each other).
pub fn layout_variants(text: &str) -> Vec<String> {
    let mut variants = Vec::new();
    let ru = convert_layout(text, true);
    if ru != text {
        variants.push(ru);
    }
    let en = convert_layout(text, false);
    if en != text && !variants.contains(&en) {
        variants.push(en);
    }
    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_layout_query_maps_back() {
        assert_eq!(convert_layout("шзрщту", false), "iphone");
        assert_eq!(convert_layout("iphone", true), "шзрщту");
    }

    #[test]
    fn variants_exclude_identity() {
        // Digits map to themselves in both layouts.
        assert!(layout_variants("2024").is_empty());

        let variants = layout_variants("iphone");
        assert!(variants.contains(&"шзрщту".to_string()));
    }
}
