//! Query-side synonym expansion.

/// Expands `tokens` with every surface form from any group containing one of
/// them (case-folded). Order-preserving; added members are lowercased and
/// deduplicated against the running list.
pub fn expand_tokens(tokens: &[String], groups: &[Vec<String>]) -> Vec<String> {
    if groups.is_empty() {
        return tokens.to_vec();
    }

    let mut expanded: Vec<String> = tokens.to_vec();
    for token in tokens {
        let token_lower = token.to_lowercase();
        for group in groups {
            if group.iter().any(|w| w.to_lowercase() == token_lower) {
                for synonym in group {
                    let synonym = synonym.to_lowercase();
                    if !expanded.iter().any(|t| t.to_lowercase() == synonym) {
                        expanded.push(synonym);
                    }
                }
                break;
            }
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups() -> Vec<Vec<String>> {
        vec![vec![
            "наушники".to_string(),
            "Headphones".to_string(),
            "earbuds".to_string(),
        ]]
    }

    #[test]
    fn group_members_are_added_lowercased() {
        let tokens = vec!["наушники".to_string()];
        assert_eq!(
            expand_tokens(&tokens, &groups()),
            vec!["наушники", "headphones", "earbuds"]
        );
    }

    #[test]
    fn matching_is_case_folded_and_duplicates_collapse() {
        let tokens = vec!["HEADPHONES".to_lowercase()];
        let expanded = expand_tokens(&tokens, &groups());
        assert_eq!(expanded, vec!["headphones", "наушники", "earbuds"]);
    }

    #[test]
    fn no_groups_is_identity() {
        let tokens = vec!["iphone".to_string()];
        assert_eq!(expand_tokens(&tokens, &[]), tokens);
    }
}
