use super::book_models::{CatalogEntry, MatchResult, TokenSet};

/// True when `name` contains every token, ignoring case.
pub fn name_matches(name: &str, tokens: &TokenSet) -> bool {
    let name = name.to_lowercase();
    tokens
        .as_slice()
        .iter()
        .all(|token| name.contains(&token.to_lowercase()))
}

/// Picks the first candidate (in listing order) whose name holds every token.
///
/// There is no scoring: when several files qualify, whichever the catalog
/// listed first wins. An empty token set therefore matches the first entry.
pub fn match_candidates(tokens: &TokenSet, candidates: &[CatalogEntry]) -> MatchResult {
    match candidates
        .iter()
        .find(|entry| name_matches(&entry.name, tokens))
    {
        Some(entry) => MatchResult::Found(entry.clone()),
        None => MatchResult::NoMatch {
            tokens: tokens.clone(),
            candidate_names: candidates.iter().map(|e| e.name.clone()).collect(),
        },
    }
}
