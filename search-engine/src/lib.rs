//! Retrieval over the per-project indexes: ranked search with layout and
//! n-gram fallbacks, autocomplete suggestions and related items.

mod accumulate;
mod engine;
mod errors;
mod related;
mod results;
mod suggest;
mod synonyms;

pub use engine::SearchEngine;
pub use errors::SearchError;
pub use results::{
    RelatedItems, SearchFilters, SearchItem, SearchOptions, SearchResult, SortOrder, SuggestResult,
    Suggestion,
};
