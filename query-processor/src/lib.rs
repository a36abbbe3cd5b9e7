//! Text processing shared by indexing and retrieval.
//!
//! Everything here is pure and synchronous: normalization, tokenization with
//! stop-word removal, keyboard-layout variants for wrong-layout queries, and
//! character n-grams for fuzzy fallback. Index construction and query
//! resolution both run tokens through the same pipeline, which is what keeps
//! the inverted index and the query side agreeing on surface forms.

mod distance;
mod layout;
mod ngram;
mod processor;
mod stopwords;

pub use distance::levenshtein;
pub use layout::{convert_layout, layout_variants};
pub use ngram::NGramGenerator;
pub use processor::{ProcessedQuery, QueryProcessor};
pub use stopwords::default_stopwords;
