//! Text processing, ranking and rule checks

pub mod posting;
pub mod text_normalizer;
pub mod retrieval;
pub mod rule_filter;
pub mod verdict;
