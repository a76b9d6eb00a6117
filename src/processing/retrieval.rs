//! BM25 lexical ranking of postings against a query

use crate::processing::posting::Posting;
use crate::processing::text_normalizer::TextNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Okapi BM25 tuning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75 }
    }
}

struct IndexedDoc {
    id: u64,
    term_freqs: HashMap<String, u32>,
    length: usize,
}

/// In-memory inverted statistics over posting texts.
pub struct RetrievalIndex {
    normalizer: TextNormalizer,
    params: Bm25Params,
    docs: Vec<IndexedDoc>,
    doc_freqs: HashMap<String, usize>,
    avg_doc_len: f32,
}

impl RetrievalIndex {
    pub fn build<'a>(postings: impl IntoIterator<Item = &'a Posting>, params: Bm25Params) -> Self {
        let normalizer = TextNormalizer::new();
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();
        let mut docs = Vec::new();

        for posting in postings {
            let tokens = normalizer.tokenize(&posting.text());
            let mut term_freqs: HashMap<String, u32> = HashMap::new();
            for token in &tokens {
                *term_freqs.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            docs.push(IndexedDoc {
                id: posting.id,
                term_freqs,
                length: tokens.len(),
            });
        }

        let total_len: usize = docs.iter().map(|d| d.length).sum();
        let avg_doc_len = if docs.is_empty() {
            0.0
        } else {
            total_len as f32 / docs.len() as f32
        };

        log::debug!(
            "Indexed {} postings ({} distinct terms, avg length {:.1})",
            docs.len(),
            doc_freqs.len(),
            avg_doc_len
        );

        Self {
            normalizer,
            params,
            docs,
            doc_freqs,
            avg_doc_len,
        }
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    fn idf(&self, term: &str) -> f32 {
        let n = self.docs.len() as f32;
        let df = self.doc_freqs.get(term).copied().unwrap_or(0) as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    fn score(&self, doc: &IndexedDoc, query_terms: &[String]) -> f32 {
        let Bm25Params { k1, b } = self.params;
        let len_norm = if self.avg_doc_len > 0.0 {
            doc.length as f32 / self.avg_doc_len
        } else {
            0.0
        };

        query_terms
            .iter()
            .filter_map(|term| {
                let tf = *doc.term_freqs.get(term)? as f32;
                let denom = tf + k1 * (1.0 - b + b * len_norm);
                Some(self.idf(term) * tf * (k1 + 1.0) / denom)
            })
            .sum()
    }

    /// Posting ids ordered by relevance, ties kept in ingestion order.
    ///
    /// A query with no usable terms yields ingestion order.
    pub fn rank(&self, query: &str, top_k: Option<usize>) -> Vec<u64> {
        let limit = top_k.unwrap_or(self.docs.len());
        let query_terms = self.normalizer.tokenize(query);

        if query_terms.is_empty() {
            return self.docs.iter().take(limit).map(|d| d.id).collect();
        }

        let mut scored: Vec<(usize, f32)> = self
            .docs
            .iter()
            .enumerate()
            .map(|(position, doc)| (position, self.score(doc, &query_terms)))
            .collect();

        // sort_by is stable, so equal scores keep ingestion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .take(limit)
            .map(|(position, _)| self.docs[position].id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus() -> Vec<Posting> {
        vec![
            Posting::new(1, "Graphic designer for print and web, Photoshop and Illustrator"),
            Posting::new(2, "Data scientist building machine learning models in Python"),
            Posting::new(3, "Backend engineer writing Rust services"),
            Posting::new(4, "Data analyst with SQL and dashboards, some Python"),
        ]
    }

    #[test]
    fn test_ranks_most_relevant_first() {
        let index = RetrievalIndex::build(&corpus(), Bm25Params::default());
        let ranked = index.rank("python data scientist", None);

        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0], 2);
        assert_eq!(ranked[1], 4);
    }

    #[test]
    fn test_zero_scores_keep_ingestion_order() {
        let index = RetrievalIndex::build(&corpus(), Bm25Params::default());
        let ranked = index.rank("rust", None);

        assert_eq!(ranked, vec![3, 1, 2, 4]);
    }

    #[test]
    fn test_empty_query_returns_ingestion_order() {
        let index = RetrievalIndex::build(&corpus(), Bm25Params::default());

        assert_eq!(index.rank("", None), vec![1, 2, 3, 4]);
        assert_eq!(index.rank("the and of", Some(2)), vec![1, 2]);
    }

    #[test]
    fn test_empty_corpus() {
        let index = RetrievalIndex::build(&Vec::new(), Bm25Params::default());

        assert!(index.is_empty());
        assert!(index.rank("python", Some(5)).is_empty());
    }

    #[test]
    fn test_top_k_truncates() {
        let index = RetrievalIndex::build(&corpus(), Bm25Params::default());
        assert_eq!(index.rank("scientist", Some(1)), vec![2]);
        // shorter document wins on equal term frequency
        assert_eq!(index.rank("python", Some(1)), vec![4]);
    }

    #[test]
    fn test_identical_documents_tie_in_ingestion_order() {
        let postings = vec![
            Posting::new(10, "remote python role"),
            Posting::new(11, "remote python role"),
            Posting::new(12, "remote python role"),
        ];
        let index = RetrievalIndex::build(&postings, Bm25Params::default());

        assert_eq!(index.rank("python", None), vec![10, 11, 12]);
    }

    #[test]
    fn test_ranking_is_deterministic() {
        let index = RetrievalIndex::build(&corpus(), Bm25Params::default());
        let first = index.rank("python sql engineer", None);
        for _ in 0..5 {
            assert_eq!(index.rank("python sql engineer", None), first);
        }
    }
}
