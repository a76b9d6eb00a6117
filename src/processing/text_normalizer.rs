//! Text normalization and keyword extraction

use regex::Regex;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

pub struct TextNormalizer {
    stop_words: HashSet<&'static str>,
    whitespace_regex: Regex,
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TextNormalizer {
    pub fn new() -> Self {
        let whitespace_regex = Regex::new(r"\s+").expect("Invalid whitespace regex");

        Self {
            stop_words: STOP_WORDS.iter().copied().collect(),
            whitespace_regex,
        }
    }

    /// Lower-case, fold typographic punctuation and collapse whitespace
    pub fn normalize(&self, text: &str) -> String {
        let folded = Self::fold_unicode(&text.to_lowercase());
        self.whitespace_regex.replace_all(&folded, " ").trim().to_string()
    }

    /// Tokenize text into words using Unicode segmentation
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let mut tokens = Vec::new();

        for word in text.unicode_words() {
            let normalized = word.to_lowercase();

            if normalized.chars().count() > 1
                && !self.stop_words.contains(normalized.as_str())
                && normalized.chars().any(|c| c.is_alphanumeric())
            {
                tokens.push(normalized);
            }
        }

        tokens
    }

    /// Extract keywords from text (frequency-based, first occurrence breaks ties)
    pub fn extract_keywords(&self, text: &str, max_keywords: usize) -> Vec<String> {
        let mut word_freq: HashMap<String, (usize, usize)> = HashMap::new();

        for (position, token) in self.tokenize(text).into_iter().enumerate() {
            if token.chars().count() > 2 {
                word_freq.entry(token).or_insert((0, position)).0 += 1;
            }
        }

        let mut keywords: Vec<(String, (usize, usize))> = word_freq.into_iter().collect();
        keywords.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));

        keywords
            .into_iter()
            .take(max_keywords)
            .map(|(word, _)| word)
            .collect()
    }

    fn fold_unicode(text: &str) -> String {
        text.chars()
            .map(|c| match c {
                '\u{2018}' | '\u{2019}' => '\'',
                '\u{201C}' | '\u{201D}' => '"',
                '\u{2010}' | '\u{2011}' | '\u{2013}' | '\u{2014}' => '-',
                '\u{00A0}' => ' ',
                _ => c,
            })
            .collect()
    }
}

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "between", "both", "but", "by",
    "can", "could", "did", "do", "does", "doing", "during", "each", "few", "for", "from",
    "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him", "his",
    "how", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more", "most",
    "my", "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "our", "ours",
    "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "them", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "very", "was", "we", "were", "what", "when",
    "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you", "your",
];
