#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
#![deny(missing_docs, unused_must_use)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing))]

//! Pure lexical statistics over raw text. Functions are deterministic.
//!
//! Contract: identical input text -> identical output.
//!
//! - [`burstiness`]: share of distinct words that occur more than once.
//! - [`word_frequencies`] / [`top_repeated_words`]: stopword-filtered counts
//!   ranked for the word-frequency chart.

use indexmap::IndexMap;
use std::collections::HashMap;

/// English stopword list.
pub mod stopwords;
/// Word tokenizers.
pub mod tokenize;

pub use tokenize::{is_punctuation, whitespace_tokenize, word_tokenize};

/// Number of entries shown in the word-frequency chart.
pub const TOP_WORDS: usize = 10;

/// A word and how many times it occurs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct WordCount {
    /// lowercased word
    pub word: String,
    /// number of occurrences
    pub count: usize,
}

/// Burstiness: distinct words with frequency > 1 divided by distinct words.
///
/// Words come from [`word_tokenize`], so punctuation tokens are counted too.
/// Text without any token scores 0.0 rather than dividing by zero.
pub fn burstiness(text: &str) -> f64 {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for token in word_tokenize(text) {
        *freq.entry(token).or_insert(0) += 1;
    }
    if freq.is_empty() {
        return 0.0;
    }
    let repeated = freq.values().filter(|&&count| count > 1).count();
    repeated as f64 / freq.len() as f64
}

/// Count whitespace-separated, lowercased words, skipping stopwords and
/// punctuation-only tokens. Keys keep first-occurrence order.
pub fn word_frequencies(text: &str) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for token in whitespace_tokenize(text) {
        if stopwords::is_stopword(&token) || is_punctuation(&token) {
            continue;
        }
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// The `k` most repeated words, by descending count.
///
/// Ties keep first-occurrence order (the sort is stable over the
/// insertion-ordered table).
pub fn top_repeated_words(text: &str, k: usize) -> Vec<WordCount> {
    let mut pairs: Vec<WordCount> = word_frequencies(text)
        .into_iter()
        .map(|(word, count)| WordCount { word, count })
        .collect();
    pairs.sort_by(|a, b| b.count.cmp(&a.count));
    pairs.truncate(k);
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quickcheck::quickcheck;

    fn words(ranked: &[WordCount]) -> Vec<(&str, usize)> {
        ranked.iter().map(|w| (w.word.as_str(), w.count)).collect()
    }

    #[test]
    fn burstiness_all_unique_is_zero() {
        assert_eq!(burstiness("alpha beta gamma delta"), 0.0);
    }

    #[test]
    fn burstiness_single_repeated_word_is_one() {
        assert_eq!(burstiness("the the the"), 1.0);
        assert_eq!(burstiness("Echo echo"), 1.0);
    }

    #[test]
    fn burstiness_empty_text_is_zero() {
        assert_eq!(burstiness(""), 0.0);
        assert_eq!(burstiness("   \n"), 0.0);
    }

    #[test]
    fn burstiness_counts_punctuation_tokens() {
        // distinct: {a, ., b, c}; repeated: {a, .}
        assert_eq!(burstiness("a. a. b c"), 0.5);
    }

    #[test]
    fn burstiness_does_not_pair_quotes_or_split_dashes() {
        assert_eq!(burstiness("He said \"hi\" to me"), 0.0);
        // distinct: {i, came, --, saw}; repeated: {i}
        assert_eq!(burstiness("I came -- I saw"), 0.25);
        assert_eq!(burstiness("1,000 and 2,000"), 0.0);
    }

    #[test]
    fn frequencies_skip_stopwords_and_punctuation() {
        let table = word_frequencies("The model and THE Model - it works , works");
        let got: Vec<(&str, usize)> = table.iter().map(|(w, c)| (w.as_str(), *c)).collect();
        assert_eq!(got, vec![("model", 2), ("works", 2)]);
    }

    #[test]
    fn frequencies_keep_attached_punctuation() {
        let table = word_frequencies("model, model");
        assert_eq!(table.get("model,"), Some(&1));
        assert_eq!(table.get("model"), Some(&1));
    }

    #[test]
    fn top_words_ranked_with_stable_ties() {
        let ranked = top_repeated_words("zeta alpha zeta beta alpha gamma zeta", 10);
        assert_eq!(words(&ranked), vec![("zeta", 3), ("alpha", 2), ("beta", 1), ("gamma", 1)]);
    }

    #[test]
    fn top_words_capped_at_k() {
        let text = (0..25).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        assert_eq!(top_repeated_words(&text, TOP_WORDS).len(), TOP_WORDS);
        assert!(top_repeated_words(&text, 0).is_empty());
    }

    #[test]
    fn top_words_of_stopwords_only_is_empty() {
        assert!(top_repeated_words("the and of a , .", TOP_WORDS).is_empty());
    }

    quickcheck! {
        fn qc_burstiness_in_unit_interval(text: String) -> bool {
            let b = burstiness(&text);
            (0.0..=1.0).contains(&b)
        }
    }

    proptest! {
        #[test]
        fn prop_repeated_word_is_fully_bursty(word in "[a-z]{1,12}", n in 2usize..20) {
            let text = vec![word.as_str(); n].join(" ");
            prop_assert_eq!(burstiness(&text), 1.0);
        }

        #[test]
        fn prop_top_words_len_and_order(text in "([a-z]{1,6}[ ,.!]{1,2}){0,60}") {
            let distinct = word_frequencies(&text).len();
            let ranked = top_repeated_words(&text, TOP_WORDS);
            prop_assert_eq!(ranked.len(), distinct.min(TOP_WORDS));
            for pair in ranked.windows(2) {
                if let [a, b] = pair {
                    prop_assert!(a.count >= b.count);
                }
            }
        }
    }
}
