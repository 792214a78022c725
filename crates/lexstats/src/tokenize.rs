use std::sync::OnceLock;

use regex::Regex;

#[allow(clippy::expect_used)]
fn clitic_pattern() -> &'static Regex {
    static CLITIC: OnceLock<Regex> = OnceLock::new();
    CLITIC.get_or_init(|| Regex::new(r"(\w)(n't|'s|'re|'ve|'ll|'d|'m)\b").expect("valid regex"))
}

/// A `"` at the start of the text or after whitespace or an opening bracket.
#[allow(clippy::expect_used)]
fn opening_quote_pattern() -> &'static Regex {
    static OPENING: OnceLock<Regex> = OnceLock::new();
    OPENING.get_or_init(|| Regex::new(r#"(^|[\s(\[{<])""#).expect("valid regex"))
}

#[allow(clippy::expect_used)]
fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| {
        Regex::new(concat!(
            r"``|''|--|n't|'(?:s|re|ve|ll|d|m)\b|\.\.\.",
            r"|\p{N}+(?:,\p{N}+)+(?:\.\p{N}+)?",
            r"|[\p{L}\p{N}]+(?:[-.'_][\p{L}\p{N}]+)*",
            r"|[^\s\p{L}\p{N}]",
        ))
        .expect("valid regex")
    })
}

/// Opening `"` becomes `` `` ``, every other `"` becomes `''`.
fn mark_quotes(text: &str) -> String {
    opening_quote_pattern().replace_all(text, "$1 `` ").replace('"', " '' ")
}

/// Lowercase `text` and split it into word tokens.
///
/// Punctuation-aware: punctuation attached to a word becomes its own token
/// (an ellipsis `...` and a dash `--` stay whole), and English clitics are
/// split off the way a Treebank tokenizer does (`don't` -> `do`, `n't`;
/// `it's` -> `it`, `'s`). Double quotes become `` `` `` when they open and
/// `''` when they close. Inner hyphens, dots and apostrophes keep a word
/// together (`state-of-the-art`, `u.s`, `o'neil`), as do digit groups
/// (`1,000`).
pub fn word_tokenize(text: &str) -> Vec<String> {
    let lowered = mark_quotes(&text.to_lowercase());
    let separated = clitic_pattern().replace_all(&lowered, "$1 $2");
    token_pattern()
        .find_iter(&separated)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whitespace split + lowercase, no punctuation handling.
pub fn whitespace_tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

/// True when `token` is non-empty and made only of ASCII punctuation.
pub fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_ascii_punctuation())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_trailing_punctuation() {
        assert_eq!(word_tokenize("Hello, World!"), vec!["hello", ",", "world", "!"]);
    }

    #[test]
    fn splits_clitics() {
        assert_eq!(word_tokenize("Don't stop"), vec!["do", "n't", "stop"]);
        assert_eq!(word_tokenize("It's late"), vec!["it", "'s", "late"]);
        assert_eq!(word_tokenize("we'll see"), vec!["we", "'ll", "see"]);
    }

    #[test]
    fn keeps_inner_joiners_and_ellipsis() {
        assert_eq!(
            word_tokenize("State-of-the-art... 3.14 O'Neil"),
            vec!["state-of-the-art", "...", "3.14", "o'neil"]
        );
    }

    #[test]
    fn opening_and_closing_quotes_differ() {
        assert_eq!(
            word_tokenize("He said \"hi\" to me"),
            vec!["he", "said", "``", "hi", "''", "to", "me"]
        );
        assert_eq!(word_tokenize("\"Yes.\""), vec!["``", "yes", ".", "''"]);
        assert_eq!(word_tokenize("(\"a\")"), vec!["(", "``", "a", "''", ")"]);
    }

    #[test]
    fn double_dash_is_one_token() {
        assert_eq!(word_tokenize("I came -- I saw"), vec!["i", "came", "--", "i", "saw"]);
        assert_eq!(word_tokenize("wait--what"), vec!["wait", "--", "what"]);
    }

    #[test]
    fn digit_groups_stay_whole() {
        assert_eq!(word_tokenize("It cost 1,000 dollars"), vec!["it", "cost", "1,000", "dollars"]);
        assert_eq!(word_tokenize("1,234,567.89"), vec!["1,234,567.89"]);
        assert_eq!(word_tokenize("one,two"), vec!["one", ",", "two"]);
        assert_eq!(word_tokenize("3, 4"), vec!["3", ",", "4"]);
    }

    #[test]
    fn empty_and_blank_inputs_yield_nothing() {
        assert!(word_tokenize("").is_empty());
        assert!(word_tokenize("  \n\t ").is_empty());
        assert!(whitespace_tokenize(" ").is_empty());
    }

    #[test]
    fn non_ascii_words_survive() {
        assert_eq!(word_tokenize("Größe café"), vec!["größe", "café"]);
    }

    #[test]
    fn punctuation_detection() {
        assert!(is_punctuation(","));
        assert!(is_punctuation("--"));
        assert!(is_punctuation("?!"));
        assert!(!is_punctuation("word,"));
        assert!(!is_punctuation(""));
    }
}
