use serde::{Deserialize, Serialize};

/// Submissions with fewer whitespace-separated words are rejected.
pub const MIN_RESPONSE_WORDS: usize = 10;

/// Upper bound on a single answer, measured in characters.
pub const MAX_RESPONSE_CHARS: usize = 20_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseValidation {
    pub passed: bool,
    pub word_count: usize,
    pub message: Option<String>,
}

/// Whitespace-token count; runs of whitespace never produce empty tokens.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Validates an answer before it is submitted (client) or recorded (authority).
pub fn validate_response(text: &str) -> ResponseValidation {
    let word_count = word_count(text);

    let message = if word_count < MIN_RESPONSE_WORDS {
        Some(format!(
            "Please write at least {MIN_RESPONSE_WORDS} words before submitting ({word_count} so far)."
        ))
    } else if text.chars().count() > MAX_RESPONSE_CHARS {
        Some(format!(
            "Responses are limited to {MAX_RESPONSE_CHARS} characters."
        ))
    } else {
        None
    };

    ResponseValidation {
        passed: message.is_none(),
        word_count,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  one   two\tthree\nfour  "), 4);
    }

    #[test]
    fn test_word_count_empty() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   \n\t "), 0);
    }

    #[test]
    fn test_word_count_counts_punctuation_attached_tokens() {
        assert_eq!(
            word_count("This is a sufficiently long answer for testing"),
            8
        );
        assert_eq!(word_count("Yes, absolutely - I led it."), 5);
    }

    #[test]
    fn test_nine_words_fail() {
        let result = validate_response("one two three four five six seven eight nine");
        assert!(!result.passed);
        assert_eq!(result.word_count, 9);
        assert!(result.message.unwrap().contains("at least 10 words"));
    }

    #[test]
    fn test_ten_words_pass() {
        let result = validate_response("one two three four five six seven eight nine ten");
        assert!(result.passed);
        assert_eq!(result.word_count, 10);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_oversized_response_fails() {
        let text = "word ".repeat(MAX_RESPONSE_CHARS / 4);
        let result = validate_response(&text);
        assert!(!result.passed);
        assert!(result.message.unwrap().contains("limited"));
    }
}
