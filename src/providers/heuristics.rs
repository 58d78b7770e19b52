//! Cheap text heuristics attached to every generation.
//!
//! Neither number is exact. The token estimate is a character ratio, not a
//! tokenizer count, and the confidence score is a length/punctuation rule of
//! thumb with uncalibrated thresholds (kept configurable for that reason).

use serde::{Deserialize, Serialize};

/// Characters per token assumed by [`estimate_tokens`].
pub const CHARS_PER_TOKEN: usize = 4;

/// `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Thresholds for the confidence heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    /// Below this many characters, text counts as short. Default: 50.
    pub short_length: usize,
    /// At or above this many characters, text counts as long. Default: 200.
    pub long_length: usize,
    pub short_score: f32,
    pub medium_score: f32,
    pub long_score: f32,
    /// Added when the text contains sentence punctuation. Default: 0.1.
    pub punctuation_bonus: f32,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            short_length: 50,
            long_length: 200,
            short_score: 0.3,
            medium_score: 0.6,
            long_score: 0.8,
            punctuation_bonus: 0.1,
        }
    }
}

impl ConfidenceThresholds {
    /// Score `text` in `[0, 1]`.
    pub fn score(&self, text: &str) -> f32 {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return 0.0;
        }
        let len = trimmed.chars().count();
        let base = if len < self.short_length {
            self.short_score
        } else if len >= self.long_length {
            self.long_score
        } else {
            self.medium_score
        };
        let bonus = if trimmed.contains(['.', '!', '?']) {
            self.punctuation_bonus
        } else {
            0.0
        };
        (base + bonus).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
        assert_eq!(estimate_tokens("ééééé"), 2);
    }

    #[test]
    fn short_text_scores_low_long_punctuated_scores_high() {
        let t = ConfidenceThresholds::default();
        let short = t.score("Yes");
        let long = t.score(&"The torchlight flickers across the wet stone. ".repeat(6));
        assert!(short < 0.5);
        assert!(long > 0.85);
        assert_eq!(t.score("   "), 0.0);
    }

    #[test]
    fn punctuation_adds_bonus() {
        let t = ConfidenceThresholds::default();
        let text = "a".repeat(100);
        let with = format!("{text}.");
        assert!(t.score(&with) > t.score(&text));
    }
}
