/// Token counting capability used by the budget trimmer.
///
/// Only the length of [`Tokenizer::encode`] is ever inspected; ids exist
/// so real BPE tokenizers can implement the trait unchanged.
pub trait Tokenizer: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u32>;

    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

/// Approximates BPE token counts without a vocabulary.
///
/// Each whitespace-separated word yields one token per started run of
/// `chars_per_token` characters; punctuation inside a word is not split.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenizer {
    chars_per_token: usize,
}

impl HeuristicTokenizer {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicTokenizer {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Tokenizer for HeuristicTokenizer {
    fn encode(&self, text: &str) -> Vec<u32> {
        let mut out = Vec::new();
        for word in text.split_whitespace() {
            let chars = word.chars().count();
            let pieces = chars.div_ceil(self.chars_per_token);
            for piece in 0..pieces {
                out.push(piece as u32);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_has_no_tokens() {
        assert_eq!(HeuristicTokenizer::default().count(""), 0);
        assert_eq!(HeuristicTokenizer::default().count("   \n"), 0);
    }

    #[test]
    fn counts_pieces_per_word() {
        let t = HeuristicTokenizer::default();
        assert_eq!(t.count("hi"), 1);
        assert_eq!(t.count("hello"), 2);
        assert_eq!(t.count("hi there friend"), 1 + 2 + 2);
    }

    #[test]
    fn zero_width_is_clamped() {
        assert_eq!(HeuristicTokenizer::new(0).count("abc"), 3);
    }
}
