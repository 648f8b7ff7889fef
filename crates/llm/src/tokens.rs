/// Approximate characters per token for English prose
const CHARS_PER_TOKEN: usize = 4;

/// Rough token count used for logging prompt sizes
pub fn estimate_tokens(text: &str) -> usize {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_tokens() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcdefgh"), 2);
        assert_eq!(estimate_tokens("abcdefghi"), 3);
    }

    #[test]
    fn test_counts_chars_not_bytes() {
        // 6 chars, 8 bytes
        assert_eq!(estimate_tokens("Bahá'í"), 2);
    }
}
