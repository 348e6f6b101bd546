//! Usage: Security-sensitive helpers (token masking for log output).

const TOKEN_MASK_PREFIX_LEN: usize = 6;
const TOKEN_MASK_SUFFIX_LEN: usize = 4;

pub(crate) fn mask_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    // Counted in chars, not bytes; percent-decoded codes can carry multi-byte
    // characters.
    let len = trimmed.chars().count();
    if len <= TOKEN_MASK_PREFIX_LEN + TOKEN_MASK_SUFFIX_LEN {
        return "*".repeat(len.min(8));
    }

    let prefix: String = trimmed.chars().take(TOKEN_MASK_PREFIX_LEN).collect();
    let suffix: String = trimmed
        .chars()
        .skip(len - TOKEN_MASK_SUFFIX_LEN)
        .collect();
    format!("{prefix}...{suffix}")
}

#[cfg(test)]
mod tests {
    use super::mask_token;

    #[test]
    fn mask_token_keeps_prefix_and_suffix() {
        let token = "abcdef1234567890";
        assert_eq!(mask_token(token), "abcdef...7890");
    }

    #[test]
    fn mask_token_short_values_redacts_fully() {
        assert_eq!(mask_token("abcd"), "****");
    }

    #[test]
    fn mask_token_empty_stays_empty() {
        assert_eq!(mask_token("   "), "");
    }

    #[test]
    fn mask_token_handles_multibyte_characters() {
        assert_eq!(mask_token("åäöüßñ1234éø"), "åäöüßñ...34éø");
        assert_eq!(mask_token("éàü"), "***");
    }
}
