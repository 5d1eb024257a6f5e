//! Text normalization for deduplication.
//!
//! `normalize` is total and deterministic: lowercase, strip URLs, strip
//! punctuation (keeping apostrophes interior to words, so contractions
//! survive), collapse whitespace, trim. URLs go first so their punctuation
//! remnants never leak into the output.

use std::sync::LazyLock;

use regex::Regex;
use sha2::{Digest, Sha256};

/// Minimum normalized length below which embeddings and clustering are too
/// noisy to be meaningful.
pub const MIN_SIGNAL_LENGTH: usize = 10;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:https?://|www\.)[^\s<>"{}|\\^`\[\]]+"#).expect("valid URL regex")
});

/// Normalize text into the canonical form used for fingerprinting.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = URL_RE.replace_all(&lowered, " ");

    // Punctuation pass. Word characters and whitespace survive; an
    // apostrophe survives only between two word characters ("don't"),
    // leading/trailing apostrophes become spaces.
    let chars: Vec<char> = stripped.chars().collect();
    let mut cleaned = String::with_capacity(chars.len());
    for (i, &c) in chars.iter().enumerate() {
        if is_word_char(c) || c.is_whitespace() {
            cleaned.push(c);
        } else if c == '\'' {
            let prev = i.checked_sub(1).map(|j| chars[j]).is_some_and(is_word_char);
            let next = chars.get(i + 1).copied().is_some_and(is_word_char);
            cleaned.push(if prev && next { '\'' } else { ' ' });
        } else {
            cleaned.push(' ');
        }
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whether a normalized text clears the length floor (inclusive).
pub fn is_valid(normalized: &str, min_length: usize) -> bool {
    normalized.chars().count() >= min_length
}

/// Hex-encoded SHA-256 of the normalized text: the fingerprint record key.
pub fn fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  The App CRASHES  "), "the app crashes");
    }

    #[test]
    fn strips_urls_before_punctuation() {
        assert_eq!(
            normalize("Check out https://x.io this is GREAT!!"),
            "check out this is great"
        );
        assert_eq!(normalize("see www.example.com/page?a=1 now"), "see now");
    }

    #[test]
    fn keeps_contraction_apostrophes_only() {
        assert_eq!(normalize("don't do that"), "don't do that");
        assert_eq!(normalize("'quoted' words"), "quoted words");
        assert_eq!(normalize("rockin'"), "rockin");
    }

    #[test]
    fn collapses_whitespace_runs() {
        assert_eq!(normalize("a\t\tb\n\nc   d"), "a b c d");
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in [
            "Check out https://x.io this is GREAT!!",
            "Don't   STOP believin'",
            "  plain text  ",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn validity_floor_is_inclusive() {
        assert!(is_valid("exactly10c", 10));
        assert!(!is_valid("only9char", 10));
        assert!(!is_valid("ok", 10));
    }

    #[test]
    fn fingerprint_is_64_hex_chars() {
        let hash = fingerprint("check out this is great");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        // Stable across calls.
        assert_eq!(hash, fingerprint("check out this is great"));
    }

    #[test]
    fn distinct_texts_get_distinct_fingerprints() {
        assert_ne!(
            fingerprint("the app crashes on startup"),
            fingerprint("the app crashes on shutdown")
        );
    }
}
