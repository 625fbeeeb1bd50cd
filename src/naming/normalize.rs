//! Name normalization for mailbox local-parts.
//!
//! Folds accents, lowercases, splits into words, drops surname particles and
//! keeps only `[a-z0-9]` in each word.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Linking particles dropped from surnames ("de la Torre" -> "torre").
pub const SURNAME_PARTICLES: [&str; 10] =
    ["de", "del", "la", "las", "los", "y", "da", "do", "das", "dos"];

/// Canonically decomposes `input` and drops combining marks.
pub fn fold_accents(input: &str) -> String {
    input.nfd().filter(|c| !is_combining_mark(*c)).collect()
}

/// Returns true if `word` is a linking particle.
pub fn is_particle(word: &str) -> bool {
    SURNAME_PARTICLES.contains(&word)
}

/// Normalizes a given name into words.
pub fn normalize_given_name(input: &str) -> Vec<String> {
    normalize_words(input, false)
}

/// Normalizes a surname into words, dropping linking particles.
pub fn normalize_surname(input: &str) -> Vec<String> {
    normalize_words(input, true)
}

fn normalize_words(input: &str, drop_particles: bool) -> Vec<String> {
    let folded = fold_accents(input).to_lowercase();
    folded
        .split_whitespace()
        .filter(|word| !(drop_particles && is_particle(word)))
        .map(strip_to_alphanumeric)
        .filter(|word| !word.is_empty())
        .collect()
}

fn strip_to_alphanumeric(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}
