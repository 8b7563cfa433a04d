//! Session naming heuristic
//!
//! Derives a short label for a chat session from the first message the user
//! sends in it. The result is a pure function of the input.

/// Name given to sessions before their first message has been sent
pub const DEFAULT_SESSION_NAME: &str = "New Chat";

/// Words that carry no topic on their own and are skipped when naming
pub const STOP_WORDS: &[&str] = &[
    "the", "and", "or", "but", "for", "with", "what", "how", "why", "when", "where", "is", "are",
    "was", "were", "can", "could", "would", "should", "will", "do", "does", "did",
];

const MAX_NAME_WORDS: usize = 3;
const MIN_KEYWORD_CHARS: usize = 3;

/// Derive a session name from the first message of a conversation
///
/// Keeps the first three keywords (tokens longer than two characters that
/// are not stop words), each capitalized. Messages made only of stop words
/// and short tokens fall back to their first three tokens. Blank input
/// yields [`DEFAULT_SESSION_NAME`].
///
/// # Examples
///
/// ```
/// use chatbook::naming::derive_name;
///
/// assert_eq!(derive_name("What is the best pizza recipe"), "Best Pizza Recipe");
/// assert_eq!(derive_name("is it ok"), "Is It Ok");
/// assert_eq!(derive_name("   "), "New Chat");
/// ```
pub fn derive_name(first_message: &str) -> String {
    let lowered = first_message.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    if tokens.is_empty() {
        return DEFAULT_SESSION_NAME.to_string();
    }

    let keywords: Vec<&str> = tokens
        .iter()
        .copied()
        .filter(|token| token.chars().count() >= MIN_KEYWORD_CHARS && !STOP_WORDS.contains(token))
        .collect();

    let chosen = if keywords.is_empty() { &tokens } else { &keywords };

    chosen
        .iter()
        .take(MAX_NAME_WORDS)
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
