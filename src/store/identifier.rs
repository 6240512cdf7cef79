//! URL-safe identifiers derived from display strings

use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

const NO_BREAK_SPACE: char = '\u{00A0}';

fn unsafe_chars() -> &'static Regex {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    UNSAFE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9]").expect("static pattern is valid"))
}

/// Turn an arbitrary display string into a URL-safe store key.
///
/// Non-breaking spaces become spaces, every character outside `[a-z0-9]`
/// (either case) becomes one `_` per UTF-16 code unit, so an emoji yields
/// `__`, and the result is lower-cased. Finally each
/// literal `___` is folded into a single `_`, so `"Fish & Chips"` becomes
/// `"fish_chips"`. Only triples are folded: `"a    b"` keeps a run of
/// underscores (`"a__b"` after one fold of the first three).
pub fn create_identifier(raw: &str) -> String {
    debug!("Creating safe ID for: {}", raw);

    let spaced = raw.replace(NO_BREAK_SPACE, " ");
    let safe = unsafe_chars()
        .replace_all(&spaced, |caps: &Captures| {
            let units: usize = caps[0].chars().map(char::len_utf16).sum();
            "_".repeat(units)
        })
        .to_lowercase();

    safe.replace("___", "_")
}
