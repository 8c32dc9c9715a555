//! Writing-system tag normalization.
//!
//! Merged data regularly carries tags written by older versions or typed by
//! hand: `en_US`, `EN-us`, bare private-use `x-kal`, deprecated language
//! subtags such as `iw`. All of these name a writing system that already has
//! a canonical BCP 47 spelling; [`normalize_ws_tag`] produces it.

use regex::Regex;
use std::sync::OnceLock;

/// Deprecated primary language subtags and their replacements.
const DEPRECATED_LANGUAGES: &[(&str, &str)] = &[
    ("iw", "he"),
    ("in", "id"),
    ("ji", "yi"),
    ("jw", "jv"),
    ("mo", "ro"),
];

/// Language subtag given to legacy tags that start directly with `x-`.
pub const PRIVATE_USE_LANGUAGE: &str = "qaa";

fn tag_shape() -> &'static Regex {
    static SHAPE: OnceLock<Regex> = OnceLock::new();
    SHAPE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9]{1,8}([_-][A-Za-z0-9]{1,8})*$").expect("static regex is valid")
    })
}

/// Canonical spelling of `tag`, or `None` when the tag is already canonical
/// (or too malformed to be recognized as a tag at all).
pub fn normalize_ws_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() || !tag_shape().is_match(trimmed) {
        return None;
    }

    let mut subtags: Vec<String> = trimmed
        .split(['-', '_'])
        .map(|s| s.to_string())
        .collect();

    if subtags[0].eq_ignore_ascii_case("x") {
        subtags.insert(0, PRIVATE_USE_LANGUAGE.to_string());
    }

    let mut in_private_use = false;
    for (i, subtag) in subtags.iter_mut().enumerate() {
        let lower = subtag.to_ascii_lowercase();
        if i == 0 {
            *subtag = DEPRECATED_LANGUAGES
                .iter()
                .find(|(old, _)| *old == lower)
                .map(|(_, new)| new.to_string())
                .unwrap_or(lower);
            continue;
        }
        if in_private_use || lower == "x" {
            in_private_use = true;
            *subtag = lower;
            continue;
        }
        *subtag = match subtag.len() {
            4 if subtag.chars().all(|c| c.is_ascii_alphabetic()) => {
                lower[..1].to_ascii_uppercase() + &lower[1..]
            }
            2 if subtag.chars().all(|c| c.is_ascii_alphabetic()) => subtag.to_ascii_uppercase(),
            _ => lower,
        };
    }

    let normalized = subtags.join("-");
    (normalized != tag).then_some(normalized)
}
