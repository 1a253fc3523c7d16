// src/utils/html.rs

use std::collections::HashSet;
use std::sync::LazyLock;

use ammonia::Builder;

/// Inline formatting kept in question text, choices and explanations.
static QUIZ_TEXT_TAGS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ["b", "i", "em", "strong", "code", "pre", "br", "sub", "sup", "p"]
        .into_iter()
        .collect()
});

/// Sanitizes admin-supplied quiz text before it is stored.
///
/// Only a small set of formatting tags survives; scripts, links and every
/// attribute are stripped.
pub fn clean_html(input: &str) -> String {
    Builder::default()
        .tags(QUIZ_TEXT_TAGS.clone())
        .clean(input)
        .to_string()
        .trim()
        .to_string()
}
