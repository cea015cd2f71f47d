use std::sync::LazyLock;

use regex::Regex;

static NON_TITLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w ]").unwrap());

/// Drops every character that is neither a word character nor a plain space.
pub fn normalize_title(text: &str) -> String {
    NON_TITLE_CHARS.replace_all(text, "").into_owned()
}

/// Two digit minimum, no maximum width.
pub fn zero_pad(n: u32) -> String {
    format!("{:02}", n)
}
