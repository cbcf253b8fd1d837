//! Text canonicalization used before any comparison.

/// Collapse whitespace runs to a single space, trim, and lower-case.
///
/// Nothing else is touched: punctuation stays, and Unicode is only case-folded
/// through [`str::to_lowercase`].
///
/// ```
/// use pdfbench_core::normalize;
///
/// assert_eq!(normalize("  The   QUICK\n\tbrown fox "), "the quick brown fox");
/// assert_eq!(normalize(""), "");
/// ```
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.to_lowercase()
}
