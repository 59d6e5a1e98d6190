use std::borrow::Cow;

/// Ellipsis appended when a string is shortened
const ELLIPSIS: &str = "...";

/// Collapses every run of whitespace to a single space and trims both ends.
///
/// Returns `Cow::Borrowed` when the input is already in that form.
///
/// # Examples
///
/// ```
/// use atomfeed::util::collapse_whitespace;
///
/// assert_eq!(collapse_whitespace("  Mon,\n 2 Jan  "), "Mon, 2 Jan");
/// assert_eq!(collapse_whitespace("tidy"), "tidy");
/// ```
pub fn collapse_whitespace(s: &str) -> Cow<'_, str> {
    let tidy = s.split_whitespace().map(str::len).sum::<usize>()
        + s.split_whitespace().count().saturating_sub(1)
        == s.len();
    if tidy && !s.chars().any(|c| c.is_whitespace() && c != ' ') {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Flattens `s` onto one line and limits it to `max_chars` characters.
///
/// If truncation is needed the result ends in "..." and still fits within
/// `max_chars`. Widths too small for an ellipsis get a plain cut.
pub fn single_line(s: &str, max_chars: usize) -> Cow<'_, str> {
    let flat = collapse_whitespace(s);
    if flat.chars().count() <= max_chars {
        return flat;
    }
    if max_chars <= ELLIPSIS.len() {
        return Cow::Owned(flat.chars().take(max_chars).collect());
    }
    let mut out: String = flat.chars().take(max_chars - ELLIPSIS.len()).collect();
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_borrows_tidy_input() {
        assert!(matches!(collapse_whitespace("a b c"), Cow::Borrowed("a b c")));
        assert!(matches!(collapse_whitespace(""), Cow::Borrowed("")));
    }

    #[test]
    fn test_collapse_rewrites_untidy_input() {
        assert_eq!(collapse_whitespace(" a  b "), "a b");
        assert_eq!(collapse_whitespace("a\tb"), "a b");
        assert_eq!(collapse_whitespace("a\nb"), "a b");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_single_line_fits() {
        assert_eq!(single_line("Short", 10), "Short");
        assert_eq!(single_line("Exactly10!", 10), "Exactly10!");
    }

    #[test]
    fn test_single_line_truncates() {
        assert_eq!(single_line("Hello, World!", 8), "Hello...");
        assert_eq!(single_line("Hello\n\nWorld", 20), "Hello World");
    }

    #[test]
    fn test_single_line_narrow_widths() {
        assert_eq!(single_line("Hello", 0), "");
        assert_eq!(single_line("Hello", 2), "He");
    }

    #[test]
    fn test_single_line_counts_chars_not_bytes() {
        assert_eq!(single_line("héllo wörld", 8), "héllo...");
    }
}
