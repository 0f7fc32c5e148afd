use std::borrow::Cow;

/// Strips characters that are not allowed in XML 1.0 character data.
///
/// Removes C0 control characters except tab, newline and carriage return,
/// plus DEL.
///
/// Returns `Cow::Borrowed` when nothing needs removing.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_disallowed) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.chars().filter(|c| !is_disallowed(*c)).collect())
}

/// Sanitizes and trims a feed text field, mapping blank input to `None`.
pub fn clean_text(s: &str) -> Option<String> {
    let cleaned = strip_control_chars(s);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}

fn is_disallowed(c: char) -> bool {
    c == '\u{7f}' || (c < '\u{20}' && c != '\t' && c != '\n' && c != '\r')
}
