//! SQL utility functions

/// Escape SQL LIKE metacharacters (%, _, \) in user input.
///
/// Pair the resulting pattern with `ESCAPE '\'` in the query.
pub fn escape_like_pattern(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Build a case-insensitive substring pattern for `LOWER(col) LIKE ? ESCAPE '\'`
pub fn contains_pattern(keyword: &str) -> String {
    format!("%{}%", escape_like_pattern(&keyword.to_lowercase()))
}
