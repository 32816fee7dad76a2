//! Placeholder substitution in command tokens.

/// Replaced with the changed path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Replaced with the operation label (`CREATE`, `WRITE`, ...).
pub const EVENT_PLACEHOLDER: &str = "{event}";

/// Substitutes `{path}` and `{event}` in every token.
///
/// Substitution is verbatim: no quoting or escaping is applied, and each
/// token is handled independently.
///
/// # Examples
///
/// ```
/// use wr_runner::resolve_placeholders;
///
/// let tokens = vec!["process".to_owned(), "{path}".to_owned(), "--event={event}".to_owned()];
/// assert_eq!(
///     resolve_placeholders(&tokens, "/tmp/test.go", "CREATE"),
///     vec!["process", "/tmp/test.go", "--event=CREATE"],
/// );
/// ```
#[must_use]
pub fn resolve_placeholders(tokens: &[String], path: &str, event: &str) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            token
                .replace(PATH_PLACEHOLDER, path)
                .replace(EVENT_PLACEHOLDER, event)
        })
        .collect()
}
