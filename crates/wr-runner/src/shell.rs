//! Deciding when a command is handed to the platform shell.
//!
//! Commands are normally executed directly, without a shell. On Windows a
//! command that names a shell or uses shell operators is passed whole to
//! `cmd.exe /C`, since direct execution cannot resolve pipes or redirections.
//! This is the only place command text is interpreted; configured commands
//! are trusted input.

const SHELLS: &[&str] = &["sh", "bash", "cmd", "cmd.exe", "powershell", "pwsh"];

/// Covers `|`, `||`, `>`, `>>`, `<`, `&` and `&&`.
const OPERATORS: &[char] = &['|', '>', '<', '&'];

/// Returns `true` if the tokens need shell interpretation: the first token is
/// a known shell, or any token contains a pipe, redirection or logical
/// operator.
///
/// # Examples
///
/// ```
/// use wr_runner::needs_shell_interpretation;
///
/// let tokens = |t: &[&str]| t.iter().map(|s| s.to_string()).collect::<Vec<_>>();
/// assert!(needs_shell_interpretation(&tokens(&["bash", "-c", "make"])));
/// assert!(needs_shell_interpretation(&tokens(&["go", "test", "|", "tee", "log"])));
/// assert!(!needs_shell_interpretation(&tokens(&["cargo", "test"])));
/// ```
#[must_use]
pub fn needs_shell_interpretation(tokens: &[String]) -> bool {
    let Some(first) = tokens.first() else {
        return false;
    };
    if SHELLS.contains(&first.to_lowercase().as_str()) {
        return true;
    }
    tokens.iter().any(|token| token.contains(OPERATORS))
}

/// Splits tokens into a program and its arguments.
///
/// With `windows` set and [`needs_shell_interpretation`] true, the whole
/// command line becomes a single `cmd.exe /C` argument. Returns `None` for an
/// empty token list.
#[must_use]
pub fn program_and_args(tokens: &[String], windows: bool) -> Option<(String, Vec<String>)> {
    let (first, rest) = tokens.split_first()?;
    if windows && needs_shell_interpretation(tokens) {
        return Some(("cmd.exe".to_owned(), vec!["/C".to_owned(), tokens.join(" ")]));
    }
    Some((first.clone(), rest.to_vec()))
}
