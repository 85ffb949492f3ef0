use std::io::Write;

use crate::error::CompileError;

/// Writes a compile error together with the offending source line.
///
/// The report has three lines: `(N) message` where `N` is the 1-based line
/// number, the source line itself with tabs replaced by spaces, and a `^`
/// marker under the offending column.
///
/// # Errors
/// Returns any I/O error raised by the output writer.
///
/// # Example
/// ```
/// use tessera::error::{CompileError, report::write_report};
///
/// let error = CompileError::UndeclaredIdentifier { name: "x".to_string(),
///                                                  line: 0,
///                                                  col:  7, };
/// let mut out = Vec::new();
/// write_report(&error, "number x;", &mut out).unwrap();
///
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("(1) Semantic error"));
/// assert!(text.ends_with("       ^\n"));
/// ```
pub fn write_report(error: &CompileError,
                    source: &str,
                    output: &mut impl Write)
                    -> std::io::Result<()> {
    writeln!(output, "({}) {error}", error.line() + 1)?;

    let Some(line) = source.lines().nth(error.line()) else {
        return Ok(());
    };

    let line: String = line.chars().map(|c| if c == '\t' { ' ' } else { c }).collect();

    writeln!(output, "{line}")?;
    writeln!(output, "{:>width$}", "^", width = error.col() + 1)
}

/// Renders the report of [`write_report`] into a `String`.
#[must_use]
pub fn report_to_string(error: &CompileError, source: &str) -> String {
    let mut out = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_report(error, source, &mut out);
    String::from_utf8_lossy(&out).into_owned()
}
