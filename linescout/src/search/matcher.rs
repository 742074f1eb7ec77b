use super::cache::CompiledPattern;
use crate::results::Match;

/// Decides whether one line satisfies the pattern.
///
/// Matching only reads the compiled program, so any number of workers may call
/// this concurrently against the same [`CompiledPattern`].
pub fn matches(compiled: &CompiledPattern, line: &str) -> bool {
    compiled.regex().is_match(line)
}

/// Strips the line terminator (`\n` or `\r\n`) left by a line-oriented read
pub fn strip_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

/// Builds the normalized record for a matching line
pub fn build_match(file: &str, line_number: usize, line: &str) -> Match {
    Match {
        file: file.to_string(),
        line: line_number,
        content: line.trim().to_string(),
    }
}

/// Matches `line` and, on success, returns its [`Match`] record
pub fn match_line(
    compiled: &CompiledPattern,
    file: &str,
    line_number: usize,
    line: &str,
) -> Option<Match> {
    matches(compiled, line).then(|| build_match(file, line_number, line))
}
