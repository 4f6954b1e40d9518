//! Context shown to the operator when no strategy recognized the file.

use std::fmt;

/// Lines shown after each line that mentions the guard subject.
pub const TRAILING_CONTEXT: usize = 2;

/// A single source line with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    pub line: usize,
    pub text: String,
}

impl fmt::Display for ContextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5} | {}", self.line, self.text)
    }
}

/// Every line mentioning `subject`, each followed by [`TRAILING_CONTEXT`] lines.
///
/// Overlapping windows are merged; output is in file order without duplicates.
pub fn guard_context(content: &str, subject: &str) -> Vec<ContextLine> {
    let lines: Vec<&str> = content.lines().collect();
    let mut out: Vec<ContextLine> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if !line.contains(subject) {
            continue;
        }

        let start = out.last().map_or(idx, |last| idx.max(last.line));
        let end = (idx + TRAILING_CONTEXT + 1).min(lines.len());
        for (offset, text) in lines[start..end].iter().enumerate() {
            out.push(ContextLine {
                line: start + offset + 1,
                text: text.to_string(),
            });
        }
    }

    out
}
