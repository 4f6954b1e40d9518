//! Rendering and recognition of `if sys.version_info >= (X, Y):` guards.

use crate::config::PythonVersion;
use crate::strategy::errors::StrategyError;
use regex::Regex;

/// Width of one indentation level in patch bodies.
pub const BODY_INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    If,
    Elif,
}

impl Keyword {
    /// `elif` first: an `if` needle is a suffix of the matching `elif` text.
    pub const ALL: [Keyword; 2] = [Keyword::Elif, Keyword::If];

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::Elif => "elif",
        }
    }

    pub fn parse(word: &str) -> Option<Self> {
        match word {
            "if" => Some(Keyword::If),
            "elif" => Some(Keyword::Elif),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guard<'a> {
    pub keyword: Keyword,
    pub subject: &'a str,
    pub threshold: PythonVersion,
}

impl<'a> Guard<'a> {
    pub fn new(keyword: Keyword, subject: &'a str, threshold: PythonVersion) -> Self {
        Self {
            keyword,
            subject,
            threshold,
        }
    }

    /// Canonical guard line without indentation or line ending.
    pub fn line(&self) -> String {
        format!(
            "{} {} >= {}:",
            self.keyword.as_str(),
            self.subject,
            self.threshold.tuple_literal()
        )
    }

    /// Render the guard followed by `body`.
    ///
    /// `body` uses [`BODY_INDENT`] per nesting level; each level is rewritten
    /// to `unit` and every non-blank line is prefixed with `base`. The result
    /// always ends with `newline`.
    pub fn render_block(&self, body: &str, base: &str, unit: &str, newline: &str) -> String {
        let mut out = String::with_capacity(body.len() + 64);
        out.push_str(base);
        out.push_str(&self.line());
        out.push_str(newline);

        for line in body.lines() {
            if line.trim().is_empty() {
                out.push_str(newline);
                continue;
            }
            out.push_str(base);
            out.push_str(&reindent(line, unit));
            out.push_str(newline);
        }

        out
    }
}

/// Re-express a body line (one implicit level deep) in terms of `unit`.
fn reindent(line: &str, unit: &str) -> String {
    let spaces = line.len() - line.trim_start_matches(' ').len();
    let levels = spaces / BODY_INDENT.len();
    let remainder = spaces % BODY_INDENT.len();

    let mut out = unit.repeat(levels + 1);
    out.push_str(&" ".repeat(remainder));
    out.push_str(&line[spaces..]);
    out
}

/// Leading whitespace of `line`.
pub fn leading_whitespace(line: &str) -> &str {
    let trimmed = line.trim_start_matches([' ', '\t']);
    &line[..line.len() - trimmed.len()]
}

/// Whitespace-tolerant matcher for guard lines of one subject.
#[derive(Debug, Clone)]
pub struct GuardMatcher {
    pattern: Regex,
}

impl GuardMatcher {
    pub fn new(subject: &str) -> Result<Self, StrategyError> {
        let pattern = format!(
            r"^(if|elif)\s+{}\s*>=\s*\(\s*(\d+)\s*,\s*(\d+)\s*\)\s*:\s*(?:#.*)?$",
            regex::escape(subject)
        );
        let pattern = Regex::new(&pattern).map_err(|e| StrategyError::InvalidPattern {
            pattern,
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Parse a (possibly indented) line into its keyword and threshold.
    pub fn parse(&self, line: &str) -> Option<(Keyword, PythonVersion)> {
        let caps = self.pattern.captures(line.trim())?;
        let keyword = Keyword::parse(&caps[1])?;
        let major = caps[2].parse().ok()?;
        let minor = caps[3].parse().ok()?;
        Some((keyword, PythonVersion::new(major, minor)))
    }
}
