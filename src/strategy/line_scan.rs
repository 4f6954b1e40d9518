//! Strategy 3: line-by-line scan for guards in layouts the other strategies miss.
//!
//! A guard's block is every following line that is blank, a comment, or
//! indented deeper than the guard. It ends at the first code line indented at
//! or above the guard (a sibling `elif`/`else` or a dedent). Blank and comment
//! lines after the last body line stay in place.

use crate::config::{PatchDefinition, PythonVersion};
use crate::strategy::errors::StrategyError;
use crate::strategy::guard::{leading_whitespace, Guard, GuardMatcher, BODY_INDENT};
use crate::strategy::{Strategy, StrategyKind};

#[derive(Debug, Clone)]
pub struct LineScan {
    matcher: GuardMatcher,
    subject: String,
    branches: Vec<(PythonVersion, String)>,
}

/// Extent of one guard block, as indices into the scanned lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Block<'a> {
    /// Index of the last body line
    last: usize,
    /// Indentation added by the first body line
    unit: &'a str,
}

impl LineScan {
    pub fn new(def: &PatchDefinition) -> Result<Self, StrategyError> {
        Ok(Self {
            matcher: GuardMatcher::new(&def.guard.subject)?,
            subject: def.guard.subject.clone(),
            branches: def
                .guard
                .branches
                .iter()
                .map(|branch| (branch.threshold, branch.body.clone()))
                .collect(),
        })
    }

    fn body_for(&self, threshold: PythonVersion) -> Option<&str> {
        self.branches
            .iter()
            .find(|(t, _)| *t == threshold)
            .map(|(_, body)| body.as_str())
    }
}

/// Find the block that follows the guard at `guard_idx`.
fn block_after<'a>(lines: &[&'a str], guard_idx: usize, base: &str) -> Option<Block<'a>> {
    let mut found: Option<Block<'a>> = None;

    for (idx, line) in lines.iter().copied().enumerate().skip(guard_idx + 1) {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let indent = leading_whitespace(line);
        if indent.len() <= base.len() || !indent.starts_with(base) {
            if text.starts_with('#') {
                continue;
            }
            break;
        }

        let unit = found.map_or(&indent[base.len()..], |block| block.unit);
        found = Some(Block { last: idx, unit });
    }

    found
}

fn line_ending(line: &str) -> &'static str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else {
        "\n"
    }
}

impl Strategy for LineScan {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LineScan
    }

    fn apply(&self, content: &str) -> Option<String> {
        let lines: Vec<&str> = content.split_inclusive('\n').collect();
        let mut out = String::with_capacity(content.len() + 1024);
        let mut changed = false;
        let mut idx = 0;

        while idx < lines.len() {
            let line = lines[idx];
            let guard = self.matcher.parse(line).and_then(|(keyword, threshold)| {
                Some((keyword, threshold, self.body_for(threshold)?))
            });

            let Some((keyword, threshold, body)) = guard else {
                out.push_str(line);
                idx += 1;
                continue;
            };

            let base = leading_whitespace(line);
            let Some(block) = block_after(&lines, idx, base) else {
                tracing::debug!(line = idx + 1, "guard without a body, leaving it alone");
                out.push_str(line);
                idx += 1;
                continue;
            };

            tracing::debug!(
                line = idx + 1,
                through = block.last + 1,
                %threshold,
                "line scan replacing guard block"
            );

            let unit = if block.unit.is_empty() {
                BODY_INDENT
            } else {
                block.unit
            };
            let newline = line_ending(line);
            let guard = Guard::new(keyword, &self.subject, threshold);
            let rendered = guard.render_block(body, base, unit, newline);
            if lines[block.last].ends_with('\n') {
                out.push_str(&rendered);
            } else {
                // Last line of a file without a trailing newline
                out.push_str(rendered.strip_suffix(newline).unwrap_or(&rendered));
            }

            idx = block.last + 1;
            changed = true;
        }

        changed.then_some(out)
    }
}
