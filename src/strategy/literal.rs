//! Strategy 2: exact-text variants of the unpatched guards.
//!
//! Every branch threshold is tried with both keywords and both indentation
//! styles. Each standalone occurrence is replaced with the branch's block
//! rendered in the same keyword and indentation.

use crate::config::PatchDefinition;
use crate::strategy::guard::{Guard, Keyword, BODY_INDENT};
use crate::strategy::{Strategy, StrategyKind};

const INDENT_UNITS: [&str; 2] = [BODY_INDENT, "\t"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variant {
    pub needle: String,
    pub replacement: String,
}

#[derive(Debug, Clone)]
pub struct LiteralVariants {
    variants: Vec<Variant>,
}

impl LiteralVariants {
    pub fn new(def: &PatchDefinition) -> Self {
        let subject = def.guard.subject.as_str();
        let original = def.guard.original.trim();

        let mut variants = Vec::new();
        for branch in &def.guard.branches {
            for keyword in Keyword::ALL {
                let guard = Guard::new(keyword, subject, branch.threshold);
                for unit in INDENT_UNITS {
                    let rendered = guard.render_block(&branch.body, "", unit, "\n");
                    variants.push(Variant {
                        needle: format!("{}\n{}{}", guard.line(), unit, original),
                        replacement: rendered
                            .strip_suffix('\n')
                            .unwrap_or(&rendered)
                            .to_string(),
                    });
                }
            }
        }

        Self { variants }
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

impl Strategy for LiteralVariants {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Literal
    }

    fn apply(&self, content: &str) -> Option<String> {
        let mut current = content.to_string();
        let mut changed = false;

        for variant in &self.variants {
            let starts = standalone_matches(&current, &variant.needle);
            if starts.is_empty() {
                continue;
            }
            tracing::debug!(
                needle = %variant.needle.escape_debug(),
                count = starts.len(),
                "literal variant matched"
            );

            // Back to front so earlier offsets stay valid
            for start in starts.into_iter().rev() {
                current.replace_range(start..start + variant.needle.len(), &variant.replacement);
            }
            changed = true;
        }

        changed.then_some(current)
    }
}

/// Offsets of `needle` that start a statement and end a line.
///
/// Rejects `if ...` inside `elif ...` and `asyncio.run` inside `asyncio.runner`.
fn standalone_matches(content: &str, needle: &str) -> Vec<usize> {
    content
        .match_indices(needle)
        .map(|(start, _)| start)
        .filter(|&start| {
            let before = content[..start].chars().next_back();
            let after = content[start + needle.len()..].chars().next();
            matches!(before, None | Some('\n' | ' ' | '\t'))
                && matches!(after, None | Some('\n' | '\r' | ' ' | '\t' | '#' | ';'))
        })
        .collect()
}
