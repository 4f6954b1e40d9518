//! Strategy 1: regular-expression rewrite of space-indented guard blocks.
//!
//! The primary branch matches a column-zero `if`/`elif` guard for its
//! threshold followed by its whole four-space-indented body. Blank lines and
//! comments between body lines belong to the block; the first code line that
//! is not indented by four spaces ends it. Every other branch matches only
//! when its body is the original one-line statement.

use crate::config::{Branch, PatchDefinition};
use crate::strategy::errors::StrategyError;
use crate::strategy::guard::{Guard, Keyword, BODY_INDENT};
use crate::strategy::{Strategy, StrategyKind};
use regex::{Captures, Regex};

/// First body line, then further four-space lines with blank or comment lines between.
const ANY_BODY: &str =
    r" {4}[^\n]*(?:\n|\z)(?:(?:[ \t]*(?:#[^\n]*)?\n)* {4}[^\n]*(?:\n|\z))*";

/// Compiled pattern and pre-rendered replacements for one branch.
#[derive(Debug, Clone)]
struct BranchPattern {
    pattern: Regex,
    if_block: String,
    elif_block: String,
}

impl BranchPattern {
    fn compile(subject: &str, branch: &Branch, body: &str) -> Result<Self, StrategyError> {
        let pattern = format!(
            r"(?m)^(if|elif) {} >= \({}, {}\):[ \t]*\n{}",
            regex::escape(subject),
            branch.threshold.major,
            branch.threshold.minor,
            body,
        );
        let compiled = Regex::new(&pattern).map_err(|e| StrategyError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        let render = |keyword| {
            Guard::new(keyword, subject, branch.threshold).render_block(
                &branch.body,
                "",
                BODY_INDENT,
                "\n",
            )
        };

        Ok(Self {
            pattern: compiled,
            if_block: render(Keyword::If),
            elif_block: render(Keyword::Elif),
        })
    }

    fn replacement(&self, caps: &Captures) -> String {
        let block = if &caps[1] == "elif" {
            &self.elif_block
        } else {
            &self.if_block
        };
        // A block that ran to the end of the file keeps its missing newline
        if caps[0].ends_with('\n') {
            block.clone()
        } else {
            block.trim_end_matches('\n').to_string()
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegexBlock {
    branches: Vec<BranchPattern>,
}

impl RegexBlock {
    pub fn new(def: &PatchDefinition) -> Result<Self, StrategyError> {
        let primary = def.primary_branch().ok_or(StrategyError::NoPrimaryBranch)?;
        let subject = def.guard.subject.as_str();
        let original = format!(
            r" {{4}}{}[ \t]*(?:#[^\n]*)?(?:\n|\z)",
            regex::escape(def.guard.original.trim())
        );

        let mut branches = vec![BranchPattern::compile(subject, primary, ANY_BODY)?];
        for branch in def.guard.branches.iter().skip(1) {
            branches.push(BranchPattern::compile(subject, branch, &original)?);
        }

        Ok(Self { branches })
    }
}

impl Strategy for RegexBlock {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Regex
    }

    fn apply(&self, content: &str) -> Option<String> {
        let mut current = content.to_string();
        let mut changed = false;

        for branch in &self.branches {
            if !branch.pattern.is_match(&current) {
                continue;
            }
            current = branch
                .pattern
                .replace_all(&current, |caps: &Captures| branch.replacement(caps))
                .into_owned();
            changed = true;
        }

        changed.then_some(current)
    }
}
