//! Ordered text rewrites for unpatched version guards.
//!
//! Each strategy is a pure `&str -> Option<String>` transformation. They are
//! tried in [`StrategyKind::ORDER`] and the first one that changes the text
//! wins; later strategies never see the output of earlier ones.

pub mod errors;
pub mod guard;
pub mod line_scan;
pub mod literal;
pub mod regex_block;

pub use errors::StrategyError;
pub use guard::{Guard, GuardMatcher, Keyword};
pub use line_scan::LineScan;
pub use literal::LiteralVariants;
pub use regex_block::RegexBlock;

use crate::config::PatchDefinition;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Multi-line regex over space-indented guard blocks
    Regex,
    /// Exact text of the one-line guards, spaces or tabs
    Literal,
    /// Indentation-aware scan over lines
    LineScan,
}

impl StrategyKind {
    pub const ORDER: [StrategyKind; 3] = [
        StrategyKind::Regex,
        StrategyKind::Literal,
        StrategyKind::LineScan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Regex => "regex",
            StrategyKind::Literal => "literal",
            StrategyKind::LineScan => "line-scan",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Strategy {
    fn kind(&self) -> StrategyKind;

    /// Rewritten text, or `None` when this strategy does not recognize `content`.
    fn apply(&self, content: &str) -> Option<String>;
}

/// The compiled strategy chain for one patch definition.
pub struct Strategies {
    chain: Vec<Box<dyn Strategy>>,
}

impl Strategies {
    pub fn compile(def: &PatchDefinition) -> Result<Self, StrategyError> {
        let chain: Vec<Box<dyn Strategy>> = vec![
            Box::new(RegexBlock::new(def)?),
            Box::new(LiteralVariants::new(def)),
            Box::new(LineScan::new(def)?),
        ];
        debug_assert!(chain
            .iter()
            .map(|s| s.kind())
            .eq(StrategyKind::ORDER.iter().copied()));
        Ok(Self { chain })
    }

    /// Run the chain, returning the first output that differs from `content`.
    pub fn apply(&self, content: &str) -> Option<(String, StrategyKind)> {
        for strategy in &self.chain {
            match strategy.apply(content) {
                Some(patched) if patched != content => {
                    tracing::debug!(strategy = %strategy.kind(), "strategy changed content");
                    return Some((patched, strategy.kind()));
                }
                _ => {
                    tracing::debug!(strategy = %strategy.kind(), "strategy did not match");
                }
            }
        }
        None
    }

    pub fn kinds(&self) -> impl Iterator<Item = StrategyKind> + '_ {
        self.chain.iter().map(|s| s.kind())
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.kinds()).finish()
    }
}
