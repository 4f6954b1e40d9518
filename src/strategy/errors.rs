use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("invalid generated pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("patch definition has no primary guard branch")]
    NoPrimaryBranch,
}
