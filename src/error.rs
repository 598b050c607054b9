use thiserror::Error;

/// Validation and setup failures raised by the analysis pipeline.
///
/// Too little data is never an error here: the analyzers return a degraded
/// summary with `sufficient_data = false` instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("mood score {0} is outside the accepted range 1-10")]
    ScoreOutOfRange(i32),

    #[error("period of {days} days is outside the accepted range 1-{max}")]
    InvalidPeriod { days: i64, max: i64 },

    #[error("user commitment must not be empty")]
    EmptyCommitment,

    #[error("user commitment is {len} characters, longer than the {max} allowed")]
    CommitmentTooLong { len: usize, max: usize },

    #[error("unknown risk level: {0}")]
    InvalidRiskLevel(String),

    #[error("invalid analysis config: {0}")]
    Config(String),

    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
