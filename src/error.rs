use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinkError {
    #[error("antenna count {elements} is not a perfect square")]
    NonSquareArray { elements: usize },

    #[error("{streams} streams requested but the matrix supports at most {rank}")]
    StreamsExceedRank { streams: usize, rank: usize },

    #[error("dimension mismatch in {op}: expected {expected}, found {found}")]
    DimensionMismatch {
        op: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("SVD did not converge on a {rows}x{cols} matrix")]
    SvdDidNotConverge { rows: usize, cols: usize },

    #[error("power-capture ratio undefined for a zero-energy matrix")]
    ZeroChannelEnergy,

    #[error("trial {trial} produced a non-finite capacity")]
    NonFiniteCapacity { trial: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
