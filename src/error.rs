use thiserror::Error;

/// Errors produced by the field, matrix and FMSR layers.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FmsrError {
    #[error("unsupported (k={k}, n={n}) parameters: FMSR requires n-k=2 and n>=4")]
    UnsupportedParams { k: u8, n: u8 },

    #[error("unsupported number of simultaneous erasures: {0} (FMSR repairs exactly one)")]
    UnsupportedErasureCount(u8),

    #[error("too few chunks supplied for decode: got {got}, need at least {need}")]
    TooFewChunks { got: u8, need: u8 },

    #[error("chunk index {0} is out of range for the current encoding matrix")]
    BadChunkIndex(u8),

    #[error("submatrix is singular and cannot be inverted")]
    SingularSubmatrix,

    #[error("no valid repair coefficients found within {0} rounds")]
    NoCoefficientsFound(u32),

    #[error("no decode matrix supplied and create_new was false")]
    MissingDecodeMatrix,

    #[error("persisted metadata blob is too short or not valid decimal ASCII")]
    MalformedMetadata,

    #[error("config TOML could not be parsed")]
    InvalidToml,

    #[error("rmds check requires mds to also be enabled")]
    RmdsRequiresMds,

    #[error("workers must be at least 1")]
    ZeroWorkers,

    #[error("lazy_threshold ({lazy}) must not exceed num_checks_threshold ({total})")]
    InvalidThresholds { lazy: u32, total: u32 },
}
