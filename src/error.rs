use thiserror::Error;

/// Errors produced by a pluggable mip compressor.
///
/// A compressor failure is never fatal to the process: the build worker logs
/// it with the asset and target format and leaves the artifact empty with an
/// unknown pixel format until a retry succeeds.
#[derive(Debug, Clone, Error)]
pub enum CompressError {
    /// The compressor does not implement the requested target format.
    #[error("unsupported texture format: {0}")]
    UnsupportedFormat(String),

    /// The source data cannot be compressed (bad dimensions, truncated
    /// payload, unrepresentable pixel layout).
    #[error("invalid source data: {0}")]
    InvalidSource(String),

    /// The underlying codec failed.
    #[error("compression failed: {0}")]
    Failed(String),
}

/// Errors decoding a serialized artifact or mip payload.
///
/// A decode failure means the cached entry is stale or corrupt; callers
/// treat it exactly like a cache miss and rebuild from source.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// The payload ended before a field could be read.
    #[error("unexpected end of data: need {needed} bytes at offset {offset}, have {available}")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A length prefix was negative.
    #[error("negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string field was not valid UTF-8.
    #[error("invalid string payload: {0}")]
    InvalidString(String),

    /// A mip record carried an unrecognized payload tag.
    #[error("unknown mip payload tag: {0}")]
    UnknownPayloadTag(u8),
}
