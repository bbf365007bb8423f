use thiserror::Error;

#[derive(Debug, Error)]
pub enum MfaError
{
    #[error("parameter has {found} coordinates but the model domain has {expected} dimensions")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("output buffer holds {found} values, expected {expected}")]
    OutputSizeMismatch { expected: usize, found: usize },
    #[error("parameter coordinate {dim} is not finite")]
    NonFiniteParameter { dim: usize },
    #[error("invalid knot vector in dimension {dim}: {reason}")]
    InvalidKnotVector { dim: usize, reason: &'static str },
    #[error("control lattice holds {found} values, knot mesh requires {expected}")]
    ControlPointCountMismatch { expected: usize, found: usize },
    #[error("batch of {len} values is not a whole number of {dom_dim}-coordinate parameters")]
    RaggedBatch { dom_dim: usize, len: usize },
    #[error("tensor region {0} does not exist")]
    InvalidRegion(usize),
    #[error("block has no variable {0}")]
    InvalidVariable(usize),
    #[error("invalid domain bounds: {0}")]
    InvalidBounds(&'static str),
    #[error("unsupported model shape: {0}")]
    UnsupportedShape(String),
    #[error("unsupported mfab version {0}")]
    UnsupportedVersion(u32),
    #[error("payload truncated: needed {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("{0} unexpected bytes after the payload")]
    TrailingBytes(usize),
    #[error("file I/O failed: {0}")]
    FileIOError(#[from] std::io::Error),
    #[error("failed to read buffer")]
    ReadBufferFailed,
    #[error("failed to write buffer")]
    WriteBufferFailed,
    #[error("serialization failed")]
    SerializationFailed,
    #[error("deserialization failed")]
    DeserializationFailed,
    #[error("lz4 decompression failed")]
    LZ4DecompressionFailed,
}
