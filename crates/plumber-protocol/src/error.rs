//! Error types for the protocol layer.
//!
//! Every failure here is about bytes: a value that could not be encoded, an
//! envelope that does not match the layout its handle declared, or an
//! argument the codec cannot carry.

/// Boxed source error from whichever codec produced it.
pub type CodecSource = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[error("encode failed: {0}")]
    Encode(#[source] CodecSource),

    /// Deserialization failed (turning bytes into a Rust value).
    ///
    /// Seeing this on an inbound call means both sides disagree about the
    /// argument types of an operation.
    #[error("decode failed: {0}")]
    Decode(#[source] CodecSource),

    /// The envelope ended before the declared argument layout did.
    #[error("envelope truncated at argument {index}: needed {needed} bytes, {remaining} left")]
    Truncated {
        index: usize,
        needed: usize,
        remaining: usize,
    },

    /// Bytes were left over after every declared argument was read.
    #[error("{count} trailing bytes after last argument")]
    TrailingBytes { count: usize },

    /// The argument encodes to the codec's null value, which the receiving
    /// side cannot turn back into the declared type.
    #[error("argument {index} encodes as null and cannot be sent")]
    NullArgument { index: usize },
}
