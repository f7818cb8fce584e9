//! Codec trait and implementations for serializing single argument values.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! The envelope layer doesn't care HOW an argument is serialized: it just
//! needs something that implements the [`Codec`] trait, plus one extra
//! question the codec alone can answer: "is this the null value?"
//!
//! Provided codecs:
//! - [`JsonCodec`] (feature `json`, default): human-readable, easy to log.
//! - [`MsgPackCodec`] (feature `msgpack`): compact binary.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode argument values to bytes and decode them back.
///
/// ## Trait bounds
///
/// - `Send + Sync` → a codec is captured by dispatch hooks that the registry
///   may run from any thread.
/// - `Clone` → each registered operation keeps its own copy.
/// - `'static` → the codec owns everything it needs.
pub trait Codec: Send + Sync + Clone + 'static {
    /// Appends the serialized form of `value` to `out`.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value can't be represented in
    /// this format.
    fn encode_into<T: Serialize + ?Sized>(
        &self,
        value: &T,
        out: &mut Vec<u8>,
    ) -> Result<(), ProtocolError>;

    /// Serializes a value into a fresh byte vector.
    fn encode<T: Serialize + ?Sized>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut out = Vec::new();
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or don't
    /// match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;

    /// Returns `true` if `encoded` is this codec's representation of null
    /// (`None`, `()`, a unit struct...).
    ///
    /// Remote calls refuse to send such arguments.
    fn is_null(&self, encoded: &[u8]) -> bool;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use plumber_protocol::{Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&("hello", 42)).unwrap();
/// let decoded: (String, i32) = codec.decode(&bytes).unwrap();
/// assert_eq!(decoded, ("hello".to_string(), 42));
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode_into<T: Serialize + ?Sized>(
        &self,
        value: &T,
        out: &mut Vec<u8>,
    ) -> Result<(), ProtocolError> {
        // `&mut Vec<u8>` implements `io::Write`, so serde_json can stream
        // straight into the (possibly pooled) buffer.
        serde_json::to_writer(out, value)
            .map_err(|e| ProtocolError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data)
            .map_err(|e| ProtocolError::Decode(Box::new(e)))
    }

    fn is_null(&self, encoded: &[u8]) -> bool {
        encoded == b"null"
    }
}

// ---------------------------------------------------------------------------
// MsgPackCodec
// ---------------------------------------------------------------------------

/// MessagePack nil marker.
#[cfg(feature = "msgpack")]
const MSGPACK_NIL: u8 = 0xc0;

/// A [`Codec`] that uses MessagePack (via `rmp-serde`).
///
/// Structs are written as maps (`write_named`) so field order changes on
/// one side don't silently shift values on the other.
#[cfg(feature = "msgpack")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

#[cfg(feature = "msgpack")]
impl Codec for MsgPackCodec {
    fn encode_into<T: Serialize + ?Sized>(
        &self,
        value: &T,
        out: &mut Vec<u8>,
    ) -> Result<(), ProtocolError> {
        rmp_serde::encode::write_named(out, value)
            .map_err(|e| ProtocolError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        rmp_serde::from_slice(data)
            .map_err(|e| ProtocolError::Decode(Box::new(e)))
    }

    fn is_null(&self, encoded: &[u8]) -> bool {
        encoded == [MSGPACK_NIL]
    }
}
