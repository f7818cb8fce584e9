//! Argument tuples and their positional envelope layout.
//!
//! A handle is generic over one [`ArgList`]: `()` for a call without
//! arguments, `(T,)` for one, `(T1, T2)` for two. Arguments are written in
//! declaration order and read back in the same order, and every one of them
//! must be non-null under the codec.

use serde::{Serialize, de::DeserializeOwned};

use plumber_protocol::{Codec, EnvelopeReader, EnvelopeWriter, ProtocolError};

/// A fixed, ordered list of call arguments.
pub trait ArgList: Sized + 'static {
    /// Number of arguments.
    const ARITY: usize;

    /// Writes every argument, in order.
    fn encode<C: Codec>(
        &self,
        codec: &C,
        writer: &mut EnvelopeWriter<'_>,
    ) -> Result<(), ProtocolError>;

    /// Reads every argument, in order.
    fn decode<C: Codec>(
        codec: &C,
        reader: &mut EnvelopeReader<'_>,
    ) -> Result<Self, ProtocolError>;
}

impl ArgList for () {
    const ARITY: usize = 0;

    fn encode<C: Codec>(&self, _: &C, _: &mut EnvelopeWriter<'_>) -> Result<(), ProtocolError> {
        Ok(())
    }

    fn decode<C: Codec>(_: &C, _: &mut EnvelopeReader<'_>) -> Result<Self, ProtocolError> {
        Ok(())
    }
}

impl<T> ArgList for (T,)
where
    T: Serialize + DeserializeOwned + 'static,
{
    const ARITY: usize = 1;

    fn encode<C: Codec>(
        &self,
        codec: &C,
        writer: &mut EnvelopeWriter<'_>,
    ) -> Result<(), ProtocolError> {
        writer.write(codec, &self.0)
    }

    fn decode<C: Codec>(
        codec: &C,
        reader: &mut EnvelopeReader<'_>,
    ) -> Result<Self, ProtocolError> {
        Ok((reader.read(codec)?,))
    }
}

impl<T1, T2> ArgList for (T1, T2)
where
    T1: Serialize + DeserializeOwned + 'static,
    T2: Serialize + DeserializeOwned + 'static,
{
    const ARITY: usize = 2;

    fn encode<C: Codec>(
        &self,
        codec: &C,
        writer: &mut EnvelopeWriter<'_>,
    ) -> Result<(), ProtocolError> {
        writer.write(codec, &self.0)?;
        writer.write(codec, &self.1)
    }

    fn decode<C: Codec>(
        codec: &C,
        reader: &mut EnvelopeReader<'_>,
    ) -> Result<Self, ProtocolError> {
        let first = reader.read(codec)?;
        let second = reader.read(codec)?;
        Ok((first, second))
    }
}

/// Encodes `args` into `buf`, replacing its contents.
pub fn to_envelope<A: ArgList, C: Codec>(
    args: &A,
    codec: &C,
    buf: &mut Vec<u8>,
) -> Result<(), ProtocolError> {
    let mut writer = EnvelopeWriter::new(buf);
    args.encode(codec, &mut writer)
}

/// Decodes a whole envelope. Leftover bytes mean the two sides disagree on
/// the argument list, so they're an error rather than ignored.
pub fn from_envelope<A: ArgList, C: Codec>(codec: &C, payload: &[u8]) -> Result<A, ProtocolError> {
    let mut reader = EnvelopeReader::new(payload);
    let args = A::decode(codec, &mut reader)?;
    reader.finish()?;
    Ok(args)
}

#[cfg(test)]
mod tests {
    use plumber_protocol::JsonCodec;

    use super::*;

    #[test]
    fn test_two_args_decode_in_declaration_order() {
        let mut buf = Vec::new();
        to_envelope(&("Hello".to_string(), 1337i32), &JsonCodec, &mut buf).unwrap();

        let (message, value): (String, i32) = from_envelope(&JsonCodec, &buf).unwrap();
        assert_eq!(message, "Hello");
        assert_eq!(value, 1337);
    }

    #[test]
    fn test_unit_args_produce_empty_envelope() {
        let mut buf = vec![1, 2, 3];
        to_envelope(&(), &JsonCodec, &mut buf).unwrap();
        assert!(buf.is_empty());
        from_envelope::<(), _>(&JsonCodec, &buf).unwrap();
    }

    #[test]
    fn test_from_envelope_extra_argument_returns_trailing_bytes() {
        let mut buf = Vec::new();
        to_envelope(&(1u8, 2u8), &JsonCodec, &mut buf).unwrap();

        let result = from_envelope::<(u8,), _>(&JsonCodec, &buf);
        assert!(matches!(result, Err(ProtocolError::TrailingBytes { count: 5 })));
    }

    #[test]
    fn test_from_envelope_missing_argument_returns_truncated() {
        let mut buf = Vec::new();
        to_envelope(&(7u8,), &JsonCodec, &mut buf).unwrap();

        let result = from_envelope::<(u8, u8), _>(&JsonCodec, &buf);
        assert!(matches!(result, Err(ProtocolError::Truncated { index: 1, .. })));
    }

    #[test]
    fn test_to_envelope_null_second_argument_reports_index() {
        let mut buf = Vec::new();
        let result = to_envelope(&("ok".to_string(), None::<i32>), &JsonCodec, &mut buf);
        assert!(matches!(result, Err(ProtocolError::NullArgument { index: 1 })));
    }

    #[test]
    fn test_arity_constants() {
        assert_eq!(<() as ArgList>::ARITY, 0);
        assert_eq!(<(String,) as ArgList>::ARITY, 1);
        assert_eq!(<(String, i32) as ArgList>::ARITY, 2);
    }
}
