//! Argument envelopes: the byte layout of one call's arguments.
//!
//! Each argument is written as a little-endian `u32` length followed by the
//! codec's bytes for that value:
//!
//! ```text
//! ┌──────────┬───────────────┬──────────┬───────────────┐
//! │ len0: u32│ arg0 bytes... │ len1: u32│ arg1 bytes... │
//! └──────────┴───────────────┴──────────┴───────────────┘
//! ```
//!
//! The length prefix keeps each argument's byte range explicit, so reading
//! argument 1 can never consume bytes that belong to argument 2, whatever
//! the codec.

use serde::{Serialize, de::DeserializeOwned};

use crate::{Codec, ProtocolError};

/// Size of the per-argument length prefix.
pub const LENGTH_PREFIX: usize = 4;

/// Appends arguments to an envelope buffer in declaration order.
pub struct EnvelopeWriter<'a> {
    buf: &'a mut Vec<u8>,
    args: usize,
}

impl<'a> EnvelopeWriter<'a> {
    /// Starts a new envelope in `buf`, discarding whatever it held.
    pub fn new(buf: &'a mut Vec<u8>) -> Self {
        buf.clear();
        Self { buf, args: 0 }
    }

    /// Encodes one argument.
    ///
    /// # Errors
    /// - [`ProtocolError::NullArgument`] if the value encodes as null; the
    ///   partial write is rolled back.
    /// - [`ProtocolError::Encode`] if the codec fails.
    pub fn write<C: Codec, T: Serialize + ?Sized>(
        &mut self,
        codec: &C,
        value: &T,
    ) -> Result<(), ProtocolError> {
        let index = self.args;
        let start = self.buf.len();

        // Reserve the prefix, encode, then patch the real length in.
        self.buf.extend_from_slice(&[0; LENGTH_PREFIX]);
        if let Err(e) = codec.encode_into(value, self.buf) {
            self.buf.truncate(start);
            return Err(e);
        }

        let body = &self.buf[start + LENGTH_PREFIX..];
        if codec.is_null(body) {
            self.buf.truncate(start);
            return Err(ProtocolError::NullArgument { index });
        }

        let len = match u32::try_from(body.len()) {
            Ok(len) => len,
            Err(_) => {
                self.buf.truncate(start);
                return Err(ProtocolError::Encode(
                    format!("argument {index} exceeds u32::MAX bytes").into(),
                ));
            }
        };
        self.buf[start..start + LENGTH_PREFIX]
            .copy_from_slice(&len.to_le_bytes());
        self.args += 1;
        Ok(())
    }

    /// Number of arguments written so far.
    pub fn arg_count(&self) -> usize {
        self.args
    }
}

/// Reads arguments back out of an envelope, front to back.
#[derive(Debug)]
pub struct EnvelopeReader<'a> {
    data: &'a [u8],
    cursor: usize,
    index: usize,
}

impl<'a> EnvelopeReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            cursor: 0,
            index: 0,
        }
    }

    /// Decodes the next argument and advances the cursor past it.
    ///
    /// # Errors
    /// - [`ProtocolError::Truncated`] if the prefix or body is cut short.
    /// - [`ProtocolError::Decode`] if the bytes don't decode as `T`.
    pub fn read<C: Codec, T: DeserializeOwned>(
        &mut self,
        codec: &C,
    ) -> Result<T, ProtocolError> {
        let rest = &self.data[self.cursor..];
        if rest.len() < LENGTH_PREFIX {
            return Err(ProtocolError::Truncated {
                index: self.index,
                needed: LENGTH_PREFIX,
                remaining: rest.len(),
            });
        }

        let mut prefix = [0u8; LENGTH_PREFIX];
        prefix.copy_from_slice(&rest[..LENGTH_PREFIX]);
        let len = u32::from_le_bytes(prefix) as usize;

        let body = &rest[LENGTH_PREFIX..];
        if body.len() < len {
            return Err(ProtocolError::Truncated {
                index: self.index,
                needed: len,
                remaining: body.len(),
            });
        }

        let value = codec.decode(&body[..len])?;
        self.cursor += LENGTH_PREFIX + len;
        self.index += 1;
        Ok(value)
    }

    /// Byte offset of the next unread argument.
    pub fn position(&self) -> usize {
        self.cursor
    }

    /// Checks that every byte was consumed.
    ///
    /// # Errors
    /// [`ProtocolError::TrailingBytes`] if anything is left.
    pub fn finish(self) -> Result<(), ProtocolError> {
        let count = self.data.len() - self.cursor;
        if count == 0 {
            Ok(())
        } else {
            Err(ProtocolError::TrailingBytes { count })
        }
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::JsonCodec;

    #[test]
    fn test_write_then_read_respects_declaration_order() {
        let codec = JsonCodec;
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf);
        writer.write(&codec, "hello").unwrap();
        writer.write(&codec, &42i32).unwrap();
        assert_eq!(writer.arg_count(), 2);

        // "hello" is 7 JSON bytes, 42 is 2.
        assert_eq!(buf.len(), LENGTH_PREFIX + 7 + LENGTH_PREFIX + 2);

        let mut reader = EnvelopeReader::new(&buf);
        let first: String = reader.read(&codec).unwrap();
        assert_eq!(reader.position(), LENGTH_PREFIX + 7);
        let second: i32 = reader.read(&codec).unwrap();
        assert_eq!((first.as_str(), second), ("hello", 42));
        reader.finish().unwrap();
    }

    #[test]
    fn test_new_clears_previous_contents() {
        let mut buf = b"stale".to_vec();
        let writer = EnvelopeWriter::new(&mut buf);
        assert_eq!(writer.arg_count(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_null_rolls_back_and_errors() {
        let codec = JsonCodec;
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf);
        writer.write(&codec, &1u8).unwrap();

        let result = writer.write(&codec, &None::<String>);

        assert!(matches!(
            result,
            Err(ProtocolError::NullArgument { index: 1 })
        ));
        assert_eq!(writer.arg_count(), 1);
        assert_eq!(buf.len(), LENGTH_PREFIX + 1);
    }

    #[test]
    fn test_read_truncated_prefix_returns_error() {
        let codec = JsonCodec;
        let mut reader = EnvelopeReader::new(&[1, 0]);
        let result: Result<u8, _> = reader.read(&codec);
        assert!(matches!(
            result,
            Err(ProtocolError::Truncated { index: 0, needed: 4, remaining: 2 })
        ));
    }

    #[test]
    fn test_read_truncated_body_returns_error() {
        let codec = JsonCodec;
        // Claims 10 bytes of body, carries 2.
        let data = [10, 0, 0, 0, b'4', b'2'];
        let mut reader = EnvelopeReader::new(&data);
        let result: Result<u32, _> = reader.read(&codec);
        assert!(matches!(
            result,
            Err(ProtocolError::Truncated { needed: 10, remaining: 2, .. })
        ));
    }

    #[test]
    fn test_finish_with_leftover_returns_trailing_bytes() {
        let codec = JsonCodec;
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf);
        writer.write(&codec, &1u8).unwrap();
        writer.write(&codec, &2u8).unwrap();

        let mut reader = EnvelopeReader::new(&buf);
        let _: u8 = reader.read(&codec).unwrap();

        assert!(matches!(
            reader.finish(),
            Err(ProtocolError::TrailingBytes { count: 5 })
        ));
    }

    #[test]
    fn test_read_wrong_type_returns_decode_error() {
        let codec = JsonCodec;
        let mut buf = Vec::new();
        EnvelopeWriter::new(&mut buf).write(&codec, "text").unwrap();

        let mut reader = EnvelopeReader::new(&buf);
        let result: Result<u64, _> = reader.read(&codec);
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
