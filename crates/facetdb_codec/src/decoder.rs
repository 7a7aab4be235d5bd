//! Tagged binary decoder.

use crate::encoder::{
    TAG_BOOLEAN, TAG_DOUBLE, TAG_INSTANT, TAG_KEYWORD, TAG_LONG, TAG_REF, TAG_TEXT, TAG_UUID,
};
use crate::error::{CodecError, CodecResult};
use crate::keyword::Keyword;
use crate::value::{Entid, TypedValue};
use uuid::Uuid;

/// Decodes a single value from its tagged binary form.
///
/// The input must contain exactly one encoded value; trailing bytes are
/// rejected. Use [`ValueDecoder`] to decode a stream of values.
///
/// # Errors
///
/// Returns an error on truncated input, an unknown tag byte, invalid
/// UTF-8, a malformed keyword, or an out-of-range instant.
pub fn decode_value(bytes: &[u8]) -> CodecResult<TypedValue> {
    let mut decoder = ValueDecoder::new(bytes);
    let value = decoder.decode()?;
    if !decoder.is_empty() {
        return Err(CodecError::LengthOverrun {
            declared: bytes.len(),
            remaining: decoder.remaining().len(),
        });
    }
    Ok(value)
}

/// A streaming decoder over a byte slice.
pub struct ValueDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ValueDecoder<'a> {
    /// Creates a decoder over the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decodes the next value.
    pub fn decode(&mut self) -> CodecResult<TypedValue> {
        let tag = self.read_byte()?;
        match tag {
            TAG_LONG => Ok(TypedValue::Long(self.read_i64()?)),
            TAG_REF => Ok(TypedValue::Ref(Entid::new(self.read_i64()?))),
            TAG_KEYWORD => {
                let text = self.read_str()?;
                Ok(TypedValue::Keyword(Keyword::parse(&text)?))
            }
            // Zero is false, any nonzero byte is true.
            TAG_BOOLEAN => Ok(TypedValue::Boolean(self.read_byte()? != 0)),
            TAG_DOUBLE => {
                let bits = self.read_i64()?;
                #[allow(clippy::cast_sign_loss)]
                Ok(TypedValue::Double(f64::from_bits(bits as u64)))
            }
            TAG_INSTANT => {
                let millis = self.read_i64()?;
                TypedValue::instant_from_millis(millis)
                    .ok_or(CodecError::InstantOutOfRange { millis })
            }
            TAG_TEXT => Ok(TypedValue::Text(self.read_str()?)),
            TAG_UUID => {
                let bytes = self.read_bytes(16)?;
                let mut raw = [0u8; 16];
                raw.copy_from_slice(bytes);
                Ok(TypedValue::Uuid(Uuid::from_bytes(raw)))
            }
            other => Err(CodecError::UnknownTag { tag: other }),
        }
    }

    /// Returns true when all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Returns the undecoded remainder.
    pub fn remaining(&self) -> &[u8] {
        &self.data[self.pos..]
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        if self.pos >= self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if self.pos + len > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    #[inline]
    fn read_i64(&mut self) -> CodecResult<i64> {
        let bytes = self.read_bytes(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(raw))
    }

    fn read_str(&mut self) -> CodecResult<String> {
        let len_bytes = self.read_bytes(4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(len_bytes);
        let declared = u32::from_be_bytes(raw) as usize;
        let remaining = self.data.len() - self.pos;
        if declared > remaining {
            return Err(CodecError::LengthOverrun {
                declared,
                remaining,
            });
        }
        let bytes = self.read_bytes(declared)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{encode_value, ValueEncoder};

    #[test]
    fn decode_unknown_tag() {
        let result = decode_value(&[0x7f]);
        assert!(matches!(result, Err(CodecError::UnknownTag { tag: 0x7f })));
    }

    #[test]
    fn decode_truncated_long() {
        let result = decode_value(&[TAG_LONG, 0, 0]);
        assert!(matches!(result, Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn decode_empty_input() {
        assert!(matches!(decode_value(&[]), Err(CodecError::UnexpectedEof)));
    }

    #[test]
    fn decode_rejects_trailing_bytes() {
        let mut bytes = encode_value(&TypedValue::Boolean(true));
        bytes.push(0x00);
        assert!(matches!(
            decode_value(&bytes),
            Err(CodecError::LengthOverrun { .. })
        ));
    }

    #[test]
    fn decode_text_with_overlong_length() {
        // Declared length 100 but only 2 payload bytes follow.
        let bytes = vec![TAG_TEXT, 0, 0, 0, 100, b'a', b'b'];
        assert!(matches!(
            decode_value(&bytes),
            Err(CodecError::LengthOverrun { .. })
        ));
    }

    #[test]
    fn decode_nonzero_boolean_is_true() {
        assert_eq!(
            decode_value(&[TAG_BOOLEAN, 7]).unwrap(),
            TypedValue::Boolean(true)
        );
    }

    #[test]
    fn decode_invalid_keyword_payload() {
        // A keyword payload that parses as text but not as a keyword.
        let mut encoder = ValueEncoder::new();
        encoder.encode(&TypedValue::Text("no-colon".to_string()));
        let mut bytes = encoder.into_bytes();
        bytes[0] = TAG_KEYWORD;
        assert!(matches!(
            decode_value(&bytes),
            Err(CodecError::MalformedKeyword { .. })
        ));
    }

    #[test]
    fn stream_decoding() {
        let mut encoder = ValueEncoder::new();
        encoder.encode(&TypedValue::Long(1));
        encoder.encode(&TypedValue::Text("x".to_string()));
        let bytes = encoder.into_bytes();

        let mut decoder = ValueDecoder::new(&bytes);
        assert_eq!(decoder.decode().unwrap(), TypedValue::Long(1));
        assert_eq!(decoder.decode().unwrap(), TypedValue::Text("x".to_string()));
        assert!(decoder.is_empty());
    }
}
