//! Tagged binary encoder.

use crate::value::TypedValue;

/// Tag byte for a long value.
pub(crate) const TAG_LONG: u8 = 0x01;
/// Tag byte for an entity reference.
pub(crate) const TAG_REF: u8 = 0x02;
/// Tag byte for a keyword.
pub(crate) const TAG_KEYWORD: u8 = 0x03;
/// Tag byte for a boolean.
pub(crate) const TAG_BOOLEAN: u8 = 0x04;
/// Tag byte for a double.
pub(crate) const TAG_DOUBLE: u8 = 0x05;
/// Tag byte for an instant.
pub(crate) const TAG_INSTANT: u8 = 0x06;
/// Tag byte for text.
pub(crate) const TAG_TEXT: u8 = 0x07;
/// Tag byte for a UUID.
pub(crate) const TAG_UUID: u8 = 0x08;

/// Encodes a value to its tagged binary form.
///
/// The encoding is deterministic: one tag byte followed by a fixed-width
/// big-endian payload, or a `u32` length prefix and UTF-8 bytes for the
/// variable-width kinds. Instants encode as milliseconds since the Unix
/// epoch.
pub fn encode_value(value: &TypedValue) -> Vec<u8> {
    let mut encoder = ValueEncoder::new();
    encoder.encode(value);
    encoder.into_bytes()
}

/// An appending encoder for typed values.
///
/// Multiple values may be encoded back to back; the resulting byte stream
/// is self-delimiting and can be decoded with a `ValueDecoder`.
pub struct ValueEncoder {
    buffer: Vec<u8>,
}

impl ValueEncoder {
    /// Creates a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Creates a new encoder with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Encodes one value onto the end of the buffer.
    pub fn encode(&mut self, value: &TypedValue) {
        match value {
            TypedValue::Long(n) => {
                self.buffer.push(TAG_LONG);
                self.buffer.extend_from_slice(&n.to_be_bytes());
            }
            TypedValue::Ref(e) => {
                self.buffer.push(TAG_REF);
                self.buffer.extend_from_slice(&e.as_i64().to_be_bytes());
            }
            TypedValue::Keyword(k) => {
                self.buffer.push(TAG_KEYWORD);
                self.encode_str(&k.to_string());
            }
            TypedValue::Boolean(b) => {
                self.buffer.push(TAG_BOOLEAN);
                self.buffer.push(u8::from(*b));
            }
            TypedValue::Double(d) => {
                self.buffer.push(TAG_DOUBLE);
                self.buffer.extend_from_slice(&d.to_bits().to_be_bytes());
            }
            TypedValue::Instant(t) => {
                self.buffer.push(TAG_INSTANT);
                self.buffer
                    .extend_from_slice(&t.timestamp_millis().to_be_bytes());
            }
            TypedValue::Text(s) => {
                self.buffer.push(TAG_TEXT);
                self.encode_str(s);
            }
            TypedValue::Uuid(u) => {
                self.buffer.push(TAG_UUID);
                self.buffer.extend_from_slice(u.as_bytes());
            }
        }
    }

    /// Consumes the encoder and returns the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Returns a view of the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns the number of encoded bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Returns true if nothing has been encoded yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn encode_str(&mut self, s: &str) {
        self.buffer
            .extend_from_slice(&(s.len() as u32).to_be_bytes());
        self.buffer.extend_from_slice(s.as_bytes());
    }
}

impl Default for ValueEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Entid;

    #[test]
    fn encode_long() {
        let bytes = encode_value(&TypedValue::Long(1));
        assert_eq!(bytes, vec![TAG_LONG, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn encode_boolean() {
        assert_eq!(encode_value(&TypedValue::Boolean(false)), vec![TAG_BOOLEAN, 0]);
        assert_eq!(encode_value(&TypedValue::Boolean(true)), vec![TAG_BOOLEAN, 1]);
    }

    #[test]
    fn encode_ref() {
        let bytes = encode_value(&TypedValue::Ref(Entid::new(258)));
        assert_eq!(bytes, vec![TAG_REF, 0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn encode_text_length_prefixed() {
        let bytes = encode_value(&TypedValue::Text("ab".to_string()));
        assert_eq!(bytes, vec![TAG_TEXT, 0, 0, 0, 2, b'a', b'b']);
    }

    #[test]
    fn encode_multiple_values_concatenate() {
        let mut encoder = ValueEncoder::new();
        encoder.encode(&TypedValue::Long(1));
        encoder.encode(&TypedValue::Boolean(true));
        assert_eq!(encoder.len(), 9 + 2);
    }
}
