//! Transaction log record framing.
//!
//! The log is a flat sequence of records, each framed as a type byte and
//! a `u32` payload length. Payloads are sequences of codec-encoded typed
//! values, so the framing shares the value codec's determinism.
//!
//! Two record types exist: vocabulary installations and committed
//! transactions. Replaying the log in order reconstructs the schema and
//! every datom.

use crate::error::{CoreError, CoreResult};
use crate::schema::{AttributeDef, Cardinality, Uniqueness, Vocabulary};
use crate::types::TxId;
use chrono::{DateTime, Utc};
use facetdb_codec::{Entid, Keyword, TypedValue, ValueDecoder, ValueEncoder, ValueType};
use facetdb_storage::LogBackend;

const RECORD_VOCAB: u8 = 0x01;
const RECORD_TX: u8 = 0x02;

/// A fully resolved operation as it appears in the log.
///
/// Tempids and attribute-wide retractions are resolved before logging,
/// so replay needs no allocation decisions.
#[derive(Debug, Clone, PartialEq)]
pub enum LogOp {
    /// Assert `(entity, attribute, value)`.
    Add(Entid, Keyword, TypedValue),
    /// Retract `(entity, attribute, value)`.
    Retract(Entid, Keyword, TypedValue),
}

impl LogOp {
    /// The entity this operation touches.
    pub fn entity(&self) -> Entid {
        match self {
            LogOp::Add(e, _, _) | LogOp::Retract(e, _, _) => *e,
        }
    }

    /// The attribute keyword this operation touches.
    pub fn attribute(&self) -> &Keyword {
        match self {
            LogOp::Add(_, a, _) | LogOp::Retract(_, a, _) => a,
        }
    }
}

/// One committed transaction as stored in the log.
#[derive(Debug, Clone, PartialEq)]
pub struct TxRecord {
    /// Transaction id.
    pub tx_id: TxId,
    /// Commit instant.
    pub tx_instant: DateTime<Utc>,
    /// The resolved operations, in application order.
    pub ops: Vec<LogOp>,
}

/// A record read back from the log.
#[derive(Debug, Clone)]
pub enum LogRecord {
    /// A vocabulary installation.
    Vocab(Vocabulary),
    /// A committed transaction.
    Tx(TxRecord),
}

/// Encodes a vocabulary record, framing included.
pub fn encode_vocab(vocab: &Vocabulary) -> Vec<u8> {
    let mut enc = ValueEncoder::new();
    enc.encode(&TypedValue::Text(vocab.name.clone()));
    enc.encode(&TypedValue::Long(i64::from(vocab.version)));
    enc.encode(&TypedValue::Long(vocab.attributes.len() as i64));
    for (keyword, def) in &vocab.attributes {
        enc.encode(&TypedValue::Keyword(keyword.clone()));
        enc.encode(&TypedValue::Long(value_type_code(def.value_type)));
        enc.encode(&TypedValue::Long(match def.cardinality {
            Cardinality::One => 0,
            Cardinality::Many => 1,
        }));
        enc.encode(&TypedValue::Long(match def.unique {
            Uniqueness::None => 0,
            Uniqueness::Value => 1,
            Uniqueness::Identity => 2,
        }));
        enc.encode(&TypedValue::Boolean(def.index));
    }
    frame(RECORD_VOCAB, enc.into_bytes())
}

/// Encodes a transaction record, framing included.
pub fn encode_tx(record: &TxRecord) -> Vec<u8> {
    let mut enc = ValueEncoder::new();
    #[allow(clippy::cast_possible_wrap)]
    enc.encode(&TypedValue::Long(record.tx_id.as_u64() as i64));
    enc.encode(&TypedValue::Instant(record.tx_instant));
    enc.encode(&TypedValue::Long(record.ops.len() as i64));
    for op in &record.ops {
        let (kind, e, a, v) = match op {
            LogOp::Add(e, a, v) => (0i64, e, a, v),
            LogOp::Retract(e, a, v) => (1i64, e, a, v),
        };
        enc.encode(&TypedValue::Long(kind));
        enc.encode(&TypedValue::Ref(*e));
        enc.encode(&TypedValue::Keyword(a.clone()));
        enc.encode(v);
    }
    frame(RECORD_TX, enc.into_bytes())
}

/// Reads and decodes every record in the log, in order.
///
/// # Errors
///
/// Returns [`CoreError::LogCorruption`] on truncated framing or
/// malformed payloads.
pub fn read_records(backend: &dyn LogBackend) -> CoreResult<Vec<LogRecord>> {
    let size = backend.len()?;
    let data = backend.read_at(0, usize::try_from(size).unwrap_or(usize::MAX))?;
    decode_record_stream(&data)
}

/// Decodes a byte stream of framed records, in order.
///
/// This is the same decoding [`read_records`] performs; it exists for
/// callers that carry framed records outside a log backend, such as the
/// sync protocol.
///
/// # Errors
///
/// Returns [`CoreError::LogCorruption`] on truncated framing or
/// malformed payloads.
pub fn decode_record_stream(data: &[u8]) -> CoreResult<Vec<LogRecord>> {
    let mut records = Vec::new();
    let mut pos = 0usize;
    while pos < data.len() {
        if pos + 5 > data.len() {
            return Err(CoreError::log_corruption("truncated record header"));
        }
        let record_type = data[pos];
        let mut len_raw = [0u8; 4];
        len_raw.copy_from_slice(&data[pos + 1..pos + 5]);
        let len = u32::from_be_bytes(len_raw) as usize;
        pos += 5;
        if pos + len > data.len() {
            return Err(CoreError::log_corruption("truncated record payload"));
        }
        let payload = &data[pos..pos + len];
        pos += len;

        match record_type {
            RECORD_VOCAB => records.push(LogRecord::Vocab(decode_vocab(payload)?)),
            RECORD_TX => records.push(LogRecord::Tx(decode_tx(payload)?)),
            other => {
                return Err(CoreError::log_corruption(format!(
                    "unknown record type {other:#04x}"
                )))
            }
        }
    }
    Ok(records)
}

fn frame(record_type: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 5);
    out.push(record_type);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&payload);
    out
}

fn decode_vocab(payload: &[u8]) -> CoreResult<Vocabulary> {
    let mut dec = ValueDecoder::new(payload);
    let name = expect_text(&mut dec, "vocabulary name")?;
    let version = expect_long(&mut dec, "vocabulary version")?;
    let count = expect_long(&mut dec, "attribute count")?;

    let mut attributes = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    for _ in 0..count {
        let keyword = match dec.decode()? {
            TypedValue::Keyword(k) => k,
            other => return Err(malformed("attribute keyword", &other)),
        };
        let value_type = value_type_from_code(expect_long(&mut dec, "value type")?)?;
        let cardinality = match expect_long(&mut dec, "cardinality")? {
            0 => Cardinality::One,
            1 => Cardinality::Many,
            n => return Err(CoreError::log_corruption(format!("bad cardinality {n}"))),
        };
        let unique = match expect_long(&mut dec, "uniqueness")? {
            0 => Uniqueness::None,
            1 => Uniqueness::Value,
            2 => Uniqueness::Identity,
            n => return Err(CoreError::log_corruption(format!("bad uniqueness {n}"))),
        };
        let index = match dec.decode()? {
            TypedValue::Boolean(b) => b,
            other => return Err(malformed("index flag", &other)),
        };
        attributes.push((
            keyword,
            AttributeDef {
                value_type,
                cardinality,
                unique,
                index,
            },
        ));
    }

    let version = u32::try_from(version)
        .map_err(|_| CoreError::log_corruption(format!("bad vocabulary version {version}")))?;
    Ok(Vocabulary::new(name, version, attributes))
}

fn decode_tx(payload: &[u8]) -> CoreResult<TxRecord> {
    let mut dec = ValueDecoder::new(payload);
    #[allow(clippy::cast_sign_loss)]
    let tx_id = TxId::new(expect_long(&mut dec, "tx id")? as u64);
    let tx_instant = match dec.decode()? {
        TypedValue::Instant(t) => t,
        other => return Err(malformed("tx instant", &other)),
    };
    let count = expect_long(&mut dec, "op count")?;

    let mut ops = Vec::with_capacity(usize::try_from(count).unwrap_or(0));
    for _ in 0..count {
        let kind = expect_long(&mut dec, "op kind")?;
        let entity = match dec.decode()? {
            TypedValue::Ref(e) => e,
            other => return Err(malformed("op entity", &other)),
        };
        let attribute = match dec.decode()? {
            TypedValue::Keyword(k) => k,
            other => return Err(malformed("op attribute", &other)),
        };
        let value = dec.decode()?;
        ops.push(match kind {
            0 => LogOp::Add(entity, attribute, value),
            1 => LogOp::Retract(entity, attribute, value),
            n => return Err(CoreError::log_corruption(format!("bad op kind {n}"))),
        });
    }

    Ok(TxRecord {
        tx_id,
        tx_instant,
        ops,
    })
}

fn expect_long(dec: &mut ValueDecoder<'_>, what: &str) -> CoreResult<i64> {
    match dec.decode()? {
        TypedValue::Long(n) => Ok(n),
        other => Err(malformed(what, &other)),
    }
}

fn expect_text(dec: &mut ValueDecoder<'_>, what: &str) -> CoreResult<String> {
    match dec.decode()? {
        TypedValue::Text(s) => Ok(s),
        other => Err(malformed(what, &other)),
    }
}

fn malformed(what: &str, got: &TypedValue) -> CoreError {
    CoreError::log_corruption(format!("expected {what}, got {}", got.value_type()))
}

const fn value_type_code(value_type: ValueType) -> i64 {
    match value_type {
        ValueType::Long => 0,
        ValueType::Ref => 1,
        ValueType::Keyword => 2,
        ValueType::Boolean => 3,
        ValueType::Double => 4,
        ValueType::Instant => 5,
        ValueType::Text => 6,
        ValueType::Uuid => 7,
    }
}

fn value_type_from_code(code: i64) -> CoreResult<ValueType> {
    Ok(match code {
        0 => ValueType::Long,
        1 => ValueType::Ref,
        2 => ValueType::Keyword,
        3 => ValueType::Boolean,
        4 => ValueType::Double,
        5 => ValueType::Instant,
        6 => ValueType::Text,
        7 => ValueType::Uuid,
        n => return Err(CoreError::log_corruption(format!("bad value type {n}"))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeDef;
    use facetdb_storage::MemoryLog;

    fn sample_vocab() -> Vocabulary {
        Vocabulary::new(
            "todo",
            1,
            vec![
                (
                    Keyword::new("todo", "uuid"),
                    AttributeDef::of(ValueType::Uuid).unique_value().indexed().build(),
                ),
                (
                    Keyword::new("todo", "name"),
                    AttributeDef::of(ValueType::Text).build(),
                ),
            ],
        )
    }

    fn sample_tx() -> TxRecord {
        TxRecord {
            tx_id: TxId::new(1),
            tx_instant: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
            ops: vec![
                LogOp::Add(
                    Entid::new(0x10000),
                    Keyword::new("todo", "name"),
                    TypedValue::Text("Buy milk".into()),
                ),
                LogOp::Retract(
                    Entid::new(0x10000),
                    Keyword::new("todo", "name"),
                    TypedValue::Text("Byu milk".into()),
                ),
            ],
        }
    }

    #[test]
    fn vocab_record_roundtrip() {
        let vocab = sample_vocab();
        let mut backend = MemoryLog::new();
        backend.append(&encode_vocab(&vocab)).unwrap();

        let records = read_records(&backend).unwrap();
        assert_eq!(records.len(), 1);
        match &records[0] {
            LogRecord::Vocab(decoded) => {
                assert_eq!(decoded.name, vocab.name);
                assert_eq!(decoded.version, vocab.version);
                assert_eq!(decoded.attributes, vocab.attributes);
            }
            LogRecord::Tx(_) => panic!("expected vocab record"),
        }
    }

    #[test]
    fn tx_record_roundtrip() {
        let tx = sample_tx();
        let mut backend = MemoryLog::new();
        backend.append(&encode_tx(&tx)).unwrap();

        let records = read_records(&backend).unwrap();
        match &records[0] {
            LogRecord::Tx(decoded) => assert_eq!(decoded, &tx),
            LogRecord::Vocab(_) => panic!("expected tx record"),
        }
    }

    #[test]
    fn records_replay_in_order() {
        let mut backend = MemoryLog::new();
        backend.append(&encode_vocab(&sample_vocab())).unwrap();
        backend.append(&encode_tx(&sample_tx())).unwrap();

        let records = read_records(&backend).unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(records[0], LogRecord::Vocab(_)));
        assert!(matches!(records[1], LogRecord::Tx(_)));
    }

    #[test]
    fn truncated_header_is_corruption() {
        let backend = MemoryLog::with_data(vec![RECORD_TX, 0, 0]);
        assert!(matches!(
            read_records(&backend),
            Err(CoreError::LogCorruption { .. })
        ));
    }

    #[test]
    fn truncated_payload_is_corruption() {
        let mut data = encode_tx(&sample_tx());
        data.truncate(data.len() - 3);
        let backend = MemoryLog::with_data(data);
        assert!(matches!(
            read_records(&backend),
            Err(CoreError::LogCorruption { .. })
        ));
    }

    #[test]
    fn unknown_record_type_is_corruption() {
        let backend = MemoryLog::with_data(vec![0x7f, 0, 0, 0, 0]);
        assert!(matches!(
            read_records(&backend),
            Err(CoreError::LogCorruption { .. })
        ));
    }
}
