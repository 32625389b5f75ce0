//! Record payload codec.
//!
//! The engine treats stored record payloads as opaque bytes; everything that
//! needs the record itself (key-path extraction during backfill and index
//! maintenance, value decoding for fetches) goes through [`RecordCodec`].
//! [`JsonCodec`] is the reference implementation.

use serde_json::Value;

use crate::error::{EngineError, EngineResult};

/// Encodes and decodes stored record payloads.
pub trait RecordCodec {
    /// Serialize a record value into storable bytes.
    fn encode_record(&self, value: &Value) -> EngineResult<Vec<u8>>;

    /// Deserialize a stored payload back into a record value.
    fn decode_record(&self, bytes: &[u8]) -> EngineResult<Value>;
}

/// JSON record codec backed by `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl RecordCodec for JsonCodec {
    fn encode_record(&self, value: &Value) -> EngineResult<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| EngineError::data(format!("unserializable record: {e}")))
    }

    fn decode_record(&self, bytes: &[u8]) -> EngineResult<Value> {
        serde_json::from_slice(bytes)
            .map_err(|e| EngineError::corrupt(format!("bad record payload: {e}")))
    }
}
