//! CBOR entry codec.

use crate::error::{CodecError, CodecResult};
use crate::Codec;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes entries as CBOR (RFC 8949) via `ciborium`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CborCodec;

impl CborCodec {
    const NAME: &'static str = "cbor";

    /// Creates a CBOR codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Codec for CborCodec {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        let mut buffer = Vec::new();
        ciborium::into_writer(value, &mut buffer)
            .map_err(|e| CodecError::encoding_failed(Self::NAME, e.to_string()))?;
        Ok(buffer)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T> {
        ciborium::from_reader(bytes)
            .map_err(|e| CodecError::decoding_failed(Self::NAME, e.to_string()))
    }
}
