//! # FileDB Codec
//!
//! Entry encodings for FileDB.
//!
//! The store persists one self-describing record per key. This crate decides
//! how that record becomes bytes; the store itself never looks inside them.
//!
//! ## Available Codecs
//!
//! - [`JsonCodec`] - UTF-8 JSON, readable with any text tool (the default)
//! - [`CborCodec`] - compact binary CBOR
//!
//! Both are self-describing, so a stored record can be decoded into a
//! smaller view (for example, only its `version` field) without knowing the
//! document type.
//!
//! ## Usage
//!
//! ```
//! use filedb_codec::{Codec, JsonCodec};
//!
//! let codec = JsonCodec::new();
//! let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
//! let decoded: Vec<i32> = codec.decode(&bytes).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cbor;
mod error;
mod json;

pub use cbor::CborCodec;
pub use error::{CodecError, CodecResult};
pub use json::JsonCodec;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A serialization format for stored entries.
///
/// Implementations must be self-describing: decoding into a struct that
/// names only some of the encoded fields must succeed and ignore the rest.
/// Values must round-trip in value, not necessarily in bytes.
pub trait Codec: Send + Sync {
    /// Short format name, used in diagnostics.
    fn name(&self) -> &'static str;

    /// Encodes a value to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::EncodingFailed`] if the value cannot be
    /// represented in this format.
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>>;

    /// Decodes a value from bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::DecodingFailed`] if the bytes are malformed or
    /// do not match the shape of `T`.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> CodecResult<T>;
}
