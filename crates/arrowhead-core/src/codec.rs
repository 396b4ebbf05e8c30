//! Payload codecs.
//!
//! Services exchange typed payloads through a codec negotiated by encoding.
//! Only JSON ships with the framework; other formats plug in by
//! implementing [`Decoder`] and [`Encoder`].

use arrowhead_future::class;
use arrowhead_future::{Failure, Outcome};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::encoding::{Encoding, EncodingRegistry, JSON};

/// Decodes bytes into typed values.
pub trait Decoder: Send + Sync + 'static {
    /// The encoding this decoder reads.
    fn encoding(&self) -> Encoding;

    /// Decodes `bytes`; failures carry the [`DECODE`](class::DECODE) class.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Outcome<T>;
}

/// Encodes typed values into bytes.
pub trait Encoder: Send + Sync + 'static {
    /// The encoding this encoder writes.
    fn encoding(&self) -> Encoding;

    /// The `Content-Type` header value for encoded payloads.
    fn content_type(&self) -> &'static str;

    /// Encodes `value`; failures carry the [`ENCODE`](class::ENCODE) class.
    fn encode<T: Serialize>(&self, value: &T) -> Outcome<Bytes>;
}

/// JSON codec backed by `serde_json`.
///
/// ```rust
/// use arrowhead_core::{Decoder, Encoder, JsonCodec};
///
/// let codec = JsonCodec::new();
/// let bytes = codec.encode(&vec![1, 2, 3]).unwrap();
/// let back: Vec<u8> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    /// Creates the codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for JsonCodec {
    fn encoding(&self) -> Encoding {
        EncodingRegistry::global().intern(JSON)
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Outcome<T> {
        serde_json::from_slice(bytes).map_err(|e| Failure::from_error(&class::DECODE, e))
    }
}

impl Encoder for JsonCodec {
    fn encoding(&self) -> Encoding {
        EncodingRegistry::global().intern(JSON)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<T: Serialize>(&self, value: &T) -> Outcome<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Failure::from_error(&class::ENCODE, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Order {
        id: u32,
        item: String,
    }

    #[test]
    fn test_json_decode_failure_is_decode_class() {
        let failure = Decoder::decode::<Order>(&JsonCodec, b"{\"id\": \"x\"}").unwrap_err();
        assert!(failure.is(&class::DECODE));
    }

    #[test]
    fn test_json_encode() {
        let bytes = JsonCodec
            .encode(&Order {
                id: 7,
                item: "lamp".into(),
            })
            .unwrap();
        assert_eq!(&bytes[..], br#"{"id":7,"item":"lamp"}"#);
        assert_eq!(Encoder::encoding(&JsonCodec).name(), "json");
    }
}
