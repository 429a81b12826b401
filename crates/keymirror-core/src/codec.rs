#![forbid(unsafe_code)]

//! Codec layer: logical value ⇄ raw string.
//!
//! # Design
//!
//! A [`Codec`] is a stateless, swappable strategy pair. [`JsonCodec`]
//! round-trips any serde value through `serde_json`. [`SentinelCodec`]
//! wraps an inner codec to make *absence itself* round-trippable: `None`
//! is stored as the literal sentinel text `undefined`. The sentinel is
//! deliberately not valid JSON, so it can never collide with an encoded
//! value — the JSON *string* `"undefined"` encodes with quotes and stays
//! distinct.
//!
//! # Failure Modes
//!
//! - `decode` fails on malformed raw text. The read path maps a decode
//!   failure to the configured default and leaves the raw entry in the
//!   backend untouched, so a later external fix can still recover it.
//! - `encode` failures make the enclosing write a no-op; subscribers are
//!   still notified and converge on backend truth.

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Raw text stored for an explicitly absent value.
pub const ABSENT_SENTINEL: &str = "undefined";

/// Error produced by a codec.
#[derive(Debug, Error)]
pub enum CodecError {
    /// JSON (de)serialization failure from the default codec.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by a custom codec.
    #[error("{0}")]
    Other(String),
}

/// Strategy converting a logical value to a raw string and back.
///
/// Codecs are stateless and swappable per observation. `decode` may fail;
/// the engine treats a failed decode as "use the default value" and never
/// propagates it.
pub trait Codec<T> {
    /// Encode `value` into the raw string stored in the backend.
    fn encode(&self, value: &T) -> Result<String, CodecError>;

    /// Decode a raw string read from the backend.
    fn decode(&self, raw: &str) -> Result<T, CodecError>;

    /// Whether `value` is the absent sentinel of this codec's domain.
    ///
    /// The seeding gate uses this: an absent default is never seeded into
    /// the backend.
    fn is_absent(&self, _value: &T) -> bool {
        false
    }
}

/// Plain `serde_json` round-trip.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn decode(&self, raw: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Absent-aware codec over `Option<T>`.
///
/// `None` encodes to [`ABSENT_SENTINEL`]; everything else delegates to the
/// inner codec. Decoding the exact sentinel text yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentinelCodec<C = JsonCodec> {
    inner: C,
}

impl<C> SentinelCodec<C> {
    /// Wrap `inner` with absent-sentinel handling.
    #[must_use]
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<T, C> Codec<Option<T>> for SentinelCodec<C>
where
    C: Codec<T>,
{
    fn encode(&self, value: &Option<T>) -> Result<String, CodecError> {
        match value {
            None => Ok(ABSENT_SENTINEL.to_owned()),
            Some(inner) => self.inner.encode(inner),
        }
    }

    fn decode(&self, raw: &str) -> Result<Option<T>, CodecError> {
        if raw == ABSENT_SENTINEL {
            return Ok(None);
        }
        self.inner.decode(raw).map(Some)
    }

    fn is_absent(&self, value: &Option<T>) -> bool {
        value.is_none()
    }
}
