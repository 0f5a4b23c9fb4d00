//! Value codec: arbitrary serializable values to and from stored bytes.
//!
//! The wire format is self-describing JSON, so foreign or corrupt data is
//! rejected deterministically at decode time instead of yielding a mangled
//! value.
//!
//! A reserved byte sequence, the **nil marker**, represents "this key was
//! queried and confirmed absent". Without it, a negative lookup would store
//! nothing and every subsequent request for that key would fall through to
//! the expensive source (cache penetration). The marker is the empty byte
//! sequence: JSON encoding of any real value is at least one byte, so
//! [`encode`] can never collide with it, and [`decode`] short-circuits on it
//! without touching the JSON path.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Reserved encoding for an explicitly cached absence.
pub const NIL_MARKER: &[u8] = b"";

/// Whether stored bytes are the nil marker.
#[must_use]
pub fn is_nil_marker(bytes: &[u8]) -> bool {
    bytes == NIL_MARKER
}

/// Encode a value for storage.
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if the value is not representable
/// (e.g. a map with non-string keys).
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let bytes = serde_json::to_vec(value)?;
    debug_assert!(!is_nil_marker(&bytes));
    Ok(bytes)
}

/// Decode stored bytes back into a value.
///
/// Returns `Ok(None)` for the nil marker. Malformed or foreign-format input
/// fails rather than silently producing a corrupt value.
///
/// # Errors
///
/// Returns [`crate::Error::Serialization`] if the bytes are not the nil
/// marker and do not decode to `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if is_nil_marker(bytes) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(bytes)?))
}
