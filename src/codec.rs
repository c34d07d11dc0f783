//! Profile ↔ bytes.
//!
//! The persisted form is the profile's JSON shape, pretty-printed:
//!
//! ```text
//! {
//!   "user_id": "...", "created_at": "...", "last_updated": "...",
//!   "nodes": { "<node id>": {"id", "type", "data", "created_at"}, ... },
//!   "edges": [ {"source", "target", "relationship", "created_at"}, ... ]
//! }
//! ```

use crate::model::Profile;
use crate::{Error, Result};

/// Serialize a profile verbatim, timestamps included.
pub fn to_bytes(profile: &Profile) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(profile)?)
}

/// Deserialize a profile.
///
/// A stream that is not JSON, lacks a non-empty `user_id`, or holds nodes
/// that don't match their declared type fails with `MalformedInput`.
pub fn from_bytes(bytes: &[u8]) -> Result<Profile> {
    let raw: serde_json::Value = serde_json::from_slice(bytes)?;

    match raw.get("user_id").and_then(|v| v.as_str()) {
        Some(id) if !id.trim().is_empty() => {}
        Some(_) => return Err(Error::MalformedInput("empty user_id".into())),
        None => return Err(Error::MalformedInput("missing user_id".into())),
    }

    Ok(serde_json::from_value(raw)?)
}
