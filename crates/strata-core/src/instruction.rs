use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One immutable append-only log record: a single predicate write on a
/// single subject at a single timestamp.
///
/// Exactly one of `object` / `object_id` is populated: `object` for a
/// scalar attribute write, `object_id` for an edge (parent -> child) write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
  pub subject_id: String,
  pub subject_type: String,
  pub predicate: String,
  /// Opaque, self-describing payload. Present iff this is a scalar write.
  /// Drivers persist this as given; the core never inspects its bytes
  /// except to decode it back into a [`serde_json::Value`] on read.
  pub object: Option<Vec<u8>>,
  /// Id of a child entity. Present iff this is an edge write.
  pub object_id: Option<String>,
  pub nano_ts: i64,
  pub source: String,
}

impl Instruction {
  /// True when this instruction writes a scalar attribute rather than an
  /// edge.
  pub fn is_scalar(&self) -> bool {
    self.object.is_some()
  }

  /// True when this instruction writes a parent -> child edge.
  pub fn is_edge(&self) -> bool {
    self.object_id.is_some()
  }

  /// Decodes `object` into a [`serde_json::Value`]. Callers must only
  /// call this on scalar instructions (`is_scalar()`).
  pub fn decode_object(&self) -> Result<serde_json::Value> {
    let bytes = self.object.as_deref().unwrap_or(b"null");
    serde_json::from_slice(bytes).map_err(|source| Error::DecodeFailure {
      subject: self.subject_id.clone(),
      predicate: self.predicate.clone(),
      source,
    })
  }
}

/// Encodes a scalar value into the opaque `object` payload using the
/// canonical self-describing encoding (plain JSON).
pub fn encode_object(value: &serde_json::Value) -> Vec<u8> {
  // `serde_json::Value` serialization is infallible for values already
  // represented as `Value`.
  serde_json::to_vec(value).expect("Value serialization is infallible")
}

/// A logical `{kind, id}` pointer to a subject, used for indexer events
/// and `Store::iterate` results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
  pub kind: String,
  pub id: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scalar_round_trips_through_encode_decode() {
    let value = serde_json::json!({"a": 1, "b": [1, 2, 3]});
    let it = Instruction {
      subject_id: "u1".into(),
      subject_type: "User".into(),
      predicate: "tags".into(),
      object: Some(encode_object(&value)),
      object_id: None,
      nano_ts: 1,
      source: "test".into(),
    };
    assert!(it.is_scalar());
    assert!(!it.is_edge());
    assert_eq!(it.decode_object().unwrap(), value);
  }
}
