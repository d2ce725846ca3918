use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A search-tier document snapshot derived from a subject by an indexer
/// handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Doc {
  pub kind: String,
  pub id: String,
  pub nano_ts: i64,
  /// Arbitrary projected fields, queried by path through the Search
  /// contract's `data.<path>` filters/ordering.
  pub data: Value,
}

impl Doc {
  pub fn new(kind: impl Into<String>, id: impl Into<String>, nano_ts: i64, data: Value) -> Self {
    Self { kind: kind.into(), id: id.into(), nano_ts, data }
  }
}
