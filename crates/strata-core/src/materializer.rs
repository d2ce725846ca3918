use std::collections::HashMap;

use crate::error::Result;
use crate::instruction::Instruction;

/// The current value of one column (attribute).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
  pub value: serde_json::Value,
  pub source: String,
  pub nano_ts: i64,
}

/// A materialized snapshot of one subject's instruction stream: the
/// latest-wins column map, plus the raw (sorted) edge instructions for
/// the query engine to follow.
pub struct Materialized {
  pub id: String,
  pub kind: String,
  pub columns: HashMap<String, Column>,
  /// Edge instructions in the same sorted order as the source stream.
  /// Not deduplicated or latest-wins collapsed: every edge instruction
  /// names a distinct child link.
  pub edges: Vec<Instruction>,
}

/// Collapses one subject's instruction list into a [`Materialized`]
/// snapshot. Returns `Ok(None)` for an empty instruction list (the
/// subject has no instructions of its own, e.g. an edge pointing at a
/// child that materializes empty).
pub fn materialize(mut instructions: Vec<Instruction>) -> Result<Option<Materialized>> {
  if instructions.is_empty() {
    return Ok(None);
  }

  // Stable sort: ties on nano_ts keep the order the store returned them in.
  instructions.sort_by_key(|it| it.nano_ts);

  let id = instructions[0].subject_id.clone();
  let kind = instructions[0].subject_type.clone();

  let mut columns = HashMap::new();
  let mut edges = Vec::new();

  for it in instructions {
    debug_assert_eq!(it.subject_id, id, "materialize called with mixed subjects");
    if it.is_edge() {
      edges.push(it);
    } else {
      let value = it.decode_object()?;
      columns.insert(
        it.predicate.clone(),
        Column {
          value,
          source: it.source.clone(),
          nano_ts: it.nano_ts,
        },
      );
    }
  }

  Ok(Some(Materialized { id, kind, columns, edges }))
}
