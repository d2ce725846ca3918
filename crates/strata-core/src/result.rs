use std::collections::HashMap;

use serde_json::{json, Map, Value};

use crate::materializer::Column;

/// One node of a query's result tree.
///
/// An empty node (`id` and `kind` both empty) stands for a subject that
/// was filtered out or never had any instructions; callers and parent
/// nodes drop these rather than including them in `children`.
#[derive(Debug, Clone)]
pub struct ResultNode {
  pub id: String,
  pub kind: String,
  pub columns: HashMap<String, Column>,
  pub children: Vec<ResultNode>,
}

impl ResultNode {
  pub fn empty() -> Self {
    Self { id: String::new(), kind: String::new(), columns: HashMap::new(), children: Vec::new() }
  }

  pub fn is_empty(&self) -> bool {
    self.id.is_empty() && self.kind.is_empty()
  }

  /// Canonical JSON projection: `id`, `kind`, one key per column, a
  /// single `source` (the last column visited wins, provenance is
  /// necessarily lossy once collapsed to one tag per entity), a
  /// `ts_millis` truncated from the newest column's `nano_ts`, and one
  /// array per distinct child kind.
  pub fn to_json(&self) -> Value {
    let mut map = Map::new();
    map.insert("id".to_string(), json!(self.id));
    map.insert("kind".to_string(), json!(self.kind));

    let mut newest_ts = 0i64;
    for (predicate, column) in &self.columns {
      map.insert(predicate.clone(), column.value.clone());
      map.insert("source".to_string(), json!(column.source));
      if column.nano_ts > newest_ts {
        newest_ts = column.nano_ts;
      }
    }
    map.insert("ts_millis".to_string(), json!(newest_ts / 1_000_000));

    let mut by_kind: HashMap<&str, Vec<Value>> = HashMap::new();
    for child in &self.children {
      by_kind.entry(child.kind.as_str()).or_default().push(child.to_json());
    }
    for (kind, values) in by_kind {
      map.insert(kind.to_string(), Value::Array(values));
    }

    Value::Object(map)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn column(value: serde_json::Value, source: &str, nano_ts: i64) -> Column {
    Column { value, source: source.to_string(), nano_ts }
  }

  #[test]
  fn empty_node_has_no_id_or_kind() {
    assert!(ResultNode::empty().is_empty());
  }

  #[test]
  fn to_json_projects_columns_and_ts_millis() {
    let mut node = ResultNode::empty();
    node.id = "p1".into();
    node.kind = "Post".into();
    node.columns.insert("title".into(), column(json!("hello"), "u1", 2_000_000_000));
    node.columns.insert("body".into(), column(json!("world"), "u1", 1_000_000_000));

    let json = node.to_json();
    assert_eq!(json["id"], json!("p1"));
    assert_eq!(json["kind"], json!("Post"));
    assert_eq!(json["title"], json!("hello"));
    assert_eq!(json["ts_millis"], json!(2000));
  }

  #[test]
  fn distinct_child_kinds_become_distinct_arrays() {
    let mut root = ResultNode::empty();
    root.id = "p1".into();
    root.kind = "Post".into();

    let mut like = ResultNode::empty();
    like.id = "p1/abc".into();
    like.kind = "Like".into();
    let mut comment = ResultNode::empty();
    comment.id = "p1/def".into();
    comment.kind = "Comment".into();
    root.children = vec![like, comment];

    let json = root.to_json();
    assert_eq!(json["Like"].as_array().unwrap().len(), 1);
    assert_eq!(json["Comment"].as_array().unwrap().len(), 1);
  }
}
