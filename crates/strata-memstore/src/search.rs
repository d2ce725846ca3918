use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use strata_index::{Doc, Filter, Search, SearchQuery};
use tokio::sync::RwLock;

/// In-memory, reference [`Search`] driver.
///
/// Documents are upserted by `(kind, id)` with last-write-wins on
/// `nano_ts`. Filters compile to a small predicate tree evaluated
/// against `doc.data` by path; ordering is a stable sort on an extracted
/// path (a leading `-` reverses); pagination is plain post-sort slicing.
#[derive(Default)]
pub struct MemSearch {
  docs: RwLock<HashMap<(String, String), Doc>>,
}

impl MemSearch {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Search for MemSearch {
  async fn update(&self, doc: Doc) -> anyhow::Result<()> {
    let key = (doc.kind.clone(), doc.id.clone());
    let mut docs = self.docs.write().await;
    match docs.get(&key) {
      Some(existing) if existing.nano_ts > doc.nano_ts => {
        tracing::debug!(kind = %key.0, id = %key.1, "dropping stale document update");
      }
      _ => {
        docs.insert(key, doc);
      }
    }
    Ok(())
  }

  async fn run_query(&self, query: &SearchQuery) -> anyhow::Result<Vec<Doc>> {
    let mut matches = self.matching_docs(query).await;
    if let Some(key) = query.order_by_key() {
      sort_by_path(&mut matches, key);
    }
    let from = query.from_offset().min(matches.len());
    let end = match query.limit_count() {
      Some(limit) => (from + limit).min(matches.len()),
      None => matches.len(),
    };
    Ok(matches[from..end].to_vec())
  }

  async fn count_query(&self, query: &SearchQuery) -> anyhow::Result<usize> {
    Ok(self.matching_docs(query).await.len())
  }
}

impl MemSearch {
  async fn matching_docs(&self, query: &SearchQuery) -> Vec<Doc> {
    let docs = self.docs.read().await;
    docs.values()
      .filter(|doc| doc.kind == query.kind())
      .filter(|doc| query.filter().is_none_or(|f| matches_filter(f, &doc.data)))
      .cloned()
      .collect()
  }
}

fn matches_filter(filter: &Filter, data: &Value) -> bool {
  match filter {
    Filter::Exact { path, value } => path_value(data, path).is_some_and(|v| v == value),
    Filter::Regex { path, pattern } => {
      let Ok(re) = Regex::new(pattern) else { return false };
      path_value(data, path).and_then(Value::as_str).is_some_and(|s| re.is_match(s))
    }
    Filter::And(filters) => filters.iter().all(|f| matches_filter(f, data)),
    Filter::Or(filters) => filters.iter().any(|f| matches_filter(f, data)),
  }
}

fn path_value<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
  path.split('.').try_fold(data, |current, segment| current.get(segment))
}

fn sort_by_path(docs: &mut [Doc], key: &str) {
  let (reverse, path) = match key.strip_prefix('-') {
    Some(rest) => (true, rest),
    None => (false, key),
  };
  docs.sort_by(|a, b| {
    let av = path_value(&a.data, path);
    let bv = path_value(&b.data, path);
    let ordering = compare_values(av, bv);
    if reverse {
      ordering.reverse()
    } else {
      ordering
    }
  });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
  let to_sortable = |v: Option<&Value>| -> String {
    match v {
      Some(Value::String(s)) => s.clone(),
      Some(other) => other.to_string(),
      None => String::new(),
    }
  };
  match (a.and_then(Value::as_f64), b.and_then(Value::as_f64)) {
    (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
    _ => to_sortable(a).cmp(&to_sortable(b)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::Arc;

  fn doc(kind: &str, id: &str, nano_ts: i64, data: Value) -> Doc {
    Doc::new(kind, id, nano_ts, data)
  }

  #[tokio::test]
  async fn update_is_last_write_wins_on_nano_ts() {
    let search = MemSearch::new();
    search.update(doc("Post", "p1", 1, json!({"title": "old"}))).await.unwrap();
    search.update(doc("Post", "p1", 0, json!({"title": "stale"}))).await.unwrap();
    search.update(doc("Post", "p1", 2, json!({"title": "new"}))).await.unwrap();

    let search = Arc::new(search);
    let results = SearchQuery::new(search, "Post").run().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].data["title"], json!("new"));
  }

  #[tokio::test]
  async fn exact_filter_matches_nested_path() {
    let search = Arc::new(MemSearch::new());
    search.update(doc("Post", "p1", 1, json!({"author": {"name": "ada"}}))).await.unwrap();
    search.update(doc("Post", "p2", 1, json!({"author": {"name": "bob"}}))).await.unwrap();

    let results = SearchQuery::new(search, "Post")
      .with_filter(Filter::Exact { path: "author.name".into(), value: json!("ada") })
      .run()
      .await
      .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "p1");
  }

  #[tokio::test]
  async fn order_by_reverses_with_minus_prefix_and_pagination_slices() {
    let search = Arc::new(MemSearch::new());
    for i in 0..5 {
      search.update(doc("Post", &format!("p{i}"), 1, json!({"rank": i}))).await.unwrap();
    }

    let results = SearchQuery::new(search, "Post").order_by("-rank").from(1).limit(2).run().await.unwrap();
    let ranks: Vec<i64> = results.iter().map(|d| d.data["rank"].as_i64().unwrap()).collect();
    assert_eq!(ranks, vec![3, 2]);
  }
}
