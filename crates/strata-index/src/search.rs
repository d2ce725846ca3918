use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::doc::Doc;

/// A leaf or boolean combination of predicates on `data.<path>` keys.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  Exact { path: String, value: Value },
  Regex { path: String, pattern: String },
  And(Vec<Filter>),
  Or(Vec<Filter>),
}

/// Driver contract consumed by the indexer pipeline and by query
/// consumers. The core does not constrain index structure; it only
/// requires that `update` is a durable upsert keyed by `(kind, id)` with
/// last-write-wins on `nano_ts`.
#[async_trait]
pub trait Search: Send + Sync {
  async fn update(&self, doc: Doc) -> anyhow::Result<()>;

  async fn run_query(&self, query: &SearchQuery) -> anyhow::Result<Vec<Doc>>;

  async fn count_query(&self, query: &SearchQuery) -> anyhow::Result<usize>;
}

/// Fluent query builder over a [`Search`] driver.
pub struct SearchQuery {
  search: Arc<dyn Search>,
  kind: String,
  filter: Option<Filter>,
  /// A `data.<path>` key to sort by; a leading `-` reverses the order.
  order_by: Option<String>,
  from: usize,
  limit: Option<usize>,
}

impl SearchQuery {
  pub fn new(search: Arc<dyn Search>, kind: impl Into<String>) -> Self {
    Self { search, kind: kind.into(), filter: None, order_by: None, from: 0, limit: None }
  }

  pub fn kind(&self) -> &str {
    &self.kind
  }

  pub fn filter(&self) -> Option<&Filter> {
    self.filter.as_ref()
  }

  pub fn order_by_key(&self) -> Option<&str> {
    self.order_by.as_deref()
  }

  pub fn from_offset(&self) -> usize {
    self.from
  }

  pub fn limit_count(&self) -> Option<usize> {
    self.limit
  }

  pub fn with_filter(mut self, filter: Filter) -> Self {
    self.filter = Some(filter);
    self
  }

  /// `path` may be prefixed with `-` to sort descending.
  pub fn order_by(mut self, path: impl Into<String>) -> Self {
    self.order_by = Some(path.into());
    self
  }

  pub fn from(mut self, n: usize) -> Self {
    self.from = n;
    self
  }

  pub fn limit(mut self, n: usize) -> Self {
    self.limit = Some(n);
    self
  }

  pub async fn run(&self) -> anyhow::Result<Vec<Doc>> {
    self.search.run_query(self).await
  }

  pub async fn count(&self) -> anyhow::Result<usize> {
    self.search.count_query(self).await
  }
}
