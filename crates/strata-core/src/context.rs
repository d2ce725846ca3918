use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::instruction::Entity;
use crate::store::Store;

/// Required configuration threaded through `Update::execute` and
/// `Query::run`. Rather than a process-wide late-bound singleton, the
/// active `Store` (and the updates channel, when an indexer pipeline is
/// wired) is carried explicitly on this handle. This keeps tests (each
/// with their own in-memory store) independent of each other.
#[derive(Clone)]
pub struct Context {
  store: Arc<dyn Store>,
  /// `62^num_chars_unique` permutations for freshly minted child ids.
  num_chars_unique: usize,
  updates: Option<mpsc::Sender<Entity>>,
  /// Optional cap on concurrently spawned child-query tasks (unbounded
  /// fan-out is a correctness/resource hazard on wide graphs).
  /// `None` preserves the baseline unbounded behavior.
  fan_out_limit: Option<Arc<Semaphore>>,
}

impl Context {
  /// Builds a context with no indexer pipeline wired.
  pub fn new(store: Arc<dyn Store>, num_chars_unique: usize) -> Self {
    Self {
      store,
      num_chars_unique,
      updates: None,
      fan_out_limit: None,
    }
  }

  /// Builds a context with an indexer pipeline wired: post-commit
  /// `Entity` events are published onto a bounded channel of the given
  /// capacity.
  pub fn with_updates(
    store: Arc<dyn Store>,
    num_chars_unique: usize,
    buffer: usize,
  ) -> (Self, mpsc::Receiver<Entity>) {
    let (tx, rx) = mpsc::channel(buffer);
    let ctx = Self {
      store,
      num_chars_unique,
      updates: Some(tx),
      fan_out_limit: None,
    };
    (ctx, rx)
  }

  /// Caps concurrently spawned query-traversal child tasks at `limit`.
  #[must_use]
  pub fn with_fan_out_limit(mut self, limit: usize) -> Self {
    self.fan_out_limit = Some(Arc::new(Semaphore::new(limit)));
    self
  }

  pub fn store(&self) -> &Arc<dyn Store> {
    &self.store
  }

  pub fn num_chars_unique(&self) -> usize {
    self.num_chars_unique
  }

  pub fn has_indexer(&self) -> bool {
    self.updates.is_some()
  }

  pub(crate) fn updates(&self) -> Option<&mpsc::Sender<Entity>> {
    self.updates.as_ref()
  }

  pub(crate) fn fan_out_limit(&self) -> Option<&Arc<Semaphore>> {
    self.fan_out_limit.as_ref()
  }
}
