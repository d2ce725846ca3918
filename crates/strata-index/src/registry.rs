use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use strata_core::Error;

use crate::handler::IndexerHandler;

/// Kind → handler map consumed by the pipeline.
///
/// Many readers, infrequent writers: registration is expected to
/// complete before the pipeline starts, after which every lookup is a
/// short-held read lock.
#[derive(Default)]
pub struct Registry {
  handlers: RwLock<HashMap<String, Arc<dyn IndexerHandler>>>,
}

impl Registry {
  pub fn new() -> Self {
    Self { handlers: RwLock::new(HashMap::new()) }
  }

  /// Registers `handler` for `kind`. At most one handler per kind;
  /// registering a second is a hard failure.
  pub fn register(&self, kind: impl Into<String>, handler: Arc<dyn IndexerHandler>) -> Result<(), Error> {
    let kind = kind.into();
    let mut handlers = self.handlers.write().expect("registry lock poisoned");
    if handlers.contains_key(&kind) {
      return Err(Error::DuplicateRegistration { kind });
    }
    handlers.insert(kind, handler);
    Ok(())
  }

  pub fn get(&self, kind: &str) -> Option<Arc<dyn IndexerHandler>> {
    self.handlers.read().expect("registry lock poisoned").get(kind).cloned()
  }

  /// Every registered kind, deterministically sorted.
  pub fn kinds(&self) -> Vec<String> {
    let mut kinds: Vec<String> = self.handlers.read().expect("registry lock poisoned").keys().cloned().collect();
    kinds.sort();
    kinds
  }

  pub fn num(&self) -> usize {
    self.handlers.read().expect("registry lock poisoned").len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use strata_core::{Context, Entity};

  struct Noop;

  #[async_trait::async_trait]
  impl IndexerHandler for Noop {
    async fn on_update(&self, e: Entity, _ctx: &Context) -> anyhow::Result<Vec<Entity>> {
      Ok(vec![e])
    }

    async fn regenerate(&self, e: Entity, _ctx: &Context) -> anyhow::Result<crate::doc::Doc> {
      Ok(crate::doc::Doc::new(e.kind, e.id, 0, serde_json::json!({})))
    }
  }

  #[test]
  fn duplicate_registration_is_rejected() {
    let registry = Registry::new();
    registry.register("Post", Arc::new(Noop)).unwrap();
    let err = registry.register("Post", Arc::new(Noop)).unwrap_err();
    assert!(matches!(err, Error::DuplicateRegistration { kind } if kind == "Post"));
  }

  #[test]
  fn kinds_are_sorted() {
    let registry = Registry::new();
    registry.register("User", Arc::new(Noop)).unwrap();
    registry.register("Comment", Arc::new(Noop)).unwrap();
    registry.register("Post", Arc::new(Noop)).unwrap();
    assert_eq!(registry.kinds(), vec!["Comment", "Post", "User"]);
  }
}
