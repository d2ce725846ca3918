use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use strata_core::{Context, Entity, Update};
use strata_index::{Doc, IndexerHandler, Pipeline, Registry, SearchQuery};
use strata_memstore::{MemSearch, MemStore};

/// Generic handler: dirties itself and its parent (if any), regenerates
/// by re-querying the store for the newest timestamp.
struct GenericHandler;

#[async_trait]
impl IndexerHandler for GenericHandler {
  async fn on_update(&self, e: Entity, ctx: &Context) -> anyhow::Result<Vec<Entity>> {
    let mut dirty = vec![e.clone()];
    if let Ok(parent_id) = strata_core::parent(&e.id) {
      let instructions = ctx.store().get_entity(parent_id).await?;
      if let Some(first) = instructions.first() {
        dirty.push(Entity { kind: first.subject_type.clone(), id: parent_id.to_string() });
      }
    }
    Ok(dirty)
  }

  async fn regenerate(&self, e: Entity, ctx: &Context) -> anyhow::Result<Doc> {
    let instructions = ctx.store().get_entity(&e.id).await?;
    let nano_ts = strata_core::materialize(instructions)?
      .map(|m| m.columns.values().map(|c| c.nano_ts).max().unwrap_or(0))
      .unwrap_or(0);
    Ok(Doc::new(e.kind, e.id, nano_ts, json!({})))
  }
}

/// Committing a new Post under a User fans out to two `Search::update`
/// calls, one per kind, within a bounded time.
#[tokio::test]
async fn indexer_fan_out_reaches_post_and_its_parent() {
  let store: Arc<MemStore> = Arc::new(MemStore::new());
  let search: Arc<MemSearch> = Arc::new(MemSearch::new());
  let (ctx, updates) = Context::with_updates(store.clone(), 10, 16);
  // No sender: a worker holding one itself would keep the channel open.
  let worker_ctx = Context::new(store, 10);

  let registry = Arc::new(Registry::new());
  registry.register("Post", Arc::new(GenericHandler)).unwrap();
  registry.register("User", Arc::new(GenericHandler)).unwrap();

  let pipeline = Pipeline::run(worker_ctx, registry, search.clone(), updates, 2);

  let mut u = Update::new("User", "u1");
  u.add_child("Post", &ctx).await.unwrap().set("url", "g.com");
  u.execute(&ctx).await.unwrap();

  drop(ctx);
  tokio::time::timeout(Duration::from_secs(5), pipeline.wait_for_done()).await.expect("pipeline did not drain in time");

  let post_docs = SearchQuery::new(search.clone(), "Post").run().await.unwrap();
  assert_eq!(post_docs.len(), 1);

  let user_docs = SearchQuery::new(search, "User").run().await.unwrap();
  assert_eq!(user_docs.len(), 1);
  assert_eq!(user_docs[0].id, "u1");
}

#[tokio::test]
async fn unregistered_kind_is_dropped_silently() {
  let store: Arc<MemStore> = Arc::new(MemStore::new());
  let search: Arc<MemSearch> = Arc::new(MemSearch::new());
  let (ctx, updates) = Context::with_updates(store.clone(), 10, 16);
  let worker_ctx = Context::new(store, 10);
  let registry = Arc::new(Registry::new());

  let pipeline = Pipeline::run(worker_ctx, registry, search.clone(), updates, 1);

  let mut u = Update::new("Widget", "w1");
  u.set("color", "red");
  u.execute(&ctx).await.unwrap();

  drop(ctx);
  tokio::time::timeout(Duration::from_secs(5), pipeline.wait_for_done()).await.expect("pipeline did not drain in time");

  assert_eq!(SearchQuery::new(search, "Widget").run().await.unwrap().len(), 0);
}
