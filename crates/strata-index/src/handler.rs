use async_trait::async_trait;
use strata_core::{Context, Entity};

use crate::doc::Doc;

/// Per-kind indexer handler. Called automatically by the pipeline
/// whenever an entity of the registered kind (or a child of one) is
/// committed.
#[async_trait]
pub trait IndexerHandler: Send + Sync {
  /// `e` just changed (it was committed directly, or is the subject of
  /// an `Update::execute` call). Returns the entities whose indexed
  /// documents should be regenerated (typically `e` itself and often
  /// its parent).
  async fn on_update(&self, e: Entity, ctx: &Context) -> anyhow::Result<Vec<Entity>>;

  /// Builds a search document snapshot for `e` by re-querying the store
  /// as needed.
  async fn regenerate(&self, e: Entity, ctx: &Context) -> anyhow::Result<Doc>;
}
