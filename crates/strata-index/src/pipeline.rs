use std::sync::Arc;

use strata_core::{Context, Entity};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::registry::Registry;
use crate::search::Search;

/// A running indexer pipeline: `num_workers` tasks draining the context's
/// updates channel.
pub struct Pipeline {
  workers: Vec<JoinHandle<()>>,
}

impl Pipeline {
  /// Spawns `num_workers` worker tasks, each pulling `Entity` events off
  /// `updates` and running them through `registry`/`search`.
  ///
  /// There is no global "close the channel" call: the channel's sender
  /// lives on every [`Context`] clone an `Update::execute` caller holds,
  /// so the channel closes (and workers drain and exit) once every such
  /// `Context` is dropped. Call [`Pipeline::wait_for_done`] only after
  /// that, or it waits forever.
  ///
  /// Pass `ctx` a context built without an updates sender (e.g.
  /// `Context::new`, not `Context::with_updates`). Handlers only need
  /// it for store reads, and a worker holding its own sender clone
  /// would keep the channel open forever.
  pub fn run(ctx: Context, registry: Arc<Registry>, search: Arc<dyn Search>, updates: mpsc::Receiver<Entity>, num_workers: usize) -> Self {
    assert!(num_workers > 0, "indexer pipeline needs at least one worker");
    let updates = Arc::new(Mutex::new(updates));
    let workers = (0..num_workers)
      .map(|_| {
        tokio::spawn(process_updates(ctx.clone(), Arc::clone(&registry), Arc::clone(&search), Arc::clone(&updates)))
      })
      .collect();
    Self { workers }
  }

  /// Joins every worker task. Intended for graceful shutdown once the
  /// updates channel has closed.
  pub async fn wait_for_done(self) {
    for worker in self.workers {
      if let Err(err) = worker.await {
        tracing::error!(error = %err, "indexer worker task failed to complete");
      }
    }
  }
}

async fn process_updates(ctx: Context, registry: Arc<Registry>, search: Arc<dyn Search>, updates: Arc<Mutex<mpsc::Receiver<Entity>>>) {
  loop {
    let entity = {
      let mut rx = updates.lock().await;
      rx.recv().await
    };
    let Some(entity) = entity else { break };

    let Some(handler) = registry.get(&entity.kind) else { continue };
    let dirty = match handler.on_update(entity.clone(), &ctx).await {
      Ok(dirty) => dirty,
      Err(err) => {
        tracing::warn!(error = %err, kind = %entity.kind, id = %entity.id, "indexer on_update failed; skipping");
        continue;
      }
    };

    for d in dirty {
      let Some(handler) = registry.get(&d.kind) else { continue };
      let doc = match handler.regenerate(d.clone(), &ctx).await {
        Ok(doc) => doc,
        Err(err) => {
          tracing::warn!(error = %err, kind = %d.kind, id = %d.id, "indexer regenerate failed; skipping");
          continue;
        }
      };
      // A search-tier dispatch failure is logged, never surfaced to the writer.
      if let Err(err) = search.update(doc).await {
        tracing::warn!(error = %err, kind = %d.kind, id = %d.id, "search update failed; continuing");
      }
    }
  }
  tracing::debug!("indexer worker finished: updates channel closed");
}
