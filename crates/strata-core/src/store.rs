use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::instruction::{Entity, Instruction};

/// Driver contract consumed by the engine. Concrete storage drivers
/// (key-value, SQL, ...) are external collaborators; the core only
/// assumes the operations below, and must not assume driver-side
/// filtering, secondary indexes, or anything beyond an id-prefix scan.
///
/// Drivers return `anyhow::Result` rather than [`crate::error::Error`]:
/// the engine wraps whatever a driver reports into `Error::StoreFailure`
/// at the subject boundary.
#[async_trait]
pub trait Store: Send + Sync {
  /// True iff no instruction exists whose subject id has `id` as a
  /// prefix. A single probe this way covers an entire subtree for
  /// collision checks when minting a fresh child id.
  async fn is_new(&self, id: &str) -> anyhow::Result<bool>;

  /// Durably appends `batch` atomically. Implementations must retry
  /// internal key collisions up to a bounded number of attempts before
  /// surfacing an error.
  async fn commit(&self, batch: Vec<Instruction>) -> anyhow::Result<()>;

  /// Returns every instruction whose subject id equals `id`. Order is
  /// unspecified; the materializer sorts.
  async fn get_entity(&self, id: &str) -> anyhow::Result<Vec<Instruction>>;

  /// Streams up to `n` distinct `{kind, id}` entities observed with
  /// subject id >= `from_id` into `tx`, in ascending subject-id order.
  /// Returns the count streamed and the last entity observed (if any).
  async fn iterate(
    &self,
    from_id: &str,
    n: usize,
    tx: mpsc::Sender<Entity>,
  ) -> anyhow::Result<(usize, Option<Entity>)>;
}
