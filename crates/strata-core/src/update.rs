use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::instrument;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::id::mint_child_id;
use crate::instruction::{encode_object, Entity, Instruction};

/// Predicate `MarkDeleted` stages: deletion is modeled as an ordinary
/// (filterable) attribute write, never physical removal.
const DELETE_PREDICATE: &str = "_delete_";

/// Small fixed bound on retries when a freshly minted child id collides
/// with an existing subject.
const ID_COLLISION_RETRY_BOUND: usize = 5;

/// Fluent builder for a batch of instructions spanning a root entity and
/// its newly-minted children.
///
/// `source` is shared (via `Rc<RefCell<..>>`) across every node this
/// builder produces: `SetSource` attaches provenance to every instruction
/// in the whole batch, and the last call anywhere in the tree wins, so
/// every node needs to observe the same cell. The cell is read exactly
/// once, synchronously, when `execute` flattens the tree; no `Rc` value
/// is ever held across an `.await`.
pub struct Update {
  kind: String,
  id: String,
  sets: Vec<(String, serde_json::Value)>,
  edges: Vec<(String, String)>,
  children: Vec<Update>,
  source: Rc<RefCell<Option<String>>>,
}

impl Update {
  /// Targets a new Update at `(kind, id)`.
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    Self {
      kind: kind.into(),
      id: id.into(),
      sets: Vec::new(),
      edges: Vec::new(),
      children: Vec::new(),
      source: Rc::new(RefCell::new(None)),
    }
  }

  fn child(kind: String, id: String, source: Rc<RefCell<Option<String>>>) -> Self {
    Self { kind, id, sets: Vec::new(), edges: Vec::new(), children: Vec::new(), source }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn kind(&self) -> &str {
    &self.kind
  }

  /// Stages a scalar write. `value` is serialized to the canonical
  /// self-describing encoding at `execute` time; serialization never
  /// fails the batch.
  pub fn set<V: Serialize>(&mut self, predicate: impl Into<String>, value: V) -> &mut Self {
    let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
    self.sets.push((predicate.into(), value));
    self
  }

  /// Attaches provenance `source` to every instruction in the whole
  /// batch. The last call anywhere in the tree wins.
  pub fn set_source(&mut self, source: impl Into<String>) -> &mut Self {
    *self.source.borrow_mut() = Some(source.into());
    self
  }

  /// Stages a deletion-marker scalar write on this subject.
  pub fn mark_deleted(&mut self) -> &mut Self {
    self.set(DELETE_PREDICATE, true)
  }

  /// Mints a fresh child id under this node, stages an edge instruction
  /// `(predicate = kind, object_id = child_id)` on this node, and
  /// returns the new child Update for further chaining.
  ///
  /// Retries the mint up to [`ID_COLLISION_RETRY_BOUND`] times if the
  /// candidate id already names an existing subject.
  pub async fn add_child(&mut self, kind: impl Into<String>, ctx: &Context) -> Result<&mut Self> {
    let kind = kind.into();
    let mut candidate = mint_child_id(&self.id, ctx.num_chars_unique());
    for _ in 0..ID_COLLISION_RETRY_BOUND {
      let is_new = ctx.store().is_new(&candidate).await.map_err(|source| Error::StoreFailure {
        subject: candidate.clone(),
        source,
      })?;
      if is_new {
        self.edges.push((kind.clone(), candidate.clone()));
        let child = Self::child(kind, candidate, Rc::clone(&self.source));
        self.children.push(child);
        return Ok(self.children.last_mut().expect("just pushed"));
      }
      candidate = mint_child_id(&self.id, ctx.num_chars_unique());
    }
    Err(Error::IdCollision { subject: self.id.clone() })
  }

  /// Walks the Update tree, assigns one `nano_ts` to every staged
  /// instruction, concatenates them in preorder, and commits the batch
  /// atomically. On success, publishes one `Entity{kind,id}` event for
  /// this (root) subject onto the context's updates channel, if an
  /// indexer pipeline is wired.
  #[instrument(level = "debug", skip(self, ctx), fields(kind = %self.kind, id = %self.id))]
  pub async fn execute(self, ctx: &Context) -> Result<()> {
    let root = Entity { kind: self.kind.clone(), id: self.id.clone() };
    let source = self.source.borrow().clone().unwrap_or_default();

    let mut batch = Vec::new();
    let mut last_ts = current_nanos();
    flatten(self, &source, &mut last_ts, &mut batch);

    let batch_len = batch.len();
    ctx.store().commit(batch).await.map_err(|source_err| Error::StoreFailure {
      subject: root.id.clone(),
      source: source_err,
    })?;
    tracing::debug!(subject = %root.id, kind = %root.kind, instructions = batch_len, "committed update batch");

    if let Some(tx) = ctx.updates() {
      // Bounded-buffer backpressure onto the writer.
      let _ = tx.send(root).await;
    }
    Ok(())
  }
}

fn flatten(node: Update, source: &str, last_ts: &mut i64, out: &mut Vec<Instruction>) {
  for (predicate, value) in node.sets {
    let nano_ts = next_nano_ts(last_ts);
    out.push(Instruction {
      subject_id: node.id.clone(),
      subject_type: node.kind.clone(),
      predicate,
      object: Some(encode_object(&value)),
      object_id: None,
      nano_ts,
      source: source.to_string(),
    });
  }
  for (predicate, child_id) in node.edges {
    let nano_ts = next_nano_ts(last_ts);
    out.push(Instruction {
      subject_id: node.id.clone(),
      subject_type: node.kind.clone(),
      predicate,
      object: None,
      object_id: Some(child_id),
      nano_ts,
      source: source.to_string(),
    });
  }
  for child in node.children {
    flatten(child, source, last_ts, out);
  }
}

/// Forces the clock to be strictly increasing within one batch, which
/// satisfies the "monotonically forced non-decreasing" requirement with
/// a simpler invariant: every instruction in a batch gets a unique,
/// increasing `nano_ts`.
fn next_nano_ts(last: &mut i64) -> i64 {
  let now = current_nanos();
  let ts = if now > *last { now } else { *last + 1 };
  *last = ts;
  ts
}

fn current_nanos() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .expect("system clock before epoch")
    .as_nanos() as i64
}
