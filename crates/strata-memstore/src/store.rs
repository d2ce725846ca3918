use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use strata_core::{Entity, Instruction, Store};
use tokio::sync::{mpsc, RwLock};

/// In-memory, append-only reference [`Store`].
///
/// Backed by a single `Vec<Instruction>` behind a `tokio::sync::RwLock`,
/// plus a secondary index from subject id to row indices for `get_entity`
/// and a sorted set of subject ids for `iterate`'s prefix-ordered scan.
/// `commit` appends by vector index, so it can never itself collide on an
/// internal key (the bounded-retry contract is honored one layer up, at
/// the id-minting layer in [`strata_core::Update::add_child`]).
#[derive(Default)]
pub struct MemStore {
  inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
  instructions: Vec<Instruction>,
  by_subject: HashMap<String, Vec<usize>>,
  subjects: BTreeSet<String>,
}

impl MemStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemStore {
  async fn is_new(&self, id: &str) -> anyhow::Result<bool> {
    // Mirrors a raw byte-prefix key scan (the original driver's
    // `util.BytesPrefix` over LevelDB): the lexicographically
    // smallest subject >= id is also the smallest subject with id as
    // a prefix, if one exists.
    let inner = self.inner.read().await;
    Ok(!inner.subjects.range(id.to_string()..).next().is_some_and(|s| s.starts_with(id)))
  }

  async fn commit(&self, batch: Vec<Instruction>) -> anyhow::Result<()> {
    tracing::debug!(batch_len = batch.len(), "appending instruction batch");
    let mut inner = self.inner.write().await;
    for it in batch {
      let row = inner.instructions.len();
      inner.by_subject.entry(it.subject_id.clone()).or_default().push(row);
      inner.subjects.insert(it.subject_id.clone());
      inner.instructions.push(it);
    }
    Ok(())
  }

  async fn get_entity(&self, id: &str) -> anyhow::Result<Vec<Instruction>> {
    let inner = self.inner.read().await;
    let rows = match inner.by_subject.get(id) {
      Some(rows) => rows,
      None => return Ok(Vec::new()),
    };
    Ok(rows.iter().map(|&row| inner.instructions[row].clone()).collect())
  }

  async fn iterate(&self, from_id: &str, n: usize, tx: mpsc::Sender<Entity>) -> anyhow::Result<(usize, Option<Entity>)> {
    let inner = self.inner.read().await;
    let mut count = 0;
    let mut last = None;
    for id in inner.subjects.range(from_id.to_string()..) {
      if count >= n {
        break;
      }
      let kind = inner.by_subject[id]
        .first()
        .map(|&row| inner.instructions[row].subject_type.clone())
        .unwrap_or_default();
      let entity = Entity { kind, id: id.clone() };
      if tx.send(entity.clone()).await.is_err() {
        break;
      }
      last = Some(entity);
      count += 1;
    }
    Ok((count, last))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use strata_core::encode_object;

  fn scalar(id: &str, predicate: &str) -> Instruction {
    Instruction {
      subject_id: id.into(),
      subject_type: "Thing".into(),
      predicate: predicate.into(),
      object: Some(encode_object(&serde_json::json!(1))),
      object_id: None,
      nano_ts: 1,
      source: "test".into(),
    }
  }

  #[tokio::test]
  async fn is_new_is_false_once_a_subject_or_descendant_exists() {
    let store = MemStore::new();
    store.commit(vec![scalar("u1/child", "count")]).await.unwrap();
    assert!(!store.is_new("u1").await.unwrap());
    assert!(!store.is_new("u1/child").await.unwrap());
    assert!(store.is_new("u2").await.unwrap());
  }

  #[tokio::test]
  async fn get_entity_returns_only_that_subjects_instructions() {
    let store = MemStore::new();
    store.commit(vec![scalar("s1", "a"), scalar("s2", "b")]).await.unwrap();
    let its = store.get_entity("s1").await.unwrap();
    assert_eq!(its.len(), 1);
    assert_eq!(its[0].subject_id, "s1");
  }

  #[tokio::test]
  async fn iterate_paginates_without_overlap() {
    let store = MemStore::new();
    for i in 0..5 {
      store.commit(vec![scalar(&format!("s{i}"), "a")]).await.unwrap();
    }
    let (tx, mut rx) = mpsc::channel(10);
    let (count, last) = store.iterate("", 2, tx).await.unwrap();
    assert_eq!(count, 2);
    let mut seen = Vec::new();
    while let Ok(e) = rx.try_recv() {
      seen.push(e.id);
    }
    assert_eq!(seen, vec!["s0".to_string(), "s1".to_string()]);

    let (tx2, mut rx2) = mpsc::channel(10);
    let from = last.unwrap().id;
    let from = format!("{from}\u{0}");
    let (count2, _) = store.iterate(&from, 10, tx2).await.unwrap();
    assert_eq!(count2, 3);
    let mut seen2 = Vec::new();
    while let Ok(e) = rx2.try_recv() {
      seen2.push(e.id);
    }
    assert_eq!(seen2, vec!["s2".to_string(), "s3".to_string(), "s4".to_string()]);
  }
}
