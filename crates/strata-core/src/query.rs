use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::materializer::materialize;
use crate::result::ResultNode;

type NodeId = usize;

struct Node {
  kind: String,
  id: String,
  filter_out: HashSet<String>,
  max_depth: usize,
  children: Vec<NodeId>,
  parent: Option<NodeId>,
}

struct Arena {
  nodes: Vec<Node>,
}

/// Builder for a depth-bounded, concurrent traversal of one subject and
/// its descendants.
///
/// Mirrors the originating API's mutable, parent-pointer'd tree: `Collect`
/// reparents a named child under whichever node it's called on, and `Run`
/// is valid from any node, always walking up to the root first. An
/// ownership-strict language can't hold a real parent pointer inside an
/// owned child, so this is a flat arena of nodes addressed by integer
/// handles. `Query` is a cheap `(arena, node_id)` handle, cloning the `Rc`
/// rather than the tree.
#[derive(Clone)]
pub struct Query {
  arena: Rc<RefCell<Arena>>,
  node: NodeId,
}

impl Query {
  pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
    let root = Node {
      kind: kind.into(),
      id: id.into(),
      filter_out: HashSet::new(),
      max_depth: 0,
      children: Vec::new(),
      parent: None,
    };
    Self { arena: Rc::new(RefCell::new(Arena { nodes: vec![root] })), node: 0 }
  }

  /// Bounds anonymous-descendant traversal starting from this node.
  pub fn upto_depth(&self, level: usize) -> &Self {
    self.arena.borrow_mut().nodes[self.node].max_depth = level;
    self
  }

  /// Excludes any subject carrying an instruction (scalar or edge) on
  /// `predicate` from this node's result.
  pub fn filter_out(&self, predicate: impl Into<String>) -> &Self {
    self.arena.borrow_mut().nodes[self.node].filter_out.insert(predicate.into());
    self
  }

  /// Returns the (memoized) named child for edges whose predicate is
  /// `kind`, reparented under this node. Calling this twice with the
  /// same kind returns the same child.
  pub fn collect(&self, kind: impl Into<String>) -> Self {
    let kind = kind.into();
    let mut arena = self.arena.borrow_mut();
    if let Some(&existing) = arena.nodes[self.node]
      .children
      .iter()
      .find(|&&child| arena.nodes[child].kind == kind)
    {
      return Self { arena: Rc::clone(&self.arena), node: existing };
    }
    let child = Node {
      kind,
      id: String::new(),
      filter_out: HashSet::new(),
      max_depth: 0,
      children: Vec::new(),
      parent: Some(self.node),
    };
    let child_id = arena.nodes.len();
    arena.nodes.push(child);
    arena.nodes[self.node].children.push(child_id);
    Self { arena: Rc::clone(&self.arena), node: child_id }
  }

  fn root_node(&self) -> NodeId {
    let arena = self.arena.borrow();
    let mut node = self.node;
    while let Some(parent) = arena.nodes[node].parent {
      node = parent;
    }
    node
  }

  /// Walks to the root of this tree and runs the traversal from there,
  /// regardless of which node `run` is called on. An id with no
  /// instructions (or one discarded by a `filter_out`) materializes to
  /// [`ResultNode::empty`].
  pub async fn run(&self, ctx: &Context) -> Result<ResultNode> {
    let root = self.root_node();
    let spec = Arc::new(snapshot(&self.arena.borrow(), root));
    let id = spec.id.clone();
    let max = spec.max_depth;
    do_run(spec, id, ctx.clone(), 0, max).await
  }
}

/// Immutable, `Send + 'static` snapshot of one arena subtree, taken at
/// `run` time so spawned traversal tasks never need to touch the
/// (non-Send) `Rc<RefCell<Arena>>` the builder uses.
#[derive(Debug, Clone)]
struct QuerySpec {
  kind: String,
  id: String,
  filter_out: HashSet<String>,
  max_depth: usize,
  children: Vec<QuerySpec>,
}

fn snapshot(arena: &Arena, node: NodeId) -> QuerySpec {
  let n = &arena.nodes[node];
  QuerySpec {
    kind: n.kind.clone(),
    id: n.id.clone(),
    filter_out: n.filter_out.clone(),
    max_depth: n.max_depth,
    children: n.children.iter().map(|&c| snapshot(arena, c)).collect(),
  }
}

fn do_run(spec: Arc<QuerySpec>, id: String, ctx: Context, level: usize, max: usize) -> BoxFuture<'static, Result<ResultNode>> {
  Box::pin(async move {
    let instructions = ctx
      .store()
      .get_entity(&id)
      .await
      .map_err(|source| Error::StoreFailure { subject: id.clone(), source })?;

    if instructions.is_empty() {
      return Ok(ResultNode::empty());
    }
    if has_filtered_predicate(&instructions, &spec.filter_out) {
      tracing::debug!(subject = %id, "discarding subject due to predicate filter");
      return Ok(ResultNode::empty());
    }

    let materialized = materialize(instructions)?.expect("non-empty checked above");

    let mut handles = Vec::new();
    for edge in &materialized.edges {
      if let Some(named) = spec.children.iter().find(|c| c.kind == edge.predicate) {
        let mut child_spec = named.clone();
        child_spec.id = edge.object_id.clone().unwrap_or_default();
        let child_max = child_spec.max_depth;
        handles.push(spawn_child(Arc::new(child_spec), ctx.clone(), 0, child_max));
      } else if level < max {
        if let Some(child_id) = edge.object_id.clone() {
          let anon = QuerySpec {
            kind: String::new(),
            id: child_id,
            filter_out: HashSet::new(),
            max_depth: 0,
            children: Vec::new(),
          };
          handles.push(spawn_child(Arc::new(anon), ctx.clone(), level + 1, max));
        }
      }
    }

    let mut children = Vec::with_capacity(handles.len());
    for handle in handles {
      match handle.await {
        Ok(Ok(result)) if !result.is_empty() => children.push(result),
        Ok(Ok(_)) => {}
        Ok(Err(err)) => return Err(err),
        Err(join_err) => {
          tracing::error!(error = %join_err, "query child task failed to complete");
        }
      }
    }

    Ok(ResultNode { id: materialized.id, kind: materialized.kind, columns: materialized.columns, children })
  })
}

fn spawn_child(spec: Arc<QuerySpec>, ctx: Context, level: usize, max: usize) -> tokio::task::JoinHandle<Result<ResultNode>> {
  let id = spec.id.clone();
  let limit = ctx.fan_out_limit().cloned();
  tokio::spawn(async move {
    let _permit = match &limit {
      Some(sem) => Some(sem.clone().acquire_owned().await.expect("fan-out semaphore never closed")),
      None => None,
    };
    do_run(spec, id, ctx, level, max).await
  })
}

fn has_filtered_predicate(instructions: &[Instruction], filter_out: &HashSet<String>) -> bool {
  !filter_out.is_empty() && instructions.iter().any(|it| filter_out.contains(&it.predicate))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn collect_is_memoized_by_kind() {
    let q = Query::new("Post", "p1");
    q.collect("Like").upto_depth(2);
    q.collect("Like").filter_out("spam");
    let arena = q.arena.borrow();
    assert_eq!(arena.nodes[0].children.len(), 1);
    let like = &arena.nodes[arena.nodes[0].children[0]];
    assert_eq!(like.max_depth, 2);
    assert!(like.filter_out.contains("spam"));
  }

  #[test]
  fn distinct_kinds_create_distinct_children() {
    let q = Query::new("Post", "p1");
    q.collect("Like");
    q.collect("Comment");
    assert_eq!(q.arena.borrow().nodes[0].children.len(), 2);
  }

  #[test]
  fn run_from_a_named_child_walks_up_to_the_root() {
    let q = Query::new("User", "u1");
    let like = q.collect("Post").collect("Like");
    assert_eq!(like.root_node(), 0);
  }
}
