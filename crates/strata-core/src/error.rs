use thiserror::Error;

/// Errors the core surfaces to callers of [`crate::update::Update::execute`]
/// and [`crate::query::Query::run`].
///
/// `IndexerDispatchFailure` has no variant here by design: it is logged at
/// the pipeline worker and never propagated to a caller.
#[derive(Debug, Error)]
pub enum Error {
  /// A `Store::get_entity` or `Store::commit` call failed. Also raised
  /// when an instruction's `object` payload fails to decode (a decode
  /// failure collapses into this variant at the subject boundary).
  #[error("store failure while operating on {subject}: {source}")]
  StoreFailure {
    subject: String,
    #[source]
    source: anyhow::Error,
  },

  /// An instruction's `object` payload could not be deserialized.
  #[error("failed to decode predicate {predicate:?} on subject {subject}: {source}")]
  DecodeFailure {
    subject: String,
    predicate: String,
    #[source]
    source: serde_json::Error,
  },

  /// `Store::commit` could not find a unique internal key within the
  /// driver's retry bound for a freshly minted child id.
  #[error("could not mint a unique id under parent {subject}")]
  IdCollision { subject: String },

  /// `Parent(id)` was called on a root id (one containing no `/`).
  #[error("id {id:?} is a root id and has no parent")]
  ParentUndefined { id: String },

  /// A second indexer handler was registered for a kind that already has one.
  #[error("an indexer handler is already registered for kind {kind:?}")]
  DuplicateRegistration { kind: String },
}

pub type Result<T> = std::result::Result<T, Error>;
