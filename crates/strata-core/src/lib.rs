//! Instruction log, entity materialization, and graph query engine.
//!
//! Everything here is generic over its collaborators: a [`Store`] supplies
//! durable instruction persistence, and an optional indexer pipeline (see
//! `strata-index`) consumes post-commit [`Entity`] events carried on a
//! [`Context`].

mod context;
mod error;
mod id;
mod instruction;
mod materializer;
mod query;
mod result;
mod store;
mod update;

pub use context::Context;
pub use error::{Error, Result};
pub use id::{mint_child_id, parent};
pub use instruction::{encode_object, Entity, Instruction};
pub use materializer::{materialize, Column, Materialized};
pub use query::Query;
pub use result::ResultNode;
pub use store::Store;
pub use update::Update;
