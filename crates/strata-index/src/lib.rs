//! Indexer registry and pipeline, and the `Search` driver contract:
//! dispatches committed entity events to per-kind handlers, regenerates
//! documents, and pushes them to a search tier.

mod doc;
mod handler;
mod pipeline;
mod registry;
mod search;

pub use doc::Doc;
pub use handler::IndexerHandler;
pub use pipeline::Pipeline;
pub use registry::Registry;
pub use search::{Filter, Search, SearchQuery};
