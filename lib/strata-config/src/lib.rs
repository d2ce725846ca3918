use std::sync::OnceLock;

use serde::Deserialize;

/// Process-wide runtime configuration, loaded once from the environment.
///
/// Mirrors the teacher's `core_config()` pattern (`bin/core/src/config.rs`):
/// an `envy`-deserialized `Env` layered over field defaults, exposed through
/// a lazily-initialized [`OnceLock`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrataConfig {
  /// Number of random characters appended to a minted child id's token.
  pub num_chars_unique: usize,
  /// Bound on the `mpsc` channel carrying dirtied entities from
  /// `Update::execute` to the indexer pipeline.
  pub updates_channel_capacity: usize,
  /// Whether an indexer pipeline should be wired up at all. Callers that
  /// never register handlers can leave this off and skip the channel.
  pub has_indexer: bool,
  /// Optional cap on concurrently in-flight child fan-out tasks per
  /// `Query::run`. `None` means unbounded.
  pub max_concurrent_children: Option<usize>,
  /// Number of worker tasks the indexer pipeline spawns.
  pub indexer_workers: usize,
}

impl Default for StrataConfig {
  fn default() -> Self {
    Self {
      num_chars_unique: 10,
      updates_channel_capacity: 1000,
      has_indexer: false,
      max_concurrent_children: None,
      indexer_workers: 4,
    }
  }
}

/// Returns the process-wide configuration, parsing the environment on
/// first access and caching the result for the lifetime of the process.
///
/// Env vars are namespaced under a `STRATA_` prefix (`STRATA_NUM_CHARS_UNIQUE`,
/// `STRATA_HAS_INDEXER`, ...) so the unprefixed field names below don't
/// collide with unrelated process environment variables.
///
/// Panics if the environment contains a value that doesn't parse into its
/// field's type (e.g. a non-numeric `STRATA_INDEXER_WORKERS`).
pub fn strata_config() -> &'static StrataConfig {
  static CONFIG: OnceLock<StrataConfig> = OnceLock::new();
  CONFIG.get_or_init(|| {
    dotenvy::dotenv().ok();
    match envy::prefixed("STRATA_").from_env::<StrataConfig>() {
      Ok(config) => config,
      Err(e) => panic!("failed to parse strata config from environment: {e:?}"),
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_sane_when_env_is_empty() {
    let config = StrataConfig::default();
    assert_eq!(config.num_chars_unique, 10);
    assert!(!config.has_indexer);
    assert_eq!(config.max_concurrent_children, None);
  }
}
