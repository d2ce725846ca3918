//! The id convention shared by every component that derives or mints a
//! subject id: child ids are `<parent_id>/<token>`, root ids contain no
//! `/`.

use rand::Rng;

use crate::error::{Error, Result};

/// Returns the longest prefix of `id` before its last `/`.
///
/// Errors with [`Error::ParentUndefined`] if `id` is a root id (contains
/// no `/`).
pub fn parent(id: &str) -> Result<&str> {
  match id.rfind('/') {
    Some(idx) => Ok(&id[..idx]),
    None => Err(Error::ParentUndefined { id: id.to_string() }),
  }
}

/// Mints a fresh child id under `parent_id` using a random base-62 token
/// of `num_chars` characters.
///
/// `rand::distr::Alphanumeric` draws from `[A-Za-z0-9]`, which is exactly
/// the base-62 alphabet the id convention calls for.
pub fn mint_child_id(parent_id: &str, num_chars: usize) -> String {
  let token = random_token(num_chars);
  format!("{parent_id}/{token}")
}

fn random_token(num_chars: usize) -> String {
  rand::rng()
    .sample_iter(&rand::distr::Alphanumeric)
    .take(num_chars)
    .map(char::from)
    .collect()
}
