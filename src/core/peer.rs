//! Peer Identity Generator
//!
//! Ephemeral transport-level identifiers, regenerated for every connection
//! attempt. Unrelated to account identity; collision avoidance is only
//! probabilistic.

use rand::seq::SliceRandom;

/// Character pool the random prefix draws from.
const POOL: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Fixed suffix every peer identity carries.
const SUFFIX: &str = "000000";

/// Length of the random prefix.
const PREFIX_LEN: usize = 10;

/// Generate a fresh 16-character peer identity.
///
/// The first ten characters are a random permutation subset of `[a-z0-9]`
/// (no character repeats), followed by the literal `000000`.
pub fn generate_peer_id() -> String {
    let mut pool = POOL.to_vec();
    pool.shuffle(&mut rand::thread_rng());
    let mut id = String::with_capacity(PREFIX_LEN + SUFFIX.len());
    for b in &pool[..PREFIX_LEN] {
        id.push(*b as char);
    }
    id.push_str(SUFFIX);
    id
}
