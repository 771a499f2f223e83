//! Seed derivation for reproducible key sampling
//!
//! A drill is driven by a single master seed. Every thread that samples read
//! keys, and every simulated failure source, gets its own seed derived from the
//! master with SHA-256 so that runs with the same master seed draw the same
//! sequences while the individual streams stay independent.
//!
//! ```
//! use keyload_core::seed::{derive_seed, worker_seed, components};
//!
//! let master = 42;
//! assert_eq!(derive_seed(master, "a"), derive_seed(master, "a"));
//! assert_ne!(
//!     worker_seed(master, components::READ_WORKER, 0),
//!     worker_seed(master, components::READ_WORKER, 1),
//! );
//! ```

use sha2::{Digest, Sha256};

/// Derive a component-specific seed from a master seed
///
/// Hashes the big-endian master seed followed by the component name and keeps
/// the first 8 bytes of the digest.
pub fn derive_seed(master_seed: u64, component: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_be_bytes());
    hasher.update(component.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Derive the seed of the `index`-th worker of a component
pub fn worker_seed(master_seed: u64, component: &str, index: usize) -> u64 {
    derive_seed(master_seed, &format!("{component}/{index}"))
}

/// Component names used for seed derivation
pub mod components {
    pub const WRITE_WORKER: &str = "write_worker";
    pub const READ_WORKER: &str = "read_worker";
    pub const STORE_FAULTS: &str = "simulated_store_faults";
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_derive_seed_deterministic() {
        let seed1 = derive_seed(7, components::READ_WORKER);
        let seed2 = derive_seed(7, components::READ_WORKER);
        assert_eq!(seed1, seed2);
    }

    #[test]
    fn test_components_get_distinct_seeds() {
        use components::*;

        let seeds = [
            derive_seed(99, WRITE_WORKER),
            derive_seed(99, READ_WORKER),
            derive_seed(99, STORE_FAULTS),
        ];
        for i in 0..seeds.len() {
            for j in (i + 1)..seeds.len() {
                assert_ne!(seeds[i], seeds[j], "components {} and {} collide", i, j);
            }
        }
    }

    #[test]
    fn test_worker_seeds_differ_per_index() {
        let a = worker_seed(1, components::WRITE_WORKER, 0);
        let b = worker_seed(1, components::WRITE_WORKER, 1);
        assert_ne!(a, b);
        assert_eq!(a, worker_seed(1, components::WRITE_WORKER, 0));
    }

    #[test]
    fn test_derived_rng_streams_reproduce() {
        let seed = worker_seed(12345, components::READ_WORKER, 3);
        let mut rng1 = SmallRng::seed_from_u64(seed);
        let mut rng2 = SmallRng::seed_from_u64(seed);

        let draws1: Vec<i64> = (0..16).map(|_| rng1.random_range(0..1000)).collect();
        let draws2: Vec<i64> = (0..16).map(|_| rng2.random_range(0..1000)).collect();
        assert_eq!(draws1, draws2);
    }
}
