//! Seed pool for the resolver's pseudo-random generator.
//!
//! The pool folds arbitrary 32-bit words into 32 slots and stirs them
//! once every 32 inputs. It is deterministic for a given input sequence
//! and is **not** cryptographically secure; it only decorrelates the
//! generator's starting state between daemon runs.

use std::time::{SystemTime, UNIX_EPOCH};

/// Number of 32-bit words in the pool.
pub const SEED_WORDS: usize = 32;

/// Size of a packed TAIA timestamp.
pub const TAIA_PACK: usize = 16;

const GOLDEN: u32 = 0x9e37_79b9;

/// TAI64 label of the Unix epoch (2^62 plus the 10 s TAI-UTC offset).
const TAI64_EPOCH: u64 = (1 << 62) + 10;

/// Caller-owned 32-word seed accumulator.
///
/// # Example
///
/// ```
/// use dnscache_bootstrap::SeedPool;
///
/// let mut a = SeedPool::new();
/// let mut b = SeedPool::new();
/// a.add_bytes(b"same input");
/// b.add_bytes(b"same input");
/// assert_eq!(a.words(), b.words());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedPool {
    seed: [u32; SEED_WORDS],
    pos: usize,
}

impl SeedPool {
    /// Creates an all-zero pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seed: [0; SEED_WORDS],
            pos: 0,
        }
    }

    /// Adds `u` to the current slot, stirring the pool when it fills.
    pub fn add_u32(&mut self, mut u: u32) {
        self.seed[self.pos] = self.seed[self.pos].wrapping_add(u);
        self.pos += 1;
        if self.pos == SEED_WORDS {
            for word in &mut self.seed {
                u = ((u ^ *word).wrapping_add(GOLDEN)) ^ (u << 7) ^ (u >> 25);
                *word = u;
            }
            self.pos = 0;
        }
    }

    /// Feeds each byte, zero-extended, through [`add_u32`](Self::add_u32).
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.add_u32(u32::from(b));
        }
    }

    /// Feeds the current wall-clock time in packed TAIA form.
    pub fn add_time(&mut self) {
        self.add_bytes(&tai_pack(SystemTime::now()));
    }

    /// The pool words.
    #[must_use]
    pub const fn words(&self) -> &[u32; SEED_WORDS] {
        &self.seed
    }

    /// Index of the slot the next word lands in.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.pos
    }

    /// Pool contents as little-endian bytes, for seeding a generator.
    #[must_use]
    pub fn seed_bytes(&self) -> [u8; SEED_WORDS * 4] {
        let mut out = [0u8; SEED_WORDS * 4];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.seed) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

impl Default for SeedPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Packs `t` as TAIA: TAI64 seconds, nanoseconds, attoseconds, all big-endian.
///
/// Times before the Unix epoch pack as the epoch.
#[must_use]
pub fn tai_pack(t: SystemTime) -> [u8; TAIA_PACK] {
    let since = t.duration_since(UNIX_EPOCH).unwrap_or_default();
    let mut out = [0u8; TAIA_PACK];
    out[..8].copy_from_slice(&TAI64_EPOCH.wrapping_add(since.as_secs()).to_be_bytes());
    out[8..12].copy_from_slice(&since.subsec_nanos().to_be_bytes());
    // attoseconds stay zero
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn identical_inputs_give_identical_pools() {
        let input: Vec<u32> = (0..1000u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();
        let mut a = SeedPool::new();
        let mut b = SeedPool::new();
        for &u in &input {
            a.add_u32(u);
            b.add_u32(u);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn thirty_second_word_stirs_pool() {
        let mut pool = SeedPool::new();
        for i in 0..31 {
            pool.add_u32(1);
            assert_eq!(pool.position(), i + 1);
        }
        assert!(pool.words()[..31].iter().all(|&w| w == 1));

        pool.add_u32(1);
        assert_eq!(pool.position(), 0);
        // (1 ^ 1) + GOLDEN, xor (1 << 7)
        assert_eq!(pool.words()[0], 0x9e37_7939);
        assert!(pool.words().iter().all(|&w| w != 1));
    }

    #[test]
    fn running_value_chains_through_pass() {
        let mut pool = SeedPool::new();
        for _ in 0..SEED_WORDS {
            pool.add_u32(0);
        }
        let mut u = 0u32;
        for &w in pool.words() {
            u = (u.wrapping_add(GOLDEN)) ^ (u << 7) ^ (u >> 25);
            assert_eq!(w, u);
        }
    }

    #[test]
    fn addition_wraps() {
        let mut pool = SeedPool::new();
        for _ in 0..SEED_WORDS * 2 {
            pool.add_u32(u32::MAX);
        }
        assert_eq!(pool.position(), 0);
    }

    #[test]
    fn tai_pack_layout() {
        let t = UNIX_EPOCH + Duration::new(1, 5);
        assert_eq!(
            tai_pack(t),
            [0x40, 0, 0, 0, 0, 0, 0, 0x0b, 0, 0, 0, 5, 0, 0, 0, 0]
        );
    }

    #[test]
    fn add_time_feeds_sixteen_words() {
        let mut pool = SeedPool::new();
        pool.add_time();
        assert_eq!(pool.position(), TAIA_PACK);
        assert_eq!(pool.words()[0], 0x40);
    }

    #[test]
    fn seed_bytes_little_endian() {
        let mut pool = SeedPool::new();
        pool.add_u32(0x0403_0201);
        assert_eq!(&pool.seed_bytes()[..4], &[1, 2, 3, 4]);
    }
}
