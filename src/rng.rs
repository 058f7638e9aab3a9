//! Seeded token generator: deterministic under a fixed seed.

use std::time::{SystemTime, UNIX_EPOCH};

/// Small LCG (Numerical Recipes constants) producing uniform token kinds.
/// A fixed seed reproduces the exact board/refill sequence, which the tests
/// rely on; `from_clock` is the default for interactive play.
#[derive(Debug, Clone)]
pub struct TokenRng {
    state: u32,
}

impl TokenRng {
    pub fn new(seed: u32) -> Self {
        // Seed 0 would get stuck near zero for the first draws.
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Seed from the wall clock (sub-second nanos mixed with seconds).
    pub fn from_clock() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self::new(now.subsec_nanos() ^ (now.as_secs() as u32))
    }

    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.state
    }

    /// Uniform token kind in `[0, kinds)`. Upper bits of the LCG state are the
    /// better-distributed ones.
    pub fn next_kind(&mut self, kinds: u8) -> u8 {
        ((self.next_u32() >> 16) % u32::from(kinds)) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = TokenRng::new(12345);
        let mut b = TokenRng::new(12345);
        for _ in 0..100 {
            assert_eq!(a.next_kind(5), b.next_kind(5));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = TokenRng::new(12345);
        let mut b = TokenRng::new(54321);
        let sa: Vec<u8> = (0..32).map(|_| a.next_kind(5)).collect();
        let sb: Vec<u8> = (0..32).map(|_| b.next_kind(5)).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn kinds_in_range() {
        let mut rng = TokenRng::new(7);
        for _ in 0..1000 {
            assert!(rng.next_kind(5) < 5);
        }
    }

    #[test]
    fn zero_seed_is_usable() {
        let mut rng = TokenRng::new(0);
        let drawn: std::collections::HashSet<u8> = (0..64).map(|_| rng.next_kind(5)).collect();
        assert!(drawn.len() > 1);
    }
}
