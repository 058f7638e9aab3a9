//! Board model: token grid, match detection, gravity compaction, cascades.

use crate::rng::TokenRng;
use std::collections::HashSet;

/// Grid coordinate as (row, col), 0-indexed from the top-left.
pub type Coord = (usize, usize);

/// Two cells are adjacent iff their Manhattan distance is exactly 1.
pub fn adjacent(a: Coord, b: Coord) -> bool {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1) == 1
}

/// N×N grid of token kinds. `None` is an empty cell, which only exists
/// transiently between `clear` and `compact_and_refill`; a stable board is
/// full and match-free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: usize,
    kinds: u8,
    /// Row-major; cells[r * size + c].
    cells: Vec<Option<u8>>,
}

impl Board {
    /// Fresh board of random tokens. Callers that need a playable board must
    /// follow up with `resolve_cascades_silently`.
    pub fn new(size: usize, kinds: u8, rng: &mut TokenRng) -> Self {
        let cells = (0..size * size).map(|_| Some(rng.next_kind(kinds))).collect();
        Self { size, kinds, cells }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn kinds(&self) -> u8 {
        self.kinds
    }

    /// Token at (row, col); `None` for empty cells and out-of-bounds reads.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.cells[row * self.size + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Option<u8>) {
        if row < self.size && col < self.size {
            self.cells[row * self.size + col] = value;
        }
    }

    /// Exchange the tokens at two coordinates. Adjacency is a caller policy,
    /// not enforced here; the swap is its own inverse.
    pub fn swap(&mut self, a: Coord, b: Coord) {
        let ia = a.0 * self.size + a.1;
        let ib = b.0 * self.size + b.1;
        self.cells.swap(ia, ib);
    }

    /// All cells belonging to a horizontal or vertical run of ≥3 equal tokens.
    /// Single sweep per line: a maximal run is measured once and the cursor
    /// jumps past it, so the scan is linear in grid size. Empty cells break
    /// runs and never match.
    pub fn detect_matches(&self) -> HashSet<Coord> {
        let n = self.size;
        let mut matches = HashSet::new();

        for r in 0..n {
            let mut c = 0;
            while c < n {
                let Some(val) = self.get(r, c) else {
                    c += 1;
                    continue;
                };
                let mut run = 1;
                while c + run < n && self.get(r, c + run) == Some(val) {
                    run += 1;
                }
                if run >= 3 {
                    for i in 0..run {
                        matches.insert((r, c + i));
                    }
                }
                c += run;
            }
        }

        for c in 0..n {
            let mut r = 0;
            while r < n {
                let Some(val) = self.get(r, c) else {
                    r += 1;
                    continue;
                };
                let mut run = 1;
                while r + run < n && self.get(r + run, c) == Some(val) {
                    run += 1;
                }
                if run >= 3 {
                    for i in 0..run {
                        matches.insert((r + i, c));
                    }
                }
                r += run;
            }
        }

        matches
    }

    /// Empty every given cell. Already-empty cells are a no-op.
    pub fn clear(&mut self, coords: &HashSet<Coord>) {
        for &(r, c) in coords {
            self.set(r, c, None);
        }
    }

    /// Gravity: per column, drop surviving tokens to the bottom preserving
    /// their relative order, then fill the rows above with fresh tokens.
    pub fn compact_and_refill(&mut self, rng: &mut TokenRng) {
        let n = self.size;
        for c in 0..n {
            let mut stack = Vec::with_capacity(n);
            for r in (0..n).rev() {
                if let Some(v) = self.get(r, c) {
                    stack.push(v);
                }
            }
            let mut r = n as i32 - 1;
            for v in stack {
                self.set(r as usize, c, Some(v));
                r -= 1;
            }
            while r >= 0 {
                self.set(r as usize, c, Some(rng.next_kind(self.kinds)));
                r -= 1;
            }
        }
    }

    /// Detect → clear → refill until the board reaches a match-free fixed
    /// point. Used for pre-play stabilization only: no animation, no score.
    /// Returns the total number of cells cleared along the way.
    pub fn resolve_cascades_silently(&mut self, rng: &mut TokenRng) -> usize {
        let mut total = 0;
        loop {
            let matches = self.detect_matches();
            if matches.is_empty() {
                return total;
            }
            total += matches.len();
            self.clear(&matches);
            self.compact_and_refill(rng);
        }
    }

    /// Build a board from explicit rows; `None` entries are empty cells.
    #[cfg(test)]
    pub fn from_rows(rows: &[Vec<Option<u8>>], kinds: u8) -> Self {
        let size = rows.len();
        assert!(rows.iter().all(|r| r.len() == size), "rows must be square");
        let cells = rows.iter().flatten().copied().collect();
        Self { size, kinds, cells }
    }
}
