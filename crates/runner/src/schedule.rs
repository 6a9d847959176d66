// Copyright 2025 Loadgauge Contributors
// SPDX-License-Identifier: Apache-2.0

//! Smooth weighted round-robin operation selection.
//!
//! Every full cycle of `sum(weights)` picks selects each index exactly
//! `weight` times, and heavy operations are spread across the cycle instead
//! of being dispatched back to back. Weights `[5, 1, 1]` yield
//! `a a b a c a a`.

/// Deterministic weighted selector over operation indices.
#[derive(Debug, Clone)]
pub struct WeightedRoundRobin {
    weights: Vec<i64>,
    current: Vec<i64>,
    total: i64,
}

impl WeightedRoundRobin {
    /// Create a selector. Weights must be non-empty and positive;
    /// load plans guarantee both.
    pub fn new(weights: &[u32]) -> Self {
        let weights: Vec<i64> = weights.iter().map(|w| i64::from(*w)).collect();
        let total = weights.iter().sum();
        Self {
            current: vec![0; weights.len()],
            weights,
            total,
        }
    }

    /// Selector advanced by `offset` picks, so that workers sharing the
    /// same weights do not all start on the same operation.
    pub fn with_offset(weights: &[u32], offset: usize) -> Self {
        let mut wrr = Self::new(weights);
        if wrr.total > 0 {
            for _ in 0..(offset as i64 % wrr.total) {
                wrr.next_index();
            }
        }
        wrr
    }

    /// Sum of all weights, the length of one full cycle.
    pub fn cycle_len(&self) -> u64 {
        self.total as u64
    }

    /// Index of the next operation to dispatch.
    pub fn next_index(&mut self) -> usize {
        let mut best = 0;
        for i in 0..self.weights.len() {
            self.current[i] += self.weights[i];
            if self.current[i] > self.current[best] {
                best = i;
            }
        }
        self.current[best] -= self.total;
        best
    }
}
