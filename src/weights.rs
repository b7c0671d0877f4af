//  Copyright 2026 Robert Zavalczki
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! Dense V x D weight matrices with unsynchronized ("Hogwild") concurrent
//! access.
//!
//! This is the only module in the crate that uses `unsafe`. Multiple worker
//! threads read and accumulate into the same rows without locking -- the
//! training algorithm is correct only in a statistical sense under
//! concurrent, racy float updates, and introducing a lock or a per-cell
//! atomic here would both slow the hot path down and change nothing about
//! correctness, since the races are already priced into the algorithm.

use std::cell::UnsafeCell;

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

pub struct WeightMatrix {
    data: UnsafeCell<Vec<f32>>,
    vocab_size: usize,
    dim: usize,
}

// SAFETY: all concurrent access goes through `row`/`row_slice`/`add_row`/
// `add_scaled_row`, which only ever touch a single row (`vocab_size` disjoint
// chunks). Two threads racing on the *same* row is tolerated by design
// (Hogwild SGD); there is no cross-row aliasing and no reallocation after
// construction.
unsafe impl Sync for WeightMatrix {}

impl WeightMatrix {
    fn with_data(vocab_size: usize, dim: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), vocab_size * dim);
        WeightMatrix {
            data: UnsafeCell::new(data),
            vocab_size,
            dim,
        }
    }

    /// Zero-initialized matrix (used for the output/context weights WO).
    pub fn zeros(vocab_size: usize, dim: usize) -> Self {
        Self::with_data(vocab_size, dim, vec![0.0; vocab_size * dim])
    }

    /// Uniformly initialized in `(-0.5/dim, 0.5/dim)` (used for the
    /// input/embedding weights WI).
    pub fn random_init(vocab_size: usize, dim: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let data: Vec<f32> = (0..vocab_size * dim)
            .map(|_| (rng.gen::<f32>() - 0.5) / dim as f32)
            .collect();
        Self::with_data(vocab_size, dim, data)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    fn row_ptr(&self, idx: usize) -> *mut f32 {
        debug_assert!(idx < self.vocab_size);
        let base = unsafe { (*self.data.get()).as_mut_ptr() };
        unsafe { base.add(idx * self.dim) }
    }

    /// Read a snapshot of row `idx`. May race with concurrent writers; the
    /// returned values are whatever was resident at the moment of the read.
    /// Allocates -- reserved for call sites outside the training hot path
    /// (tests, embedding I/O); use [`WeightMatrix::row_slice`] there instead.
    pub fn row(&self, idx: usize) -> Vec<f32> {
        self.row_slice(idx).to_vec()
    }

    /// Borrow row `idx` without copying. May race with concurrent writers;
    /// the returned slice observes whatever is resident in memory for as
    /// long as the borrow is used. Used on the training hot path, where an
    /// allocation per negative/strong/weak draw would defeat the
    /// cache-locality the unfused accumulate/update passes are for.
    #[inline]
    pub fn row_slice(&self, idx: usize) -> &[f32] {
        let ptr = self.row_ptr(idx);
        unsafe { std::slice::from_raw_parts(ptr, self.dim) }
    }

    /// Dot product of row `idx` against a caller-supplied vector.
    pub fn dot(&self, idx: usize, other: &[f32]) -> f32 {
        debug_assert_eq!(other.len(), self.dim);
        let ptr = self.row_ptr(idx);
        let row = unsafe { std::slice::from_raw_parts(ptr, self.dim) };
        row.iter().zip(other).map(|(a, b)| a * b).sum()
    }

    /// `row[idx] += delta` element-wise.
    pub fn add_row(&self, idx: usize, delta: &[f32]) {
        debug_assert_eq!(delta.len(), self.dim);
        let ptr = self.row_ptr(idx);
        let row = unsafe { std::slice::from_raw_parts_mut(ptr, self.dim) };
        for (r, d) in row.iter_mut().zip(delta) {
            *r += *d;
        }
    }

    /// `row[idx] += scale * other` element-wise.
    pub fn add_scaled_row(&self, idx: usize, scale: f32, other: &[f32]) {
        debug_assert_eq!(other.len(), self.dim);
        let ptr = self.row_ptr(idx);
        let row = unsafe { std::slice::from_raw_parts_mut(ptr, self.dim) };
        for (r, o) in row.iter_mut().zip(other) {
            *r += scale * o;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_init_is_bounded() {
        let m = WeightMatrix::random_init(10, 20, 1);
        for i in 0..10 {
            for v in m.row(i) {
                assert!(v.abs() <= 0.5 / 20.0);
            }
        }
    }

    #[test]
    fn zeros_is_all_zero() {
        let m = WeightMatrix::zeros(5, 4);
        assert_eq!(m.row(2), vec![0.0; 4]);
    }

    #[test]
    fn add_row_accumulates() {
        let m = WeightMatrix::zeros(3, 2);
        m.add_row(1, &[1.0, 2.0]);
        m.add_row(1, &[0.5, 0.5]);
        assert_eq!(m.row(1), vec![1.5, 2.5]);
    }

    #[test]
    fn add_scaled_row_scales() {
        let m = WeightMatrix::zeros(3, 2);
        m.add_scaled_row(0, 2.0, &[1.0, 1.0]);
        assert_eq!(m.row(0), vec![2.0, 2.0]);
    }

    #[test]
    fn dot_product_matches_manual() {
        let m = WeightMatrix::zeros(1, 3);
        m.add_row(0, &[1.0, 2.0, 3.0]);
        assert_eq!(m.dot(0, &[1.0, 1.0, 1.0]), 6.0);
    }

    #[test]
    fn row_slice_matches_row() {
        let m = WeightMatrix::zeros(3, 2);
        m.add_row(1, &[1.0, 2.0]);
        assert_eq!(m.row_slice(1), m.row(1).as_slice());
    }
}
