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

//! Precomputed sigmoid lookup, avoiding an `exp()` call per weight update.

/// Saturation bound: |x| >= SATURATION is clamped to 0 or 1 directly.
pub const SATURATION: f32 = 6.0;

/// Number of table entries spanning `[-SATURATION, SATURATION]`.
pub const TABLE_SIZE: usize = 512;

pub struct SigmoidTable {
    table: Vec<f32>,
}

impl SigmoidTable {
    pub fn new() -> Self {
        let mut table = Vec::with_capacity(TABLE_SIZE);
        for i in 0..TABLE_SIZE {
            let x = ((i as f32 * 2.0 / TABLE_SIZE as f32) - 1.0) * SATURATION;
            table.push(1.0 / (1.0 + (-x).exp()));
        }
        SigmoidTable { table }
    }

    /// Evaluate sigmoid(x), saturating outside `[-SATURATION, SATURATION]`.
    #[inline]
    pub fn sigmoid(&self, x: f32) -> f32 {
        if x >= SATURATION {
            1.0
        } else if x <= -SATURATION {
            0.0
        } else {
            let idx = ((x + SATURATION) * (TABLE_SIZE as f32 / (2.0 * SATURATION))) as usize;
            self.table[idx.min(TABLE_SIZE - 1)]
        }
    }
}

impl Default for SigmoidTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_one_half() {
        let table = SigmoidTable::new();
        assert!((table.sigmoid(0.0) - 0.5).abs() < 1e-2);
    }

    #[test]
    fn saturates_at_extremes() {
        let table = SigmoidTable::new();
        assert!(table.sigmoid(-10.0) < 0.01);
        assert!(table.sigmoid(10.0) > 0.99);
    }

    #[test]
    fn is_monotonic() {
        let table = SigmoidTable::new();
        let mut prev = table.sigmoid(-6.0);
        let mut x = -5.9f32;
        while x < 6.0 {
            let cur = table.sigmoid(x);
            assert!(cur >= prev - 1e-6);
            prev = cur;
            x += 0.1;
        }
    }
}
