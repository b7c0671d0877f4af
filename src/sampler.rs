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

//! The unigram^0.75 negative-sampling table.
//!
//! Built once at setup, shuffled, and then consumed purely by a shared
//! incrementing cursor during training -- no RNG call is needed per draw.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::vocab::Vocabulary;

const WORD_POWER: f64 = 0.75;

pub struct NegativeSampler {
    table: Vec<u32>,
    cursor: AtomicUsize,
}

impl NegativeSampler {
    /// Build the table; `table_size` entries, distributed proportional to
    /// `count^0.75` and then shuffled with a seeded RNG for reproducibility.
    /// Returns `None` if `negative == 0` (negative sampling disabled).
    pub fn build(vocab: &Vocabulary, table_size: usize, negative: u32, seed: u64) -> Option<Self> {
        if negative == 0 || vocab.is_empty() {
            return None;
        }

        let weights: Vec<f64> = vocab
            .entries()
            .iter()
            .map(|e| (e.count as f64).powf(WORD_POWER))
            .collect();
        let total: f64 = weights.iter().sum();

        let mut table = Vec::with_capacity(table_size);
        for (idx, w) in weights.iter().enumerate() {
            let cells = ((w * table_size as f64 / total).ceil() as usize + 1).min(table_size);
            for _ in 0..cells {
                if table.len() >= table_size {
                    break;
                }
                table.push(idx as u32);
            }
            if table.len() >= table_size {
                break;
            }
        }
        // Pad with the least frequent word if rounding left the table short.
        while table.len() < table_size {
            table.push((weights.len() - 1) as u32);
        }

        let mut rng = StdRng::seed_from_u64(seed);
        table.shuffle(&mut rng);

        Some(NegativeSampler {
            table,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Draw the next negative-sample vocabulary index, advancing the shared
    /// cursor with wraparound.
    #[inline]
    pub fn draw(&self) -> u32 {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % self.table.len();
        self.table[i]
    }

    pub fn table_len(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vocab_from(contents: &str) -> Vocabulary {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        Vocabulary::build(f.path().to_str().unwrap(), 1, 4096).unwrap()
    }

    #[test]
    fn disabled_when_negative_is_zero() {
        let vocab = vocab_from("a a a b");
        assert!(NegativeSampler::build(&vocab, 1000, 0, 1).is_none());
    }

    #[test]
    fn draws_are_always_in_vocab_range() {
        let vocab = vocab_from("a a a a b b c");
        let sampler = NegativeSampler::build(&vocab, 1000, 5, 42).unwrap();
        for _ in 0..5000 {
            let d = sampler.draw();
            assert!((d as usize) < vocab.len());
        }
    }

    #[test]
    fn frequent_words_get_more_cells() {
        let vocab = vocab_from(&format!("{} {}", "a ".repeat(100), "b"));
        let sampler = NegativeSampler::build(&vocab, 10_000, 5, 7).unwrap();
        let a_idx = vocab.search_word(b"a") as u32;
        let b_idx = vocab.search_word(b"b") as u32;
        let mut a_count = 0usize;
        let mut b_count = 0usize;
        for _ in 0..sampler.table_len() {
            let d = sampler.draw();
            if d == a_idx {
                a_count += 1;
            } else if d == b_idx {
                b_count += 1;
            }
        }
        assert!(a_count > b_count);
    }
}
