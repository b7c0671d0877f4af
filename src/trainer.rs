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

//! The parallel training core: file-range partitioning across worker
//! threads, subsampling, and the three-pass (negative / strong / weak)
//! skip-gram update per context word.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::io;
use crate::sampler::NegativeSampler;
use crate::sigmoid::{SigmoidTable, SATURATION};
use crate::tokenizer::TokenCursor;
use crate::vocab::Vocabulary;
use crate::weights::WeightMatrix;

/// Maximum number of surviving tokens buffered as one training "line".
const MAXLINE: usize = 1000;

/// How many processed words a worker accumulates locally before flushing
/// into the shared progress counter.
const FLUSH_INTERVAL: u64 = 20_000;

struct SharedState {
    word_count_actual: AtomicU64,
    alpha_bits: AtomicU32,
    negsamp_total: AtomicU64,
    negsamp_discarded: AtomicU64,
}

impl SharedState {
    fn new(starting_alpha: f32) -> Self {
        SharedState {
            word_count_actual: AtomicU64::new(0),
            alpha_bits: AtomicU32::new(starting_alpha.to_bits()),
            negsamp_total: AtomicU64::new(0),
            negsamp_discarded: AtomicU64::new(0),
        }
    }

    fn alpha(&self) -> f32 {
        f32::from_bits(self.alpha_bits.load(Ordering::Relaxed))
    }
}

/// dict2vec's linear congruential generator, kept bit-for-bit rather than
/// swapped for a library RNG: subsampling must be cheap and per-worker
/// local, with no shared state or syscalls on the hot path.
struct LocalRng(u32);

impl LocalRng {
    fn new(seed: u32) -> Self {
        LocalRng(seed)
    }

    /// Uniform sample on [0, 1).
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.0 & 0xFFFF) as f64 / 65536.0
    }
}

/// Accumulate `g * WO[target]` into `hidden`, then apply `WO[target] +=
/// g * WI[w_c]`. The two passes are kept separate (not fused) for
/// cache-locality reasons inherited from the reference algorithm.
fn train_pair(
    wi: &WeightMatrix,
    wo: &WeightMatrix,
    sigmoid: &SigmoidTable,
    w_c: usize,
    target: usize,
    label: f32,
    scale: f32,
    alpha: f32,
    hidden: &mut [f32],
) {
    let wo_row = wo.row_slice(target);
    let z = wi.dot(w_c, wo_row);
    let sig = sigmoid.sigmoid(z);
    let g = alpha * scale * (label - sig);
    for (h, o) in hidden.iter_mut().zip(wo_row) {
        *h += g * o;
    }
    wo.add_scaled_row(target, g, wi.row_slice(w_c));
}

/// Used by the strong/weak positive-sampling passes, where `label` is
/// always 1. The saturation check is one-sided: a dot product already
/// above `SATURATION` means sigmoid(z) is already ~1, so `label - sig` is
/// ~0 and the whole update (both row passes) is skipped. A dot product
/// below `-SATURATION` is the opposite extreme (sigmoid(z) ~ 0) and still
/// receives the full-strength gradient `alpha * scale`, without a table
/// lookup.
fn train_pair_checked(
    wi: &WeightMatrix,
    wo: &WeightMatrix,
    sigmoid: &SigmoidTable,
    w_c: usize,
    target: usize,
    scale: f32,
    alpha: f32,
    hidden: &mut [f32],
) {
    let wo_row = wo.row_slice(target);
    let z = wi.dot(w_c, wo_row);
    if z > SATURATION {
        return;
    }
    let g = if z < -SATURATION {
        alpha * scale
    } else {
        alpha * scale * (1.0 - sigmoid.sigmoid(z))
    };
    for (h, o) in hidden.iter_mut().zip(wo_row) {
        *h += g * o;
    }
    wo.add_scaled_row(target, g, wi.row_slice(w_c));
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    worker_id: usize,
    offset: u64,
    config: &Config,
    vocab: &Vocabulary,
    sampler: Option<&NegativeSampler>,
    wi: &WeightMatrix,
    wo: &WeightMatrix,
    sigmoid: &SigmoidTable,
    shared: &SharedState,
    epoch_word_budget: u64,
) -> std::io::Result<()> {
    let mut cursor = TokenCursor::at_offset(&config.input, offset)?;
    let mut rng = LocalRng::new(
        (config.seed as u32).wrapping_add((worker_id as u32).wrapping_mul(0x9E37_79B9)),
    );

    let half_window = config.window / 2;
    let dim = wi.dim();
    let mut hidden = vec![0.0f32; dim];
    let mut line: Vec<u32> = Vec::with_capacity(MAXLINE);

    let mut wcl: u64 = 0;
    let mut last_flush_wcl: u64 = 0;
    let mut negsamp_total_local: u64 = 0;
    let mut negsamp_discarded_local: u64 = 0;
    let start = Instant::now();

    loop {
        if shared.word_count_actual.load(Ordering::Relaxed) >= epoch_word_budget {
            break;
        }

        line.clear();
        let mut eof = false;
        for _ in 0..MAXLINE {
            let token = match cursor.read_token() {
                Some(t) => t,
                None => {
                    eof = true;
                    break;
                }
            };

            let idx = vocab.search_word(&token);
            if idx < 0 {
                continue;
            }

            wcl += 1;
            if wcl - last_flush_wcl > FLUSH_INTERVAL {
                flush_progress(
                    config,
                    vocab,
                    shared,
                    wcl,
                    &mut last_flush_wcl,
                    negsamp_total_local,
                    negsamp_discarded_local,
                    &start,
                );
            }

            let entry = vocab.entry(idx as usize);
            let keep = if entry.pdiscard.is_infinite() {
                true
            } else {
                entry.pdiscard >= rng.next_unit()
            };
            if keep {
                line.push(idx as u32);
            }
        }

        if line.len() >= 2 * half_window + 1 {
            for pos in half_window..(line.len() - half_window) {
                let w_t = line[pos] as usize;
                for c in (pos - half_window)..=(pos + half_window) {
                    if c == pos {
                        continue;
                    }
                    let w_c = line[c] as usize;
                    let alpha = shared.alpha();
                    hidden.iter_mut().for_each(|h| *h = 0.0);

                    train_pair(wi, wo, sigmoid, w_c, w_t, 1.0, 1.0, alpha, &mut hidden);

                    if let Some(sampler) = sampler {
                        let context_entry = vocab.entry(w_c);
                        let mut drawn = 0u32;
                        while drawn < config.negative {
                            let target = sampler.draw();
                            if target as usize == w_t {
                                continue;
                            }
                            if context_entry.has_pair_target(target) {
                                negsamp_discarded_local += 1;
                                drawn += 1;
                                continue;
                            }
                            negsamp_total_local += 1;
                            train_pair(
                                wi,
                                wo,
                                sigmoid,
                                w_c,
                                target as usize,
                                0.0,
                                1.0,
                                alpha,
                                &mut hidden,
                            );
                            drawn += 1;
                        }
                    }

                    if config.strong_draws > 0 {
                        let context_entry = vocab.entry(w_c);
                        for _ in 0..config.strong_draws {
                            if let Some(target) = context_entry.next_strong_pair() {
                                train_pair_checked(
                                    wi,
                                    wo,
                                    sigmoid,
                                    w_c,
                                    target as usize,
                                    config.beta_strong,
                                    alpha,
                                    &mut hidden,
                                );
                            }
                        }
                    }

                    if config.weak_draws > 0 {
                        let context_entry = vocab.entry(w_c);
                        for _ in 0..config.weak_draws {
                            if let Some(target) = context_entry.next_weak_pair() {
                                train_pair_checked(
                                    wi,
                                    wo,
                                    sigmoid,
                                    w_c,
                                    target as usize,
                                    config.beta_weak,
                                    alpha,
                                    &mut hidden,
                                );
                            }
                        }
                    }

                    wi.add_row(w_c, &hidden);
                }
            }
        }

        if eof {
            if shared.word_count_actual.load(Ordering::Relaxed) + (wcl - last_flush_wcl)
                >= epoch_word_budget
            {
                break;
            }
            // EOF reached before this worker's share of the epoch budget was
            // met; keep re-checking the shared counter rather than wrapping
            // back to the start of this worker's file region.
            std::thread::yield_now();
        }
    }

    if wcl > last_flush_wcl {
        shared
            .word_count_actual
            .fetch_add(wcl - last_flush_wcl, Ordering::Relaxed);
    }
    shared
        .negsamp_total
        .fetch_add(negsamp_total_local, Ordering::Relaxed);
    shared
        .negsamp_discarded
        .fetch_add(negsamp_discarded_local, Ordering::Relaxed);

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn flush_progress(
    config: &Config,
    vocab: &Vocabulary,
    shared: &SharedState,
    wcl: u64,
    last_flush_wcl: &mut u64,
    negsamp_total_local: u64,
    negsamp_discarded_local: u64,
    start: &Instant,
) {
    let delta = wcl - *last_flush_wcl;
    *last_flush_wcl = wcl;
    let word_count_actual = shared
        .word_count_actual
        .fetch_add(delta, Ordering::Relaxed)
        + delta;

    let total_budget = (config.epoch as u64 * vocab.train_words()).max(1);
    let progress = word_count_actual as f64 / total_budget as f64 * 100.0;
    let new_alpha = (config.alpha
        * (1.0 - word_count_actual as f32 / total_budget as f32))
        .max(0.0);
    shared
        .alpha_bits
        .store(new_alpha.to_bits(), Ordering::Relaxed);

    debug!(
        "alpha={new_alpha:.6} progress={progress:.2}% words/sec={:.1}k negsamp_discard_rate={:.3}",
        (word_count_actual as f64 / 1000.0) / start.elapsed().as_secs_f64().max(1e-6),
        negsamp_discarded_local as f64 / (negsamp_total_local.max(1)) as f64,
    );
}

/// Run the full training schedule: `config.epoch` passes, each spawning
/// `config.threads` workers that race over the shared weight matrices.
/// Writes the embedding file after each epoch (if `save_each_epoch`) or
/// after the final epoch only.
pub fn run_training(
    config: &Config,
    vocab: &Vocabulary,
    sampler: Option<&NegativeSampler>,
    wi: &WeightMatrix,
    wo: &WeightMatrix,
    sigmoid: &SigmoidTable,
) -> Result<()> {
    let file_size = std::fs::metadata(&config.input)?.len();
    let shared = SharedState::new(config.alpha);

    for epoch in 0..config.epoch {
        let epoch_word_budget = vocab.train_words() * (epoch as u64 + 1);

        std::thread::scope(|scope| {
            for worker_id in 0..config.threads {
                let offset = file_size * worker_id as u64 / config.threads as u64;
                let shared = &shared;
                scope.spawn(move || {
                    if let Err(e) = worker_loop(
                        worker_id,
                        offset,
                        config,
                        vocab,
                        sampler,
                        wi,
                        wo,
                        sigmoid,
                        shared,
                        epoch_word_budget,
                    ) {
                        warn!("worker {worker_id} stopped early due to an I/O error: {e}");
                    }
                });
            }
        });

        info!(
            "epoch {}/{} done, word_count_actual={}, negsamp_total={}, negsamp_discarded={}",
            epoch + 1,
            config.epoch,
            shared.word_count_actual.load(Ordering::Relaxed),
            shared.negsamp_total.load(Ordering::Relaxed),
            shared.negsamp_discarded.load(Ordering::Relaxed),
        );

        if config.save_each_epoch {
            let path = io::epoch_output_path(&config.output, epoch + 1, true);
            io::write_embeddings(&path, vocab, wi)?;
        }
    }

    if !config.save_each_epoch {
        let path = io::epoch_output_path(&config.output, config.epoch, false);
        io::write_embeddings(&path, vocab, wi)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocab::Relation;

    fn build_small(corpus: &str, window: usize) -> (Config, Vocabulary) {
        let mut cfg = Config::new(corpus, "ignored");
        cfg = cfg.window(window).threads(1).epoch(1).min_count(1);
        let vocab = Vocabulary::build(corpus, cfg.min_count, 4096).unwrap();
        (cfg, vocab)
    }

    #[test]
    fn positive_only_training_moves_weights() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("corpus.txt");
        std::fs::write(&corpus_path, "the cat sat on the mat the dog sat too").unwrap();
        let corpus = corpus_path.to_str().unwrap();

        let (mut cfg, mut vocab) = build_small(corpus, 3);
        cfg.output = dir.path().join("out").to_str().unwrap().to_string();
        cfg.negative = 0;
        cfg.strong_draws = 0;
        cfg.weak_draws = 0;
        vocab.compute_discard_thresholds(0.0);

        let wi = WeightMatrix::random_init(vocab.len(), 8, 1);
        let wo = WeightMatrix::zeros(vocab.len(), 8);
        let sigmoid = SigmoidTable::new();

        let before: Vec<f32> = wi.row(0);
        run_training(&cfg, &vocab, None, &wi, &wo, &sigmoid).unwrap();
        let after: Vec<f32> = wi.row(0);
        assert_ne!(before, after);
        assert!(std::path::Path::new(&format!("{}.vec", cfg.output)).exists());
    }

    #[test]
    fn strong_pairs_pull_vectors_closer() {
        let dir = tempfile::tempdir().unwrap();
        let corpus_path = dir.path().join("corpus.txt");
        let text = "alpha beta gamma delta epsilon zeta eta theta ".repeat(20);
        std::fs::write(&corpus_path, &text).unwrap();
        let corpus = corpus_path.to_str().unwrap();

        let (mut cfg, mut vocab) = build_small(corpus, 2);
        cfg.output = dir.path().join("out").to_str().unwrap().to_string();
        cfg.negative = 0;
        cfg.strong_draws = 4;
        cfg.weak_draws = 0;
        cfg.beta_strong = 1.0;
        vocab.compute_discard_thresholds(0.0);

        let pairs_path = dir.path().join("pairs.txt");
        std::fs::write(&pairs_path, "alpha theta").unwrap();
        vocab
            .ingest_pairs(pairs_path.to_str().unwrap(), Relation::Strong)
            .unwrap();

        let wi = WeightMatrix::random_init(vocab.len(), 16, 2);
        let wo = WeightMatrix::zeros(vocab.len(), 16);
        let sigmoid = SigmoidTable::new();

        let alpha_idx = vocab.search_word(b"alpha") as usize;
        let theta_idx = vocab.search_word(b"theta") as usize;
        let cos_before = cosine(&wi.row(alpha_idx), &wi.row(theta_idx));

        run_training(&cfg, &vocab, None, &wi, &wo, &sigmoid).unwrap();

        let cos_after = cosine(&wi.row(alpha_idx), &wi.row(theta_idx));
        assert!(cos_after > cos_before);
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        dot / (na * nb + 1e-12)
    }
}
