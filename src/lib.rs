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

//! A parallel word-embedding trainer combining skip-gram negative sampling
//! with two supplementary positive-sampling passes driven by external
//! "strong pair" and "weak pair" lexical relation files.

pub mod config;
pub mod error;
pub mod io;
pub mod sampler;
pub mod sigmoid;
pub mod tokenizer;
pub mod trainer;
pub mod vocab;
pub mod weights;

pub use config::Config;
pub use error::{Error, Result};

use log::info;

use sampler::NegativeSampler;
use sigmoid::SigmoidTable;
use vocab::{Relation, Vocabulary};
use weights::WeightMatrix;

/// Summary of a completed run, handed back to the CLI for the metadata
/// sidecar.
pub struct RunSummary {
    pub vocab_size: usize,
    pub train_words: u64,
}

/// End-to-end run: build the vocabulary, ingest strong/weak pairs, build
/// the sampler and weight matrices, train, and write the embedding file(s).
pub fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;

    info!("building vocabulary from '{}'", config.input);
    let mut vocab = Vocabulary::build(&config.input, config.min_count, config.hash_table_size)?;
    vocab.compute_discard_thresholds(config.sample);
    info!(
        "vocabulary size={} train_words={}",
        vocab.len(),
        vocab.train_words()
    );

    if let Some(path) = &config.strong_file {
        vocab.ingest_pairs(path, Relation::Strong)?;
    }
    if let Some(path) = &config.weak_file {
        vocab.ingest_pairs(path, Relation::Weak)?;
    }

    let sampler = NegativeSampler::build(
        &vocab,
        config.negative_table_size,
        config.negative,
        config.seed,
    );

    let wi = WeightMatrix::random_init(vocab.len(), config.size, config.seed);
    let wo = WeightMatrix::zeros(vocab.len(), config.size);
    let sigmoid = SigmoidTable::new();

    let vocab_size = vocab.len();
    let train_words = vocab.train_words();
    trainer::run_training(config, &vocab, sampler.as_ref(), &wi, &wo, &sigmoid)?;

    Ok(RunSummary {
        vocab_size,
        train_words,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end_smoke() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = dir.path().join("corpus.txt");
        std::fs::write(&corpus, "the cat sat on the mat the dog sat too but the cat ran").unwrap();
        let output = dir.path().join("vectors");

        let cfg = Config::new(corpus.to_str().unwrap(), output.to_str().unwrap())
            .size(8)
            .window(2)
            .min_count(1)
            .negative(2)
            .threads(2)
            .epoch(1);

        let summary = run(&cfg).unwrap();
        assert!(summary.vocab_size > 0);
        assert!(summary.train_words > 0);
        assert!(std::path::Path::new(&format!("{}.vec", output.to_str().unwrap())).exists());
    }
}
