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

use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use serde::Serialize;

use dict2vec_rs::Config;

/// Train word embeddings with skip-gram negative sampling plus strong/weak
/// lexical-pair positive sampling.
#[derive(Parser, Debug)]
#[clap(name = "dict2vec-rs", about = "Parallel dict2vec-style embedding trainer")]
struct Args {
    /// Training corpus: whitespace-separated tokens, no sentence markers.
    #[clap(short = 'i', long)]
    input: String,

    /// Output path; embeddings are written to `<output>.vec` (or
    /// `<output>-epoch-N.vec` with --save-each-epoch).
    #[clap(short = 'o', long)]
    output: String,

    /// File of whitespace-separated strong lexical pairs.
    #[clap(long)]
    strong_file: Option<String>,

    /// File of whitespace-separated weak lexical pairs.
    #[clap(long)]
    weak_file: Option<String>,

    /// Vector dimensionality.
    #[clap(short = 's', long, default_value_t = 100)]
    size: usize,

    /// Context window width.
    #[clap(short = 'w', long, default_value_t = 5)]
    window: usize,

    /// Discard words occurring fewer than this many times.
    #[clap(long, default_value_t = 5)]
    min_count: u32,

    /// Negative samples drawn per positive example.
    #[clap(long, default_value_t = 5)]
    negative: u32,

    /// Strong-pair draws per context word.
    #[clap(long, default_value_t = 0)]
    strong_draws: u32,

    /// Weak-pair draws per context word.
    #[clap(long, default_value_t = 0)]
    weak_draws: u32,

    /// Initial learning rate.
    #[clap(short = 'a', long, default_value_t = 0.025)]
    alpha: f32,

    /// Subsample threshold for frequent words; <= 0 disables subsampling.
    #[clap(long, default_value_t = 1e-4)]
    sample: f64,

    /// Scale applied to strong-pair gradient updates.
    #[clap(long, default_value_t = 1.0)]
    beta_strong: f32,

    /// Scale applied to weak-pair gradient updates.
    #[clap(long, default_value_t = 0.25)]
    beta_weak: f32,

    /// Number of worker threads. Defaults to the available parallelism.
    #[clap(short = 't', long)]
    threads: Option<usize>,

    /// Number of training epochs.
    #[clap(short = 'e', long, default_value_t = 1)]
    epoch: u32,

    /// Write an embedding file after every epoch instead of only the last.
    #[clap(long)]
    save_each_epoch: bool,

    /// RNG seed for weight initialization and negative-table shuffling.
    #[clap(long, default_value_t = 1)]
    seed: u64,
}

#[derive(Serialize)]
struct RunMetadata {
    input: String,
    output: String,
    config: Config,
    vocab_size: Option<usize>,
    train_words: Option<u64>,
    started_at: String,
    finished_at: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::new(args.input.clone(), args.output.clone())
        .size(args.size)
        .window(args.window)
        .min_count(args.min_count)
        .negative(args.negative)
        .strong_draws(args.strong_draws)
        .weak_draws(args.weak_draws)
        .alpha(args.alpha)
        .sample(args.sample)
        .beta_strong(args.beta_strong)
        .beta_weak(args.beta_weak)
        .threads(args.threads.unwrap_or_else(num_cpus::get))
        .epoch(args.epoch)
        .save_each_epoch(args.save_each_epoch)
        .seed(args.seed);
    let config = if let Some(path) = args.strong_file {
        config.strong_file(path)
    } else {
        config
    };
    let config = if let Some(path) = args.weak_file {
        config.weak_file(path)
    } else {
        config
    };

    let started_at = Utc::now().to_rfc3339();
    let start = Instant::now();

    let summary = dict2vec_rs::run(&config).context("training failed")?;

    let finished_at = Utc::now().to_rfc3339();
    log::info!("training finished in {:.1}s", start.elapsed().as_secs_f64());

    let meta = RunMetadata {
        input: config.input.clone(),
        output: config.output.clone(),
        config: config.clone(),
        vocab_size: Some(summary.vocab_size),
        train_words: Some(summary.train_words),
        started_at,
        finished_at,
    };
    let meta_path = format!("{}.meta.json", config.output);
    let writer = BufWriter::new(File::create(&meta_path).context("writing run metadata")?);
    serde_json::to_writer_pretty(writer, &meta).context("serializing run metadata")?;

    Ok(())
}
