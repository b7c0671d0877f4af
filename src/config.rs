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

//! Typed training configuration, with serde support for the run-metadata
//! sidecar and a builder-style fluent setup for programmatic callers.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// All hyperparameters and resource limits for one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub input: String,
    pub output: String,
    pub strong_file: Option<String>,
    pub weak_file: Option<String>,

    pub size: usize,
    pub window: usize,
    pub min_count: u32,
    pub negative: u32,
    pub strong_draws: u32,
    pub weak_draws: u32,
    pub alpha: f32,
    pub sample: f64,
    pub beta_strong: f32,
    pub beta_weak: f32,
    pub threads: usize,
    pub epoch: u32,
    pub save_each_epoch: bool,
    pub seed: u64,

    pub hash_table_size: usize,
    pub negative_table_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input: String::new(),
            output: String::new(),
            strong_file: None,
            weak_file: None,
            size: 100,
            window: 5,
            min_count: 5,
            negative: 5,
            strong_draws: 0,
            weak_draws: 0,
            alpha: 0.025,
            sample: 1e-4,
            beta_strong: 1.0,
            beta_weak: 0.25,
            threads: 1,
            epoch: 1,
            save_each_epoch: false,
            seed: 1,
            hash_table_size: 30_000_000,
            negative_table_size: 100_000_000,
        }
    }
}

impl Config {
    pub fn new(input: impl Into<String>, output: impl Into<String>) -> Self {
        Config {
            input: input.into(),
            output: output.into(),
            ..Default::default()
        }
    }

    pub fn strong_file(mut self, path: impl Into<String>) -> Self {
        self.strong_file = Some(path.into());
        self
    }

    pub fn weak_file(mut self, path: impl Into<String>) -> Self {
        self.weak_file = Some(path.into());
        self
    }

    pub fn size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    pub fn min_count(mut self, min_count: u32) -> Self {
        self.min_count = min_count;
        self
    }

    pub fn negative(mut self, negative: u32) -> Self {
        self.negative = negative;
        self
    }

    pub fn strong_draws(mut self, draws: u32) -> Self {
        self.strong_draws = draws;
        self
    }

    pub fn weak_draws(mut self, draws: u32) -> Self {
        self.weak_draws = draws;
        self
    }

    pub fn alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn sample(mut self, sample: f64) -> Self {
        self.sample = sample;
        self
    }

    pub fn beta_strong(mut self, beta: f32) -> Self {
        self.beta_strong = beta;
        self
    }

    pub fn beta_weak(mut self, beta: f32) -> Self {
        self.beta_weak = beta;
        self
    }

    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn epoch(mut self, epoch: u32) -> Self {
        self.epoch = epoch;
        self
    }

    pub fn save_each_epoch(mut self, save: bool) -> Self {
        self.save_each_epoch = save;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn hash_table_size(mut self, size: usize) -> Self {
        self.hash_table_size = size;
        self
    }

    pub fn negative_table_size(mut self, size: usize) -> Self {
        self.negative_table_size = size;
        self
    }

    /// Reject nonsensical option combinations before any file I/O is attempted.
    pub fn validate(&self) -> Result<()> {
        if self.input.is_empty() {
            return Err(Error::MissingInput("input"));
        }
        if self.output.is_empty() {
            return Err(Error::MissingInput("output"));
        }
        if self.size == 0 {
            return Err(Error::InvalidConfig("size must be > 0".into()));
        }
        if self.window == 0 {
            return Err(Error::InvalidConfig("window must be > 0".into()));
        }
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be > 0".into()));
        }
        if self.epoch == 0 {
            return Err(Error::InvalidConfig("epoch must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes_validation_with_paths() {
        let cfg = Config::new("corpus.txt", "vectors");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn missing_input_is_rejected() {
        let cfg = Config::default();
        assert!(matches!(cfg.validate(), Err(Error::MissingInput("input"))));
    }

    #[test]
    fn builder_overrides_defaults() {
        let cfg = Config::new("a", "b")
            .size(50)
            .negative(10)
            .strong_draws(2)
            .weak_draws(1)
            .threads(4);
        assert_eq!(cfg.size, 50);
        assert_eq!(cfg.negative, 10);
        assert_eq!(cfg.strong_draws, 2);
        assert_eq!(cfg.weak_draws, 1);
        assert_eq!(cfg.threads, 4);
    }
}
