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

//! The vocabulary symbol table: a hash-addressed word index plus the two
//! adjacency lists (strong/weak lexical pairs) used by the trainer's
//! positive-sampling passes.

use std::sync::atomic::{AtomicU32, Ordering};

use log::warn;

use crate::error::{Error, Result};
use crate::tokenizer::read_file_by_tokens;

/// Which adjacency relation a pair file feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Strong,
    Weak,
}

struct RawWord {
    word: Box<[u8]>,
    count: u64,
}

/// One vocabulary entry: the word itself, its frequency, its precomputed
/// subsample coefficient, and the cursored strong/weak pair adjacency.
pub struct VocabEntry {
    pub word: Box<[u8]>,
    pub count: u64,
    pub pdiscard: f64,
    pub sp: Vec<u32>,
    pub wp: Vec<u32>,
    pos_sp: AtomicU32,
    pos_wp: AtomicU32,
}

impl VocabEntry {
    /// Next strong-pair target for this word, or `None` if it has no strong pairs.
    pub fn next_strong_pair(&self) -> Option<u32> {
        if self.sp.is_empty() {
            return None;
        }
        let i = self.pos_sp.fetch_add(1, Ordering::Relaxed) as usize % self.sp.len();
        Some(self.sp[i])
    }

    /// Next weak-pair target for this word, or `None` if it has no weak pairs.
    pub fn next_weak_pair(&self) -> Option<u32> {
        if self.wp.is_empty() {
            return None;
        }
        let i = self.pos_wp.fetch_add(1, Ordering::Relaxed) as usize % self.wp.len();
        Some(self.wp[i])
    }

    pub fn has_pair_target(&self, target: u32) -> bool {
        self.sp.contains(&target) || self.wp.contains(&target)
    }
}

const EMPTY: i32 = -1;

/// The symbol table built from the training corpus.
pub struct Vocabulary {
    entries: Vec<VocabEntry>,
    hash_table: Vec<i32>,
    hash_table_size: usize,
    train_words: u64,
}

#[inline]
fn hash_word(word: &[u8], table_size: usize) -> usize {
    let mut h: u64 = 0;
    for &b in word {
        h = h.wrapping_mul(257).wrapping_add(b as u64);
    }
    (h % table_size as u64) as usize
}

impl Vocabulary {
    /// Scan `corpus_path` once, build the count-sorted vocabulary, and apply
    /// `min_count`. `hash_table_size` is exposed mainly so tests can use a
    /// small table instead of the default 30M-entry one.
    pub fn build(corpus_path: &str, min_count: u32, hash_table_size: usize) -> Result<Vocabulary> {
        let mut raw: Vec<RawWord> = Vec::new();
        let mut hash_table = vec![EMPTY; hash_table_size];
        let mut train_words: u64 = 0;

        read_file_by_tokens(corpus_path, |token| {
            train_words += 1;
            let mut idx = hash_word(token, hash_table_size);
            loop {
                let slot = hash_table[idx];
                if slot == EMPTY {
                    let new_idx = raw.len() as i32;
                    raw.push(RawWord {
                        word: token.to_vec().into_boxed_slice(),
                        count: 1,
                    });
                    hash_table[idx] = new_idx;
                    break;
                }
                if raw[slot as usize].word.as_ref() == token {
                    raw[slot as usize].count += 1;
                    break;
                }
                idx = (idx + 1) % hash_table_size;
            }
        })?;

        raw.sort_by(|a, b| b.count.cmp(&a.count));
        let cut = raw.partition_point(|w| w.count >= min_count as u64);
        let dropped: u64 = raw[cut..].iter().map(|w| w.count).sum();
        raw.truncate(cut);
        train_words = train_words.saturating_sub(dropped);

        if raw.is_empty() {
            return Err(Error::EmptyVocabulary { min_count });
        }

        hash_table.fill(EMPTY);
        for (idx, w) in raw.iter().enumerate() {
            let mut h = hash_word(&w.word, hash_table_size);
            while hash_table[h] != EMPTY {
                h = (h + 1) % hash_table_size;
            }
            hash_table[h] = idx as i32;
        }

        let entries = raw
            .into_iter()
            .map(|w| VocabEntry {
                word: w.word,
                count: w.count,
                pdiscard: 1.0,
                sp: Vec::new(),
                wp: Vec::new(),
                pos_sp: AtomicU32::new(0),
                pos_wp: AtomicU32::new(0),
            })
            .collect();

        let mut vocab = Vocabulary {
            entries,
            hash_table,
            hash_table_size,
            train_words,
        };
        vocab.compute_discard_thresholds(1e-4);
        Ok(vocab)
    }

    /// Recompute each word's `pdiscard` coefficient for the given subsample
    /// threshold. `sample <= 0.0` disables subsampling (all words kept).
    pub fn compute_discard_thresholds(&mut self, sample: f64) {
        if sample <= 0.0 {
            for e in &mut self.entries {
                e.pdiscard = f64::INFINITY;
            }
            return;
        }
        let train_words = self.train_words as f64;
        for e in &mut self.entries {
            e.pdiscard = (sample * train_words / e.count as f64).sqrt();
        }
    }

    /// Look up a word, returning its vocabulary index or `-1` if absent.
    pub fn search_word(&self, word: &[u8]) -> i32 {
        let mut idx = hash_word(word, self.hash_table_size);
        loop {
            let slot = self.hash_table[idx];
            if slot == EMPTY {
                return EMPTY;
            }
            if self.entries[slot as usize].word.as_ref() == word {
                return slot;
            }
            idx = (idx + 1) % self.hash_table_size;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn train_words(&self) -> u64 {
        self.train_words
    }

    pub fn entry(&self, idx: usize) -> &VocabEntry {
        &self.entries[idx]
    }

    pub fn entries(&self) -> &[VocabEntry] {
        &self.entries
    }

    /// Ingest a whitespace-pair file into the strong or weak adjacency
    /// relation. Pairs referencing a word outside the vocabulary are
    /// silently dropped. Missing files degrade to an empty relation.
    pub fn ingest_pairs(&mut self, path: &str, relation: Relation) -> Result<()> {
        let mut tokens: Vec<Vec<u8>> = Vec::new();
        match read_file_by_tokens(path, |t| tokens.push(t.to_vec())) {
            Ok(()) => {}
            Err(e) => {
                warn!("pair file '{path}' could not be read ({e}); treating relation as empty");
                return Ok(());
            }
        }

        let mut pairs: Vec<(i32, i32)> = Vec::new();
        let mut it = tokens.chunks_exact(2);
        for pair in &mut it {
            let a = self.search_word(&pair[0]);
            let b = self.search_word(&pair[1]);
            if a == EMPTY || b == EMPTY || a == b {
                continue;
            }
            pairs.push((a, b));
        }

        for (a, b) in pairs {
            let (a, b) = (a as usize, b as usize);
            match relation {
                Relation::Strong => {
                    self.entries[a].sp.push(b as u32);
                    self.entries[b].sp.push(a as u32);
                }
                Relation::Weak => {
                    self.entries[a].wp.push(b as u32);
                    self.entries[b].wp.push(a as u32);
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn counts_are_sorted_descending() {
        let f = write_temp("a a a b b c c c c d");
        let vocab = Vocabulary::build(f.path().to_str().unwrap(), 1, 4096).unwrap();
        for w in vocab.entries().windows(2) {
            assert!(w[0].count >= w[1].count);
        }
    }

    #[test]
    fn min_count_filters_rare_words() {
        let f = write_temp("a a a a a b");
        let vocab = Vocabulary::build(f.path().to_str().unwrap(), 2, 4096).unwrap();
        assert_eq!(vocab.len(), 1);
        assert_eq!(vocab.search_word(b"b"), -1);
    }

    #[test]
    fn min_count_above_max_is_empty_vocabulary_error() {
        let f = write_temp("a a b");
        let result = Vocabulary::build(f.path().to_str().unwrap(), 10, 4096);
        assert!(matches!(result, Err(Error::EmptyVocabulary { .. })));
    }

    #[test]
    fn search_word_roundtrips() {
        let f = write_temp("cat dog cat bird");
        let vocab = Vocabulary::build(f.path().to_str().unwrap(), 1, 4096).unwrap();
        let idx = vocab.search_word(b"cat");
        assert!(idx >= 0);
        assert_eq!(vocab.entry(idx as usize).word.as_ref(), b"cat");
        assert_eq!(vocab.search_word(b"nonexistent"), -1);
    }

    #[test]
    fn strong_pairs_are_symmetric() {
        let corpus = write_temp("cat dog bird fish");
        let mut vocab = Vocabulary::build(corpus.path().to_str().unwrap(), 1, 4096).unwrap();
        let pairs = write_temp("cat dog");
        vocab
            .ingest_pairs(pairs.path().to_str().unwrap(), Relation::Strong)
            .unwrap();
        let cat = vocab.search_word(b"cat") as usize;
        let dog = vocab.search_word(b"dog") as usize;
        assert!(vocab.entry(cat).sp.contains(&(dog as u32)));
        assert!(vocab.entry(dog).sp.contains(&(cat as u32)));
    }

    #[test]
    fn pairs_with_unknown_words_are_dropped() {
        let corpus = write_temp("cat dog");
        let mut vocab = Vocabulary::build(corpus.path().to_str().unwrap(), 1, 4096).unwrap();
        let pairs = write_temp("cat unknownword");
        vocab
            .ingest_pairs(pairs.path().to_str().unwrap(), Relation::Strong)
            .unwrap();
        let cat = vocab.search_word(b"cat") as usize;
        assert!(vocab.entry(cat).sp.is_empty());
    }

    #[test]
    fn missing_pair_file_is_not_fatal() {
        let corpus = write_temp("cat dog");
        let mut vocab = Vocabulary::build(corpus.path().to_str().unwrap(), 1, 4096).unwrap();
        let result = vocab.ingest_pairs("/nonexistent/path/pairs.txt", Relation::Strong);
        assert!(result.is_ok());
    }

    #[test]
    fn subsample_disabled_yields_infinite_threshold() {
        let corpus = write_temp("a a a b");
        let mut vocab = Vocabulary::build(corpus.path().to_str().unwrap(), 1, 4096).unwrap();
        vocab.compute_discard_thresholds(0.0);
        assert!(vocab.entry(0).pdiscard.is_infinite());
    }
}
