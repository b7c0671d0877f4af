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

//! The on-disk embedding text format: a `V D` header line followed by one
//! `<token> v0 v1 ... v(D-1)` line per vocabulary entry.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use crate::vocab::Vocabulary;
use crate::weights::WeightMatrix;

/// Write `wi`'s rows (one per vocabulary entry, in vocabulary order) to
/// `path` in the plain-text embedding format.
pub fn write_embeddings(path: &str, vocab: &Vocabulary, wi: &WeightMatrix) -> std::io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(w, "{} {}", vocab.len(), wi.dim())?;
    for (idx, entry) in vocab.entries().iter().enumerate() {
        w.write_all(&entry.word)?;
        w.write_all(b" ")?;
        for v in wi.row(idx) {
            write!(w, "{v:.3} ")?;
        }
        writeln!(w)?;
    }
    Ok(())
}

/// Suffix an output base path for a given epoch, matching
/// `-epoch-<k>.vec`/`.vec` depending on `save_each_epoch`.
pub fn epoch_output_path(base: &str, epoch: u32, save_each_epoch: bool) -> String {
    if save_each_epoch {
        format!("{base}-epoch-{epoch}.vec")
    } else {
        format!("{base}.vec")
    }
}

/// A single parsed embedding row, for round-trip tests and downstream use.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingEntry {
    pub word: Vec<u8>,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    pub dim: usize,
    pub entries: Vec<EmbeddingEntry>,
}

/// Parse the plain-text embedding format written by [`write_embeddings`].
pub fn read_embeddings(path: &str) -> std::io::Result<Embeddings> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut header = String::new();
    reader.read_line(&mut header)?;
    let mut parts = header.split_whitespace();
    let vocab_size: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid("missing vocab size in header"))?;
    let dim: usize = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid("missing dimension in header"))?;

    let mut entries = Vec::with_capacity(vocab_size);
    for _ in 0..vocab_size {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Err(invalid("unexpected end of file while reading embeddings"));
        }
        while line.last() == Some(&b'\n') || line.last() == Some(&b'\r') {
            line.pop();
        }
        let mut fields = line.split(|b| *b == b' ').filter(|f| !f.is_empty());
        let word = fields
            .next()
            .ok_or_else(|| invalid("missing token in embedding line"))?
            .to_vec();
        let mut vector = Vec::with_capacity(dim);
        for f in fields {
            let s = std::str::from_utf8(f).map_err(|_| invalid("non-utf8 vector component"))?;
            let v: f32 = s.parse().map_err(|_| invalid("non-numeric vector component"))?;
            vector.push(v);
        }
        if vector.len() != dim {
            return Err(invalid("vector length does not match header dimension"));
        }
        entries.push(EmbeddingEntry { word, vector });
    }

    Ok(Embeddings { dim, entries })
}

fn invalid(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg.to_string())
}
