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

//! Whitespace tokenizer over opaque byte strings.
//!
//! Tokens are never decoded or normalized: the corpus, and the strong/weak
//! pair files, are treated as raw bytes split on ASCII whitespace. There is
//! no sentence/document boundary token; a "line" for training purposes is
//! just a run of `MAXLINE` consecutive surviving tokens (see the `trainer`
//! module).

use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

/// Maximum token length in bytes; longer tokens are truncated on read.
pub const MAXLEN: usize = 100;

const READ_BUFFER_SIZE: usize = 8192;

#[inline]
fn is_token_separator(byte: &u8) -> bool {
    *byte == b'\n' || *byte == b' ' || *byte == b'\t' || *byte == b'\r'
}

/// Read `file_name` start to finish and invoke `token_callback` for every
/// whitespace-delimited token, truncated to `MAXLEN` bytes.
pub fn read_file_by_tokens<T: FnMut(&[u8])>(
    file_name: &str,
    mut token_callback: T,
) -> std::io::Result<()> {
    let mut buf_reader: BufReader<File> = BufReader::new(File::open(file_name)?);
    let mut rest: Vec<u8> = Vec::new();

    loop {
        let data: &[u8] = buf_reader.fill_buf()?;
        if data.is_empty() {
            if !rest.is_empty() {
                rest.truncate(MAXLEN);
                token_callback(&rest);
            }
            break;
        }

        let data_len = data.len();
        let mut skip_bytes: usize = 0;

        if !rest.is_empty() {
            if let Some(pos) = data.iter().position(is_token_separator) {
                rest.extend_from_slice(&data[..pos]);
                rest.truncate(MAXLEN);
                token_callback(&rest);
                rest.clear();
                skip_bytes = pos + 1;
            }
        }

        let mut token_start: usize = skip_bytes;
        let mut token_end: usize = token_start;

        for byte in &data[skip_bytes..] {
            if is_token_separator(byte) {
                if token_end > token_start {
                    let end = token_start + (token_end - token_start).min(MAXLEN);
                    token_callback(&data[token_start..end]);
                }
                token_end += 1;
                token_start = token_end;
            } else {
                token_end += 1;
            }
        }

        if token_end > token_start {
            rest.extend_from_slice(&data[token_start..token_end]);
        }

        buf_reader.consume(data_len);
    }

    Ok(())
}

/// Seekable streaming token reader, used by training workers that each scan
/// an independent byte range of the corpus.
pub struct TokenCursor {
    file: File,
    start_pos: usize,
    end_pos: usize,
    read_buffer: Vec<u8>,
    rest: Vec<u8>,
}

impl Iterator for TokenCursor {
    type Item = Vec<u8>;
    fn next(&mut self) -> Option<Self::Item> {
        self.read_token()
    }
}

impl TokenCursor {
    /// Open `file_name` and begin iteration at byte `offset`.
    pub fn at_offset(file_name: &str, offset: u64) -> std::io::Result<TokenCursor> {
        let mut result = TokenCursor {
            file: File::open(file_name)?,
            start_pos: 0,
            end_pos: 0,
            read_buffer: vec![0; READ_BUFFER_SIZE],
            rest: Vec::new(),
        };
        result.file.seek(SeekFrom::Start(offset))?;
        Ok(result)
    }

    /// Re-start iteration from `offset`, discarding any buffered partial token.
    pub fn reset(&mut self, offset: u64) -> std::io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.start_pos = 0;
        self.end_pos = 0;
        self.rest.clear();
        Ok(())
    }

    /// Return the next token, or `None` at end of file.
    pub fn read_token(&mut self) -> Option<Vec<u8>> {
        loop {
            if self.start_pos == self.end_pos {
                self.start_pos = 0;
                self.end_pos = self.file.read(&mut self.read_buffer[..]).unwrap_or(0);
                if self.end_pos == 0 {
                    if !self.rest.is_empty() {
                        self.rest.truncate(MAXLEN);
                        let out = std::mem::take(&mut self.rest);
                        return Some(out);
                    }
                    return None;
                }
            }

            if !self.rest.is_empty() {
                if let Some(pos) = self.read_buffer[self.start_pos..self.end_pos]
                    .iter()
                    .position(is_token_separator)
                {
                    self.rest
                        .extend_from_slice(&self.read_buffer[self.start_pos..self.start_pos + pos]);
                    self.start_pos += pos + 1;
                    self.rest.truncate(MAXLEN);
                    let out = std::mem::take(&mut self.rest);
                    return Some(out);
                }
            }

            let mut token_start: usize = self.start_pos;
            let mut token_end: usize = token_start;

            for byte in &self.read_buffer[self.start_pos..self.end_pos] {
                if !is_token_separator(byte) {
                    token_end += 1;
                    continue;
                }

                if token_end == token_start {
                    token_end += 1;
                    token_start = token_end;
                    continue;
                }

                let end = token_start + (token_end - token_start).min(MAXLEN);
                let out = self.read_buffer[token_start..end].to_vec();
                self.start_pos = token_end + 1;
                return Some(out);
            }

            if token_end > token_start {
                self.rest
                    .extend_from_slice(&self.read_buffer[token_start..token_end]);
                self.start_pos = self.end_pos;
                if self.rest.len() < MAXLEN {
                    continue;
                }
                self.rest.truncate(MAXLEN);
                let out = std::mem::take(&mut self.rest);
                return Some(out);
            }

            self.start_pos = token_end;
            self.end_pos = token_end;
        }
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
    fn splits_on_whitespace() {
        let f = write_temp("the quick\nbrown  fox\tjumps\r\nover");
        let mut tokens = Vec::new();
        read_file_by_tokens(f.path().to_str().unwrap(), |t| tokens.push(t.to_vec())).unwrap();
        let words: Vec<String> = tokens
            .into_iter()
            .map(|t| String::from_utf8(t).unwrap())
            .collect();
        assert_eq!(words, vec!["the", "quick", "brown", "fox", "jumps", "over"]);
    }

    #[test]
    fn truncates_long_tokens() {
        let long = "a".repeat(500);
        let f = write_temp(&long);
        let mut tokens = Vec::new();
        read_file_by_tokens(f.path().to_str().unwrap(), |t| tokens.push(t.to_vec())).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].len(), MAXLEN);
    }

    #[test]
    fn cursor_matches_full_scan_from_zero() {
        let f = write_temp("alpha beta gamma delta");
        let mut cursor = TokenCursor::at_offset(f.path().to_str().unwrap(), 0).unwrap();
        let mut words = Vec::new();
        while let Some(tok) = cursor.read_token() {
            words.push(String::from_utf8(tok).unwrap());
        }
        assert_eq!(words, vec!["alpha", "beta", "gamma", "delta"]);
    }

    #[test]
    fn cursor_reset_rewinds() {
        let f = write_temp("one two three");
        let mut cursor = TokenCursor::at_offset(f.path().to_str().unwrap(), 0).unwrap();
        assert_eq!(cursor.read_token(), Some(b"one".to_vec()));
        cursor.reset(0).unwrap();
        assert_eq!(cursor.read_token(), Some(b"one".to_vec()));
    }
}
