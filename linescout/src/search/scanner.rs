use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use super::cache::CompiledPattern;
use super::matcher::{match_line, strip_line_ending};
use crate::config::EncodingMode;
use crate::errors::{SearchError, SearchResult};
use crate::results::Match;

const BUFFER_CAPACITY: usize = 64 * 1024;
const LINE_CAPACITY: usize = 256;

/// Opens files and streams their matching lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileScanner {
    encoding_mode: EncodingMode,
}

impl FileScanner {
    pub fn new(encoding_mode: EncodingMode) -> Self {
        Self { encoding_mode }
    }

    /// Opens `path` and returns a lazy sequence of its matching lines.
    ///
    /// Only one line is held in memory at a time. Failing to open the file is
    /// reported here; read and decoding failures surface as an `Err` item from
    /// the iterator, after which it ends.
    pub fn scan(&self, path: &Path, pattern: &CompiledPattern) -> SearchResult<LineMatches> {
        trace!("Scanning file: {}", path.display());
        let file = File::open(path).map_err(|e| SearchError::file_unreadable(path, e))?;

        Ok(LineMatches {
            reader: BufReader::with_capacity(BUFFER_CAPACITY, file),
            buffer: Vec::with_capacity(LINE_CAPACITY),
            file: path.to_string_lossy().into_owned(),
            pattern: pattern.clone(),
            encoding_mode: self.encoding_mode,
            cancel: None,
            line_number: 0,
            bytes_read: 0,
            finished: false,
        })
    }
}

/// Iterator over the matching lines of one file, in line order.
///
/// Finite and not restartable: once it returns `None` (or an `Err`), it is
/// exhausted.
#[derive(Debug)]
pub struct LineMatches {
    reader: BufReader<File>,
    buffer: Vec<u8>,
    file: String,
    pattern: CompiledPattern,
    encoding_mode: EncodingMode,
    cancel: Option<CancellationToken>,
    line_number: usize,
    bytes_read: u64,
    finished: bool,
}

impl LineMatches {
    /// Stops the scan with [`SearchError::Cancelled`] once `token` fires.
    /// The token is checked before every line.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Bytes consumed from the file so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Number of lines read so far
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    fn fail(&mut self, err: SearchError) -> Option<SearchResult<Match>> {
        self.finished = true;
        Some(Err(err))
    }

    fn decode(&self) -> Result<Cow<'_, str>, std::str::Utf8Error> {
        match self.encoding_mode {
            EncodingMode::FailFast => std::str::from_utf8(&self.buffer).map(Cow::Borrowed),
            EncodingMode::Lossy => {
                let cow = String::from_utf8_lossy(&self.buffer);
                if let Cow::Owned(_) = cow {
                    warn!(
                        "Invalid UTF-8 replaced in {} line {}",
                        self.file, self.line_number
                    );
                }
                Ok(cow)
            }
        }
    }
}

impl Iterator for LineMatches {
    type Item = SearchResult<Match>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self
                .cancel
                .as_ref()
                .is_some_and(CancellationToken::is_cancelled)
            {
                return self.fail(SearchError::Cancelled);
            }

            self.buffer.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => {
                    self.finished = true;
                    return None;
                }
                Ok(n) => n,
                Err(e) => {
                    let err = SearchError::file_unreadable(&self.file, e);
                    return self.fail(err);
                }
            };

            self.line_number += 1;
            self.bytes_read += read as u64;

            let decoded = self.decode().map(|text| {
                match_line(
                    &self.pattern,
                    &self.file,
                    self.line_number,
                    strip_line_ending(&text),
                )
            });

            let found = match decoded {
                Ok(found) => found,
                Err(e) => {
                    let reason = format!("invalid UTF-8 on line {}: {}", self.line_number, e);
                    let err = SearchError::file_unreadable(&self.file, reason);
                    return self.fail(err);
                }
            };

            if let Some(m) = found {
                trace!("Found match at line {}: {}", m.line, m.content);
                return Some(Ok(m));
            }
        }
    }
}
