//! CSV input
//!
//! The first record is the header and names the gauge labels. Remaining
//! records are read lazily, one forward pass over the open file. Records of
//! any width are yielded; deciding what to do with a mismatched row is the
//! publisher's job.
//!
//! The `csv` crate silently skips blank lines. They are yielded here as rows
//! with no values, so they are reported like any other malformed row.

use crate::config::SourceConfig;
use crate::error::{AppError, AppResult};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::Path;

/// One data record with its 1-based line number in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub line: u64,
    pub values: Vec<String>,
}

/// Open CSV file with its header already read
pub struct CsvSource {
    path: String,
    header: Vec<String>,
    records: StringRecordsIntoIter<File>,
    crlf: bool,
    unterminated_len: Option<u64>,
}

impl CsvSource {
    /// Open `path` and read the header row
    ///
    /// # Errors
    ///
    /// - `AppError::SourceOpen` if the file cannot be opened
    /// - `AppError::SourceRead` if the header cannot be decoded
    /// - `AppError::MissingHeader` if the file holds no records at all
    pub fn open<P: AsRef<Path>>(path: P, config: &SourceConfig) -> AppResult<Self> {
        let path_display = path.as_ref().display().to_string();
        let open_error = |source: std::io::Error| AppError::SourceOpen {
            path: path_display.clone(),
            source,
        };

        let mut file = File::open(path.as_ref()).map_err(open_error)?;
        let unterminated_len = unterminated_length(&mut file).map_err(open_error)?;

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .delimiter(config.delimiter_byte())
            .trim(if config.trim { Trim::All } else { Trim::None })
            .from_reader(file);

        let header = reader
            .headers()
            .map_err(|source| AppError::SourceRead {
                path: path_display.clone(),
                source,
            })?
            .clone();

        if header.is_empty() {
            return Err(AppError::MissingHeader { path: path_display });
        }

        // A CRLF terminator leaves its '\n' for the next read, so the line
        // counter has not yet moved past the header.
        let crlf = reader.position().line() <= 1 + newlines_in(&header);

        let header = record_values(&header);
        tracing::debug!(path = %path_display, columns = ?header, crlf, "Read CSV header");

        Ok(Self {
            path: path_display,
            header,
            records: reader.into_records(),
            crlf,
            unterminated_len,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Column names from the first row, in file order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Consume the source, yielding the remaining rows in file order
    pub fn into_rows(self) -> Rows {
        Rows {
            path: self.path,
            records: self.records,
            crlf: self.crlf,
            unterminated_len: self.unterminated_len,
            blank_lines: 0..0,
            buffered: None,
            finished: false,
        }
    }
}

/// Iterator over the data rows of a `CsvSource`
///
/// Blank lines come out as rows with an empty `values`.
pub struct Rows {
    path: String,
    records: StringRecordsIntoIter<File>,
    crlf: bool,
    /// File length when the last line has no terminator
    unterminated_len: Option<u64>,
    blank_lines: Range<u64>,
    buffered: Option<Row>,
    finished: bool,
}

impl Rows {
    fn current_line(&self) -> u64 {
        self.records.reader().position().line()
    }

    fn pending_newline(&self) -> u64 {
        u64::from(self.crlf)
    }
}

impl Iterator for Rows {
    type Item = AppResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(line) = self.blank_lines.next() {
            return Some(Ok(Row {
                line,
                values: Vec::new(),
            }));
        }
        if let Some(row) = self.buffered.take() {
            return Some(Ok(row));
        }
        if self.finished {
            return None;
        }

        let line_before = self.current_line();
        let first_unread = line_before + self.pending_newline();

        let record = match self.records.next() {
            Some(Ok(record)) => record,
            Some(Err(source)) => {
                self.finished = true;
                return Some(Err(AppError::SourceRead {
                    path: self.path.clone(),
                    source,
                }));
            }
            None => {
                // Trailing blank lines after the last record
                self.finished = true;
                self.blank_lines = first_unread..self.current_line().max(first_unread);
                return self.next();
            }
        };

        // Newlines consumed by this read: the previous CRLF's '\n', skipped
        // blank lines, newlines inside quoted fields, and an LF terminator.
        let consumed = self.current_line() - line_before;
        let at_unterminated_end =
            self.unterminated_len == Some(self.records.reader().position().byte());
        let terminator = u64::from(!self.crlf && !at_unterminated_end);
        let blanks = consumed
            .saturating_sub(self.pending_newline() + newlines_in(&record) + terminator);

        let start = first_unread + blanks;
        self.blank_lines = first_unread..start;
        self.buffered = Some(Row {
            line: start,
            values: record_values(&record),
        });
        self.next()
    }
}

fn record_values(record: &StringRecord) -> Vec<String> {
    record.iter().map(str::to_string).collect()
}

fn newlines_in(record: &StringRecord) -> u64 {
    record
        .iter()
        .map(|field| field.bytes().filter(|&b| b == b'\n').count() as u64)
        .sum()
}

/// Length of the file if its last byte is not a line terminator
///
/// Leaves the file positioned at the start.
fn unterminated_length(file: &mut File) -> std::io::Result<Option<u64>> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(None);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    file.seek(SeekFrom::Start(0))?;

    Ok(match last[0] {
        b'\n' | b'\r' => None,
        _ => Some(len),
    })
}
