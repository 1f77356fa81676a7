use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::record::{DocumentRecord, IngestError};
use super::Ingestible;

/// Crawler output with one JSON-encoded `DocumentRecord` per line.
///
/// Blank lines are ignored. A line that is not UTF-8 or not a record is
/// yielded as `MalformedInput` so the builder can skip it.
pub struct JsonLinesSource<R> {
    reader: R,
    label: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, IngestError> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            label: path.display().to_string(),
        })
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn new(reader: R, label: impl Into<String>) -> Self {
        Self {
            reader,
            label: label.into(),
        }
    }
}

impl<R: BufRead> Ingestible for JsonLinesSource<R> {
    type Records = JsonLinesRecords<R>;

    fn records(self) -> Self::Records {
        JsonLinesRecords {
            reader: self.reader,
            label: self.label,
            line_number: 0,
            failed: false,
        }
    }
}

pub struct JsonLinesRecords<R> {
    reader: R,
    label: String,
    line_number: usize,
    failed: bool,
}

impl<R: BufRead> Iterator for JsonLinesRecords<R> {
    type Item = Result<DocumentRecord, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let mut buf = Vec::new();
            match self.reader.read_until(b'\n', &mut buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    self.failed = true;
                    return Some(Err(IngestError::Io(e)));
                }
            }
            self.line_number += 1;
            let location = format!("{}:{}", self.label, self.line_number);

            let line = match String::from_utf8(buf) {
                Ok(line) => line,
                Err(_) => {
                    return Some(Err(IngestError::malformed(location, "line is not valid UTF-8")))
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            return Some(
                serde_json::from_str::<DocumentRecord>(line)
                    .map_err(|e| IngestError::malformed(location, e.to_string())),
            );
        }
    }
}
