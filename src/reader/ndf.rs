use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::model::Probe;

// Zero-based columns of a NimbleGen design file
pub(crate) const PROBE_SEQUENCE_COL: usize = 5;
pub(crate) const PROBE_ID_COL: usize = 12;
pub(crate) const X_COL: usize = 15;
pub(crate) const Y_COL: usize = 16;
pub(crate) const MIN_FIELDS: usize = Y_COL + 1;

/// Streams probes out of a `.ndf` file, skipping its header row.
pub struct NdfReader {
    reader: BufReader<File>,
    path: PathBuf,
    line_num: usize,
    done: bool,
}

impl NdfReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| CustomError::ReadWithPath {
            source: e,
            path: path.clone(),
        })?;
        let mut reader = BufReader::new(f);

        // Header row
        let mut header = String::new();
        reader
            .read_line(&mut header)
            .map_err(|e| CustomError::ReadWithPath {
                source: e,
                path: path.clone(),
            })?;

        Ok(Self {
            reader,
            path,
            line_num: 1,
            done: false,
        })
    }

    fn parse_line(&self, line: &str) -> Result<Probe> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() < MIN_FIELDS {
            return Err(CustomError::NdfFields {
                path: self.path.clone(),
                line_num: self.line_num,
                n_fields: fields.len(),
                expected: MIN_FIELDS,
            });
        }
        Ok(Probe {
            id: fields[PROBE_ID_COL].to_string(),
            sequence: fields[PROBE_SEQUENCE_COL].to_string(),
            x: self.parse_coordinate(fields[X_COL], "X")?,
            y: self.parse_coordinate(fields[Y_COL], "Y")?,
        })
    }

    fn parse_coordinate(&self, value: &str, column: &'static str) -> Result<i64> {
        value.parse().map_err(|e| CustomError::NdfCoordinate {
            source: e,
            path: self.path.clone(),
            line_num: self.line_num,
            column,
            value: value.to_string(),
        })
    }
}

impl Iterator for NdfReader {
    /// Line number and the probe read from it.
    type Item = Result<(usize, Probe)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_num += 1;
                    let line = line.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    let parsed = self.parse_line(line);
                    if parsed.is_err() {
                        self.done = true;
                    }
                    return Some(parsed.map(|probe| (self.line_num, probe)));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(CustomError::ReadWithPath {
                        source: e,
                        path: self.path.clone(),
                    }));
                }
            }
        }
        None
    }
}
