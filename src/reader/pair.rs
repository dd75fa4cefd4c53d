use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::model::Measurement;
use crate::reader::IntensityReader;

pub(crate) const PAIR_HEADER: [&str; 11] = [
    "IMAGE_ID",
    "GENE_EXPR_OPTION",
    "SEQ_ID",
    "PROBE_ID",
    "POSITION",
    "X",
    "Y",
    "MATCH_INDEX",
    "SEQ_URL",
    "PM",
    "MM",
];
pub(crate) const PROBE_ID_COL: usize = 3;
pub(crate) const PM_COL: usize = 9;

/// Reads a NimbleScan `.pair` file. The column header is validated on open,
/// so a reader that exists has a well-formed schema.
pub struct PairReader {
    reader: BufReader<File>,
    path: PathBuf,
    metadata: BTreeMap<String, String>,
    line_num: usize,
    done: bool,
}

impl PairReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = File::open(&path).map_err(|e| CustomError::ReadWithPath {
            source: e,
            path: path.clone(),
        })?;
        let mut reader = BufReader::new(f);
        let mut metadata = BTreeMap::new();
        let mut line_num = 0;

        // Leading '#' lines carry scanner metadata, the first other line is the header
        let header = loop {
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .map_err(|e| CustomError::ReadWithPath {
                    source: e,
                    path: path.clone(),
                })?;
            if n == 0 {
                return Err(CustomError::PairHeaderMissing { path });
            }
            line_num += 1;
            let line = line.trim_end_matches(['\n', '\r']);
            match line.strip_prefix('#') {
                Some(comment) => parse_metadata(comment, &mut metadata),
                None => break line.to_string(),
            }
        };

        let found: Vec<&str> = header.split('\t').map(str::trim).collect();
        if found != PAIR_HEADER {
            return Err(CustomError::PairHeader {
                path,
                expected: PAIR_HEADER.iter().map(|s| s.to_string()).collect(),
                found: found.iter().map(|s| s.to_string()).collect(),
            });
        }

        Ok(Self {
            reader,
            path,
            metadata,
            line_num,
            done: false,
        })
    }

    /// `key=value` pairs from the metadata lines, e.g. `designname`.
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn design_name(&self) -> Option<&str> {
        self.metadata.get("designname").map(String::as_str)
    }

    fn parse_line(&self, line: &str) -> Result<Measurement> {
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        if fields.len() != PAIR_HEADER.len() {
            return Err(CustomError::PairFields {
                path: self.path.clone(),
                line_num: self.line_num,
                n_fields: fields.len(),
                expected: PAIR_HEADER.len(),
            });
        }
        let raw_pm = fields[PM_COL];
        let pm = raw_pm
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| CustomError::PairIntensity {
                path: self.path.clone(),
                line_num: self.line_num,
                value: raw_pm.to_string(),
            })?;
        Ok(Measurement {
            probe_id: fields[PROBE_ID_COL].to_string(),
            pm,
            line_num: self.line_num,
        })
    }
}

fn parse_metadata(comment: &str, metadata: &mut BTreeMap<String, String>) {
    for field in comment.split('\t') {
        if let Some((key, value)) = field.split_once('=') {
            metadata.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
}

impl IntensityReader for PairReader {
    fn path(&self) -> &Path {
        &self.path
    }
}

impl Iterator for PairReader {
    type Item = Result<Measurement>;

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
                        // Poison iterator to prevent further reads
                        self.done = true;
                    }
                    return Some(parsed);
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
