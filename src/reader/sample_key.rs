use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{CustomError, Result};
use crate::model::{Experiment, Sample, SampleType};
use crate::output::{PROBE_COLUMNS, file_stub};

pub(crate) const SAMPLE_KEY_FIELDS: usize = 3;
pub(crate) const PAIR_EXTENSION: &str = ".pair";

#[derive(Debug, Clone)]
pub struct SampleKey {
    samples: Vec<Sample>,
}

impl SampleKey {
    /// Reads a tab-separated `filename, type, group` manifest.
    /// Relative file names are resolved against the manifest's directory.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let base_dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|source| CustomError::CsvRead {
                source,
                path: path.to_path_buf(),
            })?;

        let mut samples = Vec::new();
        let mut seen = HashSet::new();
        let mut sample_stubs = HashMap::new();
        let mut group_stubs = HashMap::new();
        for (record_idx, result) in reader.records().enumerate() {
            let record = result.map_err(|source| CustomError::CsvRead {
                source,
                path: path.to_path_buf(),
            })?;
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }
            let line_num = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(record_idx + 1);

            if record.len() != SAMPLE_KEY_FIELDS {
                return Err(CustomError::SampleKeyFields {
                    line_num,
                    n_fields: record.len(),
                    expected: SAMPLE_KEY_FIELDS,
                });
            }

            let sample = parse_sample(&record[0], &record[1], &record[2], line_num, &base_dir)?;
            ensure_unique(&mut seen, &sample.name)?;
            ensure_distinct_stub(&mut sample_stubs, "sample", &sample.name)?;
            ensure_distinct_stub(&mut group_stubs, "group", &sample.group)?;
            samples.push(Sample {
                index: samples.len(),
                ..sample
            });
        }

        if samples.is_empty() {
            return Err(CustomError::SampleKeyEmpty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample_names(&self) -> Vec<String> {
        self.samples.iter().map(|s| s.name.clone()).collect()
    }

    /// Groups samples by experiment, in order of first appearance.
    pub fn experiments(&self) -> Vec<Experiment> {
        let mut experiments: Vec<Experiment> = Vec::new();
        for sample in &self.samples {
            match experiments.iter_mut().find(|e| e.name == sample.group) {
                Some(experiment) => experiment.samples.push(sample.clone()),
                None => {
                    let mut experiment = Experiment::new(sample.group.clone());
                    experiment.samples.push(sample.clone());
                    experiments.push(experiment);
                }
            }
        }
        experiments
    }
}

fn parse_sample(
    file: &str,
    flag: &str,
    group: &str,
    line_num: usize,
    base_dir: &Path,
) -> Result<Sample> {
    let sample_type = SampleType::from_flag(flag).ok_or_else(|| CustomError::SampleKeyType {
        line_num,
        flag: flag.to_string(),
    })?;

    let file_path = PathBuf::from(file);
    let name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(PAIR_EXTENSION))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| CustomError::SampleKeyExtension {
            line_num,
            file: file.to_string(),
        })?;

    if PROBE_COLUMNS.contains(&name) {
        return Err(CustomError::SampleKeyReservedName {
            line_num,
            sample: name.to_string(),
        });
    }

    Ok(Sample {
        name: name.to_string(),
        path: base_dir.join(&file_path),
        index: 0,
        sample_type,
        group: group.to_string(),
    })
}

fn ensure_unique(seen: &mut HashSet<String>, name: &str) -> Result<()> {
    if !seen.insert(name.to_string()) {
        return Err(CustomError::SampleKeyDuplicate {
            sample: name.to_string(),
        });
    }
    Ok(())
}

/// Plot file names are built from stubs, so distinct names must keep distinct stubs.
fn ensure_distinct_stub(
    stubs: &mut HashMap<String, String>,
    kind: &'static str,
    name: &str,
) -> Result<()> {
    match stubs.entry(file_stub(name)) {
        Entry::Occupied(entry) if entry.get() != name => Err(CustomError::SampleKeyStubCollision {
            kind,
            first: entry.get().clone(),
            second: name.to_string(),
        }),
        Entry::Occupied(_) => Ok(()),
        Entry::Vacant(entry) => {
            entry.insert(name.to_string());
            Ok(())
        }
    }
}
