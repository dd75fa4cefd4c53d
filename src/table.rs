use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use ndarray::{Array2, ArrayView1};

use crate::error::{CustomError, Result};
use crate::model::Probe;
use crate::reader::IntensityReader;
use crate::reader::ndf::NdfReader;

/// Probes of one array design joined with per-sample PM intensities.
pub struct ProbeTable {
    probes: Vec<Probe>,
    index: HashMap<String, usize>,
    samples: Vec<String>,
    // (n_probes x n_samples), NaN until measured
    intensities: Array2<f64>,
}

impl ProbeTable {
    pub fn from_ndf(path: impl AsRef<Path>, samples: Vec<String>) -> Result<Self> {
        let reader = NdfReader::open(&path)?;
        Self::from_records(path, reader, samples)
    }

    /// Builds the table from `(line_num, probe)` records of the design at `path`.
    pub fn from_records(
        path: impl AsRef<Path>,
        records: impl IntoIterator<Item = Result<(usize, Probe)>>,
        samples: Vec<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut probes = Vec::new();
        let mut index = HashMap::new();
        let mut first_lines = Vec::new();

        for record in records {
            let (line_num, probe) = record?;
            match index.entry(probe.id.clone()) {
                Entry::Occupied(entry) => {
                    return Err(CustomError::NdfDuplicateProbe {
                        path: path.to_path_buf(),
                        probe_id: probe.id,
                        first_line: first_lines[*entry.get()],
                        line_num,
                    });
                }
                Entry::Vacant(entry) => {
                    entry.insert(probes.len());
                    first_lines.push(line_num);
                    probes.push(probe);
                }
            }
        }

        if probes.is_empty() {
            return Err(CustomError::NdfEmpty {
                path: path.to_path_buf(),
            });
        }

        let intensities = Array2::from_elem((probes.len(), samples.len()), f64::NAN);
        Ok(Self {
            probes,
            index,
            samples,
            intensities,
        })
    }

    pub fn n_probes(&self) -> usize {
        self.probes.len()
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn probes(&self) -> &[Probe] {
        &self.probes
    }

    pub fn samples(&self) -> &[String] {
        &self.samples
    }

    pub fn intensities(&self) -> &Array2<f64> {
        &self.intensities
    }

    pub fn row_of(&self, probe_id: &str) -> Option<usize> {
        self.index.get(probe_id).copied()
    }

    /// Intensities of one sample in design order.
    pub fn sample_column(&self, sample_idx: usize) -> ArrayView1<'_, f64> {
        self.intensities.column(sample_idx)
    }

    pub fn n_missing(&self, sample_idx: usize) -> usize {
        self.sample_column(sample_idx)
            .iter()
            .filter(|v| v.is_nan())
            .count()
    }

    /// Writes every PM value from `reader` into the column of `sample_idx`.
    /// Returns the number of probes measured.
    pub fn consume_reader(
        &mut self,
        sample_idx: usize,
        reader: &mut dyn IntensityReader,
    ) -> Result<usize> {
        let pb = progress_bar(self.probes.len() as u64);
        self.consume_with_progress(sample_idx, reader, &pb)
    }

    /// The bar is cleared whether or not the join succeeds.
    fn consume_with_progress(
        &mut self,
        sample_idx: usize,
        reader: &mut dyn IntensityReader,
        pb: &ProgressBar,
    ) -> Result<usize> {
        let result = self.fill_column(sample_idx, reader, pb);
        pb.finish_and_clear();
        result
    }

    fn fill_column(
        &mut self,
        sample_idx: usize,
        reader: &mut dyn IntensityReader,
        pb: &ProgressBar,
    ) -> Result<usize> {
        let mut n_measured = 0;
        while let Some(measurement) = reader.next() {
            let measurement = measurement?;
            let row = self.row_of(&measurement.probe_id).ok_or_else(|| {
                CustomError::UnknownProbe {
                    path: reader.path().to_path_buf(),
                    line_num: measurement.line_num,
                    probe_id: measurement.probe_id.clone(),
                }
            })?;

            let cell = &mut self.intensities[[row, sample_idx]];
            if !cell.is_nan() {
                return Err(CustomError::DuplicateMeasurement {
                    path: reader.path().to_path_buf(),
                    line_num: measurement.line_num,
                    probe_id: measurement.probe_id,
                    sample: self.samples[sample_idx].clone(),
                });
            }
            *cell = measurement.pm;
            n_measured += 1;
            pb.inc(1);
        }
        Ok(n_measured)
    }
}

/// Hidden when logging is switched off with `--quiet`.
fn progress_bar(len: u64) -> ProgressBar {
    if log::max_level() == LevelFilter::Off {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:30} {pos}/{len} probes")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    pb
}
