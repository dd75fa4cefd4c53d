use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CustomError {
    #[error("could not read {path}")]
    ReadWithPath {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not write to {path}")]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("could not create output directory")]
    OutputDir {
        #[source]
        source: std::io::Error,
    },

    #[error("could not read sample key {path}")]
    CsvRead {
        #[source]
        source: csv::Error,
        path: PathBuf,
    },

    #[error("could not write to CSV")]
    CsvWrite(#[from] csv::Error),

    #[error("could not write array {name} to {path}")]
    NpyWrite {
        #[source]
        source: ndarray_npy::WriteNpyError,
        name: String,
        path: PathBuf,
    },

    #[error("could not write archive {path}")]
    Zip {
        #[source]
        source: zip::result::ZipError,
        path: PathBuf,
    },

    #[error("could not serialize {name} for {path}")]
    Json {
        #[source]
        source: serde_json::Error,
        name: String,
        path: PathBuf,
    },

    #[error("could not plot {what}")]
    Plot {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("could not find font")]
    Font,

    #[error("could not build thread pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("expected {expected} fields (got {n_fields}) in line {line_num} of sample key")]
    SampleKeyFields {
        line_num: usize,
        n_fields: usize,
        expected: usize,
    },

    #[error("sample type {flag:?} in line {line_num} of sample key is not 'e' or 'i'")]
    SampleKeyType { line_num: usize, flag: String },

    #[error("sample file {file} in line {line_num} of sample key is not a .pair file")]
    SampleKeyExtension { line_num: usize, file: String },

    #[error("sample {sample} is listed more than once in the sample key")]
    SampleKeyDuplicate { sample: String },

    #[error("sample key {path} lists no samples")]
    SampleKeyEmpty { path: PathBuf },

    #[error("{kind} names {first:?} and {second:?} map to the same output file name")]
    SampleKeyStubCollision {
        kind: &'static str,
        first: String,
        second: String,
    },

    #[error("sample name {sample:?} in line {line_num} of sample key clashes with a probe table column")]
    SampleKeyReservedName { line_num: usize, sample: String },

    #[error("expected at least {expected} fields (got {n_fields}) in line {line_num} of {path}")]
    NdfFields {
        path: PathBuf,
        line_num: usize,
        n_fields: usize,
        expected: usize,
    },

    #[error("could not parse {column} coordinate {value:?} in line {line_num} of {path}")]
    NdfCoordinate {
        #[source]
        source: std::num::ParseIntError,
        path: PathBuf,
        line_num: usize,
        column: &'static str,
        value: String,
    },

    #[error("probe {probe_id} appears twice in {path} (lines {first_line} and {line_num})")]
    NdfDuplicateProbe {
        path: PathBuf,
        probe_id: String,
        first_line: usize,
        line_num: usize,
    },

    #[error("design file {path} contains no probes")]
    NdfEmpty { path: PathBuf },

    #[error("no .ndf design file found in {dir}")]
    DesignNotFound { dir: PathBuf },

    #[error("found {n_candidates} .ndf design files in {dir} and none matches design name {design_name:?}")]
    DesignAmbiguous {
        dir: PathBuf,
        n_candidates: usize,
        design_name: Option<String>,
    },

    #[error("{path} is missing its column header")]
    PairHeaderMissing { path: PathBuf },

    #[error("{path} is not in standard .pair format: expected header {expected:?}, found {found:?}")]
    PairHeader {
        path: PathBuf,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("expected {expected} fields (got {n_fields}) in line {line_num} of {path}")]
    PairFields {
        path: PathBuf,
        line_num: usize,
        n_fields: usize,
        expected: usize,
    },

    #[error("could not parse PM intensity {value:?} in line {line_num} of {path}")]
    PairIntensity {
        path: PathBuf,
        line_num: usize,
        value: String,
    },

    #[error("probe {probe_id} in line {line_num} of {path} is not in the design")]
    UnknownProbe {
        path: PathBuf,
        line_num: usize,
        probe_id: String,
    },

    #[error("probe {probe_id} in line {line_num} of {path} was already measured for sample {sample}")]
    DuplicateMeasurement {
        path: PathBuf,
        line_num: usize,
        probe_id: String,
        sample: String,
    },
}

pub type Result<T> = std::result::Result<T, CustomError>;
