use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// ChIP sample, flagged `e` in the sample key.
    Treatment,
    /// Input sample, flagged `i` in the sample key.
    Control,
}

impl SampleType {
    pub fn from_flag(flag: &str) -> Option<Self> {
        match flag {
            "e" => Some(Self::Treatment),
            "i" => Some(Self::Control),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Treatment => "treatment",
            Self::Control => "control",
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub path: PathBuf,
    /// Column of this sample in the probe table.
    pub index: usize,
    pub sample_type: SampleType,
    pub group: String,
}

/// Samples sharing a biological condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub samples: Vec<Sample>,
}

impl Experiment {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            samples: Vec::new(),
        }
    }

    pub fn samples_of(&self, sample_type: SampleType) -> Vec<&Sample> {
        self.samples
            .iter()
            .filter(|s| s.sample_type == sample_type)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub id: String,
    pub sequence: String,
    pub x: i64,
    pub y: i64,
}

/// One data row of a .pair file.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub probe_id: String,
    pub pm: f64,
    pub line_num: usize,
}
