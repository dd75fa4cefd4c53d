pub mod design;
pub mod ndf;
pub mod pair;
pub mod sample_key;

use std::path::Path;

use crate::error::Result;
use crate::model::Measurement;

/// Source of per-probe intensities for a single sample.
pub trait IntensityReader: Iterator<Item = Result<Measurement>> {
    fn path(&self) -> &Path;
}
