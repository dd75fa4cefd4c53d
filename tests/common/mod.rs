#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub const N_PROBES: usize = 400;
/// Probes left out of the last replicate's .pair file.
pub const N_UNMEASURED: usize = 10;
pub const DESIGN_NAME: &str = "TEST_DESIGN";

pub const PAIR_HEADER: [&str; 11] = [
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

const NDF_HEADER: [&str; 17] = [
    "PROBE_DESIGN_ID",
    "CONTAINER",
    "DESIGN_NOTE",
    "SELECTION_CRITERIA",
    "SEQ_ID",
    "PROBE_SEQUENCE",
    "MISMATCH",
    "MATCH_INDEX",
    "FEATURE_ID",
    "ROW_NUM",
    "COL_NUM",
    "PROBE_CLASS",
    "PROBE_ID",
    "POSITION",
    "DESIGN_ID",
    "X",
    "Y",
];

static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy)]
pub struct SampleSpec {
    pub name: &'static str,
    pub flag: &'static str,
    pub group: &'static str,
    pub scale: f64,
}

pub const SAMPLES: [SampleSpec; 4] = [
    SampleSpec {
        name: "chip_rep1",
        flag: "e",
        group: "H3K4me3",
        scale: 1.0,
    },
    SampleSpec {
        name: "input_rep1",
        flag: "i",
        group: "H3K4me3",
        scale: 0.5,
    },
    SampleSpec {
        name: "ctcf_rep1",
        flag: "e",
        group: "CTCF",
        scale: 0.8,
    },
    SampleSpec {
        name: "chip_rep2",
        flag: "e",
        group: "H3K4me3",
        scale: 1.25,
    },
];

pub struct Dataset {
    pub dir: PathBuf,
    pub sample_key: PathBuf,
    pub design: PathBuf,
    pub output_dir: PathBuf,
}

impl Dataset {
    pub fn pair_path(&self, sample: &str) -> PathBuf {
        self.dir.join(format!("{sample}.pair"))
    }
}

pub fn probe_id(idx: usize) -> String {
    format!("CHR01FS{:06}", idx + 1)
}

/// PM value written to the .pair file, as it reads back.
pub fn expected_pm(sample: &SampleSpec, probe_idx: usize) -> f64 {
    let base = 64.0 * 2f64.powf((probe_idx % 97) as f64 / 10.0);
    format_pm(base * sample.scale).parse().unwrap()
}

fn format_pm(pm: f64) -> String {
    format!("{pm:.2}")
}

pub fn is_measured(sample_idx: usize, probe_idx: usize) -> bool {
    sample_idx != SAMPLES.len() - 1 || probe_idx >= N_UNMEASURED
}

pub fn create_dataset(label: &str) -> io::Result<Dataset> {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let dir = std::env::temp_dir().join("nimbleqc-tests").join(format!(
        "{}-{}-{}",
        std::process::id(),
        id,
        label
    ));
    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    let design = dir.join(format!("{DESIGN_NAME}.ndf"));
    write_ndf(&design)?;

    let sample_key = dir.join("sample_key.txt");
    let mut key = File::create(&sample_key)?;
    writeln!(key, "# file\ttype\tgroup")?;
    for (sample_idx, sample) in SAMPLES.iter().enumerate() {
        writeln!(key, "{}.pair\t{}\t{}", sample.name, sample.flag, sample.group)?;
        write_pair(&dir.join(format!("{}.pair", sample.name)), sample_idx, sample)?;
    }

    Ok(Dataset {
        output_dir: dir.join("output"),
        dir,
        sample_key,
        design,
    })
}

fn write_ndf(path: &Path) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", NDF_HEADER.join("\t"))?;
    for idx in 0..N_PROBES {
        let mut fields: Vec<String> = NDF_HEADER.iter().map(|_| "-".to_string()).collect();
        fields[0] = format!("{}", 1000 + idx);
        fields[4] = "chr1".to_string();
        fields[5] = "ACGTTGCAACGTTGCAACGT".to_string();
        fields[12] = probe_id(idx);
        fields[13] = format!("{}", idx * 35);
        fields[15] = format!("{}", idx % 20 + 1);
        fields[16] = format!("{}", idx / 20 + 1);
        writeln!(file, "{}", fields.join("\t"))?;
    }
    Ok(())
}

/// Rows are written in reverse design order so the join has to go by ID.
fn write_pair(path: &Path, sample_idx: usize, sample: &SampleSpec) -> io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(
        file,
        "# software=NimbleScan\tversion=2.5\tdesignname={DESIGN_NAME}\timagefile={}.tif",
        sample.name
    )?;
    writeln!(file, "{}", PAIR_HEADER.join("\t"))?;
    for idx in (0..N_PROBES).rev() {
        if !is_measured(sample_idx, idx) {
            continue;
        }
        writeln!(
            file,
            "{}\tN/A\tchr1\t{}\t{}\t{}\t{}\t0\t-\t{}\t0.00",
            sample.name,
            probe_id(idx),
            idx * 35,
            idx % 20 + 1,
            idx / 20 + 1,
            format_pm(expected_pm(sample, idx)),
        )?;
    }
    Ok(())
}

/// Overwrites the column header of a sample's .pair file.
pub fn corrupt_header(dataset: &Dataset, sample: &str, header: &[&str]) -> io::Result<()> {
    let path = dataset.pair_path(sample);
    let contents = fs::read_to_string(&path)?;
    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    lines[1] = header.join("\t");
    fs::write(&path, lines.join("\n") + "\n")
}

/// Appends a measurement for a probe that is not in the design.
pub fn append_unknown_probe(dataset: &Dataset, sample: &str, probe: &str) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(dataset.pair_path(sample))?;
    writeln!(file, "{sample}\tN/A\tchr1\t{probe}\t0\t1\t1\t0\t-\t100.00\t0.00")
}
