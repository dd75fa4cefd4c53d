use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use crate::Args;
use crate::error::Result;
use crate::model::{Experiment, Sample, SampleType};
use crate::output::{
    file_stub, plot_density, plot_ma, plot_qq, write_probe_table, write_probe_table_npz,
};
use crate::reader::design::locate_design;
use crate::reader::pair::PairReader;
use crate::reader::sample_key::SampleKey;
use crate::stats::{
    KDE_BANDWIDTH_FACTOR, KDE_GRID_POINTS, Kde, gaussian_kde, linear_fit, log2_intensities,
    ma_values, qq_points,
};
use crate::table::ProbeTable;

#[derive(Debug, Clone)]
pub struct RunSpec {
    sample_key_path: PathBuf,
    sample_key: SampleKey,
    design: PathBuf,
    output_dir: PathBuf,
    colors: u8,
    npz: bool,
    threads: Option<usize>,
}

impl RunSpec {
    pub fn log_paths(&self) {
        info!("sample key: {}", self.sample_key_path.display());
        info!("design    : {}", self.design.display());
        info!("output    : {}", self.output_dir.display());
        info!("colours   : {}", self.colors);
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

pub fn build_run_spec(args: &Args) -> Result<RunSpec> {
    let sample_key = SampleKey::read(&args.sample_key)?;
    let key_dir = args.sample_key.parent().unwrap_or_else(|| Path::new(""));
    let first_pair = sample_key.samples().first().map(|s| s.path.as_path());
    let design = locate_design(args.design.as_deref(), key_dir, first_pair)?;

    Ok(RunSpec {
        sample_key_path: args.sample_key.clone(),
        sample_key,
        design,
        output_dir: PathBuf::from(&args.output_directory),
        colors: args.colors,
        npz: args.npz,
        threads: args.threads,
    })
}

/// Log2 statistics of one sample, ready to plot.
struct SampleQc<'a> {
    sample: &'a Sample,
    n_values: usize,
    kde: Option<Kde>,
    qq: Vec<(f64, f64)>,
    fit: Option<(f64, f64)>,
}

impl<'a> SampleQc<'a> {
    fn compute(table: &ProbeTable, sample: &'a Sample) -> Self {
        let logs = log2_intensities(table.sample_column(sample.index).iter().copied());
        let kde = gaussian_kde(&logs, KDE_BANDWIDTH_FACTOR, KDE_GRID_POINTS);
        let qq = qq_points(&logs);
        let fit = linear_fit(&qq);
        Self {
            sample,
            n_values: logs.len(),
            kde,
            qq,
            fit,
        }
    }
}

/// Reads every sample's intensities into a table over the design's probes.
pub fn load_table(design: &Path, sample_key: &SampleKey) -> Result<ProbeTable> {
    let mut table = ProbeTable::from_ndf(design, sample_key.sample_names())?;
    info!(
        "array {} has {} probes for {} samples",
        design.display(),
        table.n_probes(),
        table.n_samples()
    );

    for sample in sample_key.samples() {
        info!(
            "reading sample {} '{}' probe signals",
            sample.index + 1,
            sample.name
        );
        let mut reader = PairReader::open(&sample.path)?;
        debug!("{} metadata: {:?}", sample.path.display(), reader.metadata());
        let n_measured = table.consume_reader(sample.index, &mut reader)?;
        debug!("{} probes measured in {}", n_measured, sample.path.display());

        let n_missing = table.n_missing(sample.index);
        if n_missing > 0 {
            warn!(
                "{} of {} probes have no intensity in sample {}",
                n_missing,
                table.n_probes(),
                sample.name
            );
        }
    }
    Ok(table)
}

fn plot_samples(table: &ProbeTable, samples: &[Sample], output_dir: &Path) -> Result<()> {
    let qcs: Vec<SampleQc> = samples
        .par_iter()
        .map(|sample| SampleQc::compute(table, sample))
        .collect();

    for qc in qcs {
        let name = &qc.sample.name;
        let Some(kde) = &qc.kde else {
            warn!("sample {name} has no positive intensities, skipping its plots");
            continue;
        };
        let stub = file_stub(name);

        let density_path = output_dir.join(format!("{stub}_density.png"));
        debug!("writing {}", density_path.display());
        plot_density(name, kde, qc.n_values, &density_path)?;

        let qq_path = output_dir.join(format!("{stub}_qq.png"));
        debug!("writing {}", qq_path.display());
        plot_qq(name, &qc.qq, qc.fit, &qq_path)?;
    }
    info!("produced QC plots per sample");
    Ok(())
}

fn plot_experiment(table: &ProbeTable, experiment: &Experiment, output_dir: &Path) -> Result<()> {
    for sample_type in [SampleType::Treatment, SampleType::Control] {
        let replicates = experiment.samples_of(sample_type);
        if replicates.len() < 2 {
            if !replicates.is_empty() {
                warn!(
                    "experiment {} has a single {} sample, no MA plot drawn",
                    experiment.name, sample_type
                );
            }
            continue;
        }

        for (first, second) in replicates.iter().tuple_combinations() {
            let points = ma_values(
                table.sample_column(first.index).iter().copied(),
                table.sample_column(second.index).iter().copied(),
            );
            let title = format!(
                "{} {}: {} vs {}",
                experiment.name, sample_type, first.name, second.name
            );
            let path = output_dir.join(format!(
                "{}_{}_{}_vs_{}_ma.png",
                file_stub(&experiment.name),
                sample_type,
                file_stub(&first.name),
                file_stub(&second.name)
            ));
            debug!("writing {} ({} probes)", path.display(), points.len());
            plot_ma(&title, &points, &path)?;
        }
    }
    Ok(())
}

pub fn run(spec: &RunSpec) -> Result<()> {
    let experiments = spec.sample_key.experiments();
    for experiment in &experiments {
        info!(
            "experiment {} with samples {}",
            experiment.name,
            experiment.samples.iter().map(|s| s.name.as_str()).join(", ")
        );
    }

    let table = load_table(&spec.design, &spec.sample_key)?;

    if spec.npz {
        let npz_path = spec.output_dir().join("probe_intensities.npz");
        info!("writing probe intensities to {}", npz_path.display());
        write_probe_table_npz(&table, &npz_path)?;
    } else {
        let csv_path = spec.output_dir().join("probe_intensities.csv");
        info!("writing probe intensities to {}", csv_path.display());
        write_probe_table(&table, &csv_path)?;
    }

    let pool = ThreadPoolBuilder::new()
        .num_threads(spec.threads.unwrap_or(0))
        .build()?;
    pool.install(|| plot_samples(&table, spec.sample_key.samples(), spec.output_dir()))?;

    for experiment in &experiments {
        plot_experiment(&table, experiment, spec.output_dir())?;
    }
    info!("produced MA plots per group of replicates");
    Ok(())
}
