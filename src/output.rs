use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

use itertools::{Itertools, MinMaxResult};
use ndarray::Array2;
use ndarray_npy::WriteNpyExt;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::error::{CustomError, Result};
use crate::stats::{Kde, MaPoint};
use crate::table::ProbeTable;

const FONT: &str = "dejavu-sans-mono";
const PLOT_SIZE: (u32, u32) = (1200, 900);
/// Leading columns of the probe table CSV, before one column per sample.
pub(crate) const PROBE_COLUMNS: [&str; 4] = ["probe_id", "sequence", "x", "y"];

pub fn write_probe_table(table: &ProbeTable, path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header = PROBE_COLUMNS.to_vec();
    header.extend(table.samples().iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (probe, row) in table.probes().iter().zip(table.intensities().rows()) {
        let mut record = vec![
            probe.id.clone(),
            probe.sequence.clone(),
            probe.x.to_string(),
            probe.y.to_string(),
        ];
        record.extend(row.iter().map(|v| {
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| CustomError::Write {
        source: e,
        path: path.into(),
    })?;
    Ok(())
}

/// Writes the table as an `.npz` archive holding `intensities.npy`,
/// `coordinates.npy`, `samples.json` and `probes.json`.
pub fn write_probe_table_npz(table: &ProbeTable, path: &Path) -> Result<()> {
    let f = File::create(path).map_err(|e| CustomError::Write {
        source: e,
        path: path.into(),
    })?;
    let mut zip = ZipWriter::new(f);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    let zip_err = |source: zip::result::ZipError| CustomError::Zip {
        source,
        path: path.into(),
    };

    let coordinates = Array2::from_shape_fn((table.n_probes(), 2), |(i, j)| {
        let probe = &table.probes()[i];
        if j == 0 { probe.x } else { probe.y }
    });
    let probe_ids: Vec<&str> = table.probes().iter().map(|p| p.id.as_str()).collect();

    zip.start_file("intensities.npy", options).map_err(zip_err)?;
    table
        .intensities()
        .write_npy(&mut zip)
        .map_err(|source| CustomError::NpyWrite {
            source,
            name: "intensities".to_string(),
            path: path.into(),
        })?;

    zip.start_file("coordinates.npy", options).map_err(zip_err)?;
    coordinates
        .write_npy(&mut zip)
        .map_err(|source| CustomError::NpyWrite {
            source,
            name: "coordinates".to_string(),
            path: path.into(),
        })?;

    let sample_names: Vec<&str> = table.samples().iter().map(String::as_str).collect();
    for (name, ids) in [("samples.json", sample_names), ("probes.json", probe_ids)] {
        let json = serde_json::to_vec(&ids).map_err(|source| CustomError::Json {
            source,
            name: name.to_string(),
            path: path.into(),
        })?;
        zip.start_file(name, options).map_err(zip_err)?;
        zip.write_all(&json).map_err(|e| CustomError::Write {
            source: e,
            path: path.into(),
        })?;
    }

    zip.finish().map_err(zip_err)?;
    Ok(())
}

/// Makes a group or sample name safe to use in a file name.
pub fn file_stub(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn register_plot_font() -> Result<()> {
    const DEJAVU_SANS_MONO: &[u8] =
        include_bytes!("../assets/fonts/dejavu-sans-mono/DejaVuSansMono.ttf");
    register_font(FONT, FontStyle::Normal, DEJAVU_SANS_MONO).map_err(|_| CustomError::Font)
}

fn plot_err<E>(what: &str) -> impl Fn(E) -> CustomError + '_
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| CustomError::Plot {
        what: what.to_string(),
        source: Box::new(e),
    }
}

/// Axis range covering `values`, padded by 5% so no point sits on the frame.
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (lo, hi) = match values.filter(|v| v.is_finite()).minmax() {
        MinMaxResult::NoElements => (0.0, 1.0),
        MinMaxResult::OneElement(v) => (v, v),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    };
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

pub fn plot_density(sample: &str, kde: &Kde, n_values: usize, path: &Path) -> Result<()> {
    register_plot_font()?;
    let what = format!("density of {sample}");
    let x_range = padded_range(kde.points.iter().map(|p| p.0));
    let y_max = kde.points.iter().map(|p| p.1).fold(0.0f64, f64::max);
    let y_range = 0.0..(if y_max > 0.0 { y_max * 1.05 } else { 1.0 });

    let root_area = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err(&what))?;

    let mut chart = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 80)
        .margin(20)
        .margin_right(40)
        .caption(
            format!("Probe intensities for {sample}, n = {n_values}"),
            (FONT, 36),
        )
        .build_cartesian_2d(x_range, y_range)
        .map_err(plot_err(&what))?;

    chart
        .configure_mesh()
        .label_style((FONT, 22))
        .x_desc("log2 PM intensity")
        .y_desc("Density")
        .x_label_formatter(&|x| format!("{:.1}", x))
        .y_label_formatter(&|y| format!("{:.2}", y))
        .draw()
        .map_err(plot_err(&what))?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            kde.points.clone(),
            BLUE.stroke_width(3),
        )))
        .map_err(plot_err(&what))?;

    root_area.present().map_err(plot_err(&what))?;
    Ok(())
}

pub fn plot_qq(
    sample: &str,
    points: &[(f64, f64)],
    fit: Option<(f64, f64)>,
    path: &Path,
) -> Result<()> {
    register_plot_font()?;
    let what = format!("QQ plot of {sample}");
    let x_range = padded_range(points.iter().map(|p| p.0));
    let y_range = padded_range(points.iter().map(|p| p.1));

    let root_area = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err(&what))?;

    let mut chart = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 80)
        .margin(20)
        .margin_right(40)
        .caption(format!("Probe intensities for {sample}"), (FONT, 36))
        .build_cartesian_2d(x_range.clone(), y_range)
        .map_err(plot_err(&what))?;

    chart
        .configure_mesh()
        .label_style((FONT, 22))
        .x_desc("Theoretical quantiles")
        .y_desc("Sample quantiles")
        .x_label_formatter(&|x| format!("{:.1}", x))
        .y_label_formatter(&|y| format!("{:.1}", y))
        .draw()
        .map_err(plot_err(&what))?;

    chart
        .draw_series(
            points
                .iter()
                .filter(|p| p.0.is_finite())
                .map(|&p| Circle::new(p, 3, BLUE.mix(0.5).filled())),
        )
        .map_err(plot_err(&what))?;

    // Reference line from a least-squares fit
    if let Some((slope, intercept)) = fit {
        let line = [x_range.start, x_range.end].map(|x| (x, slope * x + intercept));
        chart
            .draw_series(std::iter::once(PathElement::new(
                line.to_vec(),
                RED.mix(0.8).stroke_width(3),
            )))
            .map_err(plot_err(&what))?;
    }

    root_area.present().map_err(plot_err(&what))?;
    Ok(())
}

pub fn plot_ma(title: &str, points: &[MaPoint], path: &Path) -> Result<()> {
    register_plot_font()?;
    let what = format!("MA plot {title}");
    let x_range = padded_range(points.iter().map(|p| p.a));
    // Symmetric around M = 0
    let m_max = points.iter().map(|p| p.m.abs()).fold(0.0f64, f64::max);
    let m_lim = if m_max > 0.0 { m_max * 1.05 } else { 1.0 };

    let root_area = BitMapBackend::new(path, PLOT_SIZE).into_drawing_area();
    root_area.fill(&WHITE).map_err(plot_err(&what))?;

    let mut chart = ChartBuilder::on(&root_area)
        .set_label_area_size(LabelAreaPosition::Left, 110)
        .set_label_area_size(LabelAreaPosition::Bottom, 80)
        .margin(20)
        .margin_right(40)
        .caption(title, (FONT, 36))
        .build_cartesian_2d(x_range.clone(), -m_lim..m_lim)
        .map_err(plot_err(&what))?;

    chart
        .configure_mesh()
        .label_style((FONT, 22))
        .x_desc("A = mean log2 intensity")
        .y_desc("M = log2 ratio")
        .x_label_formatter(&|x| format!("{:.1}", x))
        .y_label_formatter(&|y| format!("{:.1}", y))
        .draw()
        .map_err(plot_err(&what))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.a, p.m), 2, RED.mix(0.4).filled())),
        )
        .map_err(plot_err(&what))?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(x_range.start, 0.0), (x_range.end, 0.0)],
            BLACK.stroke_width(2),
        )))
        .map_err(plot_err(&what))?;

    root_area.present().map_err(plot_err(&what))?;
    Ok(())
}
