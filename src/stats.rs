//! Descriptive statistics behind the QC plots.
//!
//! All functions work on log2 intensities; raw values that are not finite
//! and strictly positive are dropped before taking logs.

use rayon::prelude::*;

/// Width of the density kernel relative to the sample standard deviation.
pub const KDE_BANDWIDTH_FACTOR: f64 = 0.25;
pub const KDE_GRID_POINTS: usize = 200;

const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

pub fn log2_intensities(values: impl IntoIterator<Item = f64>) -> Vec<f64> {
    values
        .into_iter()
        .filter(|v| v.is_finite() && *v > 0.0)
        .map(f64::log2)
        .collect()
}

pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(data: &[f64]) -> Option<f64> {
    if data.len() < 2 {
        return None;
    }
    let mu = mean(data)?;
    let ss: f64 = data.iter().map(|x| (x - mu).powi(2)).sum();
    Some((ss / (data.len() - 1) as f64).sqrt())
}

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Kde {
    pub bandwidth: f64,
    /// `(x, density)` on an evenly spaced grid.
    pub points: Vec<(f64, f64)>,
}

/// Gaussian kernel density estimate of `data`, evaluated on `n_points` grid
/// points spanning the data range plus three bandwidths on either side.
pub fn gaussian_kde(data: &[f64], factor: f64, n_points: usize) -> Option<Kde> {
    if data.is_empty() {
        return None;
    }
    let bandwidth = std_dev(data)
        .map(|sd| sd * factor)
        .filter(|bw| bw.is_finite() && *bw > 0.0)
        .unwrap_or(1.0);

    let (lo, hi) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        });
    let grid = linspace(lo - 3.0 * bandwidth, hi + 3.0 * bandwidth, n_points);

    let norm = FRAC_1_SQRT_2PI / (data.len() as f64 * bandwidth);
    let points = grid
        .par_iter()
        .map(|&x| {
            let sum: f64 = data
                .iter()
                .map(|&xi| {
                    let z = (x - xi) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum();
            (x, sum * norm)
        })
        .collect();

    Some(Kde { bandwidth, points })
}

/// Inverse of the standard normal CDF.
///
/// Uses Acklam's rational approximation (relative error below 1.2e-9),
/// which is plenty for plotting positions.
pub fn normal_quantile(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;
    const P_HIGH: f64 = 1.0 - P_LOW;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= P_HIGH {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

/// `(theoretical, sample)` quantile pairs against a standard normal, using
/// plotting positions `i / (n + 1)`.
pub fn qq_points(data: &[f64]) -> Vec<(f64, f64)> {
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let n = sorted.len() as f64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, x)| (normal_quantile((i + 1) as f64 / (n + 1.0)), x))
        .collect()
}

/// Least-squares `(slope, intercept)` of `y` on `x`.
pub fn linear_fit(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
    let my = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mx).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mx) * (p.1 - my)).sum();
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaPoint {
    /// Mean log2 intensity.
    pub a: f64,
    /// Log2 ratio of the first sample over the second.
    pub m: f64,
}

/// MA values for probes measured in both samples.
pub fn ma_values(
    first: impl IntoIterator<Item = f64>,
    second: impl IntoIterator<Item = f64>,
) -> Vec<MaPoint> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    first
        .into_iter()
        .zip(second)
        .filter(|&(x, y)| valid(x) && valid(y))
        .map(|(x, y)| {
            let (lx, ly) = (x.log2(), y.log2());
            MaPoint {
                a: (lx + ly) / 2.0,
                m: lx - ly,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn log2_drops_unusable_values() {
        let logs = log2_intensities([8.0, 0.0, -4.0, f64::NAN, 1024.0]);
        assert_eq!(logs, vec![3.0, 10.0]);
    }

    #[test]
    fn mean_and_std_dev() {
        let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&data), Some(5.0));
        assert!(close(std_dev(&data).unwrap(), (32.0f64 / 7.0).sqrt(), 1e-12));
        assert_eq!(std_dev(&[1.0]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 8.0, 5), vec![0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
        assert!(linspace(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn kde_integrates_to_one() {
        let data: Vec<f64> = (0..50).map(|i| 6.0 + (i % 10) as f64 * 0.3).collect();
        let kde = gaussian_kde(&data, KDE_BANDWIDTH_FACTOR, KDE_GRID_POINTS).unwrap();
        assert_eq!(kde.points.len(), KDE_GRID_POINTS);
        let step = kde.points[1].0 - kde.points[0].0;
        let area: f64 = kde.points.iter().map(|p| p.1 * step).sum();
        assert!(close(area, 1.0, 1e-2), "area was {area}");
        assert!(kde.points.iter().all(|p| p.1 >= 0.0));
    }

    #[test]
    fn kde_of_constant_data_uses_unit_bandwidth() {
        let kde = gaussian_kde(&[3.0, 3.0, 3.0], KDE_BANDWIDTH_FACTOR, 11).unwrap();
        assert_eq!(kde.bandwidth, 1.0);
        // Symmetric grid, peak in the middle
        assert!(close(kde.points[5].0, 3.0, 1e-12));
        assert!(close(kde.points[5].1, FRAC_1_SQRT_2PI, 1e-12));
        assert!(gaussian_kde(&[], KDE_BANDWIDTH_FACTOR, 11).is_none());
    }

    #[test]
    fn normal_quantile_known_values() {
        assert_eq!(normal_quantile(0.5), 0.0);
        assert!(close(normal_quantile(0.975), 1.959_963_984_540_054, 1e-8));
        assert!(close(normal_quantile(0.025), -1.959_963_984_540_054, 1e-8));
        assert!(close(normal_quantile(0.001), -3.090_232_306_167_813, 1e-7));
        assert!(close(normal_quantile(0.8413447460685429), 1.0, 1e-8));
        assert!(normal_quantile(1.5).is_nan());
        assert_eq!(normal_quantile(0.0), f64::NEG_INFINITY);
    }

    #[test]
    fn qq_points_are_sorted_and_symmetric() {
        let points = qq_points(&[5.0, 1.0, 3.0]);
        let sample: Vec<f64> = points.iter().map(|p| p.1).collect();
        assert_eq!(sample, vec![1.0, 3.0, 5.0]);
        assert!(close(points[0].0, -points[2].0, 1e-12));
        assert_eq!(points[1].0, 0.0);
    }

    #[test]
    fn linear_fit_recovers_line() {
        let points: Vec<(f64, f64)> = (0..10).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        let (slope, intercept) = linear_fit(&points).unwrap();
        assert!(close(slope, 2.0, 1e-12));
        assert!(close(intercept, 1.0, 1e-12));
        assert!(linear_fit(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn ma_values_are_mean_and_difference_of_logs() {
        let first = [1024.0, 16.0, 0.0, f64::NAN, 64.0];
        let second = [256.0, 64.0, 8.0, 8.0, 64.0];
        let ma = ma_values(first, second);
        assert_eq!(
            ma,
            vec![
                MaPoint { a: 9.0, m: 2.0 },
                MaPoint { a: 5.0, m: -2.0 },
                MaPoint { a: 6.0, m: 0.0 },
            ]
        );
    }
}
