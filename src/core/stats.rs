use crate::types::{Measurement, SwathError, SwathResult, ValidityMask};
use ndarray::Axis;
use serde::{Deserialize, Serialize};

/// Reduction axis for swath statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReduceAxis {
    /// Collapse the scanline axis: one record per detector element,
    /// the instrument health monitoring view
    Scanlines,
    /// Collapse the detector axis: one record per scanline (time bin)
    Detectors,
    /// Collapse everything into a single record
    All,
}

/// Statistics of the valid elements along one reduction lane.
///
/// `mean`, `stddev` and `median` are `None` when undefined; callers must
/// check `valid_count` before trusting them. An undefined statistic is never
/// reported as 0.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStats {
    pub valid_count: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub median: Option<f64>,
}

impl CellStats {
    fn undefined() -> Self {
        Self {
            valid_count: 0,
            mean: None,
            stddev: None,
            median: None,
        }
    }
}

/// Result of one aggregation pass, read-only afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsRecord {
    pub axis: ReduceAxis,
    /// One entry per lane along the kept axis (length 1 for `ReduceAxis::All`)
    pub cells: Vec<CellStats>,
}

/// Tukey biweight location and spread of a sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biweight {
    pub location: f64,
    pub spread: f64,
}

/// Reduce a masked measurement array to per-lane statistics.
///
/// Masked-invalid elements are excluded entirely rather than zero-filled.
/// Median is the exact order statistic over the valid set; stddev uses the
/// sample (N-1) denominator and is undefined for fewer than two valid
/// elements.
pub fn aggregate(
    values: &Measurement,
    mask: &ValidityMask,
    axis: ReduceAxis,
) -> SwathResult<StatisticsRecord> {
    if values.dim() != mask.dim() {
        return Err(SwathError::shape(
            "validity mask",
            &[values.dim().0, values.dim().1],
            &[mask.dim().0, mask.dim().1],
        ));
    }

    let cells = match axis {
        ReduceAxis::All => {
            let lane: Vec<f64> = values
                .iter()
                .zip(mask.iter())
                .filter(|(_, &m)| m)
                .map(|(&v, _)| v as f64)
                .collect();
            vec![lane_stats(lane)]
        }
        ReduceAxis::Scanlines | ReduceAxis::Detectors => {
            // Keep axis 1 when collapsing scanlines, axis 0 otherwise
            let kept = if axis == ReduceAxis::Scanlines { 1 } else { 0 };
            values
                .axis_iter(Axis(kept))
                .zip(mask.axis_iter(Axis(kept)))
                .map(|(v_lane, m_lane)| {
                    let lane: Vec<f64> = v_lane
                        .iter()
                        .zip(m_lane.iter())
                        .filter(|(_, &m)| m)
                        .map(|(&v, _)| v as f64)
                        .collect();
                    lane_stats(lane)
                })
                .collect()
        }
    };

    log::debug!(
        "Aggregated {:?} over {:?}: {} lanes",
        values.dim(),
        axis,
        cells.len()
    );

    Ok(StatisticsRecord { axis, cells })
}

fn lane_stats(mut lane: Vec<f64>) -> CellStats {
    let n = lane.len();
    if n == 0 {
        return CellStats::undefined();
    }

    let mean = lane.iter().sum::<f64>() / n as f64;

    let stddev = if n > 1 {
        let ssq = lane.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
        Some((ssq / (n - 1) as f64).sqrt())
    } else {
        None
    };

    lane.sort_by(|a, b| a.total_cmp(b));
    let median = if n % 2 == 1 {
        lane[n / 2]
    } else {
        0.5 * (lane[n / 2 - 1] + lane[n / 2])
    };

    CellStats {
        valid_count: n,
        mean: Some(mean),
        stddev,
        median: Some(median),
    }
}

/// Tukey biweight estimate of location and spread.
///
/// Robust against the outliers that survive flag-based masking (cosmic-ray
/// hits, RTS pixels). Returns `None` on an empty sample; falls back to the
/// plain median with zero spread when the sample has no scatter.
pub fn biweight(sample: &[f64]) -> Option<Biweight> {
    if sample.is_empty() {
        return None;
    }

    let med = exact_median(sample);
    let deviations: Vec<f64> = sample.iter().map(|v| (v - med).abs()).collect();
    let mad = exact_median(&deviations);

    if mad == 0.0 {
        return Some(Biweight {
            location: med,
            spread: 0.0,
        });
    }

    // Location: tuning constant 6 * MAD
    let mut num = 0.0;
    let mut den = 0.0;
    for &v in sample {
        let u = (v - med) / (6.0 * mad);
        if u.abs() < 1.0 {
            let w = (1.0 - u * u).powi(2);
            num += (v - med) * w;
            den += w;
        }
    }
    let location = med + num / den;

    // Spread: tuning constant 9 * MAD
    let n = sample.len() as f64;
    let mut s_num = 0.0;
    let mut s_den = 0.0;
    for &v in sample {
        let u = (v - med) / (9.0 * mad);
        if u.abs() < 1.0 {
            let u2 = u * u;
            s_num += (v - med).powi(2) * (1.0 - u2).powi(4);
            s_den += (1.0 - u2) * (1.0 - 5.0 * u2);
        }
    }
    // The denominator weights (1 - u^2)(1 - 5u^2) change sign at |u| ~ 0.447
    // and can cancel on strongly bimodal samples; fall back to the
    // Gaussian-consistent MAD scale rather than divide by ~0
    let spread = if s_den.abs() > 1.0e-8 {
        (n * s_num).sqrt() / s_den.abs()
    } else {
        1.4826 * mad
    };

    Some(Biweight { location, spread })
}

fn exact_median(sample: &[f64]) -> f64 {
    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}
