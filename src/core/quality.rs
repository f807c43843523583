use crate::types::{
    FlagImage, Measurement, SwathError, SwathResult, ValidityMask, NETCDF_FILL_F32,
};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Strict quality threshold on the 0..10 flag scale (quality level >= 0.8)
pub const THRESHOLD_STRICT: u8 = 2;

/// Lenient quality threshold on the 0..10 flag scale (quality level >= 0.1)
pub const THRESHOLD_LENIENT: u8 = 9;

/// Policy for turning a quality-flag array into a validity mask
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskPolicy {
    /// Ordinal threshold: a pixel is invalid when flag > threshold
    pub threshold: u8,
    /// Bit-set policy: when set, a pixel is invalid when (flag & bitmask) != 0
    /// and the ordinal threshold is ignored
    pub bitmask: Option<u8>,
    /// Reject pixels whose measurement is NaN or equal to the fill sentinel,
    /// regardless of flag
    pub treat_fill_as_invalid: bool,
    /// Fill sentinel used by the measurement arrays
    pub fill_value: f32,
}

impl Default for MaskPolicy {
    fn default() -> Self {
        Self {
            threshold: THRESHOLD_LENIENT,
            bitmask: None,
            treat_fill_as_invalid: true,
            fill_value: NETCDF_FILL_F32,
        }
    }
}

/// Ternary pixel ranking used by the detector monitoring reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityClass {
    /// Passes the strict threshold
    Good,
    /// Passes the lenient threshold only
    Degraded,
    /// Fails both thresholds
    Bad,
}

/// Bad-pixel bookkeeping per detector map, at both monitoring thresholds
#[derive(Debug, Clone)]
pub struct QualitySummary {
    pub total_pixels: usize,
    /// Pixels failing the strict threshold
    pub bad_strict: usize,
    /// Pixels failing the lenient threshold
    pub bad_lenient: usize,
    /// Bad-pixel count per scanline (strict, lenient)
    pub row_bad_strict: Array1<usize>,
    pub row_bad_lenient: Array1<usize>,
    /// Bad-pixel count per detector column (strict, lenient)
    pub col_bad_strict: Array1<usize>,
    pub col_bad_lenient: Array1<usize>,
}

/// Build a validity mask from a quality-flag array and its paired measurement.
///
/// The mask is always derived fresh from the flags; callers must not patch it
/// afterwards. A pixel is marked invalid by the flag policy (bitmask or
/// ordinal threshold), and additionally by a NaN or fill-valued measurement
/// when `treat_fill_as_invalid` is set, which guards against products where a
/// good flag sits on top of a garbage value.
pub fn build_mask(
    flags: &FlagImage,
    values: &Measurement,
    policy: &MaskPolicy,
) -> SwathResult<ValidityMask> {
    if flags.dim() != values.dim() {
        return Err(SwathError::shape(
            "quality flags",
            &[values.dim().0, values.dim().1],
            &[flags.dim().0, flags.dim().1],
        ));
    }

    let (rows, cols) = flags.dim();
    let mut mask = Array2::from_elem((rows, cols), false);

    for ((i, j), &flag) in flags.indexed_iter() {
        let flag_ok = match policy.bitmask {
            Some(bits) => (flag & bits) == 0,
            None => flag <= policy.threshold,
        };

        let value_ok = if policy.treat_fill_as_invalid {
            let v = values[[i, j]];
            v.is_finite() && v != policy.fill_value
        } else {
            true
        };

        mask[[i, j]] = flag_ok && value_ok;
    }

    let valid = mask.iter().filter(|&&m| m).count();
    log::debug!(
        "Built validity mask: {}/{} pixels valid ({:.1}%)",
        valid,
        rows * cols,
        100.0 * valid as f64 / (rows * cols).max(1) as f64
    );

    Ok(mask)
}

/// Rank every pixel of a flag map into good/degraded/bad classes
pub fn rank_quality(flags: &FlagImage, strict: u8, lenient: u8) -> Array2<QualityClass> {
    flags.mapv(|flag| {
        if flag <= strict {
            QualityClass::Good
        } else if flag <= lenient {
            QualityClass::Degraded
        } else {
            QualityClass::Bad
        }
    })
}

/// Summarize bad-pixel counts of a detector quality map.
///
/// Reports totals and per-row/per-column counts at the strict and lenient
/// thresholds, the quantities the instrument health monitoring tracks over
/// time.
pub fn summarize_quality(flags: &FlagImage, strict: u8, lenient: u8) -> QualitySummary {
    let (rows, cols) = flags.dim();

    let count_bad = |lane: ndarray::ArrayView1<u8>, thr: u8| -> usize {
        lane.iter().filter(|&&f| f > thr).count()
    };

    let row_bad_strict =
        Array1::from_iter(flags.axis_iter(Axis(0)).map(|lane| count_bad(lane, strict)));
    let row_bad_lenient =
        Array1::from_iter(flags.axis_iter(Axis(0)).map(|lane| count_bad(lane, lenient)));
    let col_bad_strict =
        Array1::from_iter(flags.axis_iter(Axis(1)).map(|lane| count_bad(lane, strict)));
    let col_bad_lenient =
        Array1::from_iter(flags.axis_iter(Axis(1)).map(|lane| count_bad(lane, lenient)));

    let bad_strict = row_bad_strict.sum();
    let bad_lenient = row_bad_lenient.sum();

    log::info!(
        "Quality summary: {} bad (strict), {} bad (lenient) of {} pixels",
        bad_strict,
        bad_lenient,
        rows * cols
    );

    QualitySummary {
        total_pixels: rows * cols,
        bad_strict,
        bad_lenient,
        row_bad_strict,
        row_bad_lenient,
        col_bad_strict,
        col_bad_lenient,
    }
}
