use ndarray::{Array2, Array3};
use swathgrid::{
    aggregate, build_mask, summarize_quality, FlagImage, MaskPolicy, Measurement, ReduceAxis,
    SwathGeolocation, NETCDF_FILL_F32,
};

/// Deterministic pseudo-random byte stream for property sweeps
struct Lcg(u64);

impl Lcg {
    fn next_u8(&mut self, max: u8) -> u8 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) % (max as u64 + 1)) as u8
    }
}

fn random_flags(rows: usize, cols: usize, max: u8, seed: u64) -> FlagImage {
    let mut lcg = Lcg(seed);
    Array2::from_shape_fn((rows, cols), |_| lcg.next_u8(max))
}

#[test]
fn test_threshold_property_over_random_flags() {
    // For every threshold t, exactly the elements with flag > t are invalid
    for seed in [7, 99, 4242] {
        let flags = random_flags(16, 24, 10, seed);
        let values = Measurement::ones((16, 24));

        for t in 0..=10u8 {
            let policy = MaskPolicy {
                threshold: t,
                ..MaskPolicy::default()
            };
            let mask = build_mask(&flags, &values, &policy).expect("mask build failed");
            for ((i, j), &valid) in mask.indexed_iter() {
                assert_eq!(
                    valid,
                    flags[[i, j]] <= t,
                    "seed {} threshold {} pixel ({}, {})",
                    seed,
                    t,
                    i,
                    j
                );
            }
        }
    }
}

#[test]
fn test_monitoring_path_excludes_bad_detector_column() {
    // Detector column 2 is a dead column: flagged bad on every scanline
    let n_scan = 40;
    let n_det = 5;
    let mut flags = FlagImage::zeros((n_scan, n_det));
    let mut values = Measurement::zeros((n_scan, n_det));
    for i in 0..n_scan {
        for j in 0..n_det {
            values[[i, j]] = 100.0 + j as f32;
        }
        flags[[i, 2]] = 10;
        values[[i, 2]] = NETCDF_FILL_F32;
    }

    let mask = build_mask(&flags, &values, &MaskPolicy::default()).expect("mask build failed");
    let record = aggregate(&values, &mask, ReduceAxis::Scanlines).expect("aggregation failed");

    assert_eq!(record.cells.len(), n_det);
    for (j, cell) in record.cells.iter().enumerate() {
        if j == 2 {
            assert_eq!(cell.valid_count, 0);
            assert!(cell.mean.is_none());
            assert!(cell.median.is_none());
        } else {
            assert_eq!(cell.valid_count, n_scan);
            let mean = cell.mean.expect("defined mean");
            assert!((mean - (100.0 + j as f64)).abs() < 1e-9);
        }
    }

    let summary = summarize_quality(&flags, 2, 9);
    assert_eq!(summary.bad_strict, n_scan);
    assert_eq!(summary.col_bad_strict[2], n_scan);
    assert_eq!(summary.col_bad_strict[0], 0);
}

#[test]
fn test_pipeline_is_deterministic() {
    env_logger::builder().is_test(true).try_init().ok();

    let flags = random_flags(12, 12, 10, 1234);
    let mut values = Measurement::from_shape_fn((12, 12), |(i, j)| (i * 13 + j) as f32 * 0.25);
    values[[3, 3]] = f32::NAN;
    values[[7, 1]] = NETCDF_FILL_F32;

    let run = || {
        let policy = MaskPolicy {
            threshold: 5,
            ..MaskPolicy::default()
        };
        let mask = build_mask(&flags, &values, &policy).expect("mask build failed");
        aggregate(&values, &mask, ReduceAxis::Detectors).expect("aggregation failed")
    };

    let first = run();
    let second = run();
    assert_eq!(first.cells, second.cells);
}

#[test]
fn test_geolocation_flags_degenerate_pixels_for_consumers() {
    // A 2x2 swath where one pixel has fill-valued corners
    let rows = 2;
    let cols = 2;
    let mut lon = Array3::zeros((rows, cols, 4));
    let mut lat = Array3::zeros((rows, cols, 4));
    for i in 0..rows {
        for j in 0..cols {
            let (x0, y0) = (j as f64 * 2.0, i as f64 * 2.0);
            let corners = [
                [x0, y0],
                [x0 + 2.0, y0],
                [x0 + 2.0, y0 + 2.0],
                [x0, y0 + 2.0],
            ];
            for (k, [x, y]) in corners.iter().enumerate() {
                lon[[i, j, k]] = *x;
                lat[[i, j, k]] = *y;
            }
        }
    }
    for k in 0..4 {
        lon[[1, 1, k]] = 9.969209968386869e36;
    }

    let geo = SwathGeolocation::new(
        lon,
        lat,
        Array2::from_shape_fn((rows, cols), |(_, j)| j as f64 * 2.0 + 1.0),
        Array2::from_shape_fn((rows, cols), |(i, _)| i as f64 * 2.0 + 1.0),
    )
    .expect("geolocation build failed");

    assert_eq!(geo.degenerate_count(), 1);
    assert!(geo.is_degenerate(1, 1));
    assert!(geo.footprint_polygon(1, 1).is_none());
    assert!(geo.footprint_polygon(0, 0).is_some());
}
