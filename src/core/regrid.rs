use crate::core::geolocation::{
    clip_ring_axis, ring_signed_area, Footprint, Ring, SwathGeolocation,
};
use crate::types::{
    BoundingBox, CoordinateSystem, Measurement, SwathError, SwathResult, ValidityMask,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Cell overlap areas below this are treated as clipping noise
const MIN_CELL_OVERLAP: f64 = 1.0e-14;

/// Regular output grid definition, north-up: row 0 is the northernmost row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSpec {
    pub bounds: BoundingBox,
    pub n_rows: usize,
    pub n_cols: usize,
    pub crs: CoordinateSystem,
}

impl GridSpec {
    /// Build a grid covering `bounds` at the given cell size in degrees
    pub fn from_resolution(bounds: BoundingBox, resolution_deg: f64) -> SwathResult<Self> {
        if resolution_deg <= 0.0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(SwathError::Processing(format!(
                "Invalid grid definition: {:?} at {} deg",
                bounds, resolution_deg
            )));
        }
        Ok(Self {
            bounds,
            n_rows: (bounds.height() / resolution_deg).ceil() as usize,
            n_cols: (bounds.width() / resolution_deg).ceil() as usize,
            crs: CoordinateSystem::Geographic,
        })
    }

    pub fn cell_width(&self) -> f64 {
        self.bounds.width() / self.n_cols as f64
    }

    pub fn cell_height(&self) -> f64 {
        self.bounds.height() / self.n_rows as f64
    }

    /// Geographic bounds of cell (row, col)
    pub fn cell_bounds(&self, row: usize, col: usize) -> CellBounds {
        let dw = self.cell_width();
        let dh = self.cell_height();
        CellBounds {
            min_lon: self.bounds.min_lon + col as f64 * dw,
            max_lon: self.bounds.min_lon + (col + 1) as f64 * dw,
            min_lat: self.bounds.max_lat - (row + 1) as f64 * dh,
            max_lat: self.bounds.max_lat - row as f64 * dh,
        }
    }

    /// Cell containing the point, or `None` when outside the grid
    pub fn cell_of(&self, lon: f64, lat: f64) -> Option<(usize, usize)> {
        if !self.bounds.contains(lon, lat) {
            return None;
        }
        let col = ((lon - self.bounds.min_lon) / self.cell_width()) as usize;
        let row = ((self.bounds.max_lat - lat) / self.cell_height()) as usize;
        Some((row.min(self.n_rows - 1), col.min(self.n_cols - 1)))
    }

    /// Inclusive row range covered by a latitude interval, `None` when the
    /// interval misses the grid
    fn row_range(&self, min_lat: f64, max_lat: f64) -> Option<(usize, usize)> {
        if max_lat <= self.bounds.min_lat || min_lat >= self.bounds.max_lat {
            return None;
        }
        let dh = self.cell_height();
        let first = ((self.bounds.max_lat - max_lat) / dh).floor().max(0.0) as usize;
        let last = ((self.bounds.max_lat - min_lat) / dh).floor() as usize;
        Some((first.min(self.n_rows - 1), last.min(self.n_rows - 1)))
    }

    /// Inclusive column range covered by a longitude interval
    fn col_range(&self, min_lon: f64, max_lon: f64) -> Option<(usize, usize)> {
        if max_lon <= self.bounds.min_lon || min_lon >= self.bounds.max_lon {
            return None;
        }
        let dw = self.cell_width();
        let first = ((min_lon - self.bounds.min_lon) / dw).floor().max(0.0) as usize;
        let last = ((max_lon - self.bounds.min_lon) / dw).floor() as usize;
        Some((first.min(self.n_cols - 1), last.min(self.n_cols - 1)))
    }
}

/// Axis-aligned geographic bounds of one grid cell
#[derive(Debug, Clone, Copy)]
pub struct CellBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

/// Footprint-to-cell intersection backend.
///
/// The accumulation algorithm only needs the overlap area between a footprint
/// ring and an axis-aligned cell; swapping in another geometry backend does
/// not touch the accumulation logic.
pub trait PolygonIntersectArea {
    fn intersect_area(&self, ring: &Ring, cell: &CellBounds) -> f64;
}

/// Default backend: Sutherland-Hodgman rectangle clipping plus shoelace area
#[derive(Debug, Clone, Copy, Default)]
pub struct SutherlandHodgman;

impl PolygonIntersectArea for SutherlandHodgman {
    fn intersect_area(&self, ring: &Ring, cell: &CellBounds) -> f64 {
        let clipped = clip_ring_axis(ring, 0, cell.min_lon, false);
        let clipped = clip_ring_axis(&clipped, 0, cell.max_lon, true);
        let clipped = clip_ring_axis(&clipped, 1, cell.min_lat, false);
        let clipped = clip_ring_axis(&clipped, 1, cell.max_lat, true);
        if clipped.len() < 3 {
            return 0.0;
        }
        ring_signed_area(&clipped).abs()
    }
}

/// Footprint-to-grid weighting mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// Distribute each pixel over every cell its footprint overlaps,
    /// proportional to intersection area
    OverlapArea,
    /// Assign each pixel to the single cell containing its center
    NearestCenter,
}

/// Mutable accumulation state of one regridding pass.
///
/// Created empty, mutated only through [`GridAccumulator::accumulate`], and
/// consumed by [`OutputGrid::finalize`]. A fresh pass starts from a fresh
/// grid.
#[derive(Debug, Clone)]
pub struct OutputGrid {
    spec: GridSpec,
    planes: GridPlanes,
}

impl OutputGrid {
    pub fn new(spec: GridSpec) -> Self {
        let planes = GridPlanes::zeros(spec.n_rows, spec.n_cols);
        Self { spec, planes }
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Weight-normalize the accumulated values into a read-only composite.
    ///
    /// Cells with zero weight-sum become NaN and are cleared in the validity
    /// plane, so renderers can distinguish "never observed" from a measured
    /// zero.
    pub fn finalize(self) -> GriddedComposite {
        let (n_rows, n_cols) = self.planes.accum.dim();
        let mut values = Array2::from_elem((n_rows, n_cols), f64::NAN);
        let mut valid = Array2::from_elem((n_rows, n_cols), false);

        for ((r, c), &w) in self.planes.weight.indexed_iter() {
            if w > 0.0 {
                values[[r, c]] = self.planes.accum[[r, c]] / w;
                valid[[r, c]] = true;
            }
        }

        let covered = valid.iter().filter(|&&v| v).count();
        log::info!(
            "Finalized grid {}x{}: {:.1}% coverage",
            n_rows,
            n_cols,
            100.0 * covered as f64 / (n_rows * n_cols).max(1) as f64
        );

        GriddedComposite {
            spec: self.spec,
            values,
            weight: self.planes.weight,
            count: self.planes.count,
            valid,
        }
    }
}

/// Finalized grid composite handed to the renderer collaborator.
///
/// Axis ordering: row-major, row 0 = northernmost row, col 0 = westernmost
/// column.
#[derive(Debug, Clone)]
pub struct GriddedComposite {
    pub spec: GridSpec,
    /// Weight-normalized cell values, NaN where no data
    pub values: Array2<f64>,
    /// Accumulated weight-sum per cell
    pub weight: Array2<f64>,
    /// Number of contributing pixels per cell
    pub count: Array2<u32>,
    /// True where at least one pixel contributed
    pub valid: Array2<bool>,
}

impl GriddedComposite {
    /// Cell value, `None` for no-data cells
    pub fn value(&self, row: usize, col: usize) -> Option<f64> {
        if self.valid[[row, col]] {
            Some(self.values[[row, col]])
        } else {
            None
        }
    }
}

/// Accumulator/weight/count planes, mergeable by plain addition
#[derive(Debug, Clone)]
struct GridPlanes {
    accum: Array2<f64>,
    weight: Array2<f64>,
    count: Array2<u32>,
}

impl GridPlanes {
    fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            accum: Array2::zeros((n_rows, n_cols)),
            weight: Array2::zeros((n_rows, n_cols)),
            count: Array2::zeros((n_rows, n_cols)),
        }
    }

    fn merge(&mut self, other: GridPlanes) {
        self.accum += &other.accum;
        self.weight += &other.weight;
        self.count += &other.count;
    }
}

/// Per-pass bookkeeping of gridded and skipped pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccumulateReport {
    /// Pixels that contributed to at least one cell
    pub gridded: usize,
    /// Pixels rejected by the validity mask
    pub skipped_masked: usize,
    /// Pixels with degenerate footprint geometry
    pub skipped_degenerate: usize,
    /// Valid pixels whose footprint missed every grid cell
    pub skipped_no_overlap: usize,
}

impl AccumulateReport {
    fn merge(&mut self, other: AccumulateReport) {
        self.gridded += other.gridded;
        self.skipped_masked += other.skipped_masked;
        self.skipped_degenerate += other.skipped_degenerate;
        self.skipped_no_overlap += other.skipped_no_overlap;
    }
}

/// Swath-to-grid accumulation engine.
///
/// Contributions from repeated `accumulate` calls against the same grid add
/// commutatively, so an orbit composite is built by one call per swath
/// followed by a single `finalize`.
#[derive(Debug, Clone)]
pub struct GridAccumulator<C: PolygonIntersectArea = SutherlandHodgman> {
    clipper: C,
    weighting: Weighting,
}

impl GridAccumulator<SutherlandHodgman> {
    pub fn new(weighting: Weighting) -> Self {
        Self {
            clipper: SutherlandHodgman,
            weighting,
        }
    }
}

impl<C: PolygonIntersectArea + Sync> GridAccumulator<C> {
    pub fn with_clipper(clipper: C, weighting: Weighting) -> Self {
        Self { clipper, weighting }
    }

    /// Rasterize one swath onto the grid.
    ///
    /// Fatal errors (shape or projection mismatch) leave the grid untouched;
    /// per-pixel geometry failures are skipped and counted in the report.
    pub fn accumulate(
        &self,
        grid: &mut OutputGrid,
        geometry: &SwathGeolocation,
        values: &Measurement,
        mask: &ValidityMask,
    ) -> SwathResult<AccumulateReport> {
        self.check_inputs(grid, geometry, values, mask)?;

        let (rows, _) = values.dim();
        let (planes, report) =
            self.accumulate_scanlines(&grid.spec, geometry, values, mask, 0, rows);
        grid.planes.merge(planes);

        log::debug!(
            "Accumulated swath: {} gridded, {} masked, {} degenerate, {} no-overlap",
            report.gridded,
            report.skipped_masked,
            report.skipped_degenerate,
            report.skipped_no_overlap
        );

        Ok(report)
    }

    /// Parallel variant of [`accumulate`](Self::accumulate).
    ///
    /// Scanlines are partitioned across rayon workers; every worker fills a
    /// private set of planes which are merged by addition at the end, so the
    /// result is identical to the serial pass.
    #[cfg(feature = "parallel")]
    pub fn accumulate_par(
        &self,
        grid: &mut OutputGrid,
        geometry: &SwathGeolocation,
        values: &Measurement,
        mask: &ValidityMask,
    ) -> SwathResult<AccumulateReport> {
        use rayon::prelude::*;

        self.check_inputs(grid, geometry, values, mask)?;

        let (rows, _) = values.dim();
        let spec = &grid.spec;
        let chunk = 64usize;
        let starts: Vec<usize> = (0..rows).step_by(chunk).collect();

        let (planes, report) = starts
            .into_par_iter()
            .map(|start| {
                let end = (start + chunk).min(rows);
                self.accumulate_scanlines(spec, geometry, values, mask, start, end)
            })
            .reduce(
                || (GridPlanes::zeros(spec.n_rows, spec.n_cols), AccumulateReport::default()),
                |(mut planes_a, mut report_a), (planes_b, report_b)| {
                    planes_a.merge(planes_b);
                    report_a.merge(report_b);
                    (planes_a, report_a)
                },
            );

        grid.planes.merge(planes);
        Ok(report)
    }

    fn check_inputs(
        &self,
        grid: &OutputGrid,
        geometry: &SwathGeolocation,
        values: &Measurement,
        mask: &ValidityMask,
    ) -> SwathResult<()> {
        if let CoordinateSystem::Projected { epsg } = grid.spec.crs {
            return Err(SwathError::ProjectionMismatch(format!(
                "Rasterization onto EPSG:{} not supported, supply a geographic grid",
                epsg
            )));
        }
        if grid.spec.crs != geometry.crs() {
            return Err(SwathError::ProjectionMismatch(format!(
                "Swath geometry is {:?} but grid is {:?}",
                geometry.crs(),
                grid.spec.crs
            )));
        }

        let dim = [values.dim().0, values.dim().1];
        let geo_dim = [geometry.dim().0, geometry.dim().1];
        if geo_dim != dim {
            return Err(SwathError::shape("swath geolocation", &dim, &geo_dim));
        }
        let mask_dim = [mask.dim().0, mask.dim().1];
        if mask_dim != dim {
            return Err(SwathError::shape("validity mask", &dim, &mask_dim));
        }
        Ok(())
    }

    /// Accumulate the scanline range [start, end) into private planes
    fn accumulate_scanlines(
        &self,
        spec: &GridSpec,
        geometry: &SwathGeolocation,
        values: &Measurement,
        mask: &ValidityMask,
        start: usize,
        end: usize,
    ) -> (GridPlanes, AccumulateReport) {
        let (_, cols) = values.dim();
        let mut planes = GridPlanes::zeros(spec.n_rows, spec.n_cols);
        let mut report = AccumulateReport::default();

        for i in start..end {
            for j in 0..cols {
                if !mask[[i, j]] {
                    report.skipped_masked += 1;
                    continue;
                }
                let value = values[[i, j]] as f64;

                match self.weighting {
                    Weighting::NearestCenter => {
                        if geometry.is_degenerate(i, j) {
                            report.skipped_degenerate += 1;
                            continue;
                        }
                        let (lon, lat) = geometry.center(i, j);
                        match spec.cell_of(lon, lat) {
                            Some((r, c)) => {
                                planes.accum[[r, c]] += value;
                                planes.weight[[r, c]] += 1.0;
                                planes.count[[r, c]] += 1;
                                report.gridded += 1;
                            }
                            None => report.skipped_no_overlap += 1,
                        }
                    }
                    Weighting::OverlapArea => {
                        let footprint = match geometry.footprint_polygon(i, j) {
                            Some(fp) => fp,
                            None => {
                                report.skipped_degenerate += 1;
                                continue;
                            }
                        };
                        let added =
                            self.spread_footprint(spec, &mut planes, &footprint, value);
                        if added {
                            report.gridded += 1;
                        } else {
                            report.skipped_no_overlap += 1;
                        }
                    }
                }
            }
        }

        (planes, report)
    }

    /// Distribute one footprint over the cells it overlaps; returns whether
    /// any cell received a contribution
    fn spread_footprint(
        &self,
        spec: &GridSpec,
        planes: &mut GridPlanes,
        footprint: &Footprint,
        value: f64,
    ) -> bool {
        let mut any = false;

        for ring in footprint.pieces() {
            let mut min_lon = f64::MAX;
            let mut max_lon = f64::MIN;
            let mut min_lat = f64::MAX;
            let mut max_lat = f64::MIN;
            for &[lon, lat] in ring.iter() {
                min_lon = min_lon.min(lon);
                max_lon = max_lon.max(lon);
                min_lat = min_lat.min(lat);
                max_lat = max_lat.max(lat);
            }

            let rows = match spec.row_range(min_lat, max_lat) {
                Some(r) => r,
                None => continue,
            };
            let cols = match spec.col_range(min_lon, max_lon) {
                Some(c) => c,
                None => continue,
            };

            for r in rows.0..=rows.1 {
                for c in cols.0..=cols.1 {
                    let cell = spec.cell_bounds(r, c);
                    let area = self.clipper.intersect_area(ring, &cell);
                    if area > MIN_CELL_OVERLAP {
                        planes.accum[[r, c]] += value * area;
                        planes.weight[[r, c]] += area;
                        planes.count[[r, c]] += 1;
                        any = true;
                    }
                }
            }
        }

        any
    }
}
