use crate::types::{CoordinateSystem, SwathError, SwathResult, NETCDF_FILL_F64};
use ndarray::{Array2, Array3};

/// A closed polygon ring as (longitude, latitude) vertices, counter-clockwise,
/// without a repeated closing vertex
pub type Ring = Vec<[f64; 2]>;

/// Footprints with near-zero area are excluded as degenerate slivers
pub const DEGENERATE_AREA_EPS: f64 = 1.0e-10;

/// Ground footprint of one detector element at one scanline
#[derive(Debug, Clone, PartialEq)]
pub enum Footprint {
    /// Footprint entirely on one side of the date line
    Whole(Ring),
    /// Antimeridian-crossing footprint, split into one ring per side
    Split { west: Ring, east: Ring },
}

impl Footprint {
    /// Rings making up this footprint (one or two)
    pub fn pieces(&self) -> Vec<&Ring> {
        match self {
            Footprint::Whole(ring) => vec![ring],
            Footprint::Split { west, east } => vec![west, east],
        }
    }
}

/// Per-pixel corner and center geolocation for a measurement swath.
///
/// Corner index convention, starting at the low-scanline, low-detector
/// corner: index 0 = (i, j), 1 = (i, j+1) side, 2 = (i+1, j+1) side,
/// 3 = (i+1, j) side. The stored arrays keep this index layout exactly as
/// read; geometric winding depends on orbit direction and rings handed out
/// by [`footprint_polygon`](Self::footprint_polygon) are oriented
/// counter-clockwise on the fly. Longitudes are normalized to [-180, 180)
/// at construction and each footprint carries an antimeridian-crossing flag
/// and a degeneracy flag.
#[derive(Debug, Clone)]
pub struct SwathGeolocation {
    /// Corner longitudes, shape (scanlines, detectors, 4)
    lon_corners: Array3<f64>,
    /// Corner latitudes, shape (scanlines, detectors, 4)
    lat_corners: Array3<f64>,
    lon_center: Array2<f64>,
    lat_center: Array2<f64>,
    crossing: Array2<bool>,
    degenerate: Array2<bool>,
    crs: CoordinateSystem,
}

impl SwathGeolocation {
    /// Build swath geolocation from corner and center coordinate arrays.
    ///
    /// Checks co-indexing against the (scanline, detector) shape, normalizes
    /// longitudes, and marks degenerate footprints (fill/NaN corners,
    /// non-convex rings, near-zero area slivers) for exclusion by geometry
    /// consumers.
    pub fn new(
        mut lon_corners: Array3<f64>,
        lat_corners: Array3<f64>,
        lon_center: Array2<f64>,
        lat_center: Array2<f64>,
    ) -> SwathResult<Self> {
        let dim = lon_corners.dim();
        let (rows, cols, ncorner) = dim;
        if ncorner != 4 {
            return Err(SwathError::shape(
                "corner longitudes",
                &[rows, cols, 4],
                &[rows, cols, ncorner],
            ));
        }
        if lat_corners.dim() != dim {
            let d = lat_corners.dim();
            return Err(SwathError::shape(
                "corner latitudes",
                &[rows, cols, 4],
                &[d.0, d.1, d.2],
            ));
        }
        for (name, arr) in [("center longitudes", &lon_center), ("center latitudes", &lat_center)] {
            if arr.dim() != (rows, cols) {
                return Err(SwathError::shape(name, &[rows, cols], &[arr.dim().0, arr.dim().1]));
            }
        }

        // Fill sentinels must be caught on the raw values, before longitude
        // normalization folds them into the valid range
        let mut crossing = Array2::from_elem((rows, cols), false);
        let mut degenerate = Array2::from_elem((rows, cols), false);
        for i in 0..rows {
            for j in 0..cols {
                for k in 0..4 {
                    if !coord_usable(lon_corners[[i, j, k]])
                        || !coord_usable(lat_corners[[i, j, k]])
                    {
                        degenerate[[i, j]] = true;
                    }
                }
            }
        }

        lon_corners.mapv_inplace(normalize_lon);
        let lon_center = lon_center.mapv(normalize_lon);

        let mut n_degenerate = degenerate.iter().filter(|&&d| d).count();
        let mut n_crossing = 0usize;

        for i in 0..rows {
            for j in 0..cols {
                if degenerate[[i, j]] {
                    continue;
                }
                let mut lons = [0.0f64; 4];
                let mut lats = [0.0f64; 4];
                for k in 0..4 {
                    lons[k] = lon_corners[[i, j, k]];
                    lats[k] = lat_corners[[i, j, k]];
                }

                let span = lons.iter().cloned().fold(f64::MIN, f64::max)
                    - lons.iter().cloned().fold(f64::MAX, f64::min);
                let crosses = span > 180.0;
                if crosses {
                    crossing[[i, j]] = true;
                    n_crossing += 1;
                    // Unwrap to a contiguous ring east of the date line
                    for lon in lons.iter_mut() {
                        if *lon < 0.0 {
                            *lon += 360.0;
                        }
                    }
                }

                // Orientation is repaired on a local copy only; the stored
                // arrays keep the reader's corner index layout, which
                // corner_mesh depends on
                let mut ring: Ring = (0..4).map(|k| [lons[k], lats[k]]).collect();
                let area = ring_signed_area(&ring);
                if area < 0.0 {
                    ring.reverse();
                }

                if area.abs() < DEGENERATE_AREA_EPS || !ring_is_convex(&ring) {
                    degenerate[[i, j]] = true;
                    n_degenerate += 1;
                }
            }
        }

        log::debug!(
            "Swath geolocation {}x{}: {} degenerate, {} antimeridian-crossing footprints",
            rows,
            cols,
            n_degenerate,
            n_crossing
        );

        Ok(Self {
            lon_corners,
            lat_corners,
            lon_center,
            lat_center,
            crossing,
            degenerate,
            crs: CoordinateSystem::Geographic,
        })
    }

    /// Swath shape as (scanlines, detectors)
    pub fn dim(&self) -> (usize, usize) {
        self.lon_center.dim()
    }

    pub fn crs(&self) -> CoordinateSystem {
        self.crs
    }

    pub fn is_degenerate(&self, i: usize, j: usize) -> bool {
        self.degenerate[[i, j]]
    }

    pub fn crosses_antimeridian(&self, i: usize, j: usize) -> bool {
        self.crossing[[i, j]]
    }

    pub fn degenerate_count(&self) -> usize {
        self.degenerate.iter().filter(|&&d| d).count()
    }

    /// Center coordinate of pixel (i, j) as (longitude, latitude)
    pub fn center(&self, i: usize, j: usize) -> (f64, f64) {
        (self.lon_center[[i, j]], self.lat_center[[i, j]])
    }

    /// Counter-clockwise footprint polygon of pixel (i, j), `None` when
    /// degenerate.
    ///
    /// Antimeridian-crossing footprints are returned as two rings, one per
    /// side of the date line, so overlap math never sees a ring wrapping the
    /// globe the wrong way round.
    pub fn footprint_polygon(&self, i: usize, j: usize) -> Option<Footprint> {
        if self.degenerate[[i, j]] {
            return None;
        }

        if !self.crossing[[i, j]] {
            let mut ring: Ring = (0..4)
                .map(|k| [self.lon_corners[[i, j, k]], self.lat_corners[[i, j, k]]])
                .collect();
            if ring_signed_area(&ring) < 0.0 {
                ring.reverse();
            }
            return Some(Footprint::Whole(ring));
        }

        // Work in unwrapped coordinates [0, 360) and cut at lon = 180
        let mut ring: Ring = (0..4)
            .map(|k| {
                let lon = self.lon_corners[[i, j, k]];
                let lon = if lon < 0.0 { lon + 360.0 } else { lon };
                [lon, self.lat_corners[[i, j, k]]]
            })
            .collect();
        if ring_signed_area(&ring) < 0.0 {
            ring.reverse();
        }

        let west = clip_ring_axis(&ring, 0, 180.0, true);
        let mut east = clip_ring_axis(&ring, 0, 180.0, false);
        for v in east.iter_mut() {
            v[0] -= 360.0;
        }

        match (piece_ok(&west), piece_ok(&east)) {
            (true, true) => Some(Footprint::Split { west, east }),
            (true, false) => Some(Footprint::Whole(west)),
            (false, true) => Some(Footprint::Whole(east)),
            (false, false) => None,
        }
    }

    /// Corner mesh of shape (scanlines+1, detectors+1) for renderers that
    /// draw the swath as a quadrilateral mesh. Returns (longitude, latitude).
    pub fn corner_mesh(&self) -> (Array2<f64>, Array2<f64>) {
        let (rows, cols) = self.dim();
        let mut lon = Array2::zeros((rows + 1, cols + 1));
        let mut lat = Array2::zeros((rows + 1, cols + 1));

        for i in 0..rows {
            for j in 0..cols {
                lon[[i, j]] = self.lon_corners[[i, j, 0]];
                lat[[i, j]] = self.lat_corners[[i, j, 0]];
            }
            lon[[i, cols]] = self.lon_corners[[i, cols - 1, 1]];
            lat[[i, cols]] = self.lat_corners[[i, cols - 1, 1]];
        }
        for j in 0..cols {
            lon[[rows, j]] = self.lon_corners[[rows - 1, j, 3]];
            lat[[rows, j]] = self.lat_corners[[rows - 1, j, 3]];
        }
        lon[[rows, cols]] = self.lon_corners[[rows - 1, cols - 1, 2]];
        lat[[rows, cols]] = self.lat_corners[[rows - 1, cols - 1, 2]];

        (lon, lat)
    }
}

/// A coordinate is usable when finite and not a fill sentinel such as
/// [`NETCDF_FILL_F64`]
fn coord_usable(v: f64) -> bool {
    v.is_finite() && v != NETCDF_FILL_F64 && v.abs() < 1.0e30
}

/// Normalize a longitude to [-180, 180)
pub fn normalize_lon(lon: f64) -> f64 {
    if !lon.is_finite() {
        return lon;
    }
    let mut lon = (lon + 180.0) % 360.0;
    if lon < 0.0 {
        lon += 360.0;
    }
    lon - 180.0
}

/// Shoelace signed area of a ring (positive = counter-clockwise)
pub fn ring_signed_area(ring: &Ring) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for k in 0..n {
        let [x0, y0] = ring[k];
        let [x1, y1] = ring[(k + 1) % n];
        acc += x0 * y1 - x1 * y0;
    }
    0.5 * acc
}

/// Convexity check for a counter-clockwise ring: every edge turn is a
/// non-negative cross product
fn ring_is_convex(ring: &Ring) -> bool {
    let n = ring.len();
    for k in 0..n {
        let [ax, ay] = ring[k];
        let [bx, by] = ring[(k + 1) % n];
        let [cx, cy] = ring[(k + 2) % n];
        let cross = (bx - ax) * (cy - ay) - (by - ay) * (cx - ax);
        if cross < 0.0 {
            return false;
        }
    }
    true
}

/// Sutherland-Hodgman half-plane clip against an axis-aligned line.
///
/// `axis` is 0 for longitude, 1 for latitude; `keep_below` keeps vertices
/// with coordinate <= bound.
pub fn clip_ring_axis(ring: &Ring, axis: usize, bound: f64, keep_below: bool) -> Ring {
    let inside = |v: &[f64; 2]| {
        if keep_below {
            v[axis] <= bound
        } else {
            v[axis] >= bound
        }
    };

    let mut out: Ring = Vec::with_capacity(ring.len() + 2);
    let n = ring.len();
    for k in 0..n {
        let cur = ring[k];
        let next = ring[(k + 1) % n];
        let cur_in = inside(&cur);
        let next_in = inside(&next);

        if cur_in {
            out.push(cur);
        }
        if cur_in != next_in {
            let t = (bound - cur[axis]) / (next[axis] - cur[axis]);
            let mut crossing = [0.0; 2];
            crossing[axis] = bound;
            crossing[1 - axis] = cur[1 - axis] + t * (next[1 - axis] - cur[1 - axis]);
            out.push(crossing);
        }
    }
    out
}

fn piece_ok(ring: &Ring) -> bool {
    ring.len() >= 3 && ring_signed_area(ring).abs() >= DEGENERATE_AREA_EPS
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array2, Array3};

    /// One-pixel swath with the given corner coordinates, CCW
    fn single_pixel(corners: [[f64; 2]; 4]) -> SwathGeolocation {
        let mut lon = Array3::zeros((1, 1, 4));
        let mut lat = Array3::zeros((1, 1, 4));
        let mut lon_c = 0.0;
        let mut lat_c = 0.0;
        for (k, [x, y]) in corners.iter().enumerate() {
            lon[[0, 0, k]] = *x;
            lat[[0, 0, k]] = *y;
            lon_c += x / 4.0;
            lat_c += y / 4.0;
        }
        SwathGeolocation::new(
            lon,
            lat,
            Array2::from_elem((1, 1), lon_c),
            Array2::from_elem((1, 1), lat_c),
        )
        .unwrap()
    }

    #[test]
    fn test_lon_normalization() {
        assert_relative_eq!(normalize_lon(190.0), -170.0);
        assert_relative_eq!(normalize_lon(-190.0), 170.0);
        assert_relative_eq!(normalize_lon(360.0), 0.0);
        assert_relative_eq!(normalize_lon(180.0), -180.0);
        assert_relative_eq!(normalize_lon(-180.0), -180.0);
        assert_relative_eq!(normalize_lon(45.5), 45.5);
    }

    #[test]
    fn test_simple_footprint_is_whole() {
        let geo = single_pixel([[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert!(!geo.is_degenerate(0, 0));
        assert!(!geo.crosses_antimeridian(0, 0));
        match geo.footprint_polygon(0, 0).unwrap() {
            Footprint::Whole(ring) => {
                assert_eq!(ring.len(), 4);
                assert_relative_eq!(ring_signed_area(&ring), 1.0);
            }
            Footprint::Split { .. } => panic!("unexpected split"),
        }
    }

    #[test]
    fn test_clockwise_corners_handed_out_ccw() {
        // Same square with clockwise input ordering
        let geo = single_pixel([[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]]);
        match geo.footprint_polygon(0, 0).unwrap() {
            Footprint::Whole(ring) => assert!(ring_signed_area(&ring) > 0.0),
            Footprint::Split { .. } => panic!("unexpected split"),
        }
    }

    #[test]
    fn test_descending_swath_corner_mesh_unshifted() {
        // Latitude decreasing with scanline index puts the corner index
        // layout in clockwise winding; the stored corners and the mesh
        // built from them must keep the reader's node positions
        let mut lon = Array3::zeros((2, 2, 4));
        let mut lat = Array3::zeros((2, 2, 4));
        for i in 0..2 {
            for j in 0..2 {
                let (x0, y0) = (j as f64, -(i as f64));
                let corners = [[x0, y0], [x0 + 1.0, y0], [x0 + 1.0, y0 - 1.0], [x0, y0 - 1.0]];
                for (k, [x, y]) in corners.iter().enumerate() {
                    lon[[i, j, k]] = *x;
                    lat[[i, j, k]] = *y;
                }
            }
        }
        let geo = SwathGeolocation::new(
            lon,
            lat,
            Array2::from_shape_fn((2, 2), |(_, j)| j as f64 + 0.5),
            Array2::from_shape_fn((2, 2), |(i, _)| -(i as f64) - 0.5),
        )
        .unwrap();

        for i in 0..2 {
            for j in 0..2 {
                assert!(!geo.is_degenerate(i, j));
                match geo.footprint_polygon(i, j).unwrap() {
                    Footprint::Whole(ring) => {
                        assert_relative_eq!(ring_signed_area(&ring), 1.0)
                    }
                    Footprint::Split { .. } => panic!("unexpected split"),
                }
            }
        }

        let (mesh_lon, mesh_lat) = geo.corner_mesh();
        assert_eq!(mesh_lat.dim(), (3, 3));
        // Top edge of the mesh is the first scanline's leading edge, lat 0
        assert_relative_eq!(mesh_lat[[0, 0]], 0.0);
        assert_relative_eq!(mesh_lat[[0, 2]], 0.0);
        assert_relative_eq!(mesh_lat[[1, 1]], -1.0);
        assert_relative_eq!(mesh_lat[[2, 0]], -2.0);
        assert_relative_eq!(mesh_lon[[0, 0]], 0.0);
        assert_relative_eq!(mesh_lon[[2, 2]], 2.0);
    }

    #[test]
    fn test_antimeridian_footprint_split() {
        let geo = single_pixel([[179.0, 0.0], [-179.0, 0.0], [-179.0, 1.0], [179.0, 1.0]]);
        assert!(geo.crosses_antimeridian(0, 0));

        match geo.footprint_polygon(0, 0).unwrap() {
            Footprint::Split { west, east } => {
                // West piece sits in [179, 180], east piece in [-180, -179]
                assert!(west.iter().all(|v| v[0] >= 179.0 - 1e-9 && v[0] <= 180.0 + 1e-9));
                assert!(east.iter().all(|v| v[0] >= -180.0 - 1e-9 && v[0] <= -179.0 + 1e-9));
                let total = ring_signed_area(&west).abs() + ring_signed_area(&east).abs();
                assert_relative_eq!(total, 2.0, epsilon = 1e-9);
            }
            Footprint::Whole(_) => panic!("expected split footprint"),
        }
    }

    #[test]
    fn test_nan_corner_is_degenerate() {
        let geo = single_pixel([[0.0, f64::NAN], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]);
        assert!(geo.is_degenerate(0, 0));
        assert!(geo.footprint_polygon(0, 0).is_none());
        assert_eq!(geo.degenerate_count(), 1);
    }

    #[test]
    fn test_sliver_is_degenerate() {
        let geo = single_pixel([
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0e-12],
            [0.0, 1.0e-12],
        ]);
        assert!(geo.is_degenerate(0, 0));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let lon = Array3::zeros((2, 2, 4));
        let lat = Array3::zeros((2, 3, 4));
        let res = SwathGeolocation::new(
            lon,
            lat,
            Array2::zeros((2, 2)),
            Array2::zeros((2, 2)),
        );
        assert!(matches!(res, Err(SwathError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_corner_mesh_shape_and_edges() {
        let mut lon = Array3::zeros((2, 2, 4));
        let mut lat = Array3::zeros((2, 2, 4));
        for i in 0..2 {
            for j in 0..2 {
                let (x0, y0) = (j as f64, i as f64);
                let corners = [[x0, y0], [x0 + 1.0, y0], [x0 + 1.0, y0 + 1.0], [x0, y0 + 1.0]];
                for (k, [x, y]) in corners.iter().enumerate() {
                    lon[[i, j, k]] = *x;
                    lat[[i, j, k]] = *y;
                }
            }
        }
        let geo = SwathGeolocation::new(
            lon,
            lat,
            Array2::from_shape_fn((2, 2), |(_, j)| j as f64 + 0.5),
            Array2::from_shape_fn((2, 2), |(i, _)| i as f64 + 0.5),
        )
        .unwrap();

        let (mesh_lon, mesh_lat) = geo.corner_mesh();
        assert_eq!(mesh_lon.dim(), (3, 3));
        assert_relative_eq!(mesh_lon[[0, 0]], 0.0);
        assert_relative_eq!(mesh_lon[[2, 2]], 2.0);
        assert_relative_eq!(mesh_lat[[2, 2]], 2.0);
        assert_relative_eq!(mesh_lat[[0, 2]], 0.0);
    }
}
