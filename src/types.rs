use chrono::{DateTime, Utc};
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Real-valued measurement data (radiance, irradiance, calibration signal)
pub type MeasurementValue = f32;

/// 2D measurement array (scanline x detector-element)
pub type Measurement = Array2<MeasurementValue>;

/// 3D measurement array for spectral products (scanline x detector-element x channel)
pub type MeasurementCube = Array3<MeasurementValue>;

/// Per-pixel quality flags, bit-encoded or level-encoded (higher = worse)
pub type FlagImage = Array2<u8>;

/// Derived validity mask, true = usable for aggregation/rasterization
pub type ValidityMask = Array2<bool>;

/// Default netCDF float fill value, 0x1.ep+122
///
/// The product family this crate consumes marks missing measurements with
/// this sentinel rather than NaN.
pub const NETCDF_FILL_F32: f32 = 9.96921e36;
pub const NETCDF_FILL_F64: f64 = 9.969209968386869e36;

/// Coordinate system enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// Swath coordinates (scanline, detector-element)
    Swath,
    /// Geographic coordinates (longitude, latitude on WGS84)
    Geographic,
    /// Projected coordinates (e.g., UTM)
    Projected { epsg: u32 },
}

/// Geographic bounding box, longitudes in [-180, 180)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon < self.max_lon && lat >= self.min_lat && lat < self.max_lat
    }
}

/// Swath product metadata, supplied by the reader collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMetadata {
    pub product_id: String,
    pub mission: String,
    pub instrument: String,
    pub orbit: Option<u32>,
    pub processor_version: String,
    pub coverage_start: DateTime<Utc>,
    pub coverage_stop: DateTime<Utc>,
    pub units: Option<String>,
    pub title: Option<String>,
}

/// Error types for swath processing
#[derive(Debug, thiserror::Error)]
pub enum SwathError {
    #[error("Shape mismatch in {name}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Projection mismatch: {0}")]
    ProjectionMismatch(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

impl SwathError {
    /// Shorthand used by the shape checks at module boundaries
    pub fn shape(name: &'static str, expected: &[usize], found: &[usize]) -> Self {
        SwathError::ShapeMismatch {
            name,
            expected: expected.to_vec(),
            found: found.to_vec(),
        }
    }
}

/// Result type for swath operations
pub type SwathResult<T> = Result<T, SwathError>;
