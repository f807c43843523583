//! swathgrid: A Fast, Modular Swath Quality-Masking and Regridding Toolkit
//!
//! This library turns satellite instrument swath products (irregular orbit
//! swaths with per-pixel quality flags and quadrilateral geolocation) into
//! analysis-ready outputs: per-detector statistics for instrument health
//! monitoring, or weighted grid composites for map rendering.
//!
//! The two processing paths share the same front door:
//!
//! ```text
//! reader -> flags + values + geolocation -> build_mask
//!     -> aggregate (monitoring)  or  GridAccumulator + finalize (mapping)
//! ```

pub mod types;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    BoundingBox, CoordinateSystem, FlagImage, Measurement, MeasurementCube, MeasurementValue,
    ProductMetadata, SwathError, SwathResult, ValidityMask, NETCDF_FILL_F32, NETCDF_FILL_F64,
};

pub use crate::core::{
    aggregate, biweight, build_mask, rank_quality, summarize_quality, AccumulateReport, Biweight,
    CellBounds, CellStats, Footprint, GridAccumulator, GriddedComposite, GridSpec, MaskPolicy, OutputGrid,
    PolygonIntersectArea, QualityClass, QualitySummary, ReduceAxis, Ring, StatisticsRecord,
    SutherlandHodgman, SwathGeolocation, Weighting,
};

pub use io::SwathProduct;
