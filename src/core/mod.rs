//! Core swath processing modules

pub mod quality;
pub mod stats;
pub mod geolocation;
pub mod regrid;

// Re-export main types
pub use quality::{build_mask, rank_quality, summarize_quality, MaskPolicy, QualityClass, QualitySummary};
pub use stats::{aggregate, biweight, Biweight, CellStats, ReduceAxis, StatisticsRecord};
pub use geolocation::{Footprint, Ring, SwathGeolocation};
pub use regrid::{
    AccumulateReport, CellBounds, GridAccumulator, GriddedComposite, GridSpec, OutputGrid,
    PolygonIntersectArea, SutherlandHodgman, Weighting,
};
