use crate::core::geolocation::SwathGeolocation;
use crate::types::{FlagImage, Measurement, ProductMetadata, SwathError, SwathResult};

/// One swath worth of product data, as delivered by a reader collaborator.
///
/// The reader owns file-format mechanics; this container only carries the
/// typed arrays the engines consume, co-indexed on (scanline, detector).
#[derive(Debug, Clone)]
pub struct SwathProduct {
    pub values: Measurement,
    pub flags: FlagImage,
    pub geolocation: SwathGeolocation,
    pub metadata: ProductMetadata,
}

impl SwathProduct {
    /// Assemble a product and run the cross-array shape checks once at the
    /// boundary, so the engines can assume co-indexed inputs.
    pub fn new(
        values: Measurement,
        flags: FlagImage,
        geolocation: SwathGeolocation,
        metadata: ProductMetadata,
    ) -> SwathResult<Self> {
        let product = Self {
            values,
            flags,
            geolocation,
            metadata,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> SwathResult<()> {
        let dim = [self.values.dim().0, self.values.dim().1];
        let flag_dim = [self.flags.dim().0, self.flags.dim().1];
        if flag_dim != dim {
            return Err(SwathError::shape("quality flags", &dim, &flag_dim));
        }
        let geo_dim = [self.geolocation.dim().0, self.geolocation.dim().1];
        if geo_dim != dim {
            return Err(SwathError::shape("swath geolocation", &dim, &geo_dim));
        }

        log::debug!(
            "Validated product {} ({} x {} pixels, orbit {:?})",
            self.metadata.product_id,
            dim[0],
            dim[1],
            self.metadata.orbit
        );
        Ok(())
    }

    /// Swath shape as (scanlines, detectors)
    pub fn dim(&self) -> (usize, usize) {
        self.values.dim()
    }
}
