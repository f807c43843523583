//! Reader-boundary types
//!
//! The crate never parses product files itself; a reader collaborator fills
//! a [`SwathProduct`] with typed arrays plus metadata.

pub mod product;

pub use product::SwathProduct;
