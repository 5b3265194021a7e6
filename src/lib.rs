//! Coordinate transforms between index, scaled and physical space for OME-Zarr image pyramids.
pub mod acquisition;
pub mod annotations;
mod error;
pub mod image;
pub mod metadata;
pub mod orientation;
pub mod points;
pub mod s3;
pub mod storage;
pub mod units;
pub mod zarr;

pub use zarrs;

pub use error::{Error, Result};
