//! Assetflow image preprocessing.
//!
//! Preview generation for image uploads: bounded EXIF read, orientation
//! correction, compressed data-URL output. Runs alongside the transport
//! path and never gates it; every failure here degrades to "no preview".

pub mod filename;
pub mod preview;

pub use filename::sanitize_filename;
pub use preview::{ImagePreprocessor, Orientation};
