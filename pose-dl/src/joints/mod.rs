//! Joint orders of datasets and 2D keypoint detectors.

mod archive;
mod layout;
mod remap;

pub use archive::*;
pub use layout::*;
pub use remap::*;
