//! Box, size and affine transform types used to crop image patches.

mod common;

pub use affine::*;
pub mod affine;

pub use xywh::*;
pub mod xywh;

pub use hw::*;
pub mod hw;
