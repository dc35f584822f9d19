//! The building blocks of 2D/3D human pose training samples.

mod common;
pub mod dataset;
pub mod joints;
pub mod processor;
pub mod profiling;
