//! Data preprocessing building blocks.

pub mod augmentation;
pub mod normalizer;
pub mod occlusion;
pub mod patch;
pub mod pipeline;
pub mod pixel;

pub use augmentation::*;
pub use normalizer::*;
pub use occlusion::*;
pub use patch::*;
pub use pipeline::*;
pub use pixel::*;
