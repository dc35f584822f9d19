//! Record sources and the sample dataset adapters built on them.

mod dataset;
mod full;
mod inference;
mod json;
mod lifting;
mod mppe;
mod multiple;
mod raw_capture;
mod record;
mod registry;
mod utils;
mod worker;

pub use dataset::*;
pub use full::*;
pub use inference::*;
pub use json::*;
pub use lifting::*;
pub use mppe::*;
pub use multiple::*;
pub use raw_capture::*;
pub use record::*;
pub use registry::*;
pub use utils::*;
pub use worker::*;
