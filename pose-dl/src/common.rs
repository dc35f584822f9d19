pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use approx::abs_diff_eq;
pub use bbox::{Affine, PatchSpec, HW, XYWH};
pub use getset::{CopyGetters, Getters};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use lazy_static::lazy_static;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use rand::{prelude::*, rngs::StdRng};
pub use rand_distr::StandardNormal;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashSet,
    fmt,
    fmt::Debug,
    fs::File,
    io::{BufReader, Read, Seek},
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{vision, Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;
