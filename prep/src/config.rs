//! Sample preparation program configuration format.

use crate::common::*;
use pose_dl::processor::PreprocessorInit;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub preprocessor: PreprocessorInit,
    pub loader: LoaderConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }
}

/// Dataset options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// The registered dataset identifier, e.g. `human36m`.
    pub name: String,
    /// The directory holding `<name>_<split>.json` annotations.
    pub root: PathBuf,
    /// `gt` for ground truth 2D joints, or the name of a keypoint detector.
    #[serde(default = "default_keypoints")]
    pub keypoints: String,
    /// The directory of `<detector>_train.npz` and `<detector>_valid.npz`.
    #[serde(default)]
    pub keypoints_dir: PathBuf,
    /// Crops image patches for 2D detection instead of lifting joints.
    #[serde(default)]
    pub detection_2d: bool,
    /// Adds a shuffled pass over the train split. When caching detections
    /// without it, the shuffled pass runs over the test split instead.
    #[serde(default = "default_true")]
    pub is_train: bool,
    /// Adds an ordered test pass when caching detections. Lifting always
    /// makes one.
    #[serde(default)]
    pub with_valid: bool,
    /// Enables synthetic occlusion for cropped training patches.
    #[serde(default)]
    pub occlusion: bool,
}

/// Data loading options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub batch_size: NonZeroUsize,
    pub num_workers: NonZeroUsize,
    /// Worker `i` is seeded by `seed + i`.
    #[serde(default)]
    pub seed: u64,
    /// The maximum number of collated batches waiting to be consumed.
    #[serde(default = "default_channel_size")]
    pub channel_size: usize,
}

impl LoaderConfig {
    /// The validation batch size, 1/8 of the training batch size.
    pub fn valid_batch_size(&self) -> usize {
        (self.batch_size.get() / 8).max(1)
    }
}

fn default_keypoints() -> String {
    "gt".into()
}

fn default_true() -> bool {
    true
}

fn default_channel_size() -> usize {
    2
}
