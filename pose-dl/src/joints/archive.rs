use super::KeypointLayout;
use crate::common::*;
use ndarray::{Array2, Array3, Axis, Ix2, OwnedRepr};
use ndarray_npy::NpzReader;

/// Precomputed 2D detector keypoints of a dataset split.
#[derive(Debug, Clone)]
pub struct KeypointArchive {
    /// Keypoints of shape `[samples, joints, 2]`.
    keypoints: Array3<f64>,
}

impl KeypointArchive {
    /// The archive file of the split, `<prefix>_train.npz` or `<prefix>_valid.npz`.
    pub fn path(prefix: &Path, is_train: bool) -> PathBuf {
        let suffix = if is_train { "_train.npz" } else { "_valid.npz" };
        let mut path = prefix.as_os_str().to_owned();
        path.push(suffix);
        PathBuf::from(path)
    }

    /// Loads the `x` and `y` arrays of shape `[samples, joints]` from an npz file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file =
            File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
        let mut npz = NpzReader::new(file)
            .with_context(|| format!("'{}' is not a valid npz file", path.display()))?;

        let x = read_array(&mut npz, "x").with_context(|| format!("in '{}'", path.display()))?;
        let y = read_array(&mut npz, "y").with_context(|| format!("in '{}'", path.display()))?;
        ensure!(
            x.shape() == y.shape(),
            "x and y have different shapes {:?} and {:?} in '{}'",
            x.shape(),
            y.shape(),
            path.display()
        );

        let keypoints = ndarray::stack(Axis(2), &[x.view(), y.view()])?;
        Ok(Self { keypoints })
    }

    /// Loads the archive of the split and checks it against the dataset length.
    pub fn load(prefix: &Path, is_train: bool, num_samples: usize) -> Result<Self> {
        let path = Self::path(prefix, is_train);
        let archive = Self::open(&path)?;
        ensure!(
            archive.num_samples() == num_samples,
            "'{}' has {} samples, but the dataset has {}",
            path.display(),
            archive.num_samples(),
            num_samples
        );
        info!(
            "loaded {} detector keypoint samples from '{}'",
            num_samples,
            path.display()
        );
        Ok(archive)
    }

    pub fn num_samples(&self) -> usize {
        self.keypoints.len_of(Axis(0))
    }

    pub fn num_joints(&self) -> usize {
        self.keypoints.len_of(Axis(1))
    }

    /// The keypoints of a sample in the detector joint order.
    pub fn get(&self, index: usize) -> Option<Vec<[f64; 2]>> {
        if index >= self.num_samples() {
            return None;
        }
        let sample = self.keypoints.index_axis(Axis(0), index);
        let joints = sample
            .outer_iter()
            .map(|joint| [joint[0], joint[1]])
            .collect();
        Some(joints)
    }

    /// Converts all samples into the native joint order once.
    pub fn to_native<S>(
        &self,
        layout: KeypointLayout,
        native_names: &[S],
    ) -> Result<Vec<Vec<[f64; 2]>>>
    where
        S: AsRef<str>,
    {
        (0..self.num_samples())
            .map(|index| {
                let keypoints = self
                    .get(index)
                    .ok_or_else(|| format_err!("sample {} is out of range", index))?;
                layout.to_native(&keypoints, native_names)
            })
            .collect()
    }
}

/// Reads a 2D array saved by either numpy (`<name>.npy`) or ndarray-npy
/// (`<name>`) in double or single precision.
fn read_array<R>(npz: &mut NpzReader<R>, name: &str) -> Result<Array2<f64>>
where
    R: Read + Seek,
{
    let candidates = [format!("{}.npy", name), name.to_owned()];

    for entry in &candidates {
        if let Ok(array) = npz.by_name::<OwnedRepr<f64>, Ix2>(entry) {
            return Ok(array);
        }
        if let Ok(array) = npz.by_name::<OwnedRepr<f32>, Ix2>(entry) {
            return Ok(array.mapv(f64::from));
        }
    }

    bail!("array '{}' of shape [samples, joints] is not found", name)
}
