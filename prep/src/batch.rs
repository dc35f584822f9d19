//! Conversions from samples to ordered fields and their collation.

use crate::common::*;
use pose_dl::dataset::{FullSample, InferenceSample, LiftingItem};

/// The ordered tensors of one sample, with the image path of visualization
/// samples.
#[derive(Debug)]
pub struct SampleFields {
    pub tensors: Vec<Tensor>,
    pub image_path: Option<PathBuf>,
}

impl SampleFields {
    fn new(tensors: Vec<Tensor>) -> Self {
        Self {
            tensors,
            image_path: None,
        }
    }
}

/// A collated batch of samples.
#[derive(Debug)]
pub struct Batch {
    /// The batch index in the pass.
    pub step: usize,
    pub worker_index: usize,
    pub num_samples: usize,
    /// Per-field tensors with a leading batch dimension.
    pub fields: Vec<Tensor>,
    pub image_paths: Vec<PathBuf>,
}

impl Batch {
    /// Stacks each field of the samples along a new leading dimension.
    pub fn collate(step: usize, worker_index: usize, samples: Vec<SampleFields>) -> Result<Self> {
        ensure!(!samples.is_empty(), "cannot collate an empty batch");
        let num_samples = samples.len();
        let num_fields = samples[0].tensors.len();

        let mut columns: Vec<Vec<Tensor>> = (0..num_fields).map(|_| vec![]).collect();
        let mut image_paths = vec![];

        for (index, sample) in samples.into_iter().enumerate() {
            let SampleFields {
                tensors,
                image_path,
            } = sample;
            ensure!(
                tensors.len() == num_fields,
                "sample {} has {} fields, but the first sample has {}",
                index,
                tensors.len(),
                num_fields
            );
            columns
                .iter_mut()
                .zip(tensors)
                .for_each(|(column, tensor)| column.push(tensor));
            image_paths.extend(image_path);
        }

        let fields = columns
            .iter()
            .enumerate()
            .map(|(index, column)| -> Result<_> {
                let sizes: Vec<_> = column.iter().map(|tensor| tensor.size()).collect();
                ensure!(
                    sizes.iter().all_equal(),
                    "field {} has mismatched shapes {:?}",
                    index,
                    sizes
                );
                Ok(Tensor::stack(column.as_slice(), 0))
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            step,
            worker_index,
            num_samples,
            fields,
            image_paths,
        })
    }
}

fn size_tensor(value: usize) -> Tensor {
    Tensor::of_slice(&[value as i64])
}

impl From<FullSample> for SampleFields {
    fn from(sample: FullSample) -> Self {
        match sample {
            FullSample::Training(sample) => Self::new(vec![
                sample.image,
                sample.joint_img,
                sample.joint_cam,
                sample.joint_vis,
                sample.joints_have_depth,
            ]),
            FullSample::Visualization(sample) => Self {
                tensors: vec![sample.image, sample.bbox, sample.joint_img],
                image_path: Some(sample.image_path),
            },
            FullSample::Only2d(sample) => Self::new(vec![
                sample.image,
                sample.raw_image,
                sample.bbox,
                sample.joint_img,
                sample.f,
                sample.c,
                sample.joint_cam,
            ]),
            FullSample::DetectionCache(sample) => Self::new(vec![
                sample.image,
                sample.joint_img,
                sample.joint_cam,
                sample.joint_vis,
                sample.bbox,
                size_tensor(sample.width),
                size_tensor(sample.height),
            ]),
        }
    }
}

impl From<LiftingItem> for SampleFields {
    fn from(sample: LiftingItem) -> Self {
        match sample {
            LiftingItem::Training(sample) => Self::new(vec![
                sample.joint_img,
                sample.joint_cam,
                sample.joint_vis,
                sample.root_cam,
                sample.f,
                sample.c,
                sample.joint_img_raw,
            ]),
            LiftingItem::Visualization(sample) => Self {
                tensors: vec![sample.joint_img, sample.joint_cam],
                image_path: Some(sample.image_path),
            },
        }
    }
}

impl From<InferenceSample> for SampleFields {
    fn from(sample: InferenceSample) -> Self {
        Self::new(vec![
            sample.image,
            sample.joint_img,
            sample.joint_cam,
            sample.joint_vis,
        ])
    }
}
