//! The adapter feeding 2D keypoints to a lifting network.

use super::{load_image, record_image_size, vector_to_tensor, JointDb, SampleDataset, Worker};
use crate::{
    common::*,
    joints::{KeypointArchive, KeypointSource},
    processor::{cam_to_meters, joints_to_tensor, normalize_screen_coordinates, vis_mask},
};

/// The kind of tuples produced by [LiftingDataset].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiftingOutput {
    Training,
    Visualization,
}

/// Lifting dataset initializer.
#[derive(Debug, Clone)]
pub struct LiftingInit {
    pub is_train: bool,
    pub keypoints: KeypointSource,
    /// The directory of the detector keypoint archives.
    pub keypoints_dir: PathBuf,
    pub output: LiftingOutput,
}

impl LiftingInit {
    pub fn build(self, db: Arc<dyn JointDb>) -> Result<LiftingDataset> {
        let Self {
            is_train,
            keypoints,
            keypoints_dir,
            output,
        } = self;

        let detections = match &keypoints {
            KeypointSource::GroundTruth => None,
            KeypointSource::Detector { name, layout } => {
                let prefix = keypoints_dir.join(name);
                let archive = KeypointArchive::load(&prefix, is_train, db.num_records())?;
                let detections = archive
                    .to_native(*layout, db.meta().joints_name())
                    .with_context(|| {
                        format!("failed to remap '{}' keypoints to the dataset joints", name)
                    })?;
                Some(detections)
            }
        };

        Ok(LiftingDataset {
            db,
            keypoints,
            detections,
            output,
        })
    }
}

/// The dataset producing 2D/3D joint pairs without cropping images.
#[derive(Debug)]
pub struct LiftingDataset {
    db: Arc<dyn JointDb>,
    keypoints: KeypointSource,
    /// Detector keypoints in the dataset joint order, one entry per record.
    detections: Option<Vec<Vec<[f64; 2]>>>,
    output: LiftingOutput,
}

/// The training tuple.
#[derive(Debug, TensorLike)]
pub struct LiftingSample {
    /// `[N, 2]` input joints in normalized screen coordinates.
    pub joint_img: Tensor,
    /// `[N, 3]` camera space joints in meters.
    pub joint_cam: Tensor,
    /// `[N, 1]` visibility mask.
    pub joint_vis: Tensor,
    pub root_cam: Tensor,
    pub f: Tensor,
    pub c: Tensor,
    /// `[N, 2]` input joints in pixels.
    pub joint_img_raw: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct LiftingVisSample {
    #[tensor_like(clone)]
    pub image_path: PathBuf,
    /// `[N, 2]` input joints in pixels.
    pub joint_img: Tensor,
    pub joint_cam: Tensor,
}

/// A sample of [LiftingDataset], one variant per [LiftingOutput].
#[derive(Debug)]
pub enum LiftingItem {
    Training(LiftingSample),
    Visualization(LiftingVisSample),
}

impl LiftingDataset {
    pub fn keypoints(&self) -> &KeypointSource {
        &self.keypoints
    }

    /// The 2D input joints of a record in pixels.
    fn input_joints(&self, index: usize) -> Result<Vec<[f64; 2]>> {
        let joints = match &self.detections {
            Some(detections) => detections
                .get(index)
                .ok_or_else(|| format_err!("no detector keypoints for index {}", index))?
                .clone(),
            None => self.db.record(index)?.joint_img_2d(),
        };
        Ok(joints)
    }
}

impl SampleDataset for LiftingDataset {
    type Sample = LiftingItem;

    fn num_samples(&self) -> usize {
        self.db.num_records()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let record = self.db.record(index)?;
        let joint_img = self.input_joints(index)?;
        let joint_cam = cam_to_meters(&record.joint_cam);

        let sample = match self.output {
            LiftingOutput::Training => {
                let size = record_image_size(record)?;
                let normalized =
                    normalize_screen_coordinates(&joint_img, size.w() as f64, size.h() as f64);

                LiftingItem::Training(LiftingSample {
                    joint_img: joints_to_tensor(&normalized),
                    joint_cam,
                    joint_vis: vis_mask(&record.joint_vis),
                    root_cam: vector_to_tensor(&record.root_cam),
                    f: vector_to_tensor(&record.f),
                    c: vector_to_tensor(&record.c),
                    joint_img_raw: joints_to_tensor(&joint_img),
                })
            }
            LiftingOutput::Visualization => {
                // fail on unreadable images before drawing
                load_image(&record.image_path)?;

                LiftingItem::Visualization(LiftingVisSample {
                    image_path: record.image_path.clone(),
                    joint_img: joints_to_tensor(&joint_img),
                    joint_cam,
                })
            }
        };

        worker.stats.samples += 1;
        Ok(sample)
    }
}
