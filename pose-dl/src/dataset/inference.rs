use super::{record_image_size, JointDb, SampleDataset, Worker};
use crate::{
    common::*,
    processor::{cam_to_meters, joints_to_tensor, normalize_screen_coordinates, vis_mask},
};

/// The dataset feeding ground truth 2D joints to a lifting network at
/// inference time. It never reads pixels.
#[derive(Debug)]
pub struct InferenceDataset {
    db: Arc<dyn JointDb>,
}

#[derive(Debug, TensorLike)]
pub struct InferenceSample {
    /// The `[-1]` placeholder in place of image data.
    pub image: Tensor,
    /// `[N, 2]` joints in normalized screen coordinates.
    pub joint_img: Tensor,
    pub joint_cam: Tensor,
    pub joint_vis: Tensor,
}

impl InferenceDataset {
    pub fn new(db: Arc<dyn JointDb>) -> Self {
        Self { db }
    }
}

impl SampleDataset for InferenceDataset {
    type Sample = InferenceSample;

    fn num_samples(&self) -> usize {
        self.db.num_records()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let record = self.db.record(index)?;
        let size = record_image_size(record)?;
        let joint_img =
            normalize_screen_coordinates(&record.joint_img_2d(), size.w() as f64, size.h() as f64);

        worker.stats.samples += 1;
        Ok(InferenceSample {
            image: Tensor::of_slice(&[-1f32]),
            joint_img: joints_to_tensor(&joint_img),
            joint_cam: cam_to_meters(&record.joint_cam),
            joint_vis: vis_mask(&record.joint_vis),
        })
    }
}
