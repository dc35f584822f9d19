use super::{load_image, vector_to_tensor, JointDb, SampleDataset, Worker};
use crate::{common::*, processor::joints_to_tensor};

/// The dataset returning decoded images untouched, used to cache detector
/// outputs before any crop.
#[derive(Debug)]
pub struct RawCaptureDataset {
    db: Arc<dyn JointDb>,
}

#[derive(Debug, TensorLike)]
pub struct RawCaptureSample {
    /// RGB `[3, height, width]` uint8 image.
    pub image: Tensor,
    /// `[N, 2]` joints in source pixels.
    pub joint_img: Tensor,
    pub bbox: Tensor,
    #[tensor_like(copy)]
    pub width: usize,
    #[tensor_like(copy)]
    pub height: usize,
}

impl RawCaptureDataset {
    pub fn new(db: Arc<dyn JointDb>) -> Self {
        Self { db }
    }
}

impl SampleDataset for RawCaptureDataset {
    type Sample = RawCaptureSample;

    fn num_samples(&self) -> usize {
        self.db.num_records()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let record = self.db.record(index)?;
        let image = load_image(&record.image_path)?;
        let (_, height, width) = image.size3()?;

        worker.stats.samples += 1;
        Ok(RawCaptureSample {
            image,
            joint_img: joints_to_tensor(&record.joint_img_2d()),
            bbox: vector_to_tensor(&record.bbox),
            width: width as usize,
            height: height as usize,
        })
    }
}
