//! The adapter cropping patches for full 3D pose regression.

use super::{load_image, vector_to_tensor, JointDb, SampleDataset, Worker};
use crate::{
    common::*,
    processor::{
        cam_to_meters, depth_flag, flip_joints, joints_to_tensor, normalize_screen_coordinates,
        vis_mask, AugmentationParams, Preprocessor,
    },
    profiling::StageTimer,
};

/// The kind of tuples produced by [FullPipelineDataset].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FullOutput {
    Training,
    Visualization,
    Only2d,
    DetectionCache,
}

/// Full pipeline dataset initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FullPipelineInit {
    pub is_train: bool,
    /// Enables synthetic occlusion on training samples.
    pub occlusion: bool,
    /// Crops training samples with identity parameters instead of random
    /// augmentation.
    pub identity_augmentation: bool,
    pub output: FullOutput,
}

impl Default for FullPipelineInit {
    fn default() -> Self {
        Self {
            is_train: false,
            occlusion: false,
            identity_augmentation: true,
            output: FullOutput::Training,
        }
    }
}

impl FullPipelineInit {
    pub fn build(
        self,
        db: Arc<dyn JointDb>,
        preprocessor: Arc<Preprocessor>,
    ) -> Result<FullPipelineDataset> {
        let Self {
            is_train,
            occlusion,
            identity_augmentation,
            output,
        } = self;

        let joint_num = db.meta().joint_num();
        for &[lhs, rhs] in db.meta().flip_pairs() {
            ensure!(
                lhs < joint_num && rhs < joint_num,
                "flip pair ({}, {}) is out of range",
                lhs,
                rhs
            );
        }

        Ok(FullPipelineDataset {
            db,
            preprocessor,
            is_train,
            occlusion,
            identity_augmentation,
            output,
        })
    }
}

/// The dataset producing normalized patches and aligned joint labels.
#[derive(Debug)]
pub struct FullPipelineDataset {
    db: Arc<dyn JointDb>,
    preprocessor: Arc<Preprocessor>,
    is_train: bool,
    occlusion: bool,
    identity_augmentation: bool,
    output: FullOutput,
}

/// The training tuple. The depth flag trails the image, 2D, 3D and
/// visibility fields.
#[derive(Debug, TensorLike)]
pub struct PatchSample {
    /// Normalized `[3, height, width]` patch.
    pub image: Tensor,
    /// `[N, 2]` joints on the label grid.
    pub joint_img: Tensor,
    /// `[N, 3]` camera space joints in meters.
    pub joint_cam: Tensor,
    /// `[N, 1]` visibility mask.
    pub joint_vis: Tensor,
    /// `[1]` depth ground truth flag.
    pub joints_have_depth: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct PatchVisSample {
    #[tensor_like(clone)]
    pub image_path: PathBuf,
    pub image: Tensor,
    pub bbox: Tensor,
    /// `[N, 2]` source joints in normalized screen coordinates.
    pub joint_img: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct Only2dSample {
    pub image: Tensor,
    /// The normalized patch without the color scale.
    pub raw_image: Tensor,
    pub bbox: Tensor,
    /// `[N, 2]` source joints in pixels.
    pub joint_img: Tensor,
    pub f: Tensor,
    pub c: Tensor,
    pub joint_cam: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct DetectionCacheSample {
    pub image: Tensor,
    pub joint_img: Tensor,
    pub joint_cam: Tensor,
    pub joint_vis: Tensor,
    pub bbox: Tensor,
    #[tensor_like(copy)]
    pub width: usize,
    #[tensor_like(copy)]
    pub height: usize,
}

/// A sample of [FullPipelineDataset], one variant per [FullOutput].
#[derive(Debug)]
pub enum FullSample {
    Training(PatchSample),
    Visualization(PatchVisSample),
    Only2d(Only2dSample),
    DetectionCache(DetectionCacheSample),
}

impl FullPipelineDataset {
    pub fn output(&self) -> FullOutput {
        self.output
    }

    fn params<R>(&self, rng: &mut R) -> AugmentationParams
    where
        R: Rng,
    {
        if !self.is_train {
            return AugmentationParams::identity();
        }

        if self.identity_augmentation {
            AugmentationParams {
                do_occlusion: self.occlusion,
                ..AugmentationParams::identity()
            }
        } else {
            let params = self.preprocessor.augmentation().sample(rng);
            AugmentationParams {
                do_occlusion: params.do_occlusion && self.occlusion,
                ..params
            }
        }
    }
}

impl SampleDataset for FullPipelineDataset {
    type Sample = FullSample;

    fn num_samples(&self) -> usize {
        self.db.num_records()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let mut timer = StageTimer::new("full_pipeline");

        let meta = self.db.meta();
        let record = self.db.record(index)?;
        let bbox = record.bbox()?;
        let image = load_image(&record.image_path)?;
        let (_, height, width) = image.size3()?;
        timer.stage("load image");

        // crop
        let params = self.params(&mut worker.rng);
        let patch = self
            .preprocessor
            .crop(&mut worker.rng, &image, &bbox, &params)
            .with_context(|| format!("failed to crop '{}'", record.image_path.display()))?;
        worker.stats.record_occlusion(&patch.occlusion);
        timer.stage("crop");

        // labels
        let (joint_img, joint_vis) = worker.buffer.load(record);
        if params.do_flip {
            flip_joints(joint_img, joint_vis, meta.flip_pairs(), width as f64)?;
        }
        let normalizer = self.preprocessor.normalizer();
        normalizer.to_patch_space(joint_img, joint_vis, &patch.transform)?;
        let joint_img = normalizer.grid_scale().apply(joint_img);
        let joint_vis = vis_mask(joint_vis);
        let joint_cam = cam_to_meters(&record.joint_cam);
        let image = self.preprocessor.pixel().normalize(&patch.image);
        let bbox_tensor = vector_to_tensor(&record.bbox);
        timer.stage("normalize");

        let sample = match self.output {
            FullOutput::Training => FullSample::Training(PatchSample {
                image,
                joint_img,
                joint_cam,
                joint_vis,
                joints_have_depth: depth_flag(meta.joints_have_depth()),
            }),
            FullOutput::Visualization => {
                let joints = normalize_screen_coordinates(
                    &record.joint_img_2d(),
                    width as f64,
                    height as f64,
                );
                FullSample::Visualization(PatchVisSample {
                    image_path: record.image_path.clone(),
                    image,
                    bbox: bbox_tensor,
                    joint_img: joints_to_tensor(&joints),
                })
            }
            FullOutput::Only2d => FullSample::Only2d(Only2dSample {
                image,
                raw_image: self.preprocessor.pixel().normalize(&patch.raw_image),
                bbox: bbox_tensor,
                joint_img: joints_to_tensor(&record.joint_img_2d()),
                f: vector_to_tensor(&record.f),
                c: vector_to_tensor(&record.c),
                joint_cam,
            }),
            FullOutput::DetectionCache => FullSample::DetectionCache(DetectionCacheSample {
                image,
                joint_img,
                joint_cam,
                joint_vis,
                bbox: bbox_tensor,
                width: width as usize,
                height: height as usize,
            }),
        };

        worker.stats.samples += 1;
        timer.stage("pack");
        timer.finish();

        Ok(sample)
    }
}
