//! The adapter producing heatmap-style labels for multi-person pose estimation.

use super::{load_image, vector_to_tensor, JointDb, SampleDataset, Worker};
use crate::{
    common::*,
    joints::transform_joint_to_other_db,
    processor::{depth_flag, flip_joints, joints_to_tensor, vis_mask, LabelScale, Preprocessor},
    profiling::StageTimer,
};

/// MPPE dataset initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MppeInit {
    pub is_train: bool,
    /// Emits visualization tuples in evaluation mode.
    pub vis: bool,
    /// Remaps training labels into this joint order if set.
    pub ref_joints_name: Option<Vec<String>>,
}

impl MppeInit {
    pub fn build(
        self,
        db: Arc<dyn JointDb>,
        preprocessor: Arc<Preprocessor>,
    ) -> Result<MppeDataset> {
        let Self {
            is_train,
            vis,
            ref_joints_name,
        } = self;

        if let Some(names) = &ref_joints_name {
            ensure!(!names.is_empty(), "ref_joints_name must not be empty");
            ensure!(
                names.iter().collect::<HashSet<_>>().len() == names.len(),
                "ref_joints_name has duplicated joint names"
            );
        }

        Ok(MppeDataset {
            db,
            preprocessor,
            is_train,
            vis,
            ref_joints_name,
        })
    }
}

/// The dataset producing patches with `[N, 3]` labels on a 1/4 resolution
/// grid.
#[derive(Debug)]
pub struct MppeDataset {
    db: Arc<dyn JointDb>,
    preprocessor: Arc<Preprocessor>,
    is_train: bool,
    vis: bool,
    ref_joints_name: Option<Vec<String>>,
}

/// The training tuple.
#[derive(Debug, TensorLike)]
pub struct MppeTrainSample {
    pub image: Tensor,
    /// `[N, 3]` joints with x and y on the label grid and depth in bins.
    pub joint_img: Tensor,
    pub joint_vis: Tensor,
    pub joints_have_depth: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct MppeEvalSample {
    pub image: Tensor,
    /// `[N, 3]` camera space joints in millimeters.
    pub joint_cam: Tensor,
    pub bbox: Tensor,
    pub f: Tensor,
    pub c: Tensor,
    pub root_cam: Tensor,
    /// `[N, 3]` source joints as annotated.
    pub joint_img: Tensor,
}

#[derive(Debug, TensorLike)]
pub struct MppeVisSample {
    #[tensor_like(clone)]
    pub image_path: PathBuf,
    pub image: Tensor,
    pub bbox: Tensor,
    pub f: Tensor,
    pub c: Tensor,
    pub root_cam: Tensor,
}

#[derive(Debug)]
pub enum MppeSample {
    Training(MppeTrainSample),
    Evaluation(MppeEvalSample),
    Visualization(MppeVisSample),
}

impl MppeDataset {
    pub fn ref_joints_name(&self) -> Option<&[String]> {
        self.ref_joints_name.as_deref()
    }
}

impl SampleDataset for MppeDataset {
    type Sample = MppeSample;

    fn num_samples(&self) -> usize {
        self.db.num_records()
    }

    fn sample(&self, index: usize, worker: &mut Worker) -> Result<Self::Sample> {
        let mut timer = StageTimer::new("mppe");

        let meta = self.db.meta();
        let record = self.db.record(index)?;
        let bbox = record.bbox()?;
        let image = load_image(&record.image_path)?;
        let (_, _, width) = image.size3()?;
        timer.stage("load image");

        let params = self.preprocessor.sample_params(&mut worker.rng, self.is_train);
        let patch = self
            .preprocessor
            .crop(&mut worker.rng, &image, &bbox, &params)
            .with_context(|| format!("failed to crop '{}'", record.image_path.display()))?;
        worker.stats.record_occlusion(&patch.occlusion);
        let image = self.preprocessor.pixel().normalize(&patch.image);
        timer.stage("crop");

        let sample = if self.is_train {
            let (joint_img, joint_vis) = worker.buffer.load(record);
            if params.do_flip {
                flip_joints(joint_img, joint_vis, meta.flip_pairs(), width as f64)?;
            }
            self.preprocessor
                .normalizer()
                .to_patch_space(joint_img, joint_vis, &patch.transform)?;

            let (joint_img, joint_vis) = match &self.ref_joints_name {
                Some(ref_names) => {
                    let names = meta.joints_name();
                    let ref_names = ref_names.as_slice();
                    let joint_img = transform_joint_to_other_db(joint_img, names, ref_names)?;
                    let joint_vis = transform_joint_to_other_db(joint_vis, names, ref_names)?;
                    (
                        LabelScale::heatmap().apply(&joint_img),
                        vis_mask(&joint_vis),
                    )
                }
                None => (LabelScale::heatmap().apply(joint_img), vis_mask(joint_vis)),
            };

            MppeSample::Training(MppeTrainSample {
                image,
                joint_img,
                joint_vis,
                joints_have_depth: depth_flag(meta.joints_have_depth()),
            })
        } else if self.vis {
            MppeSample::Visualization(MppeVisSample {
                image_path: record.image_path.clone(),
                image,
                bbox: vector_to_tensor(&record.bbox),
                f: vector_to_tensor(&record.f),
                c: vector_to_tensor(&record.c),
                root_cam: vector_to_tensor(&record.root_cam),
            })
        } else {
            MppeSample::Evaluation(MppeEvalSample {
                image,
                joint_cam: joints_to_tensor(&record.joint_cam),
                bbox: vector_to_tensor(&record.bbox),
                f: vector_to_tensor(&record.f),
                c: vector_to_tensor(&record.c),
                root_cam: vector_to_tensor(&record.root_cam),
                joint_img: joints_to_tensor(&record.joint_img),
            })
        };

        worker.stats.samples += 1;
        timer.stage("pack");
        timer.finish();

        Ok(sample)
    }
}
