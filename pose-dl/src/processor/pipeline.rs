//! The shared sample preprocessing stages.

use super::{
    AugmentationParams, AugmentationPolicy, AugmentationPolicyInit, OcclusionInjector, Patch,
    PatchGenerator, PixelNormalizer, SampleNormalizer,
};
use crate::common::*;

/// Sample preprocessing options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessorInit {
    /// The patch `[height, width]` in pixels.
    pub input_shape: [usize; 2],
    /// The label grid `[height, width]`.
    pub output_shape: [usize; 2],
    /// The physical extent of a person in millimeters. Only the first
    /// component rescales the depth.
    pub bbox_3d_shape: [usize; 3],
    pub pixel_mean: [R64; 3],
    pub pixel_std: [R64; 3],
    /// The maximum number of occlusion candidates tried per sample.
    pub max_occlusion_attempts: usize,
    pub augmentation: AugmentationPolicyInit,
}

impl Default for PreprocessorInit {
    fn default() -> Self {
        Self {
            input_shape: [256, 256],
            output_shape: [64, 64],
            bbox_3d_shape: [2000, 2000, 2000],
            pixel_mean: [r64(0.485), r64(0.456), r64(0.406)],
            pixel_std: [r64(0.229), r64(0.224), r64(0.225)],
            max_occlusion_attempts: 100,
            augmentation: Default::default(),
        }
    }
}

impl PreprocessorInit {
    pub fn build(self) -> Result<Preprocessor> {
        let Self {
            input_shape,
            output_shape,
            bbox_3d_shape,
            pixel_mean,
            pixel_std,
            max_occlusion_attempts,
            augmentation,
        } = self;

        let normalizer = SampleNormalizer::new(input_shape, output_shape, bbox_3d_shape)?;
        let patch = PatchGenerator::new(normalizer.input_size());
        let occluder = OcclusionInjector::new(max_occlusion_attempts)?;
        let pixel = PixelNormalizer::new(pixel_mean.map(R64::raw), pixel_std.map(R64::raw))?;
        let augmentation = augmentation.build()?;

        Ok(Preprocessor {
            patch,
            normalizer,
            occluder,
            pixel,
            augmentation,
        })
    }
}

/// The preprocessing stages shared by the dataset adapters.
#[derive(Debug, Clone, Getters)]
pub struct Preprocessor {
    #[getset(get = "pub")]
    patch: PatchGenerator,
    #[getset(get = "pub")]
    normalizer: SampleNormalizer,
    #[getset(get = "pub")]
    occluder: OcclusionInjector,
    #[getset(get = "pub")]
    pixel: PixelNormalizer,
    #[getset(get = "pub")]
    augmentation: AugmentationPolicy,
}

impl Preprocessor {
    /// Draws random parameters in training mode, otherwise returns the
    /// identity parameters.
    pub fn sample_params<R>(&self, rng: &mut R, is_train: bool) -> AugmentationParams
    where
        R: Rng,
    {
        if is_train {
            self.augmentation.sample(rng)
        } else {
            AugmentationParams::identity()
        }
    }

    /// Crops the box from the image with the given augmentation.
    pub fn crop<R>(
        &self,
        rng: &mut R,
        image: &Tensor,
        bbox: &XYWH<f64>,
        params: &AugmentationParams,
    ) -> Result<Patch>
    where
        R: Rng,
    {
        self.patch.generate(image, bbox, params, &self.occluder, rng)
    }
}
