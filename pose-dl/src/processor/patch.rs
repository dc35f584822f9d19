//! Crops oriented and scaled patches from source images.

use super::{AugmentationParams, Occlusion, OcclusionInjector};
use crate::common::*;

/// The cropped patch and the transform from source image to patch pixels.
#[derive(Debug)]
pub struct Patch {
    /// RGB float patch in `[0, 255]` after the color scale.
    pub image: Tensor,
    /// The same patch before the color scale.
    pub raw_image: Tensor,
    pub transform: Affine,
    pub occlusion: Occlusion,
}

/// Patch cropping processor.
#[derive(Debug, Clone)]
pub struct PatchGenerator {
    patch_size: HW<usize>,
}

impl PatchGenerator {
    pub fn new(patch_size: HW<usize>) -> Self {
        Self { patch_size }
    }

    pub fn patch_size(&self) -> &HW<usize> {
        &self.patch_size
    }

    /// Builds the transform from the source box to the patch.
    pub fn transform(
        &self,
        center: [f64; 2],
        bbox: &XYWH<f64>,
        scale: f64,
        rotation: f64,
    ) -> Result<Affine> {
        Affine::from_patch(
            &PatchSpec {
                center,
                src_size: bbox.size(),
                dst_size: self.patch_size.to_f64(),
                scale,
                rotation,
            },
            false,
        )
    }

    /// Crops the box from a `[3, height, width]` image.
    ///
    /// The occlusion is injected in source coordinates before the flip and
    /// the warp. On flip, the box center is mirrored by `width - cx - 1`.
    pub fn generate<R>(
        &self,
        image: &Tensor,
        bbox: &XYWH<f64>,
        params: &AugmentationParams,
        occluder: &OcclusionInjector,
        rng: &mut R,
    ) -> Result<Patch>
    where
        R: Rng,
    {
        tch::no_grad(|| -> Result<_> {
            let (channels, _height, width) = image.size3()?;
            ensure!(
                channels == 3,
                "expect 3 image channels, but get {}",
                channels
            );

            let mut image = image.to_kind(Kind::Float);

            let occlusion = if params.do_occlusion {
                occluder.apply(rng, &mut image, bbox)?
            } else {
                Occlusion::NotRequested
            };

            let (image, center_x) = if params.do_flip {
                (image.flip(&[2]), width as f64 - bbox.cx() - 1.0)
            } else {
                (image, bbox.cx())
            };

            let transform =
                self.transform([center_x, bbox.cy()], bbox, params.scale, params.rotation)?;
            let raw_image = warp_affine(&image, &transform, &self.patch_size)?;
            let image = scale_color(&raw_image, params.color_scale);

            Ok(Patch {
                image,
                raw_image,
                transform,
                occlusion,
            })
        })
    }
}

/// Resamples a `[channels, height, width]` image through the transform
/// with bilinear interpolation. Pixels mapped from outside the source are
/// zero.
pub fn warp_affine(image: &Tensor, transform: &Affine, output_size: &HW<usize>) -> Result<Tensor> {
    let (channels, in_h, in_w) = image.size3()?;
    let out_h = output_size.h() as i64;
    let out_w = output_size.w() as i64;

    // The sampling grid maps normalized output coordinates to normalized
    // input coordinates, where -1 and 1 are the outer pixel edges.
    let theta = {
        let inverse = transform.inverse()?;
        let denormalize_output = Affine::from_rows([
            [out_w as f64 / 2.0, 0.0, (out_w as f64 - 1.0) / 2.0],
            [0.0, out_h as f64 / 2.0, (out_h as f64 - 1.0) / 2.0],
        ]);
        let normalize_input = Affine::from_rows([
            [2.0 / in_w as f64, 0.0, 1.0 / in_w as f64 - 1.0],
            [0.0, 2.0 / in_h as f64, 1.0 / in_h as f64 - 1.0],
        ]);
        let theta = &(&normalize_input * &inverse) * &denormalize_output;
        let [[a, b, c], [d, e, f]] = theta.rows();
        Tensor::of_slice(&[a, b, c, d, e, f])
            .view([1, 2, 3])
            .to_kind(Kind::Float)
    };

    // bilinear interpolation with zero padding
    let grid = Tensor::affine_grid_generator(&theta, &[1, channels, out_h, out_w], false);
    let patch = image
        .to_kind(Kind::Float)
        .view([1, channels, in_h, in_w])
        .grid_sampler(&grid, 0, 0, false)
        .view([channels, out_h, out_w]);

    Ok(patch)
}

/// Multiplies each channel by its factor and clamps into `[0, 255]`.
pub fn scale_color(image: &Tensor, color_scale: [f64; 3]) -> Tensor {
    let [r, g, b] = color_scale;
    let factors = Tensor::of_slice(&[r as f32, g as f32, b as f32]).view([3, 1, 1]);
    (image * &factors).clamp(0.0, 255.0)
}
