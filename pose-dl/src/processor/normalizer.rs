//! Conversions from source joint annotations to label tensors.

use crate::common::*;

/// Maps joints into patch space and re-masks their visibility.
#[derive(Debug, Clone, CopyGetters)]
pub struct SampleNormalizer {
    #[getset(get_copy = "pub")]
    input_size: HW<usize>,
    #[getset(get_copy = "pub")]
    output_size: HW<usize>,
    /// Half of the assumed depth extent in millimeters.
    #[getset(get_copy = "pub")]
    depth_half_extent: f64,
}

impl SampleNormalizer {
    /// Creates a normalizer from `[height, width]` patch and label shapes
    /// and the physical box extent in millimeters.
    pub fn new(
        input_shape: [usize; 2],
        output_shape: [usize; 2],
        bbox_3d_shape: [usize; 3],
    ) -> Result<Self> {
        let input_size = HW::try_from_hw(input_shape).context("invalid input_shape")?;
        let output_size = HW::try_from_hw(output_shape).context("invalid output_shape")?;
        ensure!(bbox_3d_shape[0] > 0, "bbox_3d_shape[0] must be positive");

        Ok(Self {
            input_size,
            output_size,
            depth_half_extent: bbox_3d_shape[0] as f64 / 2.0,
        })
    }

    /// Maps a millimeter depth relative to the root into `[0, 1]`.
    pub fn normalize_depth(&self, depth: f64) -> f64 {
        (depth / self.depth_half_extent + 1.0) / 2.0
    }

    /// Tests a patch space joint against the patch and the depth range.
    pub fn is_in_bounds(&self, [x, y, depth]: [f64; 3]) -> bool {
        let width = self.input_size.w() as f64;
        let height = self.input_size.h() as f64;
        (0.0..width).contains(&x) && (0.0..height).contains(&y) && (0.0..1.0).contains(&depth)
    }

    /// Transforms image plane joints into patch pixels in place.
    ///
    /// Depths are normalized into `[0, 1]`, and joints falling out of the
    /// patch or the depth range become invisible.
    pub fn to_patch_space(
        &self,
        joint_img: &mut [[f64; 3]],
        joint_vis: &mut [f64],
        transform: &Affine,
    ) -> Result<()> {
        ensure!(
            joint_img.len() == joint_vis.len(),
            "joint_img and joint_vis have different lengths ({} != {})",
            joint_img.len(),
            joint_vis.len()
        );

        joint_img
            .iter_mut()
            .zip(joint_vis.iter_mut())
            .for_each(|(joint, vis)| {
                let [x, y] = transform.apply([joint[0], joint[1]]);
                let depth = self.normalize_depth(joint[2]);
                *joint = [x, y, depth];

                if !self.is_in_bounds(*joint) {
                    *vis = 0.0;
                }
            });

        Ok(())
    }

    /// The label scale from patch pixels to the label grid.
    pub fn grid_scale(&self) -> LabelScale {
        LabelScale::Grid {
            x: self.output_size.w() as f64 / self.input_size.w() as f64,
            y: self.output_size.h() as f64 / self.input_size.h() as f64,
        }
    }
}

/// The final scaling of patch space joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LabelScale {
    /// Scales x and y per axis and drops the depth.
    Grid { x: f64, y: f64 },
    /// Divides x and y by a constant and multiplies the depth.
    Fixed {
        xy_divisor: f64,
        depth_multiplier: f64,
    },
}

impl LabelScale {
    /// The scale of a label grid at 1/4 of the patch resolution with 64
    /// depth bins.
    pub fn heatmap() -> Self {
        Self::Fixed {
            xy_divisor: 4.0,
            depth_multiplier: 64.0,
        }
    }

    /// Scales the joints into a `[N, 2]` tensor for grids or a `[N, 3]`
    /// tensor for fixed scales.
    pub fn apply(&self, joint_img: &[[f64; 3]]) -> Tensor {
        match *self {
            Self::Grid { x: sx, y: sy } => {
                let joints: Vec<_> = joint_img.iter().map(|&[x, y, _]| [x * sx, y * sy]).collect();
                joints_to_tensor(&joints)
            }
            Self::Fixed {
                xy_divisor,
                depth_multiplier,
            } => {
                let joints: Vec<_> = joint_img
                    .iter()
                    .map(|&[x, y, depth]| {
                        [x / xy_divisor, y / xy_divisor, depth * depth_multiplier]
                    })
                    .collect();
                joints_to_tensor(&joints)
            }
        }
    }
}

/// Packs joints into a float tensor of shape `[N, D]`.
pub fn joints_to_tensor<const D: usize>(joints: &[[f64; D]]) -> Tensor {
    let values: Vec<f32> = joints.iter().flatten().map(|&value| value as f32).collect();
    Tensor::of_slice(&values).view([joints.len() as i64, D as i64])
}

/// Converts camera space joints from millimeters to a `[N, 3]` tensor in meters.
pub fn cam_to_meters(joint_cam: &[[f64; 3]]) -> Tensor {
    let joints: Vec<_> = joint_cam
        .iter()
        .map(|joint| joint.map(|value| value / 1000.0))
        .collect();
    joints_to_tensor(&joints)
}

/// Casts visibilities to a strict 0/1 mask of shape `[N, 1]`.
pub fn vis_mask(joint_vis: &[f64]) -> Tensor {
    let mask: Vec<f32> = joint_vis
        .iter()
        .map(|&vis| if vis > 0.0 { 1.0 } else { 0.0 })
        .collect();
    Tensor::of_slice(&mask).view([joint_vis.len() as i64, 1])
}

/// The flag telling whether the dataset has depth ground truth, of shape `[1]`.
pub fn depth_flag(joints_have_depth: bool) -> Tensor {
    Tensor::of_slice(&[if joints_have_depth { 1f32 } else { 0f32 }])
}

/// Normalizes pixel coordinates so that `[0, w]` maps to `[-1, 1]`.
///
/// Both axes are divided by the width to keep the aspect ratio, so `y` lies
/// in `[-h/w, h/w]`.
pub fn normalize_screen_coordinates(
    joints: &[[f64; 2]],
    width: f64,
    height: f64,
) -> Vec<[f64; 2]> {
    joints
        .iter()
        .map(|&[x, y]| [x / width * 2.0 - 1.0, y / width * 2.0 - height / width])
        .collect()
}
