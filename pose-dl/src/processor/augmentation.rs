//! The random augmentation parameters drawn per training sample.

use crate::common::*;

/// Augmentation policy initializer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AugmentationPolicyInit {
    /// Scale jitter is `1 + clip(N(0, 1), -1, 1) * scale_factor`.
    pub scale_factor: R64,
    /// Rotation in degrees is `clip(N(0, 1), -2, 2) * rotation_factor`.
    pub rotation_factor: R64,
    /// The probability to rotate at all.
    pub rotation_prob: R64,
    /// The probability of horizontal flip.
    pub flip_prob: R64,
    /// Channels are scaled by a factor in `[1 - color_factor, 1 + color_factor]`.
    pub color_factor: R64,
    /// The probability to inject a synthetic occlusion.
    pub occlusion_prob: R64,
}

impl AugmentationPolicyInit {
    pub fn build(self) -> Result<AugmentationPolicy> {
        let Self {
            scale_factor,
            rotation_factor,
            rotation_prob,
            flip_prob,
            color_factor,
            occlusion_prob,
        } = self;

        ensure!(
            (0.0..1.0).contains(&scale_factor.raw()),
            "scale_factor must be in range 0.0..1.0"
        );
        ensure!(rotation_factor >= 0.0, "rotation_factor must be non-negative");
        ensure!(
            (0.0..1.0).contains(&color_factor.raw()),
            "color_factor must be in range 0.0..1.0"
        );
        for (name, prob) in [
            ("rotation_prob", rotation_prob),
            ("flip_prob", flip_prob),
            ("occlusion_prob", occlusion_prob),
        ] {
            ensure!(
                (0.0..=1.0).contains(&prob.raw()),
                "{} must be in range 0.0..=1.0",
                name
            );
        }

        Ok(AugmentationPolicy {
            scale_factor: scale_factor.raw(),
            rotation_factor: rotation_factor.raw(),
            rotation_prob: rotation_prob.raw(),
            flip_prob: flip_prob.raw(),
            color_factor: color_factor.raw(),
            occlusion_prob: occlusion_prob.raw(),
        })
    }
}

impl Default for AugmentationPolicyInit {
    fn default() -> Self {
        Self {
            scale_factor: r64(0.25),
            rotation_factor: r64(30.0),
            rotation_prob: r64(0.6),
            flip_prob: r64(0.5),
            color_factor: r64(0.2),
            occlusion_prob: r64(0.5),
        }
    }
}

/// The random augmentation policy.
#[derive(Debug, Clone)]
pub struct AugmentationPolicy {
    scale_factor: f64,
    rotation_factor: f64,
    rotation_prob: f64,
    flip_prob: f64,
    color_factor: f64,
    occlusion_prob: f64,
}

/// The augmentation parameters of one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct AugmentationParams {
    pub scale: f64,
    /// Rotation in degrees.
    pub rotation: f64,
    pub do_flip: bool,
    pub color_scale: [f64; 3],
    pub do_occlusion: bool,
}

impl AugmentationParams {
    /// The parameters used in evaluation.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            rotation: 0.0,
            do_flip: false,
            color_scale: [1.0; 3],
            do_occlusion: false,
        }
    }
}

impl Default for AugmentationParams {
    fn default() -> Self {
        Self::identity()
    }
}

impl AugmentationPolicy {
    /// Draws the parameters for a training sample.
    ///
    /// The draws happen in a fixed order: scale, rotation, flip, the three
    /// channel scales and occlusion.
    pub fn sample<R>(&self, rng: &mut R) -> AugmentationParams
    where
        R: Rng,
    {
        let Self {
            scale_factor,
            rotation_factor,
            rotation_prob,
            flip_prob,
            color_factor,
            occlusion_prob,
        } = *self;

        let scale = clipped_normal(rng, 1.0) * scale_factor + 1.0;
        let rotation = if rng.gen::<f64>() <= rotation_prob {
            clipped_normal(rng, 2.0) * rotation_factor
        } else {
            0.0
        };
        let do_flip = rng.gen::<f64>() <= flip_prob;
        let color_lo = 1.0 - color_factor;
        let color_hi = 1.0 + color_factor;
        let mut color_scale = [1.0; 3];
        color_scale
            .iter_mut()
            .for_each(|scale| *scale = color_lo + (color_hi - color_lo) * rng.gen::<f64>());
        let do_occlusion = rng.gen::<f64>() <= occlusion_prob;

        AugmentationParams {
            scale,
            rotation,
            do_flip,
            color_scale,
            do_occlusion,
        }
    }
}

fn clipped_normal<R>(rng: &mut R, bound: f64) -> f64
where
    R: Rng,
{
    let value: f64 = rng.sample(StandardNormal);
    value.max(-bound).min(bound)
}

/// Mirrors joints of a horizontally flipped image.
///
/// Every x coordinate becomes `width - x - 1`, then the coordinates and the
/// visibility of each flip pair are swapped.
pub fn flip_joints(
    joint_img: &mut [[f64; 3]],
    joint_vis: &mut [f64],
    flip_pairs: &[[usize; 2]],
    image_width: f64,
) -> Result<()> {
    ensure!(
        joint_img.len() == joint_vis.len(),
        "joint_img and joint_vis have different lengths"
    );

    joint_img.iter_mut().for_each(|joint| {
        joint[0] = image_width - joint[0] - 1.0;
    });

    for &[lhs, rhs] in flip_pairs {
        ensure!(
            lhs < joint_img.len() && rhs < joint_img.len(),
            "flip pair ({}, {}) is out of range",
            lhs,
            rhs
        );
        joint_img.swap(lhs, rhs);
        joint_vis.swap(lhs, rhs);
    }

    Ok(())
}
