use crate::common::*;

/// Per-channel normalization of RGB patches.
#[derive(Debug, Clone)]
pub struct PixelNormalizer {
    mean: [f64; 3],
    std: [f64; 3],
}

impl PixelNormalizer {
    pub fn new(mean: [f64; 3], std: [f64; 3]) -> Result<Self> {
        ensure!(
            std.iter().all(|&value| value > 0.0),
            "pixel_std must be positive, but get {:?}",
            std
        );
        Ok(Self { mean, std })
    }

    /// Maps a `[3, height, width]` patch in `[0, 255]` to `(value / 255 - mean) / std`.
    pub fn normalize(&self, image: &Tensor) -> Tensor {
        let [mr, mg, mb] = self.mean;
        let [sr, sg, sb] = self.std;
        let mean = Tensor::of_slice(&[mr as f32, mg as f32, mb as f32]).view([3, 1, 1]);
        let std = Tensor::of_slice(&[sr as f32, sg as f32, sb as f32]).view([3, 1, 1]);
        let image = image.to_kind(Kind::Float) / 255.0;
        (&image - &mean) / &std
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normalize_channels() {
        let normalizer = PixelNormalizer::new([0.5, 0.0, 1.0], [0.5, 1.0, 0.25]).unwrap();
        let image = Tensor::full(&[3, 2, 2], 255.0, (Kind::Float, Device::Cpu));
        let output = normalizer.normalize(&image);

        assert_abs_diff_eq!(output.double_value(&[0, 0, 0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output.double_value(&[1, 1, 0]), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(output.double_value(&[2, 0, 1]), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn reject_zero_std() {
        assert!(PixelNormalizer::new([0.0; 3], [1.0, 0.0, 1.0]).is_err());
    }
}
