//! The synthetic occlusion algorithm.

use crate::common::*;

const AREA_RANGE: (f64, f64) = (0.0, 0.7);
const RATIO_RANGE: (f64, f64) = (0.3, 1.0 / 0.3);

/// An occluded pixel region in source image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OcclusionRect {
    pub x: usize,
    pub y: usize,
    pub w: usize,
    pub h: usize,
}

/// The result of an occlusion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occlusion {
    NotRequested,
    Applied(OcclusionRect),
    /// No candidate fitted in the image within the attempt limit.
    Skipped,
}

/// Overwrites a random region of a box with uniform noise.
#[derive(Debug, Clone, CopyGetters)]
pub struct OcclusionInjector {
    #[getset(get_copy = "pub")]
    max_attempts: usize,
}

impl OcclusionInjector {
    pub fn new(max_attempts: usize) -> Result<Self> {
        ensure!(max_attempts > 0, "max_attempts must be positive");
        Ok(Self { max_attempts })
    }

    /// Samples a region within the box that lies entirely in the image.
    ///
    /// The area is drawn from `[0, 0.7]` of the box area and the aspect
    /// ratio from `[0.3, 1/0.3]`. It returns `None` if no candidate fits
    /// within the attempt limit, e.g. when the box exceeds the image.
    pub fn propose<R>(
        &self,
        rng: &mut R,
        bbox: &XYWH<f64>,
        image_size: &HW<usize>,
    ) -> Option<OcclusionRect>
    where
        R: Rng,
    {
        let image_w = image_size.w() as f64;
        let image_h = image_size.h() as f64;

        (0..self.max_attempts).find_map(|_| {
            let (area_lo, area_hi) = AREA_RANGE;
            let area = (rng.gen::<f64>() * (area_hi - area_lo) + area_lo) * bbox.area();

            let (ratio_lo, ratio_hi) = RATIO_RANGE;
            let ratio = rng.gen::<f64>() * (ratio_hi - ratio_lo) + ratio_lo;

            let h = (area * ratio).sqrt();
            let w = (area / ratio).sqrt();
            let xmin = rng.gen::<f64>() * (bbox.w() - w - 1.0) + bbox.x();
            let ymin = rng.gen::<f64>() * (bbox.h() - h - 1.0) + bbox.y();

            let fits = xmin >= 0.0 && ymin >= 0.0 && xmin + w < image_w && ymin + h < image_h;
            fits.then(|| OcclusionRect {
                x: xmin as usize,
                y: ymin as usize,
                w: w as usize,
                h: h as usize,
            })
        })
    }

    /// Fills a proposed region of the `[channels, height, width]` float
    /// image with noise in `[0, 255)`.
    pub fn apply<R>(
        &self,
        rng: &mut R,
        image: &mut Tensor,
        bbox: &XYWH<f64>,
    ) -> Result<Occlusion>
    where
        R: Rng,
    {
        let (channels, height, width) = image.size3()?;
        let image_size = HW::try_from_hw([height as usize, width as usize])?;

        let rect = match self.propose(rng, bbox, &image_size) {
            Some(rect) => rect,
            None => {
                warn!(
                    "no occlusion fits box {:?} in a {}x{} image after {} attempts, skip occlusion",
                    bbox.xywh(),
                    width,
                    height,
                    self.max_attempts
                );
                return Ok(Occlusion::Skipped);
            }
        };

        let OcclusionRect { x, y, w, h } = rect;
        if w > 0 && h > 0 {
            let noise: Vec<f32> = (0..(channels as usize * h * w))
                .map(|_| rng.gen::<f32>() * 255.0)
                .collect();
            let noise = Tensor::of_slice(&noise)
                .view([channels, h as i64, w as i64])
                .to_kind(image.kind());
            let (x, y, w, h) = (x as i64, y as i64, w as i64, h as i64);
            let mut region = image.i((.., y..(y + h), x..(x + w)));
            region.copy_(&noise);
        }

        Ok(Occlusion::Applied(rect))
    }
}
