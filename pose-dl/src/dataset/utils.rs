use super::JointRecord;
use crate::common::*;

/// Decodes an image file into an RGB `[3, height, width]` uint8 tensor.
pub fn load_image(path: impl AsRef<Path>) -> Result<Tensor> {
    let path = path.as_ref();
    let image = vision::image::load(path)
        .with_context(|| format!("failed to load image file '{}'", path.display()))?;
    let (channels, _height, _width) = image.size3()?;
    ensure!(
        channels == 3,
        "expect 3 channels, but get {} in image file '{}'",
        channels,
        path.display()
    );
    Ok(image)
}

/// The image size recorded in the annotation, or read from the image
/// header if absent.
pub fn record_image_size(record: &JointRecord) -> Result<HW<usize>> {
    let [height, width] = match (record.img_height, record.img_width) {
        (Some(height), Some(width)) => [height, width],
        _ => {
            let path = &record.image_path;
            let imagesize::ImageSize { height, width } = imagesize::size(path).map_err(|err| {
                format_err!(
                    "failed to read the size of image file '{}': {:?}",
                    path.display(),
                    err
                )
            })?;
            [height, width]
        }
    };
    HW::try_from_hw([height, width])
        .with_context(|| format!("invalid size of image '{}'", record.image_path.display()))
}

/// Packs values into a float tensor of shape `[len]`.
pub fn vector_to_tensor(values: &[f64]) -> Tensor {
    let values: Vec<f32> = values.iter().map(|&value| value as f32).collect();
    Tensor::of_slice(&values)
}
