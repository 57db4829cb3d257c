use std::path::Path;

use image::{GrayImage, Luma};
use rand::Rng;

use crate::error::{Result, WganError};
use crate::gan::generator::Generator;
use crate::math::matrix::Matrix;

/// Renders `per_class` generated images for every class into one PNG, one
/// row per class. Expects an `(height, width, channels)` target and draws
/// the first channel.
pub fn save_class_grid<R: Rng>(generator: &Generator, per_class: usize, path: &Path, rng: &mut R) -> Result<()> {
    let (height, width, channels) = match *generator.target_shape.as_slice() {
        [h, w, c] => (h, w, c),
        _ => {
            return Err(WganError::Shape(format!(
                "preview needs an image target, got shape {:?}",
                generator.target_shape
            )))
        }
    };
    let classes = generator.condition_dims;
    let mut grid = GrayImage::new((width * per_class) as u32, (height * classes) as u32);

    for class in 0..classes {
        let mut labels = Matrix::zeros(per_class, classes);
        for row in labels.data.iter_mut() {
            row[class] = 1.0;
        }
        let images = generator.generate(&labels, &generator.sample_noise(per_class, rng));
        for (column, image) in images.data.iter().enumerate() {
            for (pixel, value) in image.iter().step_by(channels).enumerate() {
                let x = column * width + pixel % width;
                let y = class * height + pixel / width;
                let shade = ((value.clamp(-1.0, 1.0) + 1.0) * 127.5).round() as u8;
                grid.put_pixel(x as u32, y as u32, Luma([shade]));
            }
        }
    }

    grid.save(path).map_err(|e| WganError::Persistence { path: path.to_path_buf(), detail: e.to_string() })
}
