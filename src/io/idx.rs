//! MNIST-style IDX files.
//!
//! ```text
//! images (IDX3): 00 00 08 03 | N | rows | cols | N·rows·cols bytes
//! labels (IDX1): 00 00 08 01 | N | N bytes, each a class index
//! ```
//! Counts are big-endian `u32`.

use std::path::Path;

use crate::error::{Result, WganError};
use crate::io::data::{DataProvider, Dataset};

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte";

fn header_u32(bytes: &[u8], offset: usize) -> usize {
    u32::from_be_bytes([bytes[offset], bytes[offset + 1], bytes[offset + 2], bytes[offset + 3]]) as usize
}

fn check_magic(bytes: &[u8], dims: u8, what: &str) -> Result<()> {
    let header_len = 4 + 4 * dims as usize;
    if bytes.len() < header_len {
        return Err(WganError::Data(format!(
            "IDX {what} file too short: expected at least {header_len} header bytes, got {}",
            bytes.len()
        )));
    }
    if bytes[..3] != [0x00, 0x00, 0x08] {
        return Err(WganError::Data(format!(
            "IDX {what} file: expected magic 00 00 08, got {:02X} {:02X} {:02X}",
            bytes[0], bytes[1], bytes[2]
        )));
    }
    if bytes[3] != dims {
        return Err(WganError::Data(format!(
            "IDX {what} file: expected {dims} dimensions, got {}",
            bytes[3]
        )));
    }
    Ok(())
}

/// Parses an image/label pair into `(one-hot labels, pixels)`.
///
/// Pixels are scaled from `0..=255` to `[-1, 1]`, matching a `tanh`
/// generator output.
pub fn parse_idx_pair(image_bytes: &[u8], label_bytes: &[u8], n_classes: usize) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>)> {
    check_magic(image_bytes, 3, "image")?;
    check_magic(label_bytes, 1, "label")?;

    let n_items = header_u32(image_bytes, 4);
    let n_pixels = header_u32(image_bytes, 8)
        .checked_mul(header_u32(image_bytes, 12))
        .ok_or_else(|| WganError::Data("IDX image file: rows * cols overflows".into()))?;
    let image_len = n_items.checked_mul(n_pixels)
        .and_then(|n| n.checked_add(16))
        .ok_or_else(|| WganError::Data("IDX image file: data length overflows".into()))?;
    if image_bytes.len() < image_len {
        return Err(WganError::Data(format!(
            "IDX image file too short: header declares {n_items} images of {n_pixels} pixels, file has {} bytes",
            image_bytes.len()
        )));
    }

    let label_count = header_u32(label_bytes, 4);
    if label_count != n_items {
        return Err(WganError::Data(format!(
            "IDX file mismatch: {n_items} images but {label_count} labels"
        )));
    }
    if label_bytes.len() < 8 + n_items {
        return Err(WganError::Data(format!(
            "IDX label file too short: header declares {n_items} labels, file has {} bytes",
            label_bytes.len()
        )));
    }

    let images = image_bytes[16..image_len]
        .chunks_exact(n_pixels.max(1))
        .map(|chunk| chunk.iter().map(|&px| px as f64 / 127.5 - 1.0).collect())
        .collect();

    let labels = label_bytes[8..8 + n_items].iter().enumerate()
        .map(|(i, &class)| {
            let class = class as usize;
            if class >= n_classes {
                return Err(WganError::Data(format!(
                    "IDX label {i}: class {class} out of range for {n_classes} classes"
                )));
            }
            let mut one_hot = vec![0.0; n_classes];
            one_hot[class] = 1.0;
            Ok(one_hot)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((labels, images))
}

/// Reads `train-images-idx3-ubyte` and `train-labels-idx1-ubyte` from a
/// directory.
#[derive(Debug, Clone)]
pub struct MnistProvider {
    pub classes: usize,
}

impl Default for MnistProvider {
    fn default() -> Self {
        MnistProvider { classes: 10 }
    }
}

impl DataProvider for MnistProvider {
    fn load(&self, path: &Path) -> Result<Dataset> {
        let read = |name: &str| {
            let file = path.join(name);
            std::fs::read(&file).map_err(|e| WganError::Data(format!("{}: {e}", file.display())))
        };
        let (labels, images) = parse_idx_pair(&read(TRAIN_IMAGES)?, &read(TRAIN_LABELS)?, self.classes)?;
        Dataset::new(labels, images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an IDX pair of `labels.len()` images of `side × side` pixels,
    /// image `i` filled with `i * 85`.
    fn idx_pair(labels: &[u8], side: u32) -> (Vec<u8>, Vec<u8>) {
        let mut images = vec![0, 0, 8, 3];
        for v in [labels.len() as u32, side, side] {
            images.extend_from_slice(&v.to_be_bytes());
        }
        for i in 0..labels.len() {
            images.extend(std::iter::repeat((i * 85) as u8).take((side * side) as usize));
        }
        let mut label_file = vec![0, 0, 8, 1];
        label_file.extend_from_slice(&(labels.len() as u32).to_be_bytes());
        label_file.extend_from_slice(labels);
        (images, label_file)
    }

    #[test]
    fn pixels_scale_to_unit_interval_and_labels_are_one_hot() {
        let (images, labels) = idx_pair(&[3, 0, 9, 1], 2);
        let (conditions, targets) = parse_idx_pair(&images, &labels, 10).unwrap();
        assert_eq!(targets[0], vec![-1.0; 4]);
        assert_eq!(targets[3], vec![1.0; 4]);
        assert_eq!(conditions[0][3], 1.0);
        assert_eq!(conditions[2].iter().sum::<f64>(), 1.0);
    }

    #[test]
    fn mismatched_counts_are_rejected() {
        let (images, _) = idx_pair(&[1, 2], 2);
        let (_, labels) = idx_pair(&[1], 2);
        assert!(matches!(parse_idx_pair(&images, &labels, 10), Err(WganError::Data(_))));
    }

    #[test]
    fn out_of_range_class_is_rejected() {
        let (images, labels) = idx_pair(&[12], 1);
        assert!(parse_idx_pair(&images, &labels, 10).is_err());
    }

    #[test]
    fn provider_reads_directory() {
        let dir = tempfile::tempdir().unwrap();
        let (images, labels) = idx_pair(&[5, 7], 3);
        std::fs::write(dir.path().join(TRAIN_IMAGES), images).unwrap();
        std::fs::write(dir.path().join(TRAIN_LABELS), labels).unwrap();
        let data = MnistProvider::default().load(dir.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!((data.condition_dims(), data.target_dims()), (10, 9));
    }
}
