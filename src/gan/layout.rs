use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;

/// How a condition is joined with a target before it reaches the critic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionLayout {
    /// `[x | y]` side by side.
    Columns { condition_dims: usize, target_dims: usize },
    /// The condition vector is broadcast as extra channels on every pixel of
    /// an NHWC image; image channels come first.
    Channels { height: usize, width: usize, channels: usize, condition_dims: usize },
}

impl ConditionLayout {
    pub fn input_width(&self) -> usize {
        match *self {
            ConditionLayout::Columns { condition_dims, target_dims } => condition_dims + target_dims,
            ConditionLayout::Channels { height, width, channels, condition_dims } => {
                height * width * (channels + condition_dims)
            }
        }
    }

    pub fn target_dims(&self) -> usize {
        match *self {
            ConditionLayout::Columns { target_dims, .. } => target_dims,
            ConditionLayout::Channels { height, width, channels, .. } => height * width * channels,
        }
    }

    pub fn join(&self, condition: &Matrix, target: &Matrix) -> Matrix {
        assert_eq!(condition.rows, target.rows, "condition and target batch sizes differ");
        assert_eq!(target.cols, self.target_dims(), "target width");
        match *self {
            ConditionLayout::Columns { .. } => Matrix::concat_cols(&[condition, target]),
            ConditionLayout::Channels { channels, .. } => {
                let data = condition.data.iter().zip(target.data.iter())
                    .map(|(label, image)| {
                        image.chunks(channels)
                            .flat_map(|pixel| pixel.iter().chain(label.iter()).copied())
                            .collect()
                    })
                    .collect();
                Matrix::from_data(data)
            }
        }
    }

    /// Extracts the target slice of a critic-input-shaped matrix.
    pub fn target_part(&self, joined: &Matrix) -> Matrix {
        match *self {
            ConditionLayout::Columns { condition_dims, target_dims } => {
                joined.columns(condition_dims, condition_dims + target_dims)
            }
            ConditionLayout::Channels { channels, condition_dims, .. } => {
                let data = joined.data.iter()
                    .map(|row| {
                        row.chunks(channels + condition_dims)
                            .flat_map(|pixel| pixel[..channels].iter().copied())
                            .collect()
                    })
                    .collect();
                Matrix::from_data(data)
            }
        }
    }

    /// Inverse of `target_part`: places `target` in a critic-input-shaped
    /// matrix with zeros in the condition slots.
    pub fn embed_target(&self, target: &Matrix) -> Matrix {
        match *self {
            ConditionLayout::Columns { condition_dims, .. } => {
                Matrix::concat_cols(&[&Matrix::zeros(target.rows, condition_dims), target])
            }
            ConditionLayout::Channels { condition_dims, .. } => {
                self.join(&Matrix::zeros(target.rows, condition_dims), target)
            }
        }
    }
}
