use rand::distributions::{Distribution, Uniform};
use rand::Rng;
use serde::{Serialize, Deserialize};
use std::ops::{Add, Sub, Mul};

/// Row-major dense matrix.
///
/// Batches are stored one example per row; image tensors are flattened in
/// NHWC order (channel index fastest) so a row of a `(28, 28, 1)` image batch
/// has `784` columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    pub fn filled(rows: usize, cols: usize, value: f64) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![value; cols]; rows]
        }
    }

    /// Glorot (Xavier) uniform initialization: samples from U(-l, l) with
    /// `l = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// For dense kernels `fan_in`/`fan_out` are the input and output widths;
    /// for convolution kernels both are multiplied by the receptive field size.
    pub fn glorot_uniform<R: Rng>(rows: usize, cols: usize, fan_in: usize, fan_out: usize, rng: &mut R) -> Matrix {
        let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
        let dist = Uniform::new_inclusive(-limit, limit);
        let mut res = Matrix::zeros(rows, cols);
        for row in res.data.iter_mut() {
            for v in row.iter_mut() {
                *v = dist.sample(rng);
            }
        }
        res
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect()
        }
    }

    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        let cols = data.first().map_or(0, |row| row.len());
        debug_assert!(data.iter().all(|row| row.len() == cols), "ragged matrix rows");
        Matrix {
            rows: data.len(),
            cols,
            data
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// `self · rhs`
    pub fn matmul(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.cols, rhs.rows, "Matrices are of incorrect sizes");
        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for (out_row, row) in res.data.iter_mut().zip(self.data.iter()) {
            for (k, &a) in row.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in out_row.iter_mut().zip(rhs.data[k].iter()) {
                    *o += a * b;
                }
            }
        }
        res
    }

    /// `self · rhsᵀ` without materializing the transpose.
    pub fn matmul_transposed(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.cols, rhs.cols, "Matrices are of incorrect sizes");
        let mut res = Matrix::zeros(self.rows, rhs.rows);
        for (out_row, row) in res.data.iter_mut().zip(self.data.iter()) {
            for (o, other) in out_row.iter_mut().zip(rhs.data.iter()) {
                *o = row.iter().zip(other.iter()).map(|(a, b)| a * b).sum();
            }
        }
        res
    }

    /// `selfᵀ · rhs` without materializing the transpose.
    pub fn transposed_matmul(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.rows, rhs.rows, "Matrices are of incorrect sizes");
        let mut res = Matrix::zeros(self.cols, rhs.cols);
        for (row, other) in self.data.iter().zip(rhs.data.iter()) {
            for (i, &a) in row.iter().enumerate() {
                if a == 0.0 {
                    continue;
                }
                for (o, &b) in res.data[i].iter_mut().zip(other.iter()) {
                    *o += a * b;
                }
            }
        }
        res
    }

    /// Element-wise (Hadamard) product of two same-shape matrices.
    pub fn hadamard(&self, rhs: &Matrix) -> Matrix {
        assert_eq!(self.shape(), rhs.shape(), "Matrices are of incorrect sizes");
        let data = self.data.iter().zip(rhs.data.iter())
            .map(|(row_a, row_b)| {
                row_a.iter().zip(row_b.iter()).map(|(x, y)| x * y).collect()
            })
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }

    pub fn scale(&self, factor: f64) -> Matrix {
        self.map(|x| x * factor)
    }

    /// Multiplies row `i` by `factors[i]`.
    pub fn scale_rows(&self, factors: &[f64]) -> Matrix {
        assert_eq!(self.rows, factors.len(), "one factor per row required");
        let data = self.data.iter().zip(factors.iter())
            .map(|(row, &f)| row.iter().map(|x| x * f).collect())
            .collect();
        Matrix { rows: self.rows, cols: self.cols, data }
    }

    pub fn add_assign(&mut self, rhs: &Matrix) {
        assert_eq!(self.shape(), rhs.shape(), "Matrices are of incorrect sizes");
        for (row, other) in self.data.iter_mut().zip(rhs.data.iter()) {
            for (a, b) in row.iter_mut().zip(other.iter()) {
                *a += b;
            }
        }
    }

    /// Sums every column, producing a `1 × cols` matrix.
    pub fn column_sums(&self) -> Matrix {
        let mut res = Matrix::zeros(1, self.cols);
        for row in &self.data {
            for (acc, v) in res.data[0].iter_mut().zip(row.iter()) {
                *acc += v;
            }
        }
        res
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().flat_map(|row| row.iter()).sum()
    }

    pub fn mean(&self) -> f64 {
        let n = self.rows * self.cols;
        if n == 0 {
            return 0.0;
        }
        self.sum() / n as f64
    }

    /// Horizontal concatenation; every part must have the same row count.
    pub fn concat_cols(parts: &[&Matrix]) -> Matrix {
        let rows = parts.first().map_or(0, |m| m.rows);
        assert!(parts.iter().all(|m| m.rows == rows), "row counts differ");
        let data = (0..rows)
            .map(|i| {
                parts.iter().flat_map(|m| m.data[i].iter().copied()).collect()
            })
            .collect();
        Matrix {
            rows,
            cols: parts.iter().map(|m| m.cols).sum(),
            data
        }
    }

    /// Copies columns `start..end`.
    pub fn columns(&self, start: usize, end: usize) -> Matrix {
        assert!(start <= end && end <= self.cols, "column range out of bounds");
        Matrix {
            rows: self.rows,
            cols: end - start,
            data: self.data.iter().map(|row| row[start..end].to_vec()).collect()
        }
    }

    /// Euclidean norm of every row.
    pub fn row_norms(&self) -> Vec<f64> {
        self.data.iter()
            .map(|row| row.iter().map(|x| x * x).sum::<f64>().sqrt())
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|row| row.iter().all(|x| x.is_finite()))
    }

    pub fn clamp_in_place(&mut self, min: f64, max: f64) {
        for row in self.data.iter_mut() {
            for v in row.iter_mut() {
                *v = v.clamp(min, max);
            }
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter()
            .flat_map(|row| row.iter())
            .fold(0.0, |acc, x| acc.max(x.abs()))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

impl Add for Matrix {
    type Output = Matrix;

    fn add(mut self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }
        self.add_assign(&rhs);
        self
    }
}

impl Sub for Matrix {
    type Output = Matrix;

    fn sub(self, rhs: Self) -> Self::Output {
        if self.rows != rhs.rows || self.cols != rhs.cols {
            panic!("Matrices are of incorrect sizes")
        }

        let mut res = Matrix::zeros(self.rows, self.cols);

        for i in 0..self.rows {
            for j in 0..self.cols {
                res.data[i][j] = self.data[i][j] - rhs.data[i][j];
            }
        }

        res
    }
}

impl Mul for Matrix {
    type Output = Matrix;

    fn mul(self, rhs: Self) -> Self::Output {
        self.matmul(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(data: &[&[f64]]) -> Matrix {
        Matrix::from_data(data.iter().map(|r| r.to_vec()).collect())
    }

    #[test]
    fn transposed_products_match_explicit_transpose() {
        let a = m(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let b = m(&[&[0.5, -1.0, 2.0], &[1.5, 0.0, -2.0]]);
        assert_eq!(a.matmul_transposed(&b), a.matmul(&b.transpose()));
        assert_eq!(a.transposed_matmul(&b), a.transpose().matmul(&b));
    }

    #[test]
    fn concat_and_columns_are_inverse() {
        let a = m(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let b = m(&[&[5.0], &[6.0]]);
        let joined = Matrix::concat_cols(&[&a, &b]);
        assert_eq!(joined.shape(), (2, 3));
        assert_eq!(joined.columns(0, 2), a);
        assert_eq!(joined.columns(2, 3), b);
    }

    #[test]
    fn row_norms_and_reductions() {
        let a = m(&[&[3.0, 4.0], &[0.0, 0.0]]);
        assert_eq!(a.row_norms(), vec![5.0, 0.0]);
        assert_eq!(a.column_sums(), m(&[&[3.0, 4.0]]));
        assert_eq!(a.mean(), 1.75);
    }

    #[test]
    fn non_finite_values_are_detected() {
        let mut a = Matrix::zeros(2, 2);
        assert!(a.is_finite());
        a.data[1][0] = f64::NAN;
        assert!(!a.is_finite());
    }

    #[test]
    fn glorot_uniform_respects_limit() {
        use rand::SeedableRng;
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let w = Matrix::glorot_uniform(20, 30, 20, 30, &mut rng);
        let limit = (6.0_f64 / 50.0).sqrt();
        assert!(w.max_abs() <= limit);
        assert!(w.max_abs() > 0.0);
    }
}
