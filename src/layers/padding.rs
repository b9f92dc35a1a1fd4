use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

/// Adds `rows` zero rows above and below and `cols` zero columns on each side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZeroPadding2d {
    pub rows: usize,
    pub cols: usize,
}

impl ZeroPadding2d {
    pub fn output_shape(&self, (h, w, c): (usize, usize, usize)) -> (usize, usize, usize) {
        (h + 2 * self.rows, w + 2 * self.cols, c)
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let (h, w, c) = self.output_shape(input.shape());
        let mut out = Tensor::zeros(h, w, c);
        let row_len = input.width * c;
        for y in 0..input.height {
            let src = input.index(y, 0, 0);
            let dst = out.index(y + self.rows, self.cols, 0);
            out.data[dst..dst + row_len].copy_from_slice(&input.data[src..src + row_len]);
        }
        out
    }
}

/// Removes `rows` rows from top and bottom and `cols` columns from each side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cropping2d {
    pub rows: usize,
    pub cols: usize,
}

impl Cropping2d {
    pub fn output_shape(&self, input: (usize, usize, usize)) -> Result<(usize, usize, usize)> {
        let (h, w, c) = input;
        if 2 * self.rows >= h || 2 * self.cols >= w {
            return Err(Error::InvalidSpec(format!(
                "cannot crop ({}, {}) from a {}x{} field",
                self.rows, self.cols, h, w
            )));
        }
        Ok((h - 2 * self.rows, w - 2 * self.cols, c))
    }

    pub fn forward(&self, input: &Tensor) -> Result<Tensor> {
        let (h, w, c) = self.output_shape(input.shape())?;
        let mut out = Tensor::zeros(h, w, c);
        let row_len = w * c;
        for y in 0..h {
            let src = input.index(y + self.rows, self.cols, 0);
            let dst = out.index(y, 0, 0);
            out.data[dst..dst + row_len].copy_from_slice(&input.data[src..src + row_len]);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crop_undoes_padding() {
        let input = Tensor::from_data(2, 3, 2, (0..12).map(f64::from).collect());
        let padded = ZeroPadding2d { rows: 3, cols: 1 }.forward(&input);
        assert_eq!(padded.shape(), (8, 5, 2));
        assert_eq!(padded.get(0, 0, 0), 0.0);
        assert_eq!(padded.get(3, 1, 1), 1.0);
        let cropped = Cropping2d { rows: 3, cols: 1 }.forward(&padded).unwrap();
        assert_eq!(cropped, input);
    }

    #[test]
    fn crop_rejects_oversized_margins() {
        let crop = Cropping2d { rows: 2, cols: 0 };
        assert!(crop.output_shape((4, 4, 1)).is_err());
    }
}
