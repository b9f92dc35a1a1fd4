use serde::{Serialize, Deserialize};

use crate::math::tensor::Tensor;

/// 2×2 max pooling with stride 2. Odd trailing rows/columns are dropped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MaxPool2d;

impl MaxPool2d {
    pub fn output_shape(&self, (h, w, c): (usize, usize, usize)) -> (usize, usize, usize) {
        (h / 2, w / 2, c)
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let (h, w, c) = self.output_shape(input.shape());
        let mut out = Tensor::zeros(h, w, c);
        for y in 0..h {
            for x in 0..w {
                for ch in 0..c {
                    let m = input.get(2 * y, 2 * x, ch)
                        .max(input.get(2 * y, 2 * x + 1, ch))
                        .max(input.get(2 * y + 1, 2 * x, ch))
                        .max(input.get(2 * y + 1, 2 * x + 1, ch));
                    out.set(y, x, ch, m);
                }
            }
        }
        out
    }
}

/// Nearest-neighbour 2× upsampling.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UpSample2d;

impl UpSample2d {
    pub fn output_shape(&self, (h, w, c): (usize, usize, usize)) -> (usize, usize, usize) {
        (h * 2, w * 2, c)
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let (h, w, c) = self.output_shape(input.shape());
        let mut out = Tensor::zeros(h, w, c);
        for y in 0..h {
            for x in 0..w {
                let src = input.index(y / 2, x / 2, 0);
                let dst = out.index(y, x, 0);
                out.data[dst..dst + c].copy_from_slice(&input.data[src..src + c]);
            }
        }
        out
    }
}
