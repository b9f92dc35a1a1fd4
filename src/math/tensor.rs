use rand::prelude::*;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;
use std::ops::Add;

/// A dense `height × width × channels` field stored channel-last.
///
/// Element `(y, x, c)` lives at `(y * width + x) * channels + c`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub data: Vec<f64>,
}

impl Tensor {
    pub fn zeros(height: usize, width: usize, channels: usize) -> Tensor {
        Tensor::filled(height, width, channels, 0.0)
    }

    pub fn filled(height: usize, width: usize, channels: usize, value: f64) -> Tensor {
        Tensor {
            height,
            width,
            channels,
            data: vec![value; height * width * channels],
        }
    }

    /// Wraps an HWC buffer. Panics if `data` does not hold exactly
    /// `height * width * channels` values.
    pub fn from_data(height: usize, width: usize, channels: usize, data: Vec<f64>) -> Tensor {
        assert_eq!(
            data.len(),
            height * width * channels,
            "buffer length does not match tensor shape"
        );
        Tensor { height, width, channels, data }
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    #[inline]
    pub fn index(&self, y: usize, x: usize, c: usize) -> usize {
        (y * self.width + x) * self.channels + c
    }

    #[inline]
    pub fn get(&self, y: usize, x: usize, c: usize) -> f64 {
        self.data[self.index(y, x, c)]
    }

    #[inline]
    pub fn set(&mut self, y: usize, x: usize, c: usize, value: f64) {
        let i = self.index(y, x, c);
        self.data[i] = value;
    }

    /// Copies one channel out as a single-channel tensor.
    pub fn channel(&self, c: usize) -> Tensor {
        assert!(c < self.channels, "channel index out of range");
        let data = self.data.iter().skip(c).step_by(self.channels).copied().collect();
        Tensor::from_data(self.height, self.width, 1, data)
    }

    pub fn map<F>(&self, functor: F) -> Tensor
    where
        F: Fn(f64) -> f64,
    {
        Tensor {
            height: self.height,
            width: self.width,
            channels: self.channels,
            data: self.data.iter().map(|&x| functor(x)).collect(),
        }
    }

    /// Concatenates along the channel axis (`self` channels first).
    pub fn concat_channels(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            (self.height, self.width),
            (other.height, other.width),
            "tensors must share spatial dimensions to concatenate"
        );
        let channels = self.channels + other.channels;
        let mut data = Vec::with_capacity(self.height * self.width * channels);
        for (a, b) in self.data.chunks(self.channels).zip(other.data.chunks(other.channels)) {
            data.extend_from_slice(a);
            data.extend_from_slice(b);
        }
        Tensor::from_data(self.height, self.width, channels, data)
    }

    pub fn min_max(&self) -> (f64, f64) {
        self.data.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
            (lo.min(x), hi.max(x))
        })
    }
}

/// Samples a single value from N(0, 1) using the Box-Muller transform.
pub(crate) fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    // Uniform on (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// He-normal samples: N(0, sqrt(2 / fan_in)). Used ahead of ReLU.
pub fn he_normal<R: Rng + ?Sized>(rng: &mut R, len: usize, fan_in: usize) -> Vec<f64> {
    let std_dev = (2.0 / fan_in as f64).sqrt();
    (0..len).map(|_| sample_standard_normal(rng) * std_dev).collect()
}

/// Xavier-normal samples: N(0, sqrt(1 / fan_in)). Used ahead of linear outputs.
pub fn xavier_normal<R: Rng + ?Sized>(rng: &mut R, len: usize, fan_in: usize) -> Vec<f64> {
    let std_dev = (1.0 / fan_in as f64).sqrt();
    (0..len).map(|_| sample_standard_normal(rng) * std_dev).collect()
}

impl Default for Tensor {
    fn default() -> Self {
        Tensor { height: 0, width: 0, channels: 0, data: vec![] }
    }
}

impl Add for &Tensor {
    type Output = Tensor;

    fn add(self, rhs: Self) -> Self::Output {
        if self.shape() != rhs.shape() {
            panic!("Tensors are of incorrect shapes")
        }

        Tensor {
            height: self.height,
            width: self.width,
            channels: self.channels,
            data: self.data.iter().zip(rhs.data.iter()).map(|(a, b)| a + b).collect(),
        }
    }
}
