use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::math::tensor::{he_normal, xavier_normal, Tensor};

/// A square-kernel 2-D convolution with "same" padding and stride 1.
///
/// Weights are stored kernel-row, kernel-column, input channel, output
/// channel (HWIO), so the output channels for one input tap are contiguous.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub kernel: usize,
    pub in_channels: usize,
    pub out_channels: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
}

impl Conv2d {
    /// Builds a layer with He-normal weights ahead of ReLU and Xavier-normal
    /// weights ahead of a linear output. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(
        rng: &mut R,
        in_channels: usize,
        out_channels: usize,
        kernel: usize,
        activation: ActivationFunction,
    ) -> Conv2d {
        let fan_in = kernel * kernel * in_channels;
        let len = fan_in * out_channels;
        let weights = match activation {
            ActivationFunction::ReLU => he_normal(rng, len, fan_in),
            ActivationFunction::Identity => xavier_normal(rng, len, fan_in),
        };

        Conv2d {
            kernel,
            in_channels,
            out_channels,
            weights,
            biases: vec![0.0; out_channels],
            activator: activation,
        }
    }

    pub fn param_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Checks that the weight and bias buffers match the declared kernel and
    /// channel counts.
    pub fn validate(&self) -> Result<()> {
        if self.kernel == 0 || self.in_channels == 0 || self.out_channels == 0 {
            return Err(Error::InvalidSpec(format!(
                "conv2d has a zero dimension: kernel {}, {} -> {} channels",
                self.kernel, self.in_channels, self.out_channels
            )));
        }
        let expected = self.kernel * self.kernel * self.in_channels * self.out_channels;
        if self.weights.len() != expected {
            return Err(Error::InvalidSpec(format!(
                "conv2d {k}x{k} {i} -> {o} needs {expected} weights, found {}",
                self.weights.len(),
                k = self.kernel,
                i = self.in_channels,
                o = self.out_channels,
            )));
        }
        if self.biases.len() != self.out_channels {
            return Err(Error::InvalidSpec(format!(
                "conv2d needs {} biases, found {}",
                self.out_channels,
                self.biases.len()
            )));
        }
        Ok(())
    }

    pub fn output_shape(&self, input: (usize, usize, usize)) -> Result<(usize, usize, usize)> {
        let (h, w, c) = input;
        if c != self.in_channels {
            return Err(Error::ShapeMismatch {
                context: "conv2d input channels",
                expected: (h, w, self.in_channels),
                actual: input,
            });
        }
        Ok((h, w, self.out_channels))
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        assert_eq!(input.channels, self.in_channels, "conv2d channel mismatch");

        let k = self.kernel;
        // Same padding: extra padding for even kernels goes after.
        let before = (k - 1) / 2;
        let (h, w) = (input.height, input.width);
        let oc = self.out_channels;
        let mut out = Tensor::zeros(h, w, oc);
        let mut acc = vec![0.0; oc];

        for y in 0..h {
            for x in 0..w {
                acc.copy_from_slice(&self.biases);
                for ky in 0..k {
                    let iy = y + ky;
                    if iy < before || iy - before >= h {
                        continue;
                    }
                    let iy = iy - before;
                    for kx in 0..k {
                        let ix = x + kx;
                        if ix < before || ix - before >= w {
                            continue;
                        }
                        let ix = ix - before;
                        let base = input.index(iy, ix, 0);
                        let pixel = &input.data[base..base + self.in_channels];
                        for (ic, &v) in pixel.iter().enumerate() {
                            if v == 0.0 {
                                continue;
                            }
                            let offset = ((ky * k + kx) * self.in_channels + ic) * oc;
                            let taps = &self.weights[offset..offset + oc];
                            for (a, &wt) in acc.iter_mut().zip(taps) {
                                *a += v * wt;
                            }
                        }
                    }
                }
                let start = out.index(y, x, 0);
                for (o, &a) in out.data[start..start + oc].iter_mut().zip(&acc) {
                    *o = self.activator.function(a);
                }
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn identity_kernel(channels: usize) -> Conv2d {
        let mut rng = StdRng::seed_from_u64(1);
        let mut conv = Conv2d::new(&mut rng, channels, channels, 3, ActivationFunction::Identity);
        conv.weights.iter_mut().for_each(|w| *w = 0.0);
        // Centre tap, channel c -> channel c.
        for c in 0..channels {
            let offset = (4 * channels + c) * channels + c;
            conv.weights[offset] = 1.0;
        }
        conv
    }

    #[test]
    fn centre_tap_kernel_is_identity() {
        let conv = identity_kernel(2);
        let input = Tensor::from_data(2, 2, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        assert_eq!(conv.forward(&input), input);
    }

    #[test]
    fn box_kernel_sums_zero_padded_neighbourhood() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut conv = Conv2d::new(&mut rng, 1, 1, 3, ActivationFunction::Identity);
        conv.weights.iter_mut().for_each(|w| *w = 1.0);
        let input = Tensor::filled(3, 3, 1, 1.0);
        let out = conv.forward(&input);
        // Corners see 4 pixels, edges 6, centre 9.
        assert_eq!(out.get(0, 0, 0), 4.0);
        assert_eq!(out.get(0, 1, 0), 6.0);
        assert_eq!(out.get(1, 1, 0), 9.0);
    }

    #[test]
    fn relu_and_bias_are_applied() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut conv = Conv2d::new(&mut rng, 1, 2, 1, ActivationFunction::ReLU);
        conv.weights = vec![1.0, -1.0];
        conv.biases = vec![0.5, 0.5];
        let out = conv.forward(&Tensor::filled(1, 1, 1, 2.0));
        assert_eq!(out.data, vec![2.5, 0.0]);
    }

    #[test]
    fn output_shape_checks_channels() {
        let mut rng = StdRng::seed_from_u64(4);
        let conv = Conv2d::new(&mut rng, 2, 48, 3, ActivationFunction::ReLU);
        assert_eq!(conv.output_shape((8, 8, 2)).unwrap(), (8, 8, 48));
        assert!(conv.output_shape((8, 8, 3)).is_err());
        assert_eq!(conv.param_count(), 3 * 3 * 2 * 48 + 48);
    }

    #[test]
    fn validate_catches_truncated_buffers() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut conv = Conv2d::new(&mut rng, 2, 4, 3, ActivationFunction::ReLU);
        assert!(conv.validate().is_ok());
        conv.weights.pop();
        assert!(matches!(conv.validate(), Err(Error::InvalidSpec(_))));

        let mut conv = Conv2d::new(&mut rng, 2, 4, 3, ActivationFunction::ReLU);
        conv.biases.push(0.0);
        assert!(matches!(conv.validate(), Err(Error::InvalidSpec(_))));
    }
}
