use rand::Rng;
use serde::{Serialize, Deserialize};
use tracing::trace;

use crate::activation::activation::ActivationFunction;
use crate::error::{Error, Result};
use crate::layers::conv2d::Conv2d;
use crate::layers::sampling::{MaxPool2d, UpSample2d};
use crate::math::tensor::Tensor;
use crate::network::spec::UnetSpec;

/// Convolutions applied back to back at one resolution level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvStack {
    pub convs: Vec<Conv2d>,
}

impl ConvStack {
    fn new<R: Rng + ?Sized>(
        rng: &mut R,
        in_channels: usize,
        channels: usize,
        count: usize,
        kernel: usize,
    ) -> ConvStack {
        let convs = (0..count)
            .map(|i| {
                let input = if i == 0 { in_channels } else { channels };
                Conv2d::new(rng, input, channels, kernel, ActivationFunction::ReLU)
            })
            .collect();
        ConvStack { convs }
    }

    pub fn out_channels(&self) -> usize {
        self.convs.last().map(|c| c.out_channels).unwrap_or(0)
    }

    fn output_shape(&self, input: (usize, usize, usize)) -> Result<(usize, usize, usize)> {
        self.convs.iter().try_fold(input, |shape, conv| conv.output_shape(shape))
    }

    fn forward(&self, input: &Tensor) -> Tensor {
        let mut current = input.clone();
        for conv in &self.convs {
            current = conv.forward(&current);
        }
        current
    }
}

/// The encoder-decoder stack: per-level convolutions with 2×2 max pooling on
/// the way down, 2× upsampling and skip concatenation on the way up, and a
/// 1×1 linear projection to the output channels.
///
/// `decoder[i]` mirrors `encoder[encoder.len() - 1 - i]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnetBlock {
    pub encoder: Vec<ConvStack>,
    pub bottleneck: ConvStack,
    pub decoder: Vec<ConvStack>,
    pub head: Conv2d,
    #[serde(skip)]
    pool: MaxPool2d,
    #[serde(skip)]
    upsample: UpSample2d,
}

impl UnetBlock {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, spec: &UnetSpec) -> UnetBlock {
        let levels = &spec.level_channels;
        let (skip_widths, bottom) = levels.split_at(levels.len() - 1);
        let k = spec.kernel;
        let n = spec.convs_per_level;

        let mut encoder = Vec::with_capacity(skip_widths.len());
        let mut in_channels = spec.in_channels;
        for &width in skip_widths {
            encoder.push(ConvStack::new(rng, in_channels, width, n, k));
            in_channels = width;
        }

        let bottleneck = ConvStack::new(rng, in_channels, bottom[0], n, k);

        let mut decoder = Vec::with_capacity(skip_widths.len());
        let mut below = bottom[0];
        for &width in skip_widths.iter().rev() {
            decoder.push(ConvStack::new(rng, below + width, width, n, k));
            below = width;
        }

        let head = Conv2d::new(rng, below, spec.out_channels, 1, ActivationFunction::Identity);

        UnetBlock {
            encoder,
            bottleneck,
            decoder,
            head,
            pool: MaxPool2d,
            upsample: UpSample2d,
        }
    }

    /// Shape inference through the whole stack. Fails where an upsampled
    /// tensor cannot be concatenated onto its skip connection.
    pub fn output_shape(&self, input: (usize, usize, usize)) -> Result<(usize, usize, usize)> {
        let mut skips = Vec::with_capacity(self.encoder.len());
        let mut shape = input;
        for stack in &self.encoder {
            shape = stack.output_shape(shape)?;
            skips.push(shape);
            shape = self.pool.output_shape(shape);
        }
        shape = self.bottleneck.output_shape(shape)?;

        for stack in &self.decoder {
            let (h, w, c) = self.upsample.output_shape(shape);
            let skip = skips.pop().ok_or_else(|| {
                Error::InvalidSpec("decoder has more stages than encoder".into())
            })?;
            if (h, w) != (skip.0, skip.1) {
                return Err(Error::ShapeMismatch {
                    context: "skip concatenation",
                    expected: (skip.0, skip.1, c),
                    actual: (h, w, c),
                });
            }
            shape = stack.output_shape((h, w, c + skip.2))?;
        }

        self.head.output_shape(shape)
    }

    pub fn forward(&self, input: &Tensor) -> Tensor {
        let mut skips = Vec::with_capacity(self.encoder.len());
        let mut current = input.clone();
        for stack in &self.encoder {
            let features = stack.forward(&current);
            current = self.pool.forward(&features);
            skips.push(features);
        }
        current = self.bottleneck.forward(&current);
        trace!(shape = ?current.shape(), "bottleneck");

        for (stack, skip) in self.decoder.iter().zip(skips.iter().rev()) {
            let up = self.upsample.forward(&current);
            current = stack.forward(&up.concat_channels(skip));
        }

        self.head.forward(&current)
    }
}
