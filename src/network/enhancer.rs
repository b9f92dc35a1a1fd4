use rand::{rngs::StdRng, SeedableRng};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::layers::conv2d::Conv2d;
use crate::layers::padding::{Cropping2d, ZeroPadding2d};
use crate::math::tensor::Tensor;
use crate::network::spec::UnetSpec;
use crate::network::unet::UnetBlock;

/// The residual enhancement network.
///
/// Maps an `H × W × in_channels` field and an `H × W × out_channels`
/// reference to an `H × W × out_channels` result:
///
/// ```text
/// field ─ pad ─ U-Net ─ crop ─┐
///                             (+) ─ result
/// reference ──────────────────┘
/// ```
///
/// The value is immutable once built; `forward` borrows it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementNet {
    pub spec: UnetSpec,
    pub unet: UnetBlock,
    padding: ZeroPadding2d,
    cropping: Cropping2d,
}

/// One row of the layer table printed by `summary`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    pub name: String,
    pub output_shape: (usize, usize, usize),
    pub params: usize,
}

/// Builds the enhancement network for an `h × w` field padded by
/// `(hpad, wpad)` on every side, with the default topology.
///
/// Fails when the padded field cannot pass through the three pooling stages
/// and come back to the same size.
pub fn enhancement_unet(h: usize, w: usize, hpad: usize, wpad: usize) -> Result<EnhancementNet> {
    EnhancementNet::new(UnetSpec::new(h, w, hpad, wpad))
}

impl EnhancementNet {
    pub fn new(spec: UnetSpec) -> Result<EnhancementNet> {
        spec.validate()?;

        let unet = match spec.seed {
            Some(seed) => UnetBlock::new(&mut StdRng::seed_from_u64(seed), &spec),
            None => UnetBlock::new(&mut rand::thread_rng(), &spec),
        };

        let net = EnhancementNet {
            padding: ZeroPadding2d { rows: spec.hpad, cols: spec.wpad },
            cropping: Cropping2d { rows: spec.hpad, cols: spec.wpad },
            unet,
            spec,
        };
        let output = net.check_graph()?;
        info!(
            height = net.spec.height,
            width = net.spec.width,
            hpad = net.spec.hpad,
            wpad = net.spec.wpad,
            params = net.param_count(),
            "built enhancement network"
        );
        debug!(?output, "inferred output shape");
        Ok(net)
    }

    /// Runs shape inference over the whole graph, including the residual add.
    fn check_graph(&self) -> Result<(usize, usize, usize)> {
        let [field, reference] = self.input_shapes();
        let padded = self.padding.output_shape(field);
        let raw = self.unet.output_shape(padded)?;
        let cropped = self.cropping.output_shape(raw)?;
        if cropped != reference {
            return Err(Error::ShapeMismatch {
                context: "residual add",
                expected: reference,
                actual: cropped,
            });
        }
        Ok(cropped)
    }

    /// Checks every convolution's buffers, and that the stacks carry the
    /// widths, depth and kernel size the spec declares.
    fn check_layers(&self) -> Result<()> {
        for conv in self.convs() {
            conv.validate()?;
        }

        let s = &self.spec;
        let u = &self.unet;
        let skip_levels = s.level_channels.len().saturating_sub(1);
        if u.encoder.len() != skip_levels || u.decoder.len() != skip_levels {
            return Err(Error::InvalidSpec(format!(
                "spec has {skip_levels} skip levels, model has {} encoder and {} decoder stacks",
                u.encoder.len(),
                u.decoder.len()
            )));
        }

        let widths = s.level_channels.iter()
            .chain(s.level_channels.iter().rev().skip(1));
        let stacks = u.encoder.iter()
            .chain(std::iter::once(&u.bottleneck))
            .chain(u.decoder.iter());
        for (stack, &width) in stacks.zip(widths) {
            if stack.convs.len() != s.convs_per_level {
                return Err(Error::InvalidSpec(format!(
                    "expected {} convolutions per level, found {}",
                    s.convs_per_level,
                    stack.convs.len()
                )));
            }
            if let Some(conv) = stack.convs.iter().find(|c| c.out_channels != width || c.kernel != s.kernel) {
                return Err(Error::InvalidSpec(format!(
                    "expected {k}x{k} convolutions with {width} channels, found {k2}x{k2} with {}",
                    conv.out_channels,
                    k = s.kernel,
                    k2 = conv.kernel,
                )));
            }
        }

        if u.head.kernel != 1 || u.head.out_channels != s.out_channels {
            return Err(Error::InvalidSpec(format!(
                "head must be 1x1 with {} outputs, found {k}x{k} with {}",
                s.out_channels,
                u.head.out_channels,
                k = u.head.kernel,
            )));
        }
        Ok(())
    }

    /// Shapes of the field to enhance and of the reference, in that order.
    pub fn input_shapes(&self) -> [(usize, usize, usize); 2] {
        let s = &self.spec;
        [
            (s.height, s.width, s.in_channels),
            (s.height, s.width, s.out_channels),
        ]
    }

    pub fn output_shape(&self) -> (usize, usize, usize) {
        let s = &self.spec;
        (s.height, s.width, s.out_channels)
    }

    pub fn param_count(&self) -> usize {
        self.convs().map(Conv2d::param_count).sum()
    }

    fn convs(&self) -> impl Iterator<Item = &Conv2d> {
        let u = &self.unet;
        u.encoder.iter()
            .chain(std::iter::once(&u.bottleneck))
            .chain(u.decoder.iter())
            .flat_map(|stack| stack.convs.iter())
            .chain(std::iter::once(&u.head))
    }

    /// Computes `reference + correction(field)`.
    pub fn forward(&self, field: &Tensor, reference: &Tensor) -> Result<Tensor> {
        let [field_shape, reference_shape] = self.input_shapes();
        if field.shape() != field_shape {
            return Err(Error::ShapeMismatch {
                context: "field input",
                expected: field_shape,
                actual: field.shape(),
            });
        }
        if reference.shape() != reference_shape {
            return Err(Error::ShapeMismatch {
                context: "reference input",
                expected: reference_shape,
                actual: reference.shape(),
            });
        }

        let padded = self.padding.forward(field);
        let raw = self.unet.forward(&padded);
        let correction = self.cropping.forward(&raw)?;
        Ok(&correction + reference)
    }

    /// Layer table in execution order with per-layer output shapes.
    pub fn summary(&self) -> Vec<LayerSummary> {
        let mut rows = Vec::new();
        let [field, reference] = self.input_shapes();
        rows.push(LayerSummary { name: "input".into(), output_shape: field, params: 0 });
        rows.push(LayerSummary { name: "reference".into(), output_shape: reference, params: 0 });

        let mut shape = self.padding.output_shape(field);
        rows.push(LayerSummary { name: "zero_padding".into(), output_shape: shape, params: 0 });

        let mut skips = Vec::new();
        let u = &self.unet;
        for (level, stack) in u.encoder.iter().enumerate() {
            for (i, conv) in stack.convs.iter().enumerate() {
                shape = (shape.0, shape.1, conv.out_channels);
                rows.push(conv_row(format!("enc{}_conv{}", level + 1, i + 1), conv, shape));
            }
            skips.push(shape);
            shape = (shape.0 / 2, shape.1 / 2, shape.2);
            rows.push(LayerSummary { name: format!("enc{}_pool", level + 1), output_shape: shape, params: 0 });
        }
        for (i, conv) in u.bottleneck.convs.iter().enumerate() {
            shape = (shape.0, shape.1, conv.out_channels);
            rows.push(conv_row(format!("bottleneck_conv{}", i + 1), conv, shape));
        }
        for (level, stack) in u.decoder.iter().enumerate() {
            let skip = skips.pop().unwrap_or(shape);
            shape = (shape.0 * 2, shape.1 * 2, shape.2 + skip.2);
            rows.push(LayerSummary { name: format!("dec{}_up_concat", level + 1), output_shape: shape, params: 0 });
            for (i, conv) in stack.convs.iter().enumerate() {
                shape = (shape.0, shape.1, conv.out_channels);
                rows.push(conv_row(format!("dec{}_conv{}", level + 1, i + 1), conv, shape));
            }
        }
        shape = (shape.0, shape.1, u.head.out_channels);
        rows.push(conv_row("head".into(), &u.head, shape));
        rows.push(LayerSummary { name: "cropping".into(), output_shape: self.output_shape(), params: 0 });
        rows.push(LayerSummary { name: "residual_add".into(), output_shape: self.output_shape(), params: 0 });
        rows
    }

    /// Serializes spec and weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a network previously written by `save_json` and checks
    /// that its weights still agree with its spec.
    pub fn load_json(path: &str) -> Result<EnhancementNet> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let net: EnhancementNet = serde_json::from_reader(reader)?;
        net.spec.validate()?;
        net.check_layers()?;
        net.check_graph()?;
        Ok(net)
    }
}

fn conv_row(name: String, conv: &Conv2d, output_shape: (usize, usize, usize)) -> LayerSummary {
    LayerSummary { name, output_shape, params: conv.param_count() }
}
