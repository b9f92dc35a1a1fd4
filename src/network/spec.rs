use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

/// A serializable description of the enhancement network.
///
/// `UnetSpec` can be saved to / loaded from JSON independently of the
/// weights, so an architecture can be recorded before any weights exist.
/// The defaults reproduce the fixed topology: 48/64/128/256 channels, three
/// 3×3 convolutions per level, a 2-channel input and a 1-channel output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnetSpec {
    /// Height of the un-padded field.
    pub height: usize,
    /// Width of the un-padded field.
    pub width: usize,
    /// Zero rows added above and below before the U-Net, cropped afterwards.
    pub hpad: usize,
    /// Zero columns added left and right before the U-Net, cropped afterwards.
    pub wpad: usize,
    /// Channels of the field to enhance (real and imaginary parts).
    pub in_channels: usize,
    /// Channels of the correction, and of the reference it is added to.
    pub out_channels: usize,
    /// Side of the square convolution kernel.
    pub kernel: usize,
    /// Channel width per resolution level, shallowest first. The last entry
    /// is the bottleneck; every other entry adds one pooling stage.
    pub level_channels: Vec<usize>,
    /// Convolutions applied at every resolution level.
    pub convs_per_level: usize,
    /// Seed for weight initialisation; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for UnetSpec {
    fn default() -> Self {
        UnetSpec {
            height: 256,
            width: 256,
            hpad: 3,
            wpad: 3,
            in_channels: 2,
            out_channels: 1,
            kernel: 3,
            level_channels: vec![48, 64, 128, 256],
            convs_per_level: 3,
            seed: None,
        }
    }
}

impl UnetSpec {
    pub fn new(height: usize, width: usize, hpad: usize, wpad: usize) -> UnetSpec {
        UnetSpec { height, width, hpad, wpad, ..UnetSpec::default() }
    }

    pub fn with_seed(mut self, seed: u64) -> UnetSpec {
        self.seed = Some(seed);
        self
    }

    /// Number of 2×2 pooling stages.
    pub fn pooling_stages(&self) -> usize {
        self.level_channels.len().saturating_sub(1)
    }

    pub fn padded_height(&self) -> usize {
        self.height + 2 * self.hpad
    }

    pub fn padded_width(&self) -> usize {
        self.width + 2 * self.wpad
    }

    /// Checks that the padded field survives every pooling stage and comes
    /// back to the same size through the matching upsampling stages.
    pub fn validate(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            return Err(Error::InvalidSpec(format!(
                "field dimensions must be positive, got {}x{}",
                self.height, self.width
            )));
        }
        if self.in_channels == 0 || self.out_channels == 0 {
            return Err(Error::InvalidSpec("channel counts must be positive".into()));
        }
        if self.kernel == 0 || self.convs_per_level == 0 {
            return Err(Error::InvalidSpec(
                "kernel size and convolutions per level must be positive".into(),
            ));
        }
        if self.level_channels.len() < 2 || self.level_channels.contains(&0) {
            return Err(Error::InvalidSpec(
                "need at least two non-empty resolution levels".into(),
            ));
        }

        let levels = self.pooling_stages();
        let divisor = 1usize << levels;
        for (axis, padded) in [("height", self.padded_height()), ("width", self.padded_width())] {
            if padded % divisor != 0 {
                return Err(Error::IndivisibleDimension { axis, padded, divisor, levels });
            }
        }
        Ok(())
    }

    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &str) -> Result<UnetSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology() {
        let spec = UnetSpec::default();
        assert_eq!(spec.level_channels, vec![48, 64, 128, 256]);
        assert_eq!(spec.pooling_stages(), 3);
    }

    #[test]
    fn padding_to_a_multiple_of_eight_validates() {
        assert!(UnetSpec::new(218, 170, 3, 3).validate().is_ok());
        assert!(UnetSpec::new(256, 256, 0, 0).validate().is_ok());
    }

    #[test]
    fn default_arguments_do_not_divide() {
        // 256 + 2*3 = 262, which pools to 131 -> 65 -> 32 and cannot be
        // concatenated back onto the 65-row skip.
        match UnetSpec::new(256, 256, 3, 3).validate() {
            Err(Error::IndivisibleDimension { axis, padded, divisor, .. }) => {
                assert_eq!(axis, "height");
                assert_eq!(padded, 262);
                assert_eq!(divisor, 8);
            }
            other => panic!("expected IndivisibleDimension, got {other:?}"),
        }
    }

    #[test]
    fn width_is_checked_too() {
        match UnetSpec::new(16, 12, 0, 0).validate() {
            Err(Error::IndivisibleDimension { axis, .. }) => assert_eq!(axis, "width"),
            other => panic!("expected IndivisibleDimension, got {other:?}"),
        }
    }

    #[test]
    fn rejects_degenerate_specs() {
        assert!(UnetSpec::new(0, 8, 0, 0).validate().is_err());
        let spec = UnetSpec { level_channels: vec![48], ..UnetSpec::new(8, 8, 0, 0) };
        assert!(spec.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let spec: UnetSpec = serde_json::from_str(r#"{"height": 218, "width": 170}"#).unwrap();
        assert_eq!(spec.hpad, 3);
        assert_eq!(spec.kernel, 3);
        assert_eq!(spec.out_channels, 1);
    }
}
