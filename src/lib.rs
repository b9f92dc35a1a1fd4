pub mod error;
pub mod logging;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod io;
pub mod quality;
pub mod metrics;

// Convenience re-exports
pub use error::{Error, Result};
pub use math::tensor::Tensor;
pub use activation::activation::ActivationFunction;
pub use network::{enhancement_unet, EnhancementNet, UnetSpec};
pub use metrics::compare::{run_compare, CompareConfig, CompareReport};
pub use metrics::wilcoxon::{wilcoxon, WilcoxonResult};
