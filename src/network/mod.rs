pub mod enhancer;
pub mod spec;
pub mod unet;

pub use enhancer::{enhancement_unet, EnhancementNet, LayerSummary};
pub use spec::UnetSpec;
pub use unet::UnetBlock;
