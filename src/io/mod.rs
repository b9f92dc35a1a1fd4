pub mod npy;
pub mod preview;

pub use npy::{read_array2, read_array3, read_tensor, write_tensor};
pub use preview::save_preview;
