pub mod conv2d;
pub mod padding;
pub mod sampling;

pub use conv2d::Conv2d;
pub use padding::{Cropping2d, ZeroPadding2d};
pub use sampling::{MaxPool2d, UpSample2d};
