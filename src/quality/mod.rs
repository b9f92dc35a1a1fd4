//! Full-reference image-quality scores between single-channel fields.
//!
//! These produce the per-slice values the comparison pipeline aggregates.

pub mod psnr;
pub mod ssim;

pub use psnr::psnr;
pub use ssim::ssim;

use crate::error::{Error, Result};
use crate::math::tensor::Tensor;

fn check_pair(reference: &Tensor, test: &Tensor) -> Result<()> {
    if reference.shape() != test.shape() {
        return Err(Error::ShapeMismatch {
            context: "quality score",
            expected: reference.shape(),
            actual: test.shape(),
        });
    }
    if reference.data.is_empty() {
        return Err(Error::Empty("quality score input"));
    }
    Ok(())
}

/// Reference intensity span, used when no explicit data range is given.
fn data_range(reference: &Tensor) -> f64 {
    let (lo, hi) = reference.min_max();
    hi - lo
}
