use crate::error::Result;
use crate::math::tensor::Tensor;
use super::{check_pair, data_range};

/// Peak signal-to-noise ratio in dB.
///
/// `range` defaults to the reference's max minus min. Identical inputs give
/// `f64::INFINITY`.
pub fn psnr(reference: &Tensor, test: &Tensor, range: Option<f64>) -> Result<f64> {
    check_pair(reference, test)?;
    let range = range.unwrap_or_else(|| data_range(reference));
    let n = reference.data.len() as f64;
    let mse = reference.data.iter().zip(&test.data)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>() / n;
    if mse == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(10.0 * (range * range / mse).log10())
}
