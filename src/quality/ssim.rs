use crate::error::{Error, Result};
use crate::math::tensor::Tensor;
use super::{check_pair, data_range};

const WINDOW: usize = 7;
const K1: f64 = 0.01;
const K2: f64 = 0.03;

/// Mean structural similarity over every full 7×7 window, with uniform
/// weights and sample (N-1) covariances.
pub fn ssim(reference: &Tensor, test: &Tensor, range: Option<f64>) -> Result<f64> {
    check_pair(reference, test)?;
    if reference.channels != 1 {
        return Err(Error::ShapeMismatch {
            context: "ssim expects a single channel",
            expected: (reference.height, reference.width, 1),
            actual: reference.shape(),
        });
    }
    let (h, w) = (reference.height, reference.width);
    if h < WINDOW || w < WINDOW {
        return Err(Error::InvalidSpec(format!(
            "ssim needs at least {WINDOW}x{WINDOW} pixels, got {h}x{w}"
        )));
    }

    let range = range.unwrap_or_else(|| data_range(reference));
    let c1 = (K1 * range).powi(2);
    let c2 = (K2 * range).powi(2);
    let np = (WINDOW * WINDOW) as f64;
    let cov_norm = np / (np - 1.0);

    let mut total = 0.0;
    let mut count = 0usize;
    for y in 0..=h - WINDOW {
        for x in 0..=w - WINDOW {
            let (mut sa, mut sb, mut saa, mut sbb, mut sab) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for dy in 0..WINDOW {
                for dx in 0..WINDOW {
                    let a = reference.get(y + dy, x + dx, 0);
                    let b = test.get(y + dy, x + dx, 0);
                    sa += a;
                    sb += b;
                    saa += a * a;
                    sbb += b * b;
                    sab += a * b;
                }
            }
            let (ma, mb) = (sa / np, sb / np);
            let va = cov_norm * (saa / np - ma * ma);
            let vb = cov_norm * (sbb / np - mb * mb);
            let cab = cov_norm * (sab / np - ma * mb);

            let num = (2.0 * ma * mb + c1) * (2.0 * cab + c2);
            let den = (ma * ma + mb * mb + c1) * (va + vb + c2);
            total += num / den;
            count += 1;
        }
    }

    Ok(total / count as f64)
}
