//! Paired two-sided Wilcoxon signed-rank test.
//!
//! Zero differences are discarded before ranking. Tied magnitudes share
//! their average rank. With at most 50 differences, no ties and no
//! discarded zeros the p-value is exact; otherwise it comes from the normal
//! approximation with tie correction and no continuity correction.

use serde::{Serialize, Deserialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{Error, Result};

const EXACT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PValueMethod {
    Exact,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WilcoxonResult {
    /// Smaller of the positive and negative rank sums.
    pub statistic: f64,
    pub pvalue: f64,
    /// Non-zero differences that entered the ranking.
    pub n: usize,
    /// Standardised statistic; `None` for exact p-values.
    pub zstatistic: Option<f64>,
    pub method: PValueMethod,
}

impl std::fmt::Display for WilcoxonResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WilcoxonResult(statistic={}, pvalue={:e})", self.statistic, self.pvalue)
    }
}

/// Tests whether the paired differences `x - y` are symmetric about zero.
pub fn wilcoxon(x: &[f64], y: &[f64]) -> Result<WilcoxonResult> {
    if x.len() != y.len() {
        return Err(Error::LengthMismatch { left: x.len(), right: y.len() });
    }
    if x.is_empty() {
        return Err(Error::Empty("wilcoxon needs at least one pair"));
    }

    let diffs: Vec<f64> = x.iter().zip(y).map(|(a, b)| a - b).collect();
    let nonzero: Vec<f64> = diffs.iter().copied().filter(|&d| d != 0.0).collect();
    let had_zeros = nonzero.len() != diffs.len();
    let n = nonzero.len();
    if n == 0 {
        return Err(Error::ZeroDifferences);
    }

    let magnitudes: Vec<f64> = nonzero.iter().map(|d| d.abs()).collect();
    let (ranks, tie_groups) = average_ranks(&magnitudes);

    let (mut r_plus, mut r_minus) = (0.0, 0.0);
    for (d, r) in nonzero.iter().zip(&ranks) {
        if *d > 0.0 {
            r_plus += r;
        } else {
            r_minus += r;
        }
    }
    let statistic = r_plus.min(r_minus);

    if n <= EXACT_LIMIT && tie_groups.is_empty() && !had_zeros {
        let pvalue = (2.0 * exact_cdf(n, statistic)).min(1.0);
        return Ok(WilcoxonResult { statistic, pvalue, n, zstatistic: None, method: PValueMethod::Exact });
    }

    let nf = n as f64;
    let mean = nf * (nf + 1.0) / 4.0;
    let tie_term: f64 = tie_groups.iter().map(|&t| {
        let t = t as f64;
        t * (t * t - 1.0)
    }).sum();
    let var = (nf * (nf + 1.0) * (2.0 * nf + 1.0) - 0.5 * tie_term) / 24.0;
    let z = (statistic - mean) / var.sqrt();

    let normal = Normal::new(0.0, 1.0).map_err(|e| Error::Stats(e.to_string()))?;
    let pvalue = (2.0 * normal.cdf(-z.abs())).min(1.0);
    Ok(WilcoxonResult { statistic, pvalue, n, zstatistic: Some(z), method: PValueMethod::Normal })
}

/// 1-based ranks with ties averaged, plus the sizes of tie groups (> 1).
fn average_ranks(values: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut ties = Vec::new();
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let rank = (i + j) as f64 / 2.0 + 1.0;
        for &k in &order[i..=j] {
            ranks[k] = rank;
        }
        if j > i {
            ties.push(j - i + 1);
        }
        i = j + 1;
    }
    (ranks, ties)
}

/// P(R <= t) for the rank sum of a random sign assignment over 1..=n.
fn exact_cdf(n: usize, t: f64) -> f64 {
    let max = n * (n + 1) / 2;
    // counts[s]: subsets of {1..n} summing to s. At most 2^50, exact in f64.
    let mut counts = vec![0.0f64; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for s in (k..=max).rev() {
            counts[s] += counts[s - k];
        }
    }
    let upto = (t.floor() as usize).min(max);
    let hits: f64 = counts[..=upto].iter().sum();
    hits / 2f64.powi(n as i32)
}
