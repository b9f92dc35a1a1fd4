use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::metrics::dataset::{Metric, MetricSet, Volume};

/// Slices dropped from each end of every volume. Boundary slices carry
/// little anatomy.
pub const CROP_MARGIN: usize = 20;

/// Returns `values[margin..len - margin]`.
///
/// Fails unless at least one slice survives.
pub fn crop_slices(values: &[f64], margin: usize) -> Result<&[f64]> {
    if values.len() <= 2 * margin {
        return Err(Error::VolumeTooShort {
            volume: 0,
            slices: values.len(),
            required: 2 * margin + 1,
            margin,
        });
    }
    Ok(&values[margin..values.len() - margin])
}

impl MetricSet {
    /// Copy of the set with `margin` slices cropped from both ends of every
    /// volume.
    pub fn cropped(&self, margin: usize) -> Result<MetricSet> {
        let volumes = self.volumes.iter().enumerate()
            .map(|(v, volume)| {
                let metrics = volume.metrics.iter()
                    .map(|row| crop_slices(row, margin).map(<[f64]>::to_vec))
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| match e {
                        Error::VolumeTooShort { slices, required, margin, .. } => {
                            Error::VolumeTooShort { volume: v, slices, required, margin }
                        }
                        other => other,
                    })?;
                Ok(Volume { metrics })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(MetricSet { volumes })
    }

    /// All per-slice values of one metric, volumes concatenated in order.
    pub fn pooled(&self, metric: Metric) -> Vec<f64> {
        self.volumes.iter()
            .flat_map(|v| v.metric(metric).iter().copied())
            .collect()
    }
}

/// Mean and population standard deviation of a pooled sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub mean: f64,
    pub std: f64,
    pub count: usize,
}

impl Aggregate {
    pub fn of(values: &[f64]) -> Result<Aggregate> {
        if values.is_empty() {
            return Err(Error::Empty("cannot aggregate an empty sample"));
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let var = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        Ok(Aggregate { mean, std: var.sqrt(), count: values.len() })
    }
}

/// Aggregates of SSIM, pSNR and VIF, in `Metric::ALL` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricAggregates {
    pub ssim: Aggregate,
    pub psnr: Aggregate,
    pub vif: Aggregate,
}

impl MetricAggregates {
    pub fn of(set: &MetricSet) -> Result<MetricAggregates> {
        Ok(MetricAggregates {
            ssim: Aggregate::of(&set.pooled(Metric::Ssim))?,
            psnr: Aggregate::of(&set.pooled(Metric::Psnr))?,
            vif: Aggregate::of(&set.pooled(Metric::Vif))?,
        })
    }

    pub fn get(&self, metric: Metric) -> Aggregate {
        match metric {
            Metric::Ssim => self.ssim,
            Metric::Psnr => self.psnr,
            Metric::Vif => self.vif,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(slices: usize, f: impl Fn(usize) -> f64) -> Volume {
        let row: Vec<f64> = (0..slices).map(f).collect();
        Volume { metrics: vec![row.clone(), row.clone(), row] }
    }

    #[test]
    fn crop_removes_twenty_from_each_end() {
        for len in [41usize, 60, 155] {
            let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
            let cropped = crop_slices(&values, CROP_MARGIN).unwrap();
            assert_eq!(cropped.len(), len - 40);
            assert_eq!(cropped[0], 20.0);
            assert_eq!(*cropped.last().unwrap(), (len - 21) as f64);
        }
    }

    #[test]
    fn crop_rejects_short_volumes() {
        let set = MetricSet::new(vec![volume(60, |_| 0.0), volume(40, |_| 0.0)]).unwrap();
        match set.cropped(CROP_MARGIN) {
            Err(Error::VolumeTooShort { volume, slices, required, .. }) => {
                assert_eq!((volume, slices, required), (1, 40, 41));
            }
            other => panic!("expected VolumeTooShort, got {other:?}"),
        }
    }

    #[test]
    fn constant_sample_has_zero_spread() {
        let agg = Aggregate::of(&[1.0; 50]).unwrap();
        assert_eq!(agg.mean, 1.0);
        assert_eq!(agg.std, 0.0);
        assert_eq!(agg.count, 50);
    }

    #[test]
    fn std_is_population_std() {
        let agg = Aggregate::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(agg.mean, 5.0);
        assert_eq!(agg.std, 2.0);
    }

    #[test]
    fn pooling_concatenates_cropped_volumes() {
        let set = MetricSet::new(vec![
            volume(45, |i| i as f64),
            volume(42, |_| 100.0),
        ])
        .unwrap();
        let cropped = set.cropped(CROP_MARGIN).unwrap();
        let pooled = cropped.pooled(Metric::Psnr);
        assert_eq!(pooled, vec![20.0, 21.0, 22.0, 23.0, 24.0, 100.0, 100.0]);
        let aggs = MetricAggregates::of(&cropped).unwrap();
        assert_eq!(aggs.get(Metric::Vif).count, 7);
    }

    #[test]
    fn empty_sample_fails() {
        assert!(Aggregate::of(&[]).is_err());
    }
}
