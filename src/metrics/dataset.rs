use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array2, Array3, ArrayView2, Axis};
use serde::{Serialize, Deserialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::io::npy::{read_array2, read_array3};

/// Image-quality metric, in the order they are stored along the metric axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Ssim,
    Psnr,
    Vif,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Ssim, Metric::Psnr, Metric::Vif];

    pub fn index(self) -> usize {
        match self {
            Metric::Ssim => 0,
            Metric::Psnr => 1,
            Metric::Vif => 2,
        }
    }

    /// Display name, also the stem of the chart file.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Ssim => "SSIM",
            Metric::Psnr => "pSNR",
            Metric::Vif => "VIF",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// MRI undersampling ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acceleration {
    #[serde(rename = "5x")]
    R5,
    #[serde(rename = "10x")]
    R10,
    #[serde(rename = "15x")]
    R15,
}

impl Acceleration {
    pub const ALL: [Acceleration; 3] = [Acceleration::R5, Acceleration::R10, Acceleration::R15];

    pub fn label(self) -> &'static str {
        match self {
            Acceleration::R5 => "5x",
            Acceleration::R10 => "10x",
            Acceleration::R15 => "15x",
        }
    }
}

impl fmt::Display for Acceleration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which reconstruction produced a metric set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Previous-scan registration baseline, evaluated at 5x only.
    Previous,
    Enhanced,
    NonEnhanced,
}

impl Condition {
    pub fn file_tag(self) -> &'static str {
        match self {
            Condition::Previous => "previous",
            Condition::Enhanced => "enhanced",
            Condition::NonEnhanced => "non_enhanced",
        }
    }

    /// `metrics_{condition}_{R}`, without extension.
    pub fn file_stem(self, accel: Acceleration) -> String {
        format!("metrics_{}_{}", self.file_tag(), accel.label())
    }
}

/// Per-slice values of one volume, one row per metric.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub metrics: Vec<Vec<f64>>,
}

impl Volume {
    pub fn slices(&self) -> usize {
        self.metrics.first().map(Vec::len).unwrap_or(0)
    }

    pub fn metric(&self, metric: Metric) -> &[f64] {
        &self.metrics[metric.index()]
    }
}

/// All volumes for one (condition, acceleration factor).
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    pub volumes: Vec<Volume>,
}

impl MetricSet {
    /// Builds a set from per-volume rows, checking that every volume carries
    /// all three metrics with one slice count.
    pub fn new(volumes: Vec<Volume>) -> Result<MetricSet> {
        for (v, volume) in volumes.iter().enumerate() {
            if volume.metrics.len() != Metric::ALL.len() {
                return Err(Error::Ragged(format!(
                    "volume {v} has {} metric rows, expected {}",
                    volume.metrics.len(),
                    Metric::ALL.len()
                )));
            }
            let slices = volume.slices();
            if volume.metrics.iter().any(|m| m.len() != slices) {
                return Err(Error::Ragged(format!(
                    "volume {v} has metrics of different slice counts"
                )));
            }
        }
        Ok(MetricSet { volumes })
    }

    /// `volumes × metrics × slices`.
    pub fn from_array3(arr: &Array3<f64>) -> Result<MetricSet> {
        let volumes = arr.axis_iter(Axis(0))
            .map(volume_from_rows)
            .collect();
        MetricSet::new(volumes)
    }

    /// One `metrics × slices` array per volume; slice counts may differ.
    pub fn from_volumes(arrays: &[Array2<f64>]) -> Result<MetricSet> {
        MetricSet::new(arrays.iter().map(|a| volume_from_rows(a.view())).collect())
    }

    pub fn total_slices(&self) -> usize {
        self.volumes.iter().map(Volume::slices).sum()
    }
}

fn volume_from_rows(rows: ArrayView2<f64>) -> Volume {
    Volume {
        metrics: rows.axis_iter(Axis(0)).map(|r| r.to_vec()).collect(),
    }
}

/// Loads `metrics_{condition}_{R}.npy` from `dir`, or, if that file is
/// absent, the per-volume files in the `metrics_{condition}_{R}/` directory.
pub fn load_metric_set(dir: &Path, condition: Condition, accel: Acceleration) -> Result<MetricSet> {
    let stem = condition.file_stem(accel);
    let file = dir.join(format!("{stem}.npy"));
    let set = if file.is_file() {
        debug!(path = %file.display(), "reading metric array");
        MetricSet::from_array3(&read_array3(&file)?)?
    } else {
        let volume_dir = dir.join(&stem);
        debug!(path = %volume_dir.display(), "reading per-volume metric arrays");
        let arrays = volume_files(&volume_dir)?
            .iter()
            .map(|p| read_array2(p))
            .collect::<Result<Vec<_>>>()?;
        MetricSet::from_volumes(&arrays)?
    };
    if set.volumes.is_empty() {
        return Err(Error::Empty("metric set has no volumes"));
    }
    info!(
        condition = condition.file_tag(),
        accel = accel.label(),
        volumes = set.volumes.len(),
        slices = set.total_slices(),
        "loaded metrics"
    );
    Ok(set)
}

/// `.npy` files in `dir`, ordered by numeric stem (`0.npy`, `1.npy`, ...,
/// `10.npy`); non-numeric stems sort after, by name.
fn volume_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().map(|e| e == "npy").unwrap_or(false))
        .collect();
    files.sort_by_key(|p| {
        let stem = p.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        (stem.parse::<u64>().unwrap_or(u64::MAX), stem)
    });
    Ok(files)
}

/// The three conditions, each indexed like `Acceleration::ALL`.
#[derive(Debug, Clone)]
pub struct ConditionSets {
    pub previous: Vec<MetricSet>,
    pub enhanced: Vec<MetricSet>,
    pub non_enhanced: Vec<MetricSet>,
}

impl ConditionSets {
    /// Loads every set. The previous method exists at 5x only, so its 5x
    /// file is read once and reused for all three acceleration factors.
    pub fn load(dir: &Path) -> Result<ConditionSets> {
        let previous_5x = load_metric_set(dir, Condition::Previous, Acceleration::R5)?;
        let previous = vec![previous_5x; Acceleration::ALL.len()];

        let load = |condition| {
            Acceleration::ALL.iter()
                .map(|&accel| load_metric_set(dir, condition, accel))
                .collect::<Result<Vec<_>>>()
        };

        Ok(ConditionSets {
            previous,
            enhanced: load(Condition::Enhanced)?,
            non_enhanced: load(Condition::NonEnhanced)?,
        })
    }

    pub fn get(&self, condition: Condition, accel: Acceleration) -> &MetricSet {
        let i = Acceleration::ALL.iter().position(|&a| a == accel).unwrap_or(0);
        match condition {
            Condition::Previous => &self.previous[i],
            Condition::Enhanced => &self.enhanced[i],
            Condition::NonEnhanced => &self.non_enhanced[i],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use ndarray_npy::write_npy;

    #[test]
    fn file_stems_follow_naming_pattern() {
        assert_eq!(Condition::NonEnhanced.file_stem(Acceleration::R10), "metrics_non_enhanced_10x");
        assert_eq!(Condition::Previous.file_stem(Acceleration::R5), "metrics_previous_5x");
    }

    #[test]
    fn array3_splits_into_volumes_and_metrics() {
        let arr = Array3::from_shape_fn((2, 3, 4), |(v, m, s)| (v * 100 + m * 10 + s) as f64);
        let set = MetricSet::from_array3(&arr).unwrap();
        assert_eq!(set.volumes.len(), 2);
        assert_eq!(set.volumes[1].metric(Metric::Psnr), &[110.0, 111.0, 112.0, 113.0]);
        assert_eq!(set.total_slices(), 8);
    }

    #[test]
    fn rejects_wrong_metric_count() {
        let arr = Array3::<f64>::zeros((1, 2, 5));
        assert!(matches!(MetricSet::from_array3(&arr), Err(Error::Ragged(_))));
    }

    #[test]
    fn per_volume_directory_is_read_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let vol_dir = dir.path().join("metrics_enhanced_10x");
        fs::create_dir(&vol_dir).unwrap();
        for v in [0usize, 2, 10] {
            let a: Array2<f64> = Array2::from_elem((3, 2 + v), v as f64);
            write_npy(vol_dir.join(format!("{v}.npy")), &a).unwrap();
        }
        let set = load_metric_set(dir.path(), Condition::Enhanced, Acceleration::R10).unwrap();
        let slices: Vec<usize> = set.volumes.iter().map(Volume::slices).collect();
        assert_eq!(slices, vec![2, 4, 12]);
    }

    #[test]
    fn single_file_takes_precedence() {
        let dir = tempfile::tempdir().unwrap();
        let arr = array![[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]];
        write_npy(dir.path().join("metrics_previous_5x.npy"), &arr).unwrap();
        let set = load_metric_set(dir.path(), Condition::Previous, Acceleration::R5).unwrap();
        assert_eq!(set.volumes[0].metric(Metric::Vif), &[5.0, 6.0]);
    }
}
