//! Comparison of per-slice image-quality metrics across reconstruction
//! conditions and acceleration factors.

pub mod aggregate;
pub mod chart;
pub mod compare;
pub mod dataset;
pub mod wilcoxon;

pub use aggregate::{crop_slices, Aggregate, MetricAggregates, CROP_MARGIN};
pub use chart::BarChart;
pub use compare::{build_chart, compare, run_compare, CompareConfig, CompareReport};
pub use dataset::{load_metric_set, Acceleration, Condition, ConditionSets, Metric, MetricSet, Volume};
pub use wilcoxon::{wilcoxon, WilcoxonResult};
