use std::fs;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::metrics::aggregate::{MetricAggregates, CROP_MARGIN};
use crate::metrics::chart::{cubehelix_palette, Bar, BarChart, BarSeries, Bracket, BAR_WIDTH, GROUP_OFFSET};
use crate::metrics::dataset::{Acceleration, ConditionSets, Metric};
use crate::metrics::wilcoxon::{wilcoxon, WilcoxonResult};

/// Acceleration factor at which enhanced and non-enhanced are tested.
pub const SIGNIFICANCE_ACCELERATION: Acceleration = Acceleration::R5;

/// Bracket placement `[y, h]` for one metric's significance annotations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub y: f64,
    pub h: f64,
}

/// Settings for a comparison run. Every field has a default, so a partial
/// JSON file is enough.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareConfig {
    /// Directory holding the `metrics_{condition}_{R}` inputs.
    pub metrics_dir: PathBuf,
    /// Directory the `{metric}.png` charts are written to.
    pub figures_dir: PathBuf,
    /// Optional JSON dump of the full report.
    pub report_path: Option<PathBuf>,
    pub render_charts: bool,
    /// Chart size in pixels.
    pub figure_size: (u32, u32),
    pub ssim_annotation: Annotation,
    pub psnr_annotation: Annotation,
    pub vif_annotation: Annotation,
    pub significance_text: String,
    pub single_visit_label: String,
    pub multi_visit_label: String,
    pub previous_label: String,
    pub x_ticks: Vec<String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        CompareConfig {
            metrics_dir: PathBuf::from("data/metrics"),
            figures_dir: PathBuf::from("figures"),
            report_path: None,
            render_charts: true,
            figure_size: (1920, 1440),
            ssim_annotation: Annotation { y: 1.05, h: 0.05 },
            psnr_annotation: Annotation { y: 50.0, h: 2.5 },
            vif_annotation: Annotation { y: 1.05, h: 0.05 },
            significance_text: "***".into(),
            single_visit_label: "single-visit".into(),
            multi_visit_label: "multi-visit".into(),
            previous_label: "previous".into(),
            x_ticks: vec!["PS_reg".into(), "R=5x".into(), "R=10x".into(), "R=15x".into()],
        }
    }
}

impl CompareConfig {
    pub fn annotation(&self, metric: Metric) -> Annotation {
        match metric {
            Metric::Ssim => self.ssim_annotation,
            Metric::Psnr => self.psnr_annotation,
            Metric::Vif => self.vif_annotation,
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<CompareConfig> {
        let file = fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Aggregates of every condition at one acceleration factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSummary {
    pub acceleration: Acceleration,
    pub previous: MetricAggregates,
    pub non_enhanced: MetricAggregates,
    pub enhanced: MetricAggregates,
    /// Means without the boundary crop, for reference.
    pub non_enhanced_uncropped: MetricAggregates,
    pub enhanced_uncropped: MetricAggregates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignificanceTest {
    pub metric: Metric,
    pub acceleration: Acceleration,
    pub result: WilcoxonResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareReport {
    /// In `Acceleration::ALL` order.
    pub summaries: Vec<AccelerationSummary>,
    /// In `Metric::ALL` order.
    pub tests: Vec<SignificanceTest>,
}

impl CompareReport {
    pub fn summary(&self, accel: Acceleration) -> Option<&AccelerationSummary> {
        self.summaries.iter().find(|s| s.acceleration == accel)
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let file = fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Crops, aggregates and tests the loaded metric sets.
pub fn compare(sets: &ConditionSets) -> Result<CompareReport> {
    let mut summaries = Vec::with_capacity(Acceleration::ALL.len());
    for (i, &accel) in Acceleration::ALL.iter().enumerate() {
        let enhanced = &sets.enhanced[i];
        let non_enhanced = &sets.non_enhanced[i];
        summaries.push(AccelerationSummary {
            acceleration: accel,
            previous: MetricAggregates::of(&sets.previous[i].cropped(CROP_MARGIN)?)?,
            non_enhanced: MetricAggregates::of(&non_enhanced.cropped(CROP_MARGIN)?)?,
            enhanced: MetricAggregates::of(&enhanced.cropped(CROP_MARGIN)?)?,
            non_enhanced_uncropped: MetricAggregates::of(non_enhanced)?,
            enhanced_uncropped: MetricAggregates::of(enhanced)?,
        });
    }

    let accel = SIGNIFICANCE_ACCELERATION;
    let i = Acceleration::ALL.iter().position(|&a| a == accel).unwrap_or(0);
    let enhanced = sets.enhanced[i].cropped(CROP_MARGIN)?;
    let non_enhanced = sets.non_enhanced[i].cropped(CROP_MARGIN)?;
    let tests = Metric::ALL.iter()
        .map(|&metric| {
            let result = wilcoxon(&enhanced.pooled(metric), &non_enhanced.pooled(metric))?;
            Ok(SignificanceTest { metric, acceleration: accel, result })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CompareReport { summaries, tests })
}

/// Lays out the grouped bar chart for one metric: the previous method at
/// tick 0, then single-visit and multi-visit side by side at each
/// acceleration factor, bracketed by the significance marker.
pub fn build_chart(report: &CompareReport, metric: Metric, config: &CompareConfig) -> BarChart {
    let palette = cubehelix_palette(3);
    let grouped = |pick: fn(&AccelerationSummary) -> &MetricAggregates, shift: f64| {
        report.summaries.iter().enumerate()
            .map(|(i, s)| {
                let agg = pick(s).get(metric);
                Bar { x: GROUP_OFFSET + i as f64 + shift, height: agg.mean, error: agg.std }
            })
            .collect::<Vec<_>>()
    };

    let mut series = vec![
        BarSeries {
            label: config.single_visit_label.clone(),
            color: palette[0],
            bars: grouped(|s| &s.non_enhanced, 0.0),
        },
        BarSeries {
            label: config.multi_visit_label.clone(),
            color: palette[1],
            bars: grouped(|s| &s.enhanced, BAR_WIDTH),
        },
    ];
    if let Some(first) = report.summaries.first() {
        let agg = first.previous.get(metric);
        series.push(BarSeries {
            label: config.previous_label.clone(),
            color: palette[2],
            bars: vec![Bar { x: 0.0, height: agg.mean, error: agg.std }],
        });
    }

    let annotation = config.annotation(metric);
    let brackets = (0..report.summaries.len())
        .map(|i| {
            let x1 = GROUP_OFFSET + i as f64;
            Bracket {
                x1,
                x2: x1 + BAR_WIDTH,
                y: annotation.y,
                h: annotation.h,
                text: config.significance_text.clone(),
            }
        })
        .collect();

    BarChart {
        y_label: metric.name().to_string(),
        series,
        brackets,
        x_ticks: config.x_ticks.clone(),
    }
}

/// Loads the metric sets, prints the aggregates and test results, writes
/// one chart per metric, and optionally dumps the report as JSON.
pub fn run_compare(config: &CompareConfig) -> Result<CompareReport> {
    info!(dir = %config.metrics_dir.display(), "loading metric sets");
    let sets = ConditionSets::load(&config.metrics_dir)?;
    let report = compare(&sets)?;

    for s in &report.summaries {
        for metric in Metric::ALL {
            info!(
                accel = s.acceleration.label(),
                metric = metric.name(),
                previous = s.previous.get(metric).mean,
                non_enhanced = s.non_enhanced.get(metric).mean,
                non_enhanced_std = s.non_enhanced.get(metric).std,
                enhanced = s.enhanced.get(metric).mean,
                enhanced_std = s.enhanced.get(metric).std,
                non_enhanced_uncropped = s.non_enhanced_uncropped.get(metric).mean,
                enhanced_uncropped = s.enhanced_uncropped.get(metric).mean,
                "cropped aggregates"
            );
        }
    }
    for t in &report.tests {
        println!("{} @ {}: {}", t.metric, t.acceleration, t.result);
        if t.result.pvalue >= 0.001 {
            warn!(
                metric = t.metric.name(),
                pvalue = t.result.pvalue,
                "difference is not significant at the annotated level"
            );
        }
    }

    if config.render_charts {
        fs::create_dir_all(&config.figures_dir)?;
        for metric in Metric::ALL {
            let path = config.figures_dir.join(format!("{}.png", metric.name()));
            build_chart(&report, metric, config).render(&path, config.figure_size)?;
            info!(path = %path.display(), "wrote chart");
        }
    }

    if let Some(path) = &config.report_path {
        report.save_json(path)?;
        info!(path = %path.display(), "wrote report");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::dataset::{MetricSet, Volume};

    fn set(volumes: usize, slices: usize, f: impl Fn(usize, usize, usize) -> f64) -> MetricSet {
        let volumes = (0..volumes)
            .map(|v| Volume {
                metrics: (0..3).map(|m| (0..slices).map(|s| f(v, m, s)).collect()).collect(),
            })
            .collect();
        MetricSet::new(volumes).unwrap()
    }

    fn sets() -> ConditionSets {
        // Boundary slices carry a large outlier so cropping is observable.
        let value = |base: f64| move |_v: usize, m: usize, s: usize| {
            if s < 20 || s >= 50 { 1000.0 } else { base + m as f64 + (s % 5) as f64 * 0.01 }
        };
        let previous = set(2, 70, value(0.5));
        ConditionSets {
            previous: vec![previous.clone(), previous.clone(), previous],
            enhanced: (0..3).map(|r| set(2, 70, value(0.9 - r as f64 * 0.1))).collect(),
            non_enhanced: (0..3).map(|r| set(2, 70, value(0.8 - r as f64 * 0.1))).collect(),
        }
    }

    #[test]
    fn cropped_aggregates_ignore_boundary_slices() {
        let report = compare(&sets()).unwrap();
        let s5 = report.summary(Acceleration::R5).unwrap();
        assert!((s5.enhanced.get(Metric::Ssim).mean - 0.92).abs() < 1e-9);
        assert!((s5.non_enhanced.get(Metric::Psnr).mean - 1.82).abs() < 1e-9);
        assert_eq!(s5.enhanced.ssim.count, 2 * 30);
        assert!(s5.enhanced_uncropped.get(Metric::Ssim).mean > 100.0);
        let s15 = report.summary(Acceleration::R15).unwrap();
        assert!((s15.enhanced.get(Metric::Ssim).mean - 0.72).abs() < 1e-9);
        // Previous is the same 5x data at every factor.
        assert_eq!(s15.previous, s5.previous);
    }

    #[test]
    fn tests_run_per_metric_at_five_x() {
        let report = compare(&sets()).unwrap();
        assert_eq!(report.tests.len(), 3);
        for (t, metric) in report.tests.iter().zip(Metric::ALL) {
            assert_eq!(t.metric, metric);
            assert_eq!(t.acceleration, Acceleration::R5);
            // Enhanced exceeds non-enhanced on every slice.
            assert_eq!(t.result.statistic, 0.0);
            assert!(t.result.pvalue < 1e-6);
        }
    }

    #[test]
    fn chart_layout_matches_grouped_positions() {
        let report = compare(&sets()).unwrap();
        let config = CompareConfig::default();
        let chart = build_chart(&report, Metric::Psnr, &config);
        assert_eq!(chart.y_label, "pSNR");
        let xs = |i: usize| chart.series[i].bars.iter().map(|b| b.x).collect::<Vec<_>>();
        let close = |a: &[f64], b: &[f64]| a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-12);
        assert!(close(&xs(0), &[0.85, 1.85, 2.85]));
        assert!(close(&xs(1), &[1.15, 2.15, 3.15]));
        assert_eq!(xs(2), vec![0.0]);
        assert_eq!(chart.series[0].label, "single-visit");
        assert_eq!(chart.series[1].label, "multi-visit");
        assert_eq!(chart.series[2].label, "previous");
        assert_eq!(chart.brackets.len(), 3);
        assert!(chart.brackets.iter().all(|b| b.y == 50.0 && b.h == 2.5 && b.text == "***"));
        assert!((chart.brackets[2].x2 - 3.15).abs() < 1e-12);
    }

    #[test]
    fn partial_config_takes_defaults() {
        let config: CompareConfig = serde_json::from_str(r#"{"metrics_dir": "m"}"#).unwrap();
        assert_eq!(config.metrics_dir, PathBuf::from("m"));
        assert_eq!(config.annotation(Metric::Ssim), Annotation { y: 1.05, h: 0.05 });
        assert!(config.render_charts);
    }
}
