use std::f64::consts::PI;
use std::path::Path;

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};

pub const BAR_WIDTH: f64 = 0.3;
/// Centre of the first grouped bar at each acceleration factor, relative to
/// its tick.
pub const GROUP_OFFSET: f64 = 0.85;

/// One bar with a symmetric error bar, centred on `x`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub x: f64,
    pub height: f64,
    pub error: f64,
}

/// Bars of one legend entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub label: String,
    pub color: (u8, u8, u8),
    pub bars: Vec<Bar>,
}

/// A `***` bracket joining two bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub x1: f64,
    pub x2: f64,
    pub y: f64,
    pub h: f64,
    pub text: String,
}

impl Bracket {
    /// Polyline: up from `x1`, across, down to `x2`.
    pub fn path(&self) -> [(f64, f64); 4] {
        let top = self.y + self.h;
        [(self.x1, self.y), (self.x1, top), (self.x2, top), (self.x2, self.y)]
    }
}

/// Everything needed to draw one grouped bar chart, independent of the
/// drawing backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub y_label: String,
    pub series: Vec<BarSeries>,
    pub brackets: Vec<Bracket>,
    /// Tick label at integer x positions 0, 1, 2, ...
    pub x_ticks: Vec<String>,
}

impl BarChart {
    pub fn x_range(&self) -> (f64, f64) {
        (-0.5, self.x_ticks.len() as f64 - 0.5)
    }

    /// Headroom above the tallest error bar or bracket label.
    pub fn y_max(&self) -> f64 {
        let bars = self.series.iter()
            .flat_map(|s| s.bars.iter())
            .map(|b| b.height + b.error);
        let brackets = self.brackets.iter().map(|b| b.y + b.h);
        bars.chain(brackets).fold(0.0, f64::max) * 1.1
    }

    pub fn render(&self, path: &Path, size: (u32, u32)) -> Result<()> {
        self.draw(path, size).map_err(|e| Error::Chart(e.to_string()))
    }

    fn draw(&self, path: &Path, size: (u32, u32)) -> std::result::Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;

        let (x_lo, x_hi) = self.x_range();
        let y_hi = self.y_max().max(f64::EPSILON);
        let mut chart = ChartBuilder::on(&root)
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)?;

        let ticks = self.x_ticks.clone();
        let tick_label = move |x: &f64| {
            let nearest = x.round();
            if (x - nearest).abs() < 1e-6 && nearest >= 0.0 {
                ticks.get(nearest as usize).cloned().unwrap_or_default()
            } else {
                String::new()
            }
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(2 * self.x_ticks.len() + 2)
            .x_label_formatter(&tick_label)
            .y_desc(self.y_label.as_str())
            .axis_desc_style(("sans-serif", 24).into_font().style(FontStyle::Bold))
            .label_style(("sans-serif", 20))
            .draw()?;

        for series in &self.series {
            let (r, g, b) = series.color;
            let color = RGBColor(r, g, b);
            chart
                .draw_series(series.bars.iter().map(|bar| {
                    let half = BAR_WIDTH / 2.0;
                    Rectangle::new([(bar.x - half, 0.0), (bar.x + half, bar.height)], color.filled())
                }))?
                .label(series.label.as_str())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 18, y + 6)], color.filled()));

            chart.draw_series(series.bars.iter().map(|bar| {
                PathElement::new(
                    vec![(bar.x, bar.height - bar.error), (bar.x, bar.height + bar.error)],
                    BLACK.stroke_width(2),
                )
            }))?;
        }

        let label_style = TextStyle::from(("sans-serif", 22).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Bottom));
        for bracket in &self.brackets {
            chart.draw_series(std::iter::once(PathElement::new(
                bracket.path().to_vec(),
                BLACK.stroke_width(2),
            )))?;
            chart.draw_series(std::iter::once(Text::new(
                bracket.text.clone(),
                ((bracket.x1 + bracket.x2) / 2.0, bracket.y + bracket.h),
                label_style.clone(),
            )))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 20))
            .draw()?;

        root.present()?;
        Ok(())
    }
}

/// Samples the default cubehelix colour map (start 0.5, rotation -1.5,
/// hue 1.0, gamma 1.0) at `n` evenly spaced interior points.
pub fn cubehelix_palette(n: usize) -> Vec<(u8, u8, u8)> {
    (1..=n)
        .map(|i| {
            let x = i as f64 / (n + 1) as f64;
            let angle = 2.0 * PI * (0.5 / 3.0 - 1.5 * x);
            let amp = x * (1.0 - x) / 2.0;
            let (c, s) = (angle.cos(), angle.sin());
            let channel = |p: f64, q: f64| {
                let v = x + amp * (p * c + q * s);
                (v.clamp(0.0, 1.0) * 255.0).round() as u8
            };
            (
                channel(-0.14861, 1.78277),
                channel(-0.29227, -0.90649),
                channel(1.97294, 0.0),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart() -> BarChart {
        BarChart {
            y_label: "SSIM".into(),
            series: vec![BarSeries {
                label: "a".into(),
                color: (0, 0, 0),
                bars: vec![Bar { x: 0.85, height: 0.8, error: 0.1 }],
            }],
            brackets: vec![Bracket { x1: 0.85, x2: 1.15, y: 1.05, h: 0.05, text: "***".into() }],
            x_ticks: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn bracket_path_has_two_legs() {
        let chart = chart();
        let b = &chart.brackets[0];
        let expected = [(0.85, 1.05), (0.85, 1.1), (1.15, 1.1), (1.15, 1.05)];
        for (got, want) in b.path().iter().zip(expected) {
            assert!((got.0 - want.0).abs() < 1e-12 && (got.1 - want.1).abs() < 1e-12);
        }
    }

    #[test]
    fn y_axis_clears_bracket_labels() {
        assert!((chart().y_max() - 1.1 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn palette_runs_dark_to_light() {
        let p = cubehelix_palette(3);
        assert_eq!(p.len(), 3);
        let luma = |(r, g, b): (u8, u8, u8)| r as u32 + g as u32 + b as u32;
        assert!(luma(p[0]) < luma(p[1]) && luma(p[1]) < luma(p[2]));
    }
}
