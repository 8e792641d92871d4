//! Chart descriptions for each report and their PNG rendering.
//!
//! The `*_chart` builders are plain data and always available; drawing needs
//! the `web` feature (plotters + image).

use serde::Serialize;
use std::collections::BTreeSet;

use crate::reports::{CountrySales, CountrySegment, MonthlyRevenue, SubcategoryGender, WeekdaySales};

/// Direction the bars grow in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Categories along X, values up the Y axis
    Vertical,
    /// Categories along Y, values along the X axis
    Horizontal,
}

/// An RGBA colour, alpha in `0.0..=1.0`
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub f64);

/// Default series colours, applied in order
pub const PALETTE: [Rgba; 6] = [
    Rgba(31, 119, 180, 1.0),
    Rgba(255, 127, 14, 1.0),
    Rgba(44, 160, 44, 1.0),
    Rgba(214, 39, 40, 1.0),
    Rgba(148, 103, 189, 1.0),
    Rgba(140, 86, 75, 1.0),
];

const SALES_DIM: Rgba = Rgba(44, 160, 44, 0.5);
const SALES_BEST: Rgba = Rgba(44, 255, 44, 0.8);
const COUNT_DIM: Rgba = Rgba(31, 119, 180, 0.5);
const COUNT_BEST: Rgba = Rgba(31, 119, 180, 0.8);

/// One bar series
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    /// One value per category; gaps are drawn as zero-height bars
    pub values: Vec<f64>,
    /// One colour per category
    pub colors: Vec<Rgba>,
    /// Optional text shown inside each bar
    pub labels: Vec<String>,
}

impl Series {
    fn uniform(name: &str, values: Vec<f64>, color: Rgba) -> Self {
        Series {
            name: name.to_string(),
            colors: vec![color; values.len()],
            values,
            labels: Vec::new(),
        }
    }
}

/// Everything needed to draw one bar chart
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub orientation: Orientation,
    /// Series are stacked on top of each other instead of overlapping
    pub stacked: bool,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
}

impl ChartSpec {
    /// Upper bound of the value axis: the tallest stack (or bar) plus headroom
    pub fn value_max(&self) -> f64 {
        let n = self.categories.len();
        let max = if self.stacked {
            (0..n)
                .map(|i| {
                    self.series
                        .iter()
                        .map(|s| s.values.get(i).copied().unwrap_or(0.0).max(0.0))
                        .sum::<f64>()
                })
                .fold(0.0, f64::max)
        } else {
            self.series
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .fold(0.0, f64::max)
        };
        if max > 0.0 { max * 1.05 } else { 1.0 }
    }
}

/// Rendering size
///
/// # Default Configuration
/// * 800x600 pixels
#[derive(Clone, Copy, Debug)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}

/// Stacked monthly revenue, one series per store type
pub fn revenue_chart(report: &MonthlyRevenue) -> ChartSpec {
    let series = report
        .series
        .iter()
        .enumerate()
        .map(|(i, store)| {
            let mut series = Series::uniform(
                &store.store_type,
                store.values.iter().map(|v| v.unwrap_or(0.0)).collect(),
                PALETTE[i % PALETTE.len()],
            );
            series.labels = store.hover.iter().map(|h| h.clone().unwrap_or_default()).collect();
            series
        })
        .collect();

    ChartSpec {
        title: "Revenue".to_string(),
        orientation: Orientation::Vertical,
        stacked: true,
        categories: report
            .months
            .iter()
            .map(|m| m.format("%Y-%m").to_string())
            .collect(),
        series,
    }
}

/// Country ranking, largest market at the top
pub fn country_chart(report: &[CountrySales]) -> ChartSpec {
    let mut ranked: Vec<&CountrySales> = report.iter().collect();
    ranked.sort_by(|a, b| a.total.total_cmp(&b.total));

    ChartSpec {
        title: "Sales by country".to_string(),
        orientation: Orientation::Horizontal,
        stacked: false,
        categories: ranked.iter().map(|c| c.country.clone()).collect(),
        series: vec![Series::uniform(
            "Sales",
            ranked.iter().map(|c| c.total).collect(),
            PALETTE[0],
        )],
    }
}

/// Sub-category sales stacked by gender
pub fn subcategory_chart(category: &str, report: &[SubcategoryGender]) -> ChartSpec {
    ChartSpec {
        title: category.to_string(),
        orientation: Orientation::Horizontal,
        stacked: true,
        categories: report.iter().map(|r| r.subcategory.clone()).collect(),
        series: vec![
            Series::uniform(
                "F",
                report.iter().map(|r| r.female.unwrap_or(0.0)).collect(),
                PALETTE[0],
            ),
            Series::uniform(
                "M",
                report.iter().map(|r| r.male.unwrap_or(0.0)).collect(),
                PALETTE[1],
            ),
        ],
    }
}

/// Weekday sales value and transaction count, best day highlighted
pub fn weekday_chart(store_type: &str, report: &WeekdaySales) -> ChartSpec {
    let highlight = |i: usize, best: Rgba, dim: Rgba| {
        if report.best_day == Some(i) { best } else { dim }
    };
    let n = report.days.len();

    let sales = Series {
        name: "Sales value".to_string(),
        values: report.days.iter().map(|d| d.sales).collect(),
        colors: (0..n).map(|i| highlight(i, SALES_BEST, SALES_DIM)).collect(),
        labels: report.days.iter().map(|d| format!("{:.2}", d.sales)).collect(),
    };
    let counts = Series {
        name: "Transactions".to_string(),
        values: report.days.iter().map(|d| d.transactions as f64).collect(),
        colors: (0..n).map(|i| highlight(i, COUNT_BEST, COUNT_DIM)).collect(),
        labels: report.days.iter().map(|d| d.transactions.to_string()).collect(),
    };

    ChartSpec {
        title: store_type.to_string(),
        orientation: Orientation::Horizontal,
        stacked: true,
        categories: report.days.iter().map(|d| d.weekday.to_string()).collect(),
        series: vec![sales, counts],
    }
}

/// Customer segmentation: per-country bars split by gender
pub fn segments_chart(report: &[CountrySegment]) -> ChartSpec {
    let genders: BTreeSet<&str> = report
        .iter()
        .flat_map(|c| c.genders.iter().map(|g| g.gender.as_str()))
        .collect();

    let series = genders
        .into_iter()
        .enumerate()
        .map(|(i, gender)| {
            let values = report
                .iter()
                .map(|c| {
                    c.genders
                        .iter()
                        .find(|g| g.gender == gender)
                        .map_or(0.0, |g| g.count as f64)
                })
                .collect();
            Series::uniform(gender, values, PALETTE[i % PALETTE.len()])
        })
        .collect();

    ChartSpec {
        title: "Customer segmentation".to_string(),
        orientation: Orientation::Horizontal,
        stacked: true,
        categories: report.iter().map(|c| c.country.clone()).collect(),
        series,
    }
}

#[cfg(feature = "web")]
pub use render::render_png;

#[cfg(feature = "web")]
mod render {
    use plotters::prelude::*;

    use super::{ChartOptions, ChartSpec, Orientation, Rgba};
    use crate::error::{DashboardError, Result};

    const BAR_HALF_WIDTH: f64 = 0.4;

    fn render_err<E: std::fmt::Display>(e: E) -> DashboardError {
        DashboardError::Render(e.to_string())
    }

    fn color(c: Rgba) -> RGBAColor {
        RGBAColor(c.0, c.1, c.2, c.3)
    }

    /// Category name for a tick on the category axis, blank between bars
    fn category_label(categories: &[String], position: f64) -> String {
        let rounded = position.round();
        if (position - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        categories.get(rounded as usize).cloned().unwrap_or_default()
    }

    /// Bar rectangles as `(category index, low, high, series index)`
    fn bar_extents(spec: &ChartSpec) -> Vec<(usize, f64, f64, usize)> {
        let mut bars = Vec::new();
        let mut base = vec![0.0f64; spec.categories.len()];
        for (s_idx, series) in spec.series.iter().enumerate() {
            for (i, value) in series.values.iter().enumerate().take(base.len()) {
                let value = value.max(0.0);
                let low = if spec.stacked { base[i] } else { 0.0 };
                bars.push((i, low, low + value, s_idx));
                if spec.stacked {
                    base[i] += value;
                }
            }
        }
        bars
    }

    /// Draws a chart to PNG bytes
    ///
    /// The chart is drawn into an in-memory RGB buffer and then encoded,
    /// so nothing touches the filesystem.
    ///
    /// # Arguments
    /// * `spec` - What to draw
    /// * `options` - Output size
    ///
    /// # Returns
    /// * `Result<Vec<u8>>` - PNG bytes
    pub fn render_png(spec: &ChartSpec, options: ChartOptions) -> Result<Vec<u8>> {
        let (width, height) = (options.width, options.height);
        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let n = spec.categories.len();
            if n == 0 {
                root.titled(&spec.title, ("sans-serif", 30).into_font())
                    .map_err(render_err)?;
                root.present().map_err(render_err)?;
            } else {
                draw_bars(&root, spec)?;
            }
        }

        let image = image::RgbImage::from_raw(width, height, buffer)
            .ok_or_else(|| DashboardError::Render("pixel buffer size mismatch".to_string()))?;
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .map_err(render_err)?;
        Ok(png)
    }

    fn draw_bars(
        root: &DrawingArea<BitMapBackend<'_>, plotters::coord::Shift>,
        spec: &ChartSpec,
    ) -> Result<()> {
        let n = spec.categories.len();
        let category_range = -0.5f64..(n as f64 - 0.5);
        let value_range = 0f64..spec.value_max();
        let categories = &spec.categories;
        let label_of = |v: &f64| category_label(categories, *v);

        let mut builder = ChartBuilder::on(root);
        builder
            .caption(&spec.title, ("sans-serif", 30).into_font())
            .margin(10);

        let bars = bar_extents(spec);

        match spec.orientation {
            Orientation::Vertical => {
                let mut chart = builder
                    .x_label_area_size(40)
                    .y_label_area_size(60)
                    .build_cartesian_2d(category_range, value_range)
                    .map_err(render_err)?;
                chart
                    .configure_mesh()
                    .disable_x_mesh()
                    .x_labels(n)
                    .x_label_formatter(&label_of)
                    .draw()
                    .map_err(render_err)?;

                for (s_idx, series) in spec.series.iter().enumerate() {
                    let legend_color = color(series.colors.first().copied().unwrap_or(super::PALETTE[0]));
                    chart
                        .draw_series(bars.iter().filter(|b| b.3 == s_idx).map(|&(i, low, high, _)| {
                            let c = color(series.colors.get(i).copied().unwrap_or(super::PALETTE[0]));
                            Rectangle::new(
                                [(i as f64 - BAR_HALF_WIDTH, low), (i as f64 + BAR_HALF_WIDTH, high)],
                                c.filled(),
                            )
                        }))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], legend_color.filled()));
                }

                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(render_err)?;
            }
            Orientation::Horizontal => {
                let mut chart = builder
                    .x_label_area_size(40)
                    .y_label_area_size(140)
                    .build_cartesian_2d(value_range, category_range)
                    .map_err(render_err)?;
                chart
                    .configure_mesh()
                    .disable_y_mesh()
                    .y_labels(n)
                    .y_label_formatter(&label_of)
                    .draw()
                    .map_err(render_err)?;

                for (s_idx, series) in spec.series.iter().enumerate() {
                    let legend_color = color(series.colors.first().copied().unwrap_or(super::PALETTE[0]));
                    chart
                        .draw_series(bars.iter().filter(|b| b.3 == s_idx).map(|&(i, low, high, _)| {
                            let c = color(series.colors.get(i).copied().unwrap_or(super::PALETTE[0]));
                            Rectangle::new(
                                [(low, i as f64 - BAR_HALF_WIDTH), (high, i as f64 + BAR_HALF_WIDTH)],
                                c.filled(),
                            )
                        }))
                        .map_err(render_err)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], legend_color.filled()));

                    if !series.labels.is_empty() {
                        chart
                            .draw_series(bars.iter().filter(|b| b.3 == s_idx && b.2 > b.1).map(|&(i, low, high, _)| {
                                let text = series.labels.get(i).cloned().unwrap_or_default();
                                Text::new(text, ((low + high) / 2.0, i as f64), ("sans-serif", 12).into_font())
                            }))
                            .map_err(render_err)?;
                    }
                }

                chart
                    .configure_series_labels()
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()
                    .map_err(render_err)?;
            }
        }

        root.present().map_err(render_err)?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::charts::Series;

        #[test]
        fn stacked_bars_start_where_previous_series_ends() {
            let spec = ChartSpec {
                title: String::new(),
                orientation: Orientation::Vertical,
                stacked: true,
                categories: vec!["a".into(), "b".into()],
                series: vec![
                    Series::uniform("x", vec![1.0, 2.0], Rgba(0, 0, 0, 1.0)),
                    Series::uniform("y", vec![3.0, -1.0], Rgba(0, 0, 0, 1.0)),
                ],
            };
            let bars = bar_extents(&spec);
            assert_eq!(bars[2], (0, 1.0, 4.0, 1));
            assert_eq!(bars[3], (1, 2.0, 2.0, 1));
        }

        #[test]
        fn category_ticks_only_on_whole_positions() {
            let cats = vec!["Mon".to_string(), "Tue".to_string()];
            assert_eq!(category_label(&cats, 1.0), "Tue");
            assert_eq!(category_label(&cats, 0.5), "");
            assert_eq!(category_label(&cats, -0.5), "");
            assert_eq!(category_label(&cats, 7.0), "");
        }
    }
}
