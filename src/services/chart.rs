use crate::error::AppError;
use crate::services::table::Table;
use serde::Serialize;
use std::collections::HashMap;

/// Default bucket count for histograms.
pub const DEFAULT_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Histogram,
    Scatter,
    Box,
    Area,
    Heatmap,
}

impl ChartKind {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "pie" => Ok(ChartKind::Pie),
            "line" => Ok(ChartKind::Line),
            "histogram" => Ok(ChartKind::Histogram),
            "scatter" => Ok(ChartKind::Scatter),
            "box" => Ok(ChartKind::Box),
            "area" => Ok(ChartKind::Area),
            "heatmap" => Ok(ChartKind::Heatmap),
            other => Err(AppError::UnknownChartKind(other.to_string())),
        }
    }

    /// Kinds that cannot be built from a single column.
    pub fn requires_y_axis(self) -> bool {
        matches!(self, ChartKind::Scatter | ChartKind::Box | ChartKind::Heatmap)
    }
}

#[derive(Debug, Clone)]
pub struct ChartRequest {
    pub columns: Vec<String>,
    pub kind: ChartKind,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxGroup {
    pub label: String,
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

/// Aggregated chart data, one variant per kind. Serialized as the embeddable
/// chart artifact; rendering to pixels is the client's job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ChartSpec {
    Bar {
        title: String,
        categories: Vec<String>,
        counts: Vec<usize>,
    },
    Pie {
        title: String,
        labels: Vec<String>,
        counts: Vec<usize>,
        proportions: Vec<f64>,
    },
    Line {
        title: String,
        values: Vec<Option<f64>>,
    },
    Histogram {
        title: String,
        bins: Vec<HistogramBin>,
    },
    Scatter {
        title: String,
        points: Vec<[f64; 2]>,
    },
    Box {
        title: String,
        groups: Vec<BoxGroup>,
    },
    Area {
        title: String,
        values: Vec<Option<f64>>,
    },
    Heatmap {
        title: String,
        x_labels: Vec<String>,
        y_labels: Vec<String>,
        cells: Vec<Vec<usize>>,
    },
}

/// Validates the request and dispatches on chart kind. Single-axis requests
/// produce one spec per selected column; two-axis requests produce one spec
/// for the pair.
pub fn build_charts(table: &Table, request: &ChartRequest) -> Result<Vec<ChartSpec>, AppError> {
    let x_axis = request.x_axis.as_deref().filter(|s| !s.is_empty());
    let y_axis = request.y_axis.as_deref().filter(|s| !s.is_empty());

    for column in &request.columns {
        if !table.has_column(column) {
            return Err(AppError::InvalidColumn(column.clone()));
        }
    }

    // Two-axis mode: every kind except bar/pie needs a valid y column.
    if let Some(x) = x_axis {
        if !table.has_column(x) {
            return Err(AppError::InvalidColumn(x.to_string()));
        }
        if matches!(request.kind, ChartKind::Bar | ChartKind::Pie) {
            return Ok(vec![single_column_chart(table, request.kind, x)?]);
        }
        let y = match y_axis {
            None => return Err(AppError::InvalidAxis("none selected".to_string())),
            Some(y) if !table.has_column(y) => {
                return Err(AppError::InvalidAxis(y.to_string()));
            }
            Some(y) => y,
        };
        return Ok(vec![axis_chart(table, request.kind, x, y)?]);
    }

    // Single-axis mode.
    if let Some(y) = y_axis {
        if !table.has_column(y) {
            return Err(AppError::InvalidAxis(y.to_string()));
        }
    }
    if request.kind.requires_y_axis() {
        return Err(AppError::InvalidAxis("none selected".to_string()));
    }
    if request.columns.is_empty() {
        return Err(AppError::MissingSelection);
    }

    request
        .columns
        .iter()
        .map(|column| single_column_chart(table, request.kind, column))
        .collect()
}

fn single_column_chart(
    table: &Table,
    kind: ChartKind,
    column: &str,
) -> Result<ChartSpec, AppError> {
    match kind {
        ChartKind::Bar => {
            let (categories, counts) = value_frequencies(table, column)?;
            Ok(ChartSpec::Bar {
                title: column.to_string(),
                categories,
                counts,
            })
        }
        ChartKind::Pie => {
            let (labels, counts) = value_frequencies(table, column)?;
            let total: usize = counts.iter().sum();
            let proportions = counts
                .iter()
                .map(|&c| {
                    if total == 0 {
                        0.0
                    } else {
                        c as f64 / total as f64
                    }
                })
                .collect();
            Ok(ChartSpec::Pie {
                title: column.to_string(),
                labels,
                counts,
                proportions,
            })
        }
        ChartKind::Line => Ok(ChartSpec::Line {
            title: column.to_string(),
            values: table.numeric_values(column)?,
        }),
        ChartKind::Area => Ok(ChartSpec::Area {
            title: column.to_string(),
            values: table.numeric_values(column)?,
        }),
        ChartKind::Histogram => Ok(ChartSpec::Histogram {
            title: column.to_string(),
            bins: histogram_bins(&non_null(table.numeric_values(column)?), DEFAULT_BINS),
        }),
        // Ruled out by validation in build_charts.
        ChartKind::Scatter | ChartKind::Box | ChartKind::Heatmap => Err(AppError::InvalidAxis(
            "none selected".to_string(),
        )),
    }
}

/// Two-axis chart construction. `y` has already been validated by
/// `build_charts`; bar/pie never reach here in two-axis mode but stay
/// buildable from the x column alone.
fn axis_chart(table: &Table, kind: ChartKind, x: &str, y: &str) -> Result<ChartSpec, AppError> {
    match kind {
        ChartKind::Bar | ChartKind::Pie => single_column_chart(table, kind, x),
        // Value-over-index kinds plot the y column.
        ChartKind::Line | ChartKind::Area | ChartKind::Histogram => {
            single_column_chart(table, kind, y)
        }
        ChartKind::Scatter => {
            let xs = table.numeric_values(x)?;
            let ys = table.numeric_values(y)?;
            let points = xs
                .into_iter()
                .zip(ys)
                .filter_map(|pair| match pair {
                    (Some(px), Some(py)) => Some([px, py]),
                    _ => None,
                })
                .collect();
            Ok(ChartSpec::Scatter {
                title: format!("{} vs {}", x, y),
                points,
            })
        }
        ChartKind::Box => {
            let labels = table.text_values(x)?;
            let values = table.numeric_values(y)?;

            let mut order: Vec<String> = Vec::new();
            let mut grouped: HashMap<String, Vec<f64>> = HashMap::new();
            for (label, value) in labels.into_iter().zip(values) {
                let (Some(label), Some(value)) = (label, value) else {
                    continue;
                };
                if !grouped.contains_key(&label) {
                    order.push(label.clone());
                }
                grouped.entry(label).or_default().push(value);
            }

            let groups = order
                .into_iter()
                .filter_map(|label| {
                    let values = grouped.remove(&label)?;
                    Some(box_group(label, values))
                })
                .collect();
            Ok(ChartSpec::Box {
                title: format!("{} by {}", y, x),
                groups,
            })
        }
        ChartKind::Heatmap => {
            let xs = table.text_values(x)?;
            let ys = table.text_values(y)?;

            let mut x_labels: Vec<String> = Vec::new();
            let mut y_labels: Vec<String> = Vec::new();
            let mut pairs: Vec<(usize, usize)> = Vec::new();
            for (xv, yv) in xs.into_iter().zip(ys) {
                let (Some(xv), Some(yv)) = (xv, yv) else {
                    continue;
                };
                let xi = index_of(&mut x_labels, xv);
                let yi = index_of(&mut y_labels, yv);
                pairs.push((xi, yi));
            }

            let mut cells = vec![vec![0usize; y_labels.len()]; x_labels.len()];
            for (xi, yi) in pairs {
                cells[xi][yi] += 1;
            }
            Ok(ChartSpec::Heatmap {
                title: format!("{} vs {}", x, y),
                x_labels,
                y_labels,
                cells,
            })
        }
    }
}

fn index_of(labels: &mut Vec<String>, label: String) -> usize {
    if let Some(idx) = labels.iter().position(|l| *l == label) {
        idx
    } else {
        labels.push(label);
        labels.len() - 1
    }
}

/// Distinct-value frequencies of a column's textual representation, descending
/// by count, ties broken by first appearance.
fn value_frequencies(table: &Table, column: &str) -> Result<(Vec<String>, Vec<usize>), AppError> {
    let cells = table.text_values(column)?;
    let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
    for (row, cell) in cells.into_iter().enumerate() {
        let Some(value) = cell else { continue };
        let entry = counts.entry(value).or_insert((0, row));
        entry.0 += 1;
    }

    let mut ranked: Vec<(String, usize, usize)> = counts
        .into_iter()
        .map(|(value, (count, first_row))| (value, count, first_row))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    Ok(ranked
        .into_iter()
        .map(|(value, count, _)| (value, count))
        .unzip())
}

fn non_null(values: Vec<Option<f64>>) -> Vec<f64> {
    values.into_iter().flatten().collect()
}

fn histogram_bins(values: &[f64], bin_count: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bin_count as f64;
    let mut bins: Vec<HistogramBin> = (0..bin_count)
        .map(|i| HistogramBin {
            lower: min + width * i as f64,
            upper: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for &value in values {
        let idx = (((value - min) / width) as usize).min(bin_count - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Linear-interpolation quantile over a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

fn box_group(label: String, mut values: Vec<f64>) -> BoxGroup {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let q1 = quantile(&values, 0.25);
    let median = quantile(&values, 0.5);
    let q3 = quantile(&values, 0.75);
    let iqr = q3 - q1;
    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    let outliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|&v| v < lower_fence || v > upper_fence)
        .collect();
    let inliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|&v| v >= lower_fence && v <= upper_fence)
        .collect();
    let lower_whisker = inliers.first().copied().unwrap_or(q1);
    let upper_whisker = inliers.last().copied().unwrap_or(q3);

    BoxGroup {
        label,
        lower_whisker,
        q1,
        median,
        q3,
        upper_whisker,
        outliers,
    }
}
