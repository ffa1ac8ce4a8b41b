//! Chart drawing on the SVG backend

use plotters::prelude::*;
use std::path::Path;
use windclass_core::{Error, Label, Result, NOISE};

fn render_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Other(anyhow::anyhow!("plot rendering failed: {e}"))
}

/// Colour of a cluster label, grey for noise
pub fn label_color(label: Label) -> RGBColor {
    if label == NOISE {
        return RGBColor(128, 128, 128);
    }
    let c = Palette99::pick(label.max(0) as usize).to_rgba();
    RGBColor(c.0, c.1, c.2)
}

/// Padded `[min, max]` of the finite values, `(0, 1)` if there are none
pub fn finite_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> (f64, f64) {
    let (lo, hi) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { 0.05 * (hi - lo) } else { 0.5 };
    (lo - pad, hi + pad)
}

fn distinct_labels(labels: &[Label]) -> Vec<Label> {
    let mut distinct = labels.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    distinct
}

pub(crate) fn scatter(
    path: &Path,
    size: (u32, u32),
    title: &str,
    axes: (&str, &str),
    x: &[f64],
    y: &[f64],
    labels: &[Label],
) -> Result<()> {
    let (x_lo, x_hi) = finite_range(x);
    let (y_lo, y_hi) = finite_range(y);
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(render_error)?;
    chart
        .configure_mesh()
        .x_desc(axes.0)
        .y_desc(axes.1)
        .draw()
        .map_err(render_error)?;

    for label in distinct_labels(labels) {
        let color = label_color(label);
        let points = x
            .iter()
            .zip(y)
            .zip(labels)
            .filter(|((a, b), &l)| l == label && a.is_finite() && b.is_finite())
            .map(|((&a, &b), _)| Circle::new((a, b), 1, color.mix(0.5).filled()));
        chart
            .draw_series(points)
            .map_err(render_error)?
            .label(format!("cluster {label}"))
            .legend(move |(px, py)| Circle::new((px + 8, py), 4, color.filled()));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;
    root.present().map_err(render_error)
}

/// Per-cluster step histograms of bulk speed over 200 to 900 km/s
pub(crate) fn speed_histograms(
    path: &Path,
    size: (u32, u32),
    title: &str,
    speed: &[f64],
    labels: &[Label],
) -> Result<()> {
    const BINS: usize = 50;
    let (lo, hi) = (200.0, 900.0);
    let width = (hi - lo) / BINS as f64;

    let mut series = Vec::new();
    let mut y_max = 1usize;
    for label in distinct_labels(labels) {
        let values: Vec<f64> = speed
            .iter()
            .zip(labels)
            .filter(|(_, &l)| l == label)
            .map(|(&v, _)| v)
            .collect();
        let hist = windclass_core::stats::Histogram::new(&values, BINS, lo, hi);
        y_max = y_max.max(hist.counts.iter().copied().max().unwrap_or(0));
        series.push((label, hist));
    }

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0.0..(y_max as f64 * 1.1))
        .map_err(render_error)?;
    chart
        .configure_mesh()
        .x_desc("Solar wind speed, km/s")
        .y_desc("Counts")
        .draw()
        .map_err(render_error)?;

    for (label, hist) in series {
        let color = label_color(label);
        let steps = hist.counts.iter().enumerate().flat_map(|(i, &c)| {
            let left = lo + i as f64 * width;
            [(left, c as f64), (left + width, c as f64)]
        });
        chart
            .draw_series(LineSeries::new(steps, &color))
            .map_err(render_error)?
            .label(format!("cluster {label}"))
            .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], color));
    }
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(render_error)?;
    root.present().map_err(render_error)
}

/// Mismatch percentage against threshold, with the best threshold marked
pub(crate) fn error_curve(
    path: &Path,
    size: (u32, u32),
    title: &str,
    thresholds: &[f64],
    errors: &[f64],
) -> Result<()> {
    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let (x_lo, x_hi) = finite_range(thresholds);
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_lo..x_hi, 0.0..100.0)
        .map_err(render_error)?;
    chart
        .configure_mesh()
        .x_desc("Threshold speed, km/s")
        .y_desc("Abs. error, %")
        .draw()
        .map_err(render_error)?;

    let points: Vec<(f64, f64)> = thresholds
        .iter()
        .copied()
        .zip(errors.iter().copied())
        .filter(|(_, e)| e.is_finite())
        .collect();
    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLACK))
        .map_err(render_error)?;

    let best = points.iter().min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some(&(t, _)) = best {
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(t, 0.0), (t, 100.0)],
                RED.mix(0.6),
            )))
            .map_err(render_error)?;
    }
    root.present().map_err(render_error)
}

/// Filled cells, one per grid point, coloured by label
pub(crate) fn decision_grid(
    path: &Path,
    size: (u32, u32),
    title: &str,
    xs: &[f64],
    ys: &[f64],
    labels: &[Label],
) -> Result<()> {
    if xs.len() < 2 || ys.len() < 2 || labels.len() != xs.len() * ys.len() {
        return Err(Error::InvalidInput(format!(
            "decision grid of {} x {} points needs {} labels, got {}",
            xs.len(),
            ys.len(),
            xs.len() * ys.len(),
            labels.len()
        )));
    }
    let dx = (xs[1] - xs[0]) / 2.0;
    let dy = (ys[1] - ys[0]) / 2.0;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(
            (xs[0] - dx)..(xs[xs.len() - 1] + dx),
            (ys[0] - dy)..(ys[ys.len() - 1] + dy),
        )
        .map_err(render_error)?;
    chart.configure_mesh().draw().map_err(render_error)?;

    let cells = xs.iter().enumerate().flat_map(move |(i, &x)| {
        ys.iter().enumerate().map(move |(j, &y)| {
            let color = label_color(labels[i * ys.len() + j]);
            Rectangle::new([(x - dx, y - dy), (x + dx, y + dy)], color.mix(0.4).filled())
        })
    });
    chart.draw_series(cells).map_err(render_error)?;
    root.present().map_err(render_error)
}

/// Binned counts shaded by count relative to the fullest bin
pub(crate) fn density(
    path: &Path,
    size: (u32, u32),
    title: &str,
    x_edges: &[f64],
    y_edges: &[f64],
    counts: &[usize],
) -> Result<()> {
    let (nx, ny) = (x_edges.len().saturating_sub(1), y_edges.len().saturating_sub(1));
    if nx == 0 || ny == 0 || counts.len() != nx * ny {
        return Err(Error::InvalidInput(format!(
            "density of {nx} x {ny} bins needs {} counts, got {}",
            nx * ny,
            counts.len()
        )));
    }
    let max = counts.iter().copied().max().unwrap_or(0).max(1) as f64;

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE).map_err(render_error)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_edges[0]..x_edges[nx], y_edges[0]..y_edges[ny])
        .map_err(render_error)?;
    chart
        .configure_mesh()
        .x_desc("umapx")
        .y_desc("umapy")
        .draw()
        .map_err(render_error)?;

    let cells = (0..nx).flat_map(move |i| {
        (0..ny).filter_map(move |j| {
            let c = counts[i * ny + j];
            (c > 0).then(|| {
                Rectangle::new(
                    [(x_edges[i], y_edges[j]), (x_edges[i + 1], y_edges[j + 1])],
                    BLUE.mix(0.1 + 0.9 * c as f64 / max).filled(),
                )
            })
        })
    });
    chart.draw_series(cells).map_err(render_error)?;
    root.present().map_err(render_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finite_range() {
        assert_eq!(finite_range(&[f64::NAN]), (0.0, 1.0));
        assert_eq!(finite_range(&[2.0, 2.0]), (1.5, 2.5));
        let (lo, hi) = finite_range(&[0.0, f64::INFINITY, 10.0]);
        assert_eq!((lo, hi), (-0.5, 10.5));
    }

    #[test]
    fn test_noise_is_grey() {
        assert_eq!(label_color(NOISE), RGBColor(128, 128, 128));
        assert_ne!(label_color(0), label_color(1));
    }
}
