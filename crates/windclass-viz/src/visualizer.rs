use crate::render;
use std::path::PathBuf;
use tracing::debug;
use windclass_core::{ClassificationVisualizer, Error, FeatureMatrix, Label, Result};

#[derive(Debug, Clone)]
struct Scatter {
    name: String,
    axes: (String, String),
    x: Vec<f64>,
    y: Vec<f64>,
    labels: Vec<Label>,
}

#[derive(Debug, Clone)]
struct Labelled {
    name: String,
    values: Vec<f64>,
    labels: Vec<Label>,
}

#[derive(Debug, Clone)]
struct Curve {
    name: String,
    x: Vec<f64>,
    y: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Grid {
    name: String,
    xs: Vec<f64>,
    ys: Vec<f64>,
    labels: Vec<Label>,
}

#[derive(Debug, Clone)]
struct Density {
    name: String,
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    counts: Vec<usize>,
}

/// Collects diagnostics and writes one SVG chart per record
///
/// Feature scatters are drawn in `log10` of both axes when
/// `log_features` is set, matching how composition ratios and entropy are
/// usually shown.
#[derive(Debug, Clone)]
pub struct SvgVisualizer {
    size: (u32, u32),
    log_features: bool,
    scatters: Vec<Scatter>,
    speeds: Vec<Labelled>,
    curves: Vec<Curve>,
    grids: Vec<Grid>,
    densities: Vec<Density>,
}

impl Default for SvgVisualizer {
    fn default() -> Self {
        Self {
            size: (800, 600),
            log_features: true,
            scatters: Vec::new(),
            speeds: Vec::new(),
            curves: Vec::new(),
            grids: Vec::new(),
            densities: Vec::new(),
        }
    }
}

impl SvgVisualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn with_log_features(mut self, log_features: bool) -> Self {
        self.log_features = log_features;
        self
    }

    /// Number of charts that [`save_visualizations`](ClassificationVisualizer::save_visualizations) would write
    pub fn n_charts(&self) -> usize {
        self.scatters.len()
            + self.speeds.len()
            + self.curves.len()
            + self.grids.len()
            + self.densities.len()
    }

    pub fn clear(&mut self) {
        self.scatters.clear();
        self.speeds.clear();
        self.curves.clear();
        self.grids.clear();
        self.densities.clear();
    }
}

fn check_len(expected: usize, actual: usize, what: &str) -> Result<()> {
    if expected != actual {
        return Err(Error::size_mismatch(expected, actual, what));
    }
    Ok(())
}

fn file_name(prefix: &str, name: &str) -> PathBuf {
    let slug: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    PathBuf::from(format!("{prefix}_{slug}.svg"))
}

impl ClassificationVisualizer for SvgVisualizer {
    fn record_feature_scatter(
        &mut self,
        name: &str,
        axes: (&str, &str),
        x: &[f64],
        y: &[f64],
        labels: &[Label],
    ) -> Result<()> {
        check_len(x.len(), y.len(), "scatter coordinates")?;
        check_len(x.len(), labels.len(), "scatter labels")?;
        let (x, y, axes) = if self.log_features {
            (
                x.iter().map(|v| v.log10()).collect(),
                y.iter().map(|v| v.log10()).collect(),
                (format!("log10({})", axes.0), format!("log10({})", axes.1)),
            )
        } else {
            (x.to_vec(), y.to_vec(), (axes.0.to_string(), axes.1.to_string()))
        };
        self.scatters.push(Scatter {
            name: name.to_string(),
            axes,
            x,
            y,
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn record_embedding(
        &mut self,
        name: &str,
        embedding: &FeatureMatrix,
        labels: &[Label],
    ) -> Result<()> {
        if embedding.n_cols() < 2 {
            return Err(Error::InvalidInput(format!(
                "embedding needs two columns, has {}",
                embedding.n_cols()
            )));
        }
        check_len(embedding.n_rows(), labels.len(), "embedding labels")?;
        self.scatters.push(Scatter {
            name: name.to_string(),
            axes: ("umapx".to_string(), "umapy".to_string()),
            x: embedding.column(0),
            y: embedding.column(1),
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn record_speed_distribution(
        &mut self,
        name: &str,
        speed: &[f64],
        labels: &[Label],
    ) -> Result<()> {
        check_len(speed.len(), labels.len(), "speed labels")?;
        self.speeds.push(Labelled {
            name: name.to_string(),
            values: speed.to_vec(),
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn record_error_curve(&mut self, name: &str, thresholds: &[f64], errors: &[f64]) -> Result<()> {
        check_len(thresholds.len(), errors.len(), "error curve")?;
        self.curves.push(Curve {
            name: name.to_string(),
            x: thresholds.to_vec(),
            y: errors.to_vec(),
        });
        Ok(())
    }

    fn record_decision_grid(
        &mut self,
        name: &str,
        xs: &[f64],
        ys: &[f64],
        labels: &[Label],
    ) -> Result<()> {
        check_len(xs.len() * ys.len(), labels.len(), "decision grid")?;
        self.grids.push(Grid {
            name: name.to_string(),
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            labels: labels.to_vec(),
        });
        Ok(())
    }

    fn record_density(
        &mut self,
        name: &str,
        x_edges: &[f64],
        y_edges: &[f64],
        counts: &[usize],
    ) -> Result<()> {
        let cells = x_edges.len().saturating_sub(1) * y_edges.len().saturating_sub(1);
        check_len(cells, counts.len(), "density counts")?;
        self.densities.push(Density {
            name: name.to_string(),
            x_edges: x_edges.to_vec(),
            y_edges: y_edges.to_vec(),
            counts: counts.to_vec(),
        });
        Ok(())
    }

    fn save_visualizations(&self, output_prefix: &str) -> Result<Vec<String>> {
        let mut written = Vec::with_capacity(self.n_charts());
        let mut emit = |path: PathBuf| {
            debug!(path = %path.display(), "wrote chart");
            written.push(path.display().to_string());
        };

        for s in &self.scatters {
            let path = file_name(output_prefix, &s.name);
            let axes = (s.axes.0.as_str(), s.axes.1.as_str());
            render::scatter(&path, self.size, &s.name, axes, &s.x, &s.y, &s.labels)?;
            emit(path);
        }
        for s in &self.speeds {
            let path = file_name(output_prefix, &s.name);
            render::speed_histograms(&path, self.size, &s.name, &s.values, &s.labels)?;
            emit(path);
        }
        for c in &self.curves {
            let path = file_name(output_prefix, &c.name);
            render::error_curve(&path, self.size, &c.name, &c.x, &c.y)?;
            emit(path);
        }
        for g in &self.grids {
            let path = file_name(output_prefix, &g.name);
            render::decision_grid(&path, self.size, &g.name, &g.xs, &g.ys, &g.labels)?;
            emit(path);
        }
        for d in &self.densities {
            let path = file_name(output_prefix, &d.name);
            render::density(&path, self.size, &d.name, &d.x_edges, &d.y_edges, &d.counts)?;
            emit(path);
        }
        Ok(written)
    }
}
