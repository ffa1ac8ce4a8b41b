//! Rectangles and binned densities in embedding space

use serde::{Deserialize, Serialize};

/// Closed rectangle `[x_min, x_max] x [y_min, y_max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Region {
    pub fn new(x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            x_min: x.0,
            x_max: x.1,
            y_min: y.0,
            y_max: y.1,
        }
    }

    /// Dense core of the unclustered records in the oriented ensemble
    pub fn localised_noise() -> Self {
        Self::new((4.5, 7.0), (3.5, 7.0))
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }
}

/// Bin layout of a [`DensityGrid`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub bins: usize,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            bins: 50,
            x_range: (-3.0, 13.0),
            y_range: (0.0, 12.0),
        }
    }
}

/// Two-dimensional histogram, last bin closed on the right
#[derive(Debug, Clone, PartialEq)]
pub struct DensityGrid {
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    /// Row-major by x bin: `counts[i * ny + j]`
    pub counts: Vec<usize>,
}

fn edges(bins: usize, (lo, hi): (f64, f64)) -> Vec<f64> {
    let width = (hi - lo) / bins as f64;
    (0..=bins).map(|i| lo + i as f64 * width).collect()
}

fn bin_of(v: f64, edges: &[f64]) -> Option<usize> {
    let bins = edges.len() - 1;
    let (lo, hi) = (edges[0], edges[bins]);
    if !v.is_finite() || v < lo || v > hi || hi <= lo {
        return None;
    }
    Some((((v - lo) / (hi - lo) * bins as f64) as usize).min(bins - 1))
}

impl DensityGrid {
    pub fn empty(spec: &GridSpec) -> Self {
        let bins = spec.bins.max(1);
        Self {
            x_edges: edges(bins, spec.x_range),
            y_edges: edges(bins, spec.y_range),
            counts: vec![0; bins * bins],
        }
    }

    pub fn from_points(x: &[f64], y: &[f64], spec: &GridSpec) -> Self {
        let mut grid = Self::empty(spec);
        for (&a, &b) in x.iter().zip(y) {
            grid.add(a, b);
        }
        grid
    }

    /// Count one point; points outside the grid are dropped
    pub fn add(&mut self, x: f64, y: f64) {
        let ny = self.y_edges.len() - 1;
        if let (Some(i), Some(j)) = (bin_of(x, &self.x_edges), bin_of(y, &self.y_edges)) {
            self.counts[i * ny + j] += 1;
        }
    }

    pub fn get(&self, i: usize, j: usize) -> usize {
        self.counts[i * (self.y_edges.len() - 1) + j]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    pub fn x_centers(&self) -> Vec<f64> {
        self.x_edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect()
    }

    pub fn y_centers(&self) -> Vec<f64> {
        self.y_edges.windows(2).map(|e| 0.5 * (e[0] + e[1])).collect()
    }
}
