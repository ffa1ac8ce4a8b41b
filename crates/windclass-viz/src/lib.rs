//! SVG diagnostic plots for solar wind classifications
//!
//! [`SvgVisualizer`] implements
//! [`ClassificationVisualizer`](windclass_core::ClassificationVisualizer):
//! pipeline stages record scatters, speed distributions, threshold error
//! curves, decision grids and ensemble densities, and
//! `save_visualizations` renders each to `<prefix>_<name>.svg` with
//! `plotters`.

mod render;
mod visualizer;

pub use render::{finite_range, label_color};
pub use visualizer::SvgVisualizer;
