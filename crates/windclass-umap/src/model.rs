use crate::curve::find_ab_params;
use crate::fuzzy::{fuzzy_union, membership_strengths, smooth_knn_dist, SparseGraph};
use crate::layout::{optimize_layout, LayoutSchedule};
use crate::params::{InitStrategy, UmapParameters};
use crate::spectral::{connected_components, spectral_layout};
use rand::{thread_rng, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Normal;
use tracing::{debug, instrument};
use windclass_core::{
    knn_query, knn_self, ConfigurableEstimator, Embedder, Error, EstimatorProperties,
    FeatureMatrix, FittedEmbedding, Result,
};

/// UMAP estimator
///
/// # Example
///
/// ```rust,ignore
/// use windclass_umap::Umap;
/// use windclass_core::{Embedder, FittedEmbedding, Metric};
///
/// let umap = Umap::new()
///     .with_n_neighbors(40)
///     .with_metric(Metric::Correlation)
///     .with_min_dist(0.0)
///     .with_spread(0.5)
///     .with_random_state(1)
///     .fit(&scaled)?;
/// let projected = umap.transform(&scaled_full)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct Umap {
    params: UmapParameters,
}

impl Umap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.params.n_neighbors = n_neighbors;
        self
    }

    pub fn with_metric(mut self, metric: windclass_core::Metric) -> Self {
        self.params.metric = metric;
        self
    }

    pub fn with_n_components(mut self, n_components: usize) -> Self {
        self.params.n_components = n_components;
        self
    }

    pub fn with_min_dist(mut self, min_dist: f64) -> Self {
        self.params.min_dist = min_dist;
        self
    }

    pub fn with_spread(mut self, spread: f64) -> Self {
        self.params.spread = spread;
        self
    }

    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.params.n_epochs = Some(n_epochs);
        self
    }

    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.params.init = init;
        self
    }

    /// Seed the fit for reproducible embeddings
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.params.random_state = Some(seed);
        self
    }

    pub fn with_transform_seed(mut self, seed: u64) -> Self {
        self.params.transform_seed = seed;
        self
    }

    fn validate(&self, x: &FeatureMatrix) -> Result<()> {
        let p = &self.params;
        if p.n_neighbors < 2 {
            return Err(Error::InvalidParameter(format!(
                "n_neighbors must be at least 2, got {}",
                p.n_neighbors
            )));
        }
        if p.n_components == 0 {
            return Err(Error::InvalidParameter(
                "n_components must be positive".to_string(),
            ));
        }
        if p.negative_sample_rate == 0 || p.learning_rate <= 0.0 {
            return Err(Error::InvalidParameter(
                "negative_sample_rate and learning_rate must be positive".to_string(),
            ));
        }
        x.ensure_rows(self.minimum_sample_size())?;
        x.ensure_finite("embedding input")
    }

    fn initial_layout(&self, graph: &SparseGraph, n: usize, rng: &mut ChaCha8Rng) -> Vec<f64> {
        let dim = self.params.n_components;
        let random = |rng: &mut ChaCha8Rng| -> Vec<f64> {
            (0..n * dim).map(|_| rng.gen_range(-10.0..10.0)).collect()
        };

        match self.params.init {
            InitStrategy::Random => random(rng),
            InitStrategy::Spectral => {
                let components = connected_components(graph, n);
                let spectral = if components == 1 {
                    spectral_layout(graph, n, dim, rng)
                } else {
                    debug!(components, "graph is disconnected, using random initialisation");
                    None
                };
                match spectral {
                    Some(mut layout) => {
                        let max_abs = layout.iter().fold(0.0f64, |m, v| m.max(v.abs()));
                        let expansion = if max_abs > 0.0 { 10.0 / max_abs } else { 1.0 };
                        let jitter = Normal::new(0.0, 1e-4).ok();
                        for v in layout.iter_mut() {
                            *v *= expansion;
                            if let Some(noise) = &jitter {
                                *v += rng.sample(noise);
                            }
                        }
                        layout
                    }
                    None => random(rng),
                }
            }
        }
    }
}

impl ConfigurableEstimator for Umap {
    type Parameters = UmapParameters;

    fn with_parameters(params: UmapParameters) -> Self {
        Self { params }
    }

    fn parameters(&self) -> &UmapParameters {
        &self.params
    }
}

impl EstimatorProperties for Umap {
    fn algorithm_name(&self) -> &'static str {
        "UMAP"
    }

    fn minimum_sample_size(&self) -> usize {
        self.params.n_neighbors.max(self.params.n_components + 2)
    }
}

/// Rescale every output dimension onto `[0, 10]`
fn normalize_layout(layout: &mut [f64], dim: usize) {
    for d in 0..dim {
        let column = layout.iter().skip(d).step_by(dim);
        let (lo, hi) = column.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
        let range = hi - lo;
        for v in layout.iter_mut().skip(d).step_by(dim) {
            *v = if range > 0.0 { 10.0 * (*v - lo) / range } else { 0.0 };
        }
    }
}

impl Embedder for Umap {
    type Fitted = FittedUmap;

    #[instrument(
        skip(self, x),
        fields(n = x.n_rows(), d = x.n_cols(), k = self.params.n_neighbors, metric = self.params.metric.name())
    )]
    fn fit(&self, x: &FeatureMatrix) -> Result<FittedUmap> {
        self.validate(x)?;
        let p = &self.params;
        let n = x.n_rows();
        let dim = p.n_components;
        let seed = p.random_state.unwrap_or_else(|| thread_rng().gen());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let (a, b) = find_ab_params(p.spread, p.min_dist)?;

        let knn = knn_self(x, p.n_neighbors, p.metric)?;
        let (sigmas, rhos) = smooth_knn_dist(&knn, p.n_neighbors as f64, p.local_connectivity);
        let mut graph = fuzzy_union(&membership_strengths(&knn, &sigmas, &rhos, true));
        debug!(edges = graph.len(), a, b, "built fuzzy simplicial set");

        let n_epochs = p.fit_epochs(n);
        graph.prune_for_epochs(n_epochs);

        let mut layout = self.initial_layout(&graph, n, &mut rng);
        normalize_layout(&mut layout, dim);

        let schedule = LayoutSchedule {
            a,
            b,
            n_epochs,
            initial_alpha: p.learning_rate,
            negative_sample_rate: p.negative_sample_rate,
            gamma: p.repulsion_strength,
        };
        optimize_layout(&mut layout, None, dim, &graph, schedule, &mut rng);
        debug!(n_epochs, "embedding optimised");

        Ok(FittedUmap {
            params: p.clone(),
            a,
            b,
            training: x.clone(),
            embedding: FeatureMatrix::new(layout, n, dim)?,
        })
    }
}

/// A fitted UMAP embedding
///
/// Keeps the training data so new points can be placed relative to it.
#[derive(Debug, Clone)]
pub struct FittedUmap {
    params: UmapParameters,
    a: f64,
    b: f64,
    training: FeatureMatrix,
    embedding: FeatureMatrix,
}

impl FittedUmap {
    pub fn parameters(&self) -> &UmapParameters {
        &self.params
    }

    /// Fitted curve parameters `(a, b)`
    pub fn curve(&self) -> (f64, f64) {
        (self.a, self.b)
    }

    pub fn n_features(&self) -> usize {
        self.training.n_cols()
    }
}

impl FittedEmbedding for FittedUmap {
    fn embedding(&self) -> &FeatureMatrix {
        &self.embedding
    }

    /// Place new points against the frozen training embedding
    ///
    /// Each point starts at the membership-weighted mean of its training
    /// neighbours and is then refined with the training layout held fixed.
    /// The optimisation is seeded by `transform_seed`, so repeated calls on
    /// the same input give identical output.
    #[instrument(skip(self, x), fields(n = x.n_rows()))]
    fn transform(&self, x: &FeatureMatrix) -> Result<FeatureMatrix> {
        if x.n_cols() != self.training.n_cols() {
            return Err(Error::dimension_mismatch(self.training.n_cols(), x.n_cols()));
        }
        x.ensure_finite("embedding transform input")?;
        let p = &self.params;
        let dim = p.n_components;
        let n = x.n_rows();
        if n == 0 {
            return Ok(FeatureMatrix::zeros(0, dim));
        }

        let knn = knn_query(x, &self.training, p.n_neighbors, p.metric)?;
        let local_connectivity = (p.local_connectivity - 1.0).max(0.0);
        let (sigmas, rhos) = smooth_knn_dist(&knn, p.n_neighbors as f64, local_connectivity);
        let mut graph = membership_strengths(&knn, &sigmas, &rhos, false);

        let mut layout = vec![0.0; n * dim];
        for i in 0..n {
            let range = i * knn.k()..(i + 1) * knn.k();
            let total: f64 = graph.vals[range.clone()].iter().sum();
            if total <= 0.0 {
                continue;
            }
            for e in range {
                let w = graph.vals[e] / total;
                let neighbour = self.embedding.row(graph.cols[e]);
                for d in 0..dim {
                    layout[i * dim + d] += w * neighbour[d];
                }
            }
        }

        let n_epochs = p.transform_epochs(n);
        graph.prune_for_epochs(n_epochs);

        let schedule = LayoutSchedule {
            a: self.a,
            b: self.b,
            n_epochs,
            initial_alpha: p.learning_rate / 4.0,
            negative_sample_rate: p.negative_sample_rate,
            gamma: p.repulsion_strength,
        };
        let mut rng = ChaCha8Rng::seed_from_u64(p.transform_seed);
        optimize_layout(
            &mut layout,
            Some(self.embedding.as_slice()),
            dim,
            &graph,
            schedule,
            &mut rng,
        );

        FeatureMatrix::new(layout, n, dim)
    }
}
