//! Named solar wind quantities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A column of a per-spacecraft feature table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Feature {
    /// C6+/C5+ charge-state ratio
    #[serde(rename = "c6_c5")]
    C6C5,
    /// O7+/O6+ charge-state ratio
    #[serde(rename = "o7_o6")]
    O7O6,
    /// Fe/O abundance ratio
    #[serde(rename = "fe_o")]
    FeO,
    /// Average iron charge state
    #[serde(rename = "q_fe")]
    QFe,
    /// Alpha-to-proton ratio
    #[serde(rename = "he_h")]
    HeH,
    /// Proton-specific entropy
    Sp,
    /// Proton density
    Np,
    /// Proton bulk speed
    Vp,
    /// Proton temperature
    Tp,
    /// Heliocentric distance (Ulysses only)
    R,
}

/// Subspace of the Gaussian mixture classifier
pub const MIXTURE_FEATURES: [Feature; 2] = [Feature::O7O6, Feature::Sp];

/// The six non-evolving quantities used by the manifold classifier
pub const MANIFOLD_FEATURES: [Feature; 6] = [
    Feature::O7O6,
    Feature::Sp,
    Feature::C6C5,
    Feature::QFe,
    Feature::FeO,
    Feature::HeH,
];

impl Feature {
    pub const ALL: [Feature; 10] = [
        Feature::C6C5,
        Feature::O7O6,
        Feature::FeO,
        Feature::QFe,
        Feature::HeH,
        Feature::Sp,
        Feature::Np,
        Feature::Vp,
        Feature::Tp,
        Feature::R,
    ];

    /// Column name in tables and artifacts
    pub fn name(&self) -> &'static str {
        match self {
            Feature::C6C5 => "c6_c5",
            Feature::O7O6 => "o7_o6",
            Feature::FeO => "fe_o",
            Feature::QFe => "q_fe",
            Feature::HeH => "he_h",
            Feature::Sp => "Sp",
            Feature::Np => "Np",
            Feature::Vp => "Vp",
            Feature::Tp => "Tp",
            Feature::R => "R",
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Feature {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Feature::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| crate::Error::MissingColumn(s.to_string()))
    }
}

/// Proton-specific entropy `T / sqrt(n)`
///
/// NaN when the density is not positive or either input is NaN.
#[inline]
pub fn proton_entropy(temperature: f64, density: f64) -> f64 {
    if density > 0.0 {
        temperature / density.sqrt()
    } else {
        f64::NAN
    }
}

/// `numerator / denominator`, NaN for a non-positive denominator
#[inline]
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        f64::NAN
    }
}
