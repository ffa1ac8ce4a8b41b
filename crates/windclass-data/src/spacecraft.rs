//! Spacecraft-specific feature derivation

use crate::error::Result;
use crate::feature::{proton_entropy, ratio, Feature};
use crate::series::RawSeries;
use crate::source::InstrumentSource;
use crate::table::FeatureTable;
use crate::window::DateWindow;
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};

/// Raw column names expected from each instrument stream
pub mod columns {
    pub const ULYSSES_COMPOSITION: [&str; 4] = ["c6_c5", "o7_o6", "fe_o", "q_fe"];
    pub const ULYSSES_PLASMA: [&str; 6] = ["R", "n_p", "n_a", "T_p_large", "T_p_small", "v_r"];
    pub const ACE_COMPOSITION: [&str; 4] = ["C6to5", "O7to6", "FetoO", "avqFe"];
    pub const ACE_PLASMA: [&str; 4] = ["Np", "Vp", "Tpr", "alpha_ratio"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spacecraft {
    Ulysses,
    Ace,
}

impl Spacecraft {
    pub fn name(&self) -> &'static str {
        match self {
            Spacecraft::Ulysses => "Ulysses",
            Spacecraft::Ace => "ACE",
        }
    }

    /// Resampling bin width
    pub fn cadence(&self) -> TimeDelta {
        match self {
            Spacecraft::Ulysses => TimeDelta::hours(3),
            Spacecraft::Ace => TimeDelta::hours(2),
        }
    }

    /// Mission interval analysed by default
    pub fn default_window(&self) -> Result<DateWindow> {
        match self {
            Spacecraft::Ulysses => DateWindow::from_dates((1990, 1, 1), (2010, 1, 1)),
            Spacecraft::Ace => DateWindow::from_dates((1998, 1, 1), (2011, 1, 1)),
        }
    }

    /// Features present in this spacecraft's derived table
    pub fn features(&self) -> &'static [Feature] {
        match self {
            Spacecraft::Ulysses => &Feature::ALL,
            Spacecraft::Ace => &Feature::ALL[..9],
        }
    }

    /// Download both instrument streams and derive the feature table
    ///
    /// Any source failure aborts acquisition.
    #[instrument(skip(composition, plasma), fields(spacecraft = self.name()))]
    pub fn acquire(
        &self,
        composition: &dyn InstrumentSource,
        plasma: &dyn InstrumentSource,
        window: &DateWindow,
    ) -> Result<FeatureTable> {
        info!(source = %composition.describe(), "fetching composition");
        let composition = composition.fetch(window)?;
        info!(source = %plasma.describe(), "fetching plasma");
        let plasma = plasma.fetch(window)?;
        let table = self.derive(&composition, &plasma)?;
        info!(records = table.len(), "feature table ready");
        Ok(table)
    }

    pub fn derive(&self, composition: &RawSeries, plasma: &RawSeries) -> Result<FeatureTable> {
        match self {
            Spacecraft::Ulysses => derive_ulysses(composition, plasma),
            Spacecraft::Ace => derive_ace(composition, plasma),
        }
    }
}

impl fmt::Display for Spacecraft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn merged(composition: &RawSeries, plasma: &RawSeries, cadence: TimeDelta) -> Result<FeatureTable> {
    composition
        .resample(cadence)?
        .merge_outer(&plasma.resample(cadence)?)
}

fn keep_features(table: &mut FeatureTable, features: &[Feature]) -> Result<()> {
    let names: Vec<&str> = features.iter().map(Feature::name).collect();
    table.retain_columns(&names)
}

/// Ulysses SWICS composition and SWOOPS plasma on a 3-hour grid
///
/// `Tp` is the NaN-skipping mean of the two temperature estimates and
/// `he_h` is `n_a / n_p`.
pub fn derive_ulysses(composition: &RawSeries, plasma: &RawSeries) -> Result<FeatureTable> {
    let mut table = merged(composition, plasma, Spacecraft::Ulysses.cadence())?;

    let large = table.column("T_p_large")?;
    let small = table.column("T_p_small")?;
    let tp: Vec<f64> = large
        .iter()
        .zip(small)
        .map(|(&a, &b)| match (a.is_nan(), b.is_nan()) {
            (false, false) => (a + b) / 2.0,
            (false, true) => a,
            (true, false) => b,
            (true, true) => f64::NAN,
        })
        .collect();
    let np = table.column("n_p")?;
    let sp: Vec<f64> = tp.iter().zip(np).map(|(&t, &n)| proton_entropy(t, n)).collect();
    let he_h: Vec<f64> = table
        .column("n_a")?
        .iter()
        .zip(np)
        .map(|(&a, &n)| ratio(a, n))
        .collect();

    table.insert_column(Feature::Tp.name(), tp)?;
    table.insert_column(Feature::Sp.name(), sp)?;
    table.insert_column(Feature::HeH.name(), he_h)?;
    table.rename_column("n_p", Feature::Np.name())?;
    table.rename_column("v_r", Feature::Vp.name())?;
    keep_features(&mut table, Spacecraft::Ulysses.features())?;
    Ok(table)
}

/// ACE SWICS composition and SWEPAM plasma on a 2-hour grid
pub fn derive_ace(composition: &RawSeries, plasma: &RawSeries) -> Result<FeatureTable> {
    let mut table = merged(composition, plasma, Spacecraft::Ace.cadence())?;

    let sp: Vec<f64> = table
        .column("Tpr")?
        .iter()
        .zip(table.column("Np")?)
        .map(|(&t, &n)| proton_entropy(t, n))
        .collect();
    table.insert_column(Feature::Sp.name(), sp)?;

    for (from, to) in [
        ("C6to5", Feature::C6C5),
        ("O7to6", Feature::O7O6),
        ("FetoO", Feature::FeO),
        ("avqFe", Feature::QFe),
        ("Tpr", Feature::Tp),
        ("alpha_ratio", Feature::HeH),
    ] {
        table.rename_column(from, to.name())?;
    }
    keep_features(&mut table, Spacecraft::Ace.features())?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;
    use approx::assert_relative_eq;

    #[test]
    fn test_ulysses_derivation() {
        let t = parse_timestamp("1995-01-01T01:00").unwrap();
        let mut composition = RawSeries::with_columns(&columns::ULYSSES_COMPOSITION);
        composition.push(t, &[0.5, 0.1, 0.12, 10.5]).unwrap();
        let mut plasma = RawSeries::with_columns(&columns::ULYSSES_PLASMA);
        plasma
            .push(t, &[1.5, 4.0, 0.2, 200000.0, f64::NAN, 750.0])
            .unwrap();

        let table = derive_ulysses(&composition, &plasma).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.column_names().count(), 10);
        assert_relative_eq!(table.feature(Feature::Tp).unwrap()[0], 200000.0);
        assert_relative_eq!(table.feature(Feature::Sp).unwrap()[0], 100000.0);
        assert_relative_eq!(table.feature(Feature::HeH).unwrap()[0], 0.05);
        assert_relative_eq!(table.feature(Feature::Vp).unwrap()[0], 750.0);
        assert_relative_eq!(table.feature(Feature::R).unwrap()[0], 1.5);
        assert!(!table.has_column("n_a"));
    }

    #[test]
    fn test_ace_derivation_has_no_distance() {
        let t = parse_timestamp("2003-01-01T00:30").unwrap();
        let mut composition = RawSeries::with_columns(&columns::ACE_COMPOSITION);
        composition.push(t, &[1.2, 0.3, 0.15, 11.0]).unwrap();
        let mut plasma = RawSeries::with_columns(&columns::ACE_PLASMA);
        plasma.push(t, &[9.0, 380.0, 60000.0, 0.03]).unwrap();

        let table = derive_ace(&composition, &plasma).unwrap();
        assert_eq!(table.column_names().count(), 9);
        assert!(!table.has_column("R"));
        assert_relative_eq!(table.feature(Feature::Sp).unwrap()[0], 20000.0);
        assert_relative_eq!(table.feature(Feature::HeH).unwrap()[0], 0.03);
        assert_relative_eq!(table.feature(Feature::O7O6).unwrap()[0], 0.3);
    }

    #[test]
    fn test_missing_stream_column() {
        let t = parse_timestamp("2003-01-01").unwrap();
        let mut composition = RawSeries::with_columns(&["C6to5"]);
        composition.push(t, &[1.0]).unwrap();
        let mut plasma = RawSeries::with_columns(&columns::ACE_PLASMA);
        plasma.push(t, &[9.0, 380.0, 60000.0, 0.03]).unwrap();
        assert!(derive_ace(&composition, &plasma).is_err());
    }
}
