//! Acquisition from local CSV exports

use approx::assert_relative_eq;
use std::io::Write;
use tempfile::NamedTempFile;
use windclass_data::{
    columns, ColumnMap, CsvSource, DateWindow, Feature, InstrumentSource, LatitudeScans,
    Spacecraft, MANIFOLD_FEATURES,
};

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn identity(names: &[&str]) -> Vec<ColumnMap> {
    names.iter().map(|n| ColumnMap::new(*n, *n)).collect()
}

#[test]
fn test_ulysses_from_csv() {
    let composition = write_csv(
        "Time,c6_c5,o7_o6,fe_o,q_fe,unused\n\
         1994-08-15T00:30:00Z,0.4,0.02,0.1,9.8,1\n\
         1994-08-15T02:30:00Z,0.6,0.04,0.1,10.2,1\n\
         1994-08-15T07:00:00Z,1.0,0.3,0.2,11.0,1\n\
         1993-01-01T00:00:00Z,9.0,9.0,9.0,9.0,1\n",
    );
    let plasma = write_csv(
        "Time,R,n_p,n_a,T_p_large,T_p_small,v_r\n\
         1994-08-15T01:00:00Z,1.4,1.0,0.05,250000,240000,760\n\
         1994-08-15T07:30:00Z,1.4,4.0,0.08,-1e31,80000,420\n",
    );

    let window = DateWindow::from_dates((1994, 1, 1), (1995, 1, 1)).unwrap();
    let table = Spacecraft::Ulysses
        .acquire(
            &CsvSource::new(composition.path(), identity(&columns::ULYSSES_COMPOSITION)),
            &CsvSource::new(plasma.path(), identity(&columns::ULYSSES_PLASMA)),
            &window,
        )
        .unwrap();

    // bins at 00:00, 03:00 (empty) and 06:00
    assert_eq!(table.len(), 3);
    let o7 = table.feature(Feature::O7O6).unwrap();
    assert_relative_eq!(o7[0], 0.03);
    assert!(o7[1].is_nan());
    assert_relative_eq!(o7[2], 0.3);

    let sp = table.feature(Feature::Sp).unwrap();
    assert_relative_eq!(sp[0], 245000.0);
    assert_relative_eq!(sp[2], 40000.0);

    let complete = table.dropna(&MANIFOLD_FEATURES).unwrap();
    assert_eq!(complete.len(), 2);

    let scans = LatitudeScans::ulysses().unwrap();
    assert_eq!(scans.select(&table).len(), 3);
}

#[test]
fn test_csv_missing_column() {
    let file = write_csv("Time,Np\n2000-01-01T00:00:00Z,4.0\n");
    let source = CsvSource::new(file.path(), identity(&["Np", "Vp"]));
    let window = DateWindow::from_dates((2000, 1, 1), (2000, 1, 2)).unwrap();
    assert!(source.fetch(&window).is_err());
}
