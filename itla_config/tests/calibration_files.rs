use std::fs::File;
use std::io::Write;

use itla_config::calibration::{
    CalibrationError, MapTable, load_sled_temperatures, sled_spacing,
};
use rstest::rstest;
use tempfile::tempdir;

/// One `.map` row: values sit at fields 2, 5, 8, 11, 14, 17, 20, with a
/// label and an index field before each (the vendor layout).
fn map_line(freq: f64, sled: f64, current_raw: f64) -> String {
    format!(
        "F 0 {freq:.4} S 0 {sled:.2} T1 0 43.10 T2 0 41.20 P1 0 1.20 P2 0 1.10 I 0 {current_raw:.1}"
    )
}

fn sled_line(centi_deg: i64) -> String {
    format!("0 0 0 0 0 {centi_deg}")
}

#[rstest]
fn sled_file_reads_column_five() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("module.sled");
    let mut f = File::create(&path).unwrap();
    for t in [2950, 2955, 2948] {
        writeln!(f, "{}", sled_line(t)).unwrap();
    }
    drop(f);

    let temps = load_sled_temperatures(&path).unwrap();
    assert_eq!(temps.len(), 3);
    assert!((temps[0] - 29.50).abs() < 1e-9);
    assert!((temps[1] - 29.55).abs() < 1e-9);
}

#[rstest]
fn sled_file_rejects_short_line() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("short.sled");
    std::fs::write(&path, "0 0 2950\n").unwrap();

    assert!(matches!(
        load_sled_temperatures(&path),
        Err(CalibrationError::Malformed { line: 1, .. })
    ));
}

#[rstest]
fn spacing_from_clustered_sled_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("module.sled");
    let mut f = File::create(&path).unwrap();
    // Three clusters near 26, 30 and 34 C: spacing 4 C.
    for t in [2600, 2610, 3000, 3010, 3400, 3390] {
        writeln!(f, "{}", sled_line(t)).unwrap();
    }
    drop(f);

    let temps = load_sled_temperatures(&path).unwrap();
    let spacing = sled_spacing(&temps).unwrap();
    assert!((spacing - 4.0).abs() < 0.1, "spacing {spacing}");
}

#[rstest]
fn single_cluster_sled_file_is_an_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flat.sled");
    let mut f = File::create(&path).unwrap();
    for t in [2995, 3000, 3005, 3002] {
        writeln!(f, "{}", sled_line(t)).unwrap();
    }
    drop(f);

    let temps = load_sled_temperatures(&path).unwrap();
    assert!(matches!(
        sled_spacing(&temps),
        Err(CalibrationError::TooFewClusters { clusters: 1 })
    ));
}

#[rstest]
fn map_file_parses_fixed_fields() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("module.map");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "header line, skipped").unwrap();
    writeln!(f, "{}", map_line(193.0, 25.0, 1000.0)).unwrap();
    writeln!(f, "{}", map_line(194.0, 26.0, 1100.0)).unwrap();
    drop(f);

    let table = MapTable::load(&path).unwrap();
    assert_eq!(table.points().len(), 2);
    assert_eq!(table.points()[0].freq_thz, 193.0);
    assert_eq!(table.points()[0].sled_temp_c, 25.0);
    // Raw current scales by 0.1 into milliamps.
    assert!((table.points()[0].current_ma - 100.0).abs() < 1e-9);
    assert!((table.current_for(193.5).unwrap() - 105.0).abs() < 1e-9);
}

#[rstest]
fn map_file_rejects_unsorted_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("unsorted.map");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "{}", map_line(194.0, 26.0, 1100.0)).unwrap();
    writeln!(f, "{}", map_line(193.0, 25.0, 1000.0)).unwrap();
    drop(f);

    assert!(matches!(
        MapTable::load(&path),
        Err(CalibrationError::Unsorted { line: 2, .. })
    ));
}

#[rstest]
fn map_file_with_only_short_lines_is_empty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.map");
    std::fs::write(&path, "just a header\nanother comment\n").unwrap();

    assert!(matches!(
        MapTable::load(&path),
        Err(CalibrationError::Empty { .. })
    ));
}

#[rstest]
fn map_line_with_non_numeric_field_errors() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.map");
    let good = map_line(193.0, 25.0, 1000.0);
    let bad = good.replace("1000.0", "n/a");
    std::fs::write(&path, format!("{bad}\n")).unwrap();

    assert!(matches!(
        MapTable::load(&path),
        Err(CalibrationError::Malformed { line: 1, .. })
    ));
}
