//! Vendor calibration file parsing and frequency interpolation.
//!
//! Two fixed-layout, single-space-delimited text formats ship with each
//! module: a `.sled` file (sled temperature log, centi-degrees at field 5)
//! and a `.map` file (frequency grid with sled/filter temperatures and bias
//! current at fields 2/5/8/11/14/17/20). Field positions count empty strings
//! from consecutive spaces, so lines are split on the literal space byte and
//! runs of spaces are NOT collapsed; that matches the files as the vendor
//! writes them.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sled temperatures are re-centered near this operating point (°C); jumps
/// settle fastest when the sled stays close to it.
pub const SLED_CENTER_TEMP_C: f64 = 30.0;

/// Consecutive sled samples further apart than this start a new cluster (°C).
const CLUSTER_BREAK_C: f64 = 1.0;

#[derive(Debug, Error)]
pub enum CalibrationError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: malformed calibration record: {reason}")]
    Malformed {
        path: PathBuf,
        line: usize,
        reason: String,
    },
    #[error("sled table has {clusters} temperature cluster(s); spacing needs at least 2")]
    TooFewClusters { clusters: usize },
    #[error("frequency {freq_thz} THz outside calibration range [{min_thz}, {max_thz}] THz")]
    FrequencyOutOfRange {
        freq_thz: f64,
        min_thz: f64,
        max_thz: f64,
    },
    #[error("map file {path} contains no usable rows")]
    Empty { path: PathBuf },
    #[error("{path}:{line}: map rows must be sorted ascending by frequency")]
    Unsorted { path: PathBuf, line: usize },
}

/// One row of the `.map` frequency grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub freq_thz: f64,
    pub sled_temp_c: f64,
    pub filter1_temp_c: f64,
    pub filter2_temp_c: f64,
    pub filter1_power: f64,
    pub filter2_power: f64,
    pub current_ma: f64,
}

/// Frequency grid from a `.map` file, sorted ascending by frequency.
/// Loaded once per session; read-only afterwards.
#[derive(Debug, Clone)]
pub struct MapTable {
    points: Vec<MapPoint>,
}

fn field<'a>(
    fields: &'a [&'a str],
    idx: usize,
    path: &Path,
    line: usize,
) -> Result<f64, CalibrationError> {
    let raw = fields
        .get(idx)
        .ok_or_else(|| CalibrationError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: format!("missing field {idx}"),
        })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| CalibrationError::Malformed {
            path: path.to_path_buf(),
            line,
            reason: format!("field {idx} ({raw:?}) is not a number"),
        })
}

/// Read the sled temperatures (°C) from a `.sled` file.
///
/// Field index 5 holds the temperature in units of 0.01 °C.
pub fn load_sled_temperatures(path: &Path) -> Result<Vec<f64>, CalibrationError> {
    let text = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut temps = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(' ').collect();
        temps.push(field(&fields, 5, path, i + 1)? * 0.01);
    }
    Ok(temps)
}

/// Spacing between acceptable sled modes (°C).
///
/// Consecutive samples within [`CLUSTER_BREAK_C`] of each other form one
/// cluster; the spacing is the mean absolute difference between consecutive
/// cluster averages. The sled can be offset by any whole multiple of this
/// spacing without changing the output frequency.
pub fn sled_spacing(temps: &[f64]) -> Result<f64, CalibrationError> {
    let mut cluster_means: Vec<f64> = Vec::new();
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut prev: Option<f64> = None;

    for &t in temps {
        if let Some(p) = prev {
            if (t - p).abs() > CLUSTER_BREAK_C {
                cluster_means.push(sum / count as f64);
                sum = 0.0;
                count = 0;
            }
        }
        sum += t;
        count += 1;
        prev = Some(t);
    }
    if count > 0 {
        cluster_means.push(sum / count as f64);
    }

    if cluster_means.len() < 2 {
        return Err(CalibrationError::TooFewClusters {
            clusters: cluster_means.len(),
        });
    }

    let total: f64 = cluster_means.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    Ok(total / (cluster_means.len() - 1) as f64)
}

impl MapTable {
    /// Parse a `.map` file. Lines with fewer than 18 fields are skipped
    /// (the vendor writes header and comment lines that way); a line that
    /// passes the field-count gate but lacks a required field is an error.
    pub fn load(path: &Path) -> Result<Self, CalibrationError> {
        let text = std::fs::read_to_string(path).map_err(|source| CalibrationError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut points: Vec<MapPoint> = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let fields: Vec<&str> = line.split(' ').collect();
            if fields.len() < 18 {
                continue;
            }
            let point = MapPoint {
                freq_thz: field(&fields, 2, path, i + 1)?,
                sled_temp_c: field(&fields, 5, path, i + 1)?,
                filter1_temp_c: field(&fields, 8, path, i + 1)?,
                filter2_temp_c: field(&fields, 11, path, i + 1)?,
                filter1_power: field(&fields, 14, path, i + 1)?,
                filter2_power: field(&fields, 17, path, i + 1)?,
                current_ma: field(&fields, 20, path, i + 1)? * 0.1,
            };
            if let Some(last) = points.last() {
                if point.freq_thz <= last.freq_thz {
                    return Err(CalibrationError::Unsorted {
                        path: path.to_path_buf(),
                        line: i + 1,
                    });
                }
            }
            points.push(point);
        }

        if points.is_empty() {
            return Err(CalibrationError::Empty {
                path: path.to_path_buf(),
            });
        }
        Ok(Self { points })
    }

    /// Build a table from rows already in memory (tests, tooling).
    pub fn from_points(points: Vec<MapPoint>) -> Result<Self, CalibrationError> {
        for (i, w) in points.windows(2).enumerate() {
            if w[1].freq_thz <= w[0].freq_thz {
                return Err(CalibrationError::Unsorted {
                    path: PathBuf::from("<memory>"),
                    line: i + 2,
                });
            }
        }
        if points.is_empty() {
            return Err(CalibrationError::Empty {
                path: PathBuf::from("<memory>"),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn min_freq_thz(&self) -> f64 {
        self.points[0].freq_thz
    }

    pub fn max_freq_thz(&self) -> f64 {
        self.points[self.points.len() - 1].freq_thz
    }

    /// Indices of the grid points bracketing `freq_thz`.
    ///
    /// Returns `(i, i)` when the frequency lands exactly on the first grid
    /// point. Frequencies outside the table range are rejected rather than
    /// scanned past the end.
    fn bracket(&self, freq_thz: f64) -> Result<(usize, usize), CalibrationError> {
        let min = self.min_freq_thz();
        let max = self.max_freq_thz();
        if !(freq_thz >= min && freq_thz <= max) {
            return Err(CalibrationError::FrequencyOutOfRange {
                freq_thz,
                min_thz: min,
                max_thz: max,
            });
        }
        // First index whose grid frequency is >= freq_thz.
        let upper = self.points.partition_point(|p| p.freq_thz < freq_thz);
        if upper == 0 {
            Ok((0, 0))
        } else {
            Ok((upper - 1, upper))
        }
    }

    /// Sled set temperature (°C) for a clean jump to `freq_thz`.
    ///
    /// Starts from the nearer bracketing grid point, applies the sled slope
    /// over the residual GHz, then shifts by whole sled-spacing multiples to
    /// land as close as possible to [`SLED_CENTER_TEMP_C`]. Each spacing
    /// interval reproduces the same output frequency, so the shift changes
    /// only how far the sled must travel.
    pub fn sled_temperature_for(
        &self,
        freq_thz: f64,
        sled_slope_c_per_ghz: f64,
        sled_spacing_c: f64,
    ) -> Result<f64, CalibrationError> {
        let (lower, upper) = self.bracket(freq_thz)?;
        let lo = &self.points[lower];
        let hi = &self.points[upper];

        // Nearer gridpoint wins; ties keep the lower one.
        let grid = if (freq_thz - hi.freq_thz).abs() < (freq_thz - lo.freq_thz).abs() {
            hi
        } else {
            lo
        };

        let freq_diff_ghz = (freq_thz - grid.freq_thz) * 1_000.0;
        let base_temp = grid.sled_temp_c + sled_slope_c_per_ghz * freq_diff_ghz;

        let mode_adjust = ((SLED_CENTER_TEMP_C - base_temp) / sled_spacing_c).round();
        Ok(base_temp + mode_adjust * sled_spacing_c)
    }

    /// Bias current (mA) for `freq_thz`, linearly interpolated between the
    /// bracketing grid points. Never leaves the bracket.
    pub fn current_for(&self, freq_thz: f64) -> Result<f64, CalibrationError> {
        let (lower, upper) = self.bracket(freq_thz)?;
        if lower == upper {
            return Ok(self.points[lower].current_ma);
        }
        let lo = &self.points[lower];
        let hi = &self.points[upper];

        let span = hi.freq_thz - lo.freq_thz;
        let upper_frac = (freq_thz - lo.freq_thz) / span;
        Ok(upper_frac * hi.current_ma + (1.0 - upper_frac) * lo.current_ma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(freq: f64, sled: f64, current: f64) -> MapPoint {
        MapPoint {
            freq_thz: freq,
            sled_temp_c: sled,
            filter1_temp_c: 40.0,
            filter2_temp_c: 41.0,
            filter1_power: 1.0,
            filter2_power: 1.0,
            current_ma: current,
        }
    }

    fn table() -> MapTable {
        MapTable::from_points(vec![
            point(193.0, 25.0, 100.0),
            point(194.0, 26.0, 110.0),
        ])
        .unwrap()
    }

    #[test]
    fn midpoint_current_interpolates() {
        assert!((table().current_for(193.5).unwrap() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn current_at_gridpoints_is_exact() {
        let t = table();
        assert_eq!(t.current_for(193.0).unwrap(), 100.0);
        assert_eq!(t.current_for(194.0).unwrap(), 110.0);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let t = table();
        assert!(matches!(
            t.current_for(197.0),
            Err(CalibrationError::FrequencyOutOfRange { .. })
        ));
        assert!(matches!(
            t.current_for(190.0),
            Err(CalibrationError::FrequencyOutOfRange { .. })
        ));
    }

    #[test]
    fn sled_spacing_two_clusters() {
        // Two clusters around 20 and 30: spacing 10.
        let temps = [20.0, 20.2, 19.9, 30.1, 30.0, 29.8];
        let spacing = sled_spacing(&temps).unwrap();
        assert!((spacing - 10.0).abs() < 0.2, "spacing {spacing}");
    }

    #[test]
    fn sled_spacing_needs_two_clusters() {
        let temps = [25.0, 25.1, 24.9, 25.2];
        assert!(matches!(
            sled_spacing(&temps),
            Err(CalibrationError::TooFewClusters { clusters: 1 })
        ));
        assert!(matches!(
            sled_spacing(&[]),
            Err(CalibrationError::TooFewClusters { clusters: 0 })
        ));
    }

    #[test]
    fn sled_temperature_recentres_near_thirty() {
        let t = table();
        // spacing 4 C, slope -0.07 C/GHz: whatever the base temp, the result
        // must sit within half a spacing of 30 C.
        let temp = t.sled_temperature_for(193.25, -0.07, 4.0).unwrap();
        assert!((temp - 30.0).abs() <= 2.0, "temp {temp}");
    }

    #[test]
    fn sled_temperature_is_deterministic() {
        let t = table();
        let a = t.sled_temperature_for(193.7, -0.05, 3.4).unwrap();
        let b = t.sled_temperature_for(193.7, -0.05, 3.4).unwrap();
        assert_eq!(a, b);
    }
}
