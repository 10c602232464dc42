use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::InputError;

/// A named sequence of values over a frame (or time) axis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureSeries {
    pub name: String,
    pub values: Vec<f64>,
}

impl FeatureSeries {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn stats(&self) -> SummaryStats {
        SummaryStats::of(&self.values)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub mean: f64,
    /// Population standard deviation
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n;
        Self {
            mean,
            std_dev: variance.sqrt(),
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

/// Row-major dense matrix (rows are coefficients / bins, columns are frames).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Matrix {
    rows: Vec<Vec<f64>>,
}

impl Matrix {
    /// All rows must share one length.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.windows(2).all(|w| w[0].len() == w[1].len()));
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            rows: self.rows.iter().map(|r| r.iter().map(|&v| f(v)).collect()).collect(),
        }
    }

    pub fn row_stats(&self) -> Vec<SummaryStats> {
        self.rows.iter().map(|r| SummaryStats::of(r)).collect()
    }
}

#[cfg(test)]
impl Matrix {
    pub fn col_count(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Score {
    pub label: String,
    pub value: f64,
}

/// Labelled probabilities that sum to 1, kept sorted from most to least likely.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScoreTable {
    scores: Vec<Score>,
}

/// Genre label → probability.
pub type GenreScores = ScoreTable;

impl ScoreTable {
    /// Normalize raw non-negative weights into a distribution.
    pub fn from_weights(labels: &[&str], weights: &[f64]) -> Self {
        debug_assert_eq!(labels.len(), weights.len());
        let probs = normalize(weights);
        let mut scores: Vec<Score> = labels
            .iter()
            .zip(probs)
            .map(|(label, value)| Score {
                label: label.to_string(),
                value,
            })
            .collect();
        scores.sort_by(|a, b| b.value.total_cmp(&a.value));
        Self { scores }
    }

    pub fn top(&self) -> Option<&Score> {
        self.scores.first()
    }

    pub fn scores(&self) -> &[Score] {
        &self.scores
    }
}

#[cfg(test)]
impl ScoreTable {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.scores.iter().find(|s| s.label == label).map(|s| s.value)
    }

    pub fn total(&self) -> f64 {
        self.scores.iter().map(|s| s.value).sum()
    }
}

/// Scale weights to sum to 1. Degenerate input (empty sum, NaN, negatives)
/// falls back to a uniform distribution.
pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let valid = weights.iter().all(|w| w.is_finite() && *w >= 0.0);
    let sum: f64 = weights.iter().sum();
    if !valid || sum <= 0.0 {
        let n = weights.len().max(1) as f64;
        return vec![1.0 / n; weights.len()];
    }
    weights.iter().map(|w| w / sum).collect()
}

/// Symmetric matrix with unit diagonal over a fixed list of feature names.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    pub values: Matrix,
}

impl CorrelationMatrix {
    /// Symmetrize a square matrix of draws in [-1, 1] as (M + Mᵀ) / 2 and set
    /// the diagonal to 1.
    pub fn from_raw(labels: &[&str], raw: &Matrix) -> Self {
        let n = labels.len();
        debug_assert_eq!(raw.row_count(), n);
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            1.0
                        } else {
                            ((raw.get(i, j) + raw.get(j, i)) / 2.0).clamp(-1.0, 1.0)
                        }
                    })
                    .collect()
            })
            .collect();

        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            values: Matrix::from_rows(rows),
        }
    }
}

#[cfg(test)]
impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.size();
        (0..n).all(|i| (0..n).all(|j| self.values.get(i, j) == self.values.get(j, i)))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FftSize(u32);

impl FftSize {
    pub const ALL: [u32; 4] = [512, 1024, 2048, 4096];

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for FftSize {
    fn default() -> Self {
        Self(512)
    }
}

impl TryFrom<u32> for FftSize {
    type Error = InputError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::ALL.contains(&value) {
            Ok(Self(value))
        } else {
            Err(InputError::InvalidFftSize(value))
        }
    }
}

impl FromStr for FftSize {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| InputError::InvalidNumber {
            field: "fft_size",
            value: s.to_string(),
        })?;
        Self::try_from(value)
    }
}

impl fmt::Display for FftSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HopLength(u32);

impl HopLength {
    pub const ALL: [u32; 3] = [256, 512, 1024];

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for HopLength {
    fn default() -> Self {
        Self(256)
    }
}

impl TryFrom<u32> for HopLength {
    type Error = InputError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if Self::ALL.contains(&value) {
            Ok(Self(value))
        } else {
            Err(InputError::InvalidHopLength(value))
        }
    }
}

impl FromStr for HopLength {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| InputError::InvalidNumber {
            field: "hop_length",
            value: s.to_string(),
        })?;
        Self::try_from(value)
    }
}

impl fmt::Display for HopLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Window settings picked in the sidebar. Shown in the metadata panel only;
/// the synthetic generator ignores them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DisplaySettings {
    pub fft_size: FftSize,
    pub hop_length: HopLength,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum SpectralFeature {
    #[default]
    Centroid,
    Bandwidth,
    Contrast,
    Rolloff,
}

impl SpectralFeature {
    pub const ALL: [SpectralFeature; 4] = [
        SpectralFeature::Centroid,
        SpectralFeature::Bandwidth,
        SpectralFeature::Contrast,
        SpectralFeature::Rolloff,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            SpectralFeature::Centroid => "Spectral Centroid",
            SpectralFeature::Bandwidth => "Spectral Bandwidth",
            SpectralFeature::Contrast => "Spectral Contrast",
            SpectralFeature::Rolloff => "Spectral Rolloff",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            SpectralFeature::Centroid => "centroid",
            SpectralFeature::Bandwidth => "bandwidth",
            SpectralFeature::Contrast => "contrast",
            SpectralFeature::Rolloff => "rolloff",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            SpectralFeature::Centroid => 0,
            SpectralFeature::Bandwidth => 1,
            SpectralFeature::Contrast => 2,
            SpectralFeature::Rolloff => 3,
        }
    }
}

impl FromStr for SpectralFeature {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SpectralFeature::ALL
            .into_iter()
            .find(|f| f.slug().eq_ignore_ascii_case(wanted) || f.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InputError::UnknownFeature(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_stats_use_population_std_dev() {
        let stats = SummaryStats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.std_dev, 2.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(SummaryStats::of(&[]), SummaryStats::default());
    }

    #[test]
    fn score_table_is_normalized_and_sorted() {
        let table = ScoreTable::from_weights(&["a", "b", "c"], &[1.0, 3.0, 4.0]);
        let labels: Vec<&str> = table.scores().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, ["c", "b", "a"]);
        assert!((table.total() - 1.0).abs() < 1e-12);
        assert_eq!(table.get("c"), Some(0.5));
        assert_eq!(table.top().map(|s| s.label.as_str()), Some("c"));
    }

    #[test]
    fn degenerate_weights_fall_back_to_uniform() {
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.5, 0.5]);
        assert_eq!(normalize(&[1.0, f64::NAN]), vec![0.5, 0.5]);
        assert_eq!(normalize(&[-1.0, 3.0, 2.0]), vec![1.0 / 3.0; 3]);
        assert!(normalize(&[]).is_empty());
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let raw = Matrix::from_rows(vec![
            vec![0.3, -0.8, 0.1],
            vec![0.4, -0.2, 0.9],
            vec![-1.0, 0.5, 0.7],
        ]);
        let corr = CorrelationMatrix::from_raw(&["x", "y", "z"], &raw);
        assert!(corr.is_symmetric());
        for i in 0..3 {
            assert_eq!(corr.values.get(i, i), 1.0);
        }
        assert!((corr.values.get(0, 1) - (-0.2)).abs() < 1e-12);
    }

    #[test]
    fn window_settings_only_accept_enumerated_values() {
        assert_eq!("2048".parse::<FftSize>().map(|f| f.get()), Ok(2048));
        assert_eq!("1000".parse::<FftSize>(), Err(InputError::InvalidFftSize(1000)));
        assert!(matches!(
            "big".parse::<FftSize>(),
            Err(InputError::InvalidNumber { field: "fft_size", .. })
        ));
        assert_eq!(HopLength::try_from(1024).map(|h| h.get()), Ok(1024));
        assert_eq!(HopLength::try_from(128), Err(InputError::InvalidHopLength(128)));
        let defaults = DisplaySettings::default();
        assert_eq!((defaults.fft_size.get(), defaults.hop_length.get()), (512, 256));
    }

    #[test]
    fn spectral_feature_parses_slug_and_label() {
        assert_eq!("rolloff".parse::<SpectralFeature>(), Ok(SpectralFeature::Rolloff));
        assert_eq!(
            "Spectral Bandwidth".parse::<SpectralFeature>(),
            Ok(SpectralFeature::Bandwidth)
        );
        assert!("loudness".parse::<SpectralFeature>().is_err());
    }
}
