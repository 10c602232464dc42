use rand::distr::StandardUniform;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::analysis::{random_matrix, uniform_series};
use super::features::{CorrelationMatrix, FeatureSeries, Matrix};
use crate::error::InputError;

const SCATTER_POINTS: usize = 100;
const TEMPO_DRAWS: usize = 100;
const CHROMA_PITCHES: usize = 12;
const CHROMA_FRAMES: usize = 100;
const SIGNATURE_ROWS: usize = 20;
const SIGNATURE_COLS: usize = 30;

pub const CORRELATION_FEATURES: [&str; 10] = [
    "Spectral Centroid",
    "Spectral Bandwidth",
    "Spectral Contrast",
    "Zero Crossing Rate",
    "Tempo",
    "RMS Energy",
    "MFCC 1",
    "MFCC 2",
    "MFCC 3",
    "MFCC 4",
];

/// Typical tempo (mean, std-dev) in BPM per genre.
pub const GENRE_TEMPOS: [(&str, f64, f64); 7] = [
    ("Electronic", 128.0, 10.0),
    ("Pop", 110.0, 15.0),
    ("Rock", 115.0, 20.0),
    ("Hip-Hop", 95.0, 12.0),
    ("Classical", 85.0, 25.0),
    ("Jazz", 100.0, 18.0),
    ("Folk", 90.0, 15.0),
];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum VizType {
    #[default]
    FeatureSpace3d,
    FeatureCorrelation,
    TempoDistribution,
    AudioFingerprint,
}

impl VizType {
    pub const ALL: [VizType; 4] = [
        VizType::FeatureSpace3d,
        VizType::FeatureCorrelation,
        VizType::TempoDistribution,
        VizType::AudioFingerprint,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            VizType::FeatureSpace3d => "3D Feature Space",
            VizType::FeatureCorrelation => "Feature Correlation",
            VizType::TempoDistribution => "Tempo Distribution",
            VizType::AudioFingerprint => "Audio Fingerprint",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            VizType::FeatureSpace3d => "feature-space",
            VizType::FeatureCorrelation => "correlation",
            VizType::TempoDistribution => "tempo",
            VizType::AudioFingerprint => "fingerprint",
        }
    }
}

impl FromStr for VizType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        VizType::ALL
            .into_iter()
            .find(|v| v.slug().eq_ignore_ascii_case(wanted) || v.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InputError::UnknownVisualization(wanted.to_string()))
    }
}

impl fmt::Display for VizType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Dataset behind the selected advanced visualization.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AdvancedView {
    FeatureSpace {
        spectral_centroid: Vec<f64>,
        tempo: Vec<f64>,
        spectral_contrast: Vec<f64>,
        energy: Vec<f64>,
    },
    Correlation(CorrelationMatrix),
    TempoDistribution {
        genres: Vec<FeatureSeries>,
        current_tempo: u32,
    },
    Fingerprint {
        chromagram: Matrix,
        signature: Matrix,
    },
}

#[cfg(test)]
impl AdvancedView {
    pub fn viz_type(&self) -> VizType {
        match self {
            AdvancedView::FeatureSpace { .. } => VizType::FeatureSpace3d,
            AdvancedView::Correlation(_) => VizType::FeatureCorrelation,
            AdvancedView::TempoDistribution { .. } => VizType::TempoDistribution,
            AdvancedView::Fingerprint { .. } => VizType::AudioFingerprint,
        }
    }
}

pub fn generate<R: Rng + ?Sized>(viz: VizType, rng: &mut R) -> AdvancedView {
    match viz {
        VizType::FeatureSpace3d => AdvancedView::FeatureSpace {
            spectral_centroid: uniform_series(rng, SCATTER_POINTS, 10.0, 0.0),
            tempo: uniform_series(rng, SCATTER_POINTS, 10.0, 0.0),
            spectral_contrast: uniform_series(rng, SCATTER_POINTS, 10.0, 0.0),
            energy: uniform_series(rng, SCATTER_POINTS, 1.0, 0.0),
        },
        VizType::FeatureCorrelation => {
            let n = CORRELATION_FEATURES.len();
            let raw = random_matrix(rng, n, n, StandardUniform).map(|v| v * 2.0 - 1.0);
            AdvancedView::Correlation(CorrelationMatrix::from_raw(&CORRELATION_FEATURES, &raw))
        }
        VizType::TempoDistribution => {
            let genres = GENRE_TEMPOS
                .iter()
                .map(|&(genre, mean, std_dev)| {
                    let draws = (0..TEMPO_DRAWS)
                        .map(|_| {
                            let z: f64 = rng.sample(StandardNormal);
                            mean + std_dev * z
                        })
                        .collect();
                    FeatureSeries::new(genre, draws)
                })
                .collect();
            AdvancedView::TempoDistribution {
                genres,
                current_tempo: rng.random_range(80..140),
            }
        }
        VizType::AudioFingerprint => AdvancedView::Fingerprint {
            chromagram: random_matrix(rng, CHROMA_PITCHES, CHROMA_FRAMES, StandardUniform),
            signature: random_matrix(rng, SIGNATURE_ROWS, SIGNATURE_COLS, StandardUniform),
        },
    }
}
