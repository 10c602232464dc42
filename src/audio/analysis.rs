use rand::distr::StandardUniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use serde::Serialize;

use super::advanced::{self, AdvancedView, VizType};
use super::features::{DisplaySettings, FeatureSeries, GenreScores, Matrix, ScoreTable, SpectralFeature};
use super::source::{AudioSource, SourceSummary};

const WAVEFORM_POINTS_PER_SEC: usize = 100;
const WAVEFORM_WINDOW_SECS: f64 = 10.0;
const SPECTROGRAM_BINS: usize = 100;
const FEATURE_FRAMES: usize = 100;
const MFCC_COEFFICIENTS: usize = 20;

pub const KEYS: [&str; 5] = ["C Major", "A Minor", "G Major", "E Minor", "D Major"];
pub const MOODS: [&str; 5] = ["Energetic", "Calm", "Happy", "Melancholic", "Intense"];
pub const GENRES: [&str; 7] = ["Electronic", "Pop", "Rock", "Hip-Hop", "Classical", "Jazz", "Folk"];
pub const SUBGENRES: [&str; 5] = ["House", "Techno", "Drum & Bass", "Ambient", "Dubstep"];
pub const IMPORTANCE_FEATURES: [&str; 8] = [
    "Spectral Centroid",
    "Zero Crossing Rate",
    "Spectral Contrast",
    "Tempo",
    "MFCC 1",
    "MFCC 2",
    "MFCC 3",
    "MFCC 4",
];
pub const INSTRUMENTS: [&str; 6] = ["Drums", "Bass", "Piano", "Guitar", "Synthesizer", "Vocals"];

/// Genre whose prediction unlocks the sub-genre breakdown.
const SUBGENRE_PARENT: &str = "Electronic";

/// Everything one render pass shows, all of it synthetic.
#[derive(Clone, Debug, Serialize)]
pub struct Analysis {
    pub source: SourceSummary,
    pub settings: DisplaySettings,
    /// Only present when the Analyze trigger fired on this pass.
    pub overview: Option<Overview>,
    pub features: FeatureSet,
    pub classification: Classification,
    pub advanced: AdvancedView,
}

#[derive(Clone, Debug, Serialize)]
pub struct Overview {
    pub waveform: Waveform,
    pub spectrogram: Matrix,
    pub results: AnalysisResults,
}

#[derive(Clone, Debug, Serialize)]
pub struct Waveform {
    pub times: Vec<f64>,
    pub amplitude: Vec<f64>,
    /// Visible x-range in seconds
    pub window: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisResults {
    pub bpm: u32,
    pub key: &'static str,
    pub mood: &'static str,
    pub energy_pct: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct FeatureSet {
    /// Centroid, bandwidth, contrast, rolloff (in `SpectralFeature` order)
    pub spectral: Vec<FeatureSeries>,
    pub temporal_times: Vec<f64>,
    pub zero_crossing_rate: FeatureSeries,
    pub rms_energy: FeatureSeries,
    pub temporal_summary: Vec<TemporalStat>,
    pub mfcc: Matrix,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemporalStat {
    pub feature: &'static str,
    pub mean: f64,
    pub std_dev: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MfccStat {
    pub coefficient: String,
    pub mean: f64,
    pub std_dev: f64,
}

impl FeatureSet {
    pub fn spectral_series(&self, feature: SpectralFeature) -> &FeatureSeries {
        &self.spectral[feature.index()]
    }

    /// One row per MFCC coefficient.
    pub fn mfcc_stats(&self) -> Vec<MfccStat> {
        self.mfcc
            .row_stats()
            .into_iter()
            .enumerate()
            .map(|(i, stats)| MfccStat {
                coefficient: format!("MFCC {}", i + 1),
                mean: stats.mean,
                std_dev: stats.std_dev,
            })
            .collect()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Classification {
    pub genres: GenreScores,
    pub feature_importance: ScoreTable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subgenres: Option<GenreScores>,
    /// Detection confidence in percent, in `INSTRUMENTS` order
    pub instruments: Vec<(String, f64)>,
}

pub struct AnalysisRequest<'a> {
    pub source: AudioSource<'a>,
    pub settings: DisplaySettings,
    pub viz: VizType,
    pub run_overview: bool,
}

/// Produce a fresh synthetic analysis. Nothing here reads the audio payload;
/// two calls with the same input differ unless the generator is seeded.
pub fn analyze<R: Rng + ?Sized>(request: &AnalysisRequest<'_>, rng: &mut R) -> Analysis {
    let duration = request.source.duration_secs() as f64;

    let overview = if request.run_overview {
        log::debug!("Generating overview (waveform, spectrogram, results)...");
        Some(generate_overview(duration, rng))
    } else {
        None
    };

    log::debug!("Generating spectral, temporal and MFCC features...");
    let features = generate_features(duration, rng);

    log::debug!("Scoring genres...");
    let classification = classify(rng);

    log::debug!("Generating advanced view: {}", request.viz.label());
    let advanced = advanced::generate(request.viz, rng);

    if let Some(top) = classification.genres.top() {
        log::info!(
            "Analysis for '{}': {} ({:.1}%)",
            request.source.display_name(),
            top.label,
            top.value * 100.0
        );
    }

    Analysis {
        source: request.source.summary(),
        settings: request.settings,
        overview,
        features,
        classification,
        advanced,
    }
}

fn generate_overview<R: Rng + ?Sized>(duration: f64, rng: &mut R) -> Overview {
    let points = duration as usize * WAVEFORM_POINTS_PER_SEC;
    let times = linspace(0.0, duration, points);
    let amplitude = times
        .iter()
        .map(|&t| {
            let noise: f64 = rng.sample(StandardNormal);
            (2.0 * std::f64::consts::PI * t).sin() * noise * 0.1
        })
        .collect();

    let spectrogram = random_matrix(rng, SPECTROGRAM_BINS, SPECTROGRAM_BINS, StandardUniform);

    let results = AnalysisResults {
        bpm: rng.random_range(80..140),
        key: KEYS[rng.random_range(0..KEYS.len())],
        mood: MOODS[rng.random_range(0..MOODS.len())],
        energy_pct: rng.random_range(50..95),
    };

    Overview {
        waveform: Waveform {
            times,
            amplitude,
            window: [0.0, duration.min(WAVEFORM_WINDOW_SECS)],
        },
        spectrogram,
        results,
    }
}

fn generate_features<R: Rng + ?Sized>(duration: f64, rng: &mut R) -> FeatureSet {
    // (scale, offset) per spectral feature, in SpectralFeature order
    let spectral_ranges = [(2000.0, 1000.0), (1000.0, 500.0), (50.0, 0.0), (3000.0, 2000.0)];
    let spectral = SpectralFeature::ALL
        .iter()
        .zip(spectral_ranges)
        .map(|(feature, (scale, offset))| {
            FeatureSeries::new(feature.label(), uniform_series(rng, FEATURE_FRAMES, scale, offset))
        })
        .collect();

    let temporal_times = linspace(0.0, duration, FEATURE_FRAMES);
    let zero_crossing_rate =
        FeatureSeries::new("Zero Crossing Rate", uniform_series(rng, FEATURE_FRAMES, 0.1, 0.2));
    let rms_energy = FeatureSeries::new("RMS Energy", uniform_series(rng, FEATURE_FRAMES, 0.3, 0.1));

    let zcr_stats = zero_crossing_rate.stats();
    let rms_stats = rms_energy.stats();
    let temporal_summary = vec![
        TemporalStat {
            feature: "Zero Crossing Rate",
            mean: zcr_stats.mean,
            std_dev: zcr_stats.std_dev,
        },
        TemporalStat {
            feature: "RMS Energy",
            mean: rms_stats.mean,
            std_dev: rms_stats.std_dev,
        },
        TemporalStat {
            feature: "Tempo",
            mean: rng.random_range(80..140u32) as f64,
            std_dev: rng.random::<f64>() * 10.0,
        },
        TemporalStat {
            feature: "Onset Strength",
            mean: rng.random::<f64>() * 0.5 + 0.2,
            std_dev: rng.random::<f64>() * 0.1,
        },
    ];

    let mfcc = random_matrix(rng, MFCC_COEFFICIENTS, FEATURE_FRAMES, StandardNormal);

    FeatureSet {
        spectral,
        temporal_times,
        zero_crossing_rate,
        rms_energy,
        temporal_summary,
        mfcc,
    }
}

fn classify<R: Rng + ?Sized>(rng: &mut R) -> Classification {
    let genres = ScoreTable::from_weights(&GENRES, &uniform_series(rng, GENRES.len(), 1.0, 0.0));
    let feature_importance = ScoreTable::from_weights(
        &IMPORTANCE_FEATURES,
        &uniform_series(rng, IMPORTANCE_FEATURES.len(), 1.0, 0.0),
    );

    let subgenres = match genres.top() {
        Some(top) if top.label == SUBGENRE_PARENT => Some(ScoreTable::from_weights(
            &SUBGENRES,
            &uniform_series(rng, SUBGENRES.len(), 1.0, 0.0),
        )),
        _ => None,
    };

    let instruments = INSTRUMENTS
        .iter()
        .map(|name| (name.to_string(), rng.random::<f64>() * 80.0 + 20.0))
        .collect();

    Classification {
        genres,
        feature_importance,
        subgenres,
        instruments,
    }
}

/// `count` draws of `U[0,1) * scale + offset`.
pub(crate) fn uniform_series<R: Rng + ?Sized>(rng: &mut R, count: usize, scale: f64, offset: f64) -> Vec<f64> {
    (0..count).map(|_| rng.random::<f64>() * scale + offset).collect()
}

/// Fill a matrix row-parallel. Each row gets its own generator seeded from
/// `rng`, so a seeded run stays reproducible regardless of thread scheduling.
pub(crate) fn random_matrix<R, D>(rng: &mut R, rows: usize, cols: usize, dist: D) -> Matrix
where
    R: Rng + ?Sized,
    D: Distribution<f64> + Sync,
{
    let seeds: Vec<u64> = (0..rows).map(|_| rng.random()).collect();
    let data: Vec<Vec<f64>> = seeds
        .into_par_iter()
        .map(|seed| {
            let mut row_rng = StdRng::seed_from_u64(seed);
            (0..cols).map(|_| dist.sample(&mut row_rng)).collect::<Vec<f64>>()
        })
        .collect();
    Matrix::from_rows(data)
}

/// `count` evenly spaced points over `[start, end]`, endpoints included.
pub(crate) fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}
