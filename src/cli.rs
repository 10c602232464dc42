use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::audio::advanced::VizType;
use crate::audio::features::{FftSize, HopLength, SpectralFeature};
use crate::audio::source::SampleTrack;

#[derive(Parser, Debug)]
#[command(name = "audioviz", about = "Audio analysis & visualization dashboard")]
pub struct Cli {
    /// Input audio file (MP3, WAV, OGG). Takes precedence over --sample.
    pub input: Option<PathBuf>,

    /// Sample track (electronic-beat, jazz-sample, classical-piano, pop-song, rock-guitar)
    #[arg(short, long)]
    pub sample: Option<SampleTrack>,

    /// FFT size (512, 1024, 2048, 4096)
    #[arg(long, default_value = "512")]
    pub fft_size: FftSize,

    /// Hop length (256, 512, 1024)
    #[arg(long, default_value = "256")]
    pub hop_length: HopLength,

    /// Advanced visualization (feature-space, correlation, tempo, fingerprint)
    #[arg(long, default_value = "feature-space")]
    pub viz: VizType,

    /// Spectral feature to plot (centroid, bandwidth, contrast, rolloff)
    #[arg(long, default_value = "centroid")]
    pub feature: SpectralFeature,

    /// Run the full analysis (waveform, spectrogram, tempo/key/mood)
    #[arg(short, long)]
    pub analyze: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Html)]
    pub format: OutputFormat,

    /// Output file; `-` writes to stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Seed the generator for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Skip the simulated processing delay
    #[arg(long)]
    pub no_delay: bool,

    /// Serve the interactive dashboard over HTTP
    #[arg(long)]
    pub serve: bool,

    /// Address to listen on with --serve
    #[arg(long, default_value = "127.0.0.1:8501")]
    pub bind: String,

    /// Dashboard title
    #[arg(long, default_value = "AudioViz AI")]
    pub title: String,

    /// List available sample tracks and exit
    #[arg(long)]
    pub list_samples: bool,

    /// Config file (defaults to ./audioviz.toml or ~/.config/audioviz/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Html,
    Json,
}

impl OutputFormat {
    pub fn default_output(&self) -> PathBuf {
        match self {
            OutputFormat::Html => PathBuf::from("dashboard.html"),
            OutputFormat::Json => PathBuf::from("analysis.json"),
        }
    }
}
