mod audio;
mod cli;
mod config;
mod error;
mod render;
mod selection;
mod server;
mod templates;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use audio::features::{DisplaySettings, FftSize, HopLength};
use audio::source::{SampleTrack, UploadedAudioRef, SAMPLE_DURATION_SECS};
use cli::{Cli, OutputFormat};
use config::Config;
use render::html::{render_page, PageOptions};
use selection::Selection;
use templates::loader::Shell;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    let cfg = match config::find_config(cli.config.as_deref()) {
        Some(path) => match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                cfg
            }
            Err(err) => {
                log::warn!("{:#}", err);
                Config::default()
            }
        },
        None => Config::default(),
    };
    merge_config(&mut cli, &cfg);

    if cli.list_samples {
        println!("Available sample tracks:");
        for track in SampleTrack::ALL {
            println!("  {:<18} {:<16} {}s", track.slug(), track.display_name(), SAMPLE_DURATION_SECS);
        }
        return Ok(());
    }

    let shell = Shell::load(cfg.output.template_dir.as_deref())?;
    let seed = cli.seed.or(cfg.analysis.seed);
    let defaults = DisplaySettings {
        fft_size: cli.fft_size,
        hop_length: cli.hop_length,
    };
    let latency = if cli.no_delay {
        Duration::ZERO
    } else {
        Duration::from_millis(cfg.analysis.simulated_latency_ms)
    };

    if cli.serve {
        let state = server::ServerState {
            defaults,
            seed,
            latency,
            page: PageOptions {
                title: cli.title.clone(),
                plotly_src: cfg.output.plotly_src.clone(),
                interactive: true,
            },
            max_upload_bytes: cfg.server.max_upload_mb.saturating_mul(1024 * 1024),
            shell: Arc::new(shell),
        };
        log::info!("audioviz - audio analysis dashboard");
        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        return runtime.block_on(server::run(state, &cli.bind));
    }

    let upload = match cli.input {
        Some(ref path) => Some(UploadedAudioRef::from_path(path)?),
        None => None,
    };
    let selection = Selection {
        upload,
        sample: cli.sample,
        settings: defaults,
        viz: cli.viz,
        feature: cli.feature,
        analyze: cli.analyze,
    };

    match selection.source() {
        Some(source) => log::info!("Source: {} ({}s)", source.display_name(), source.duration_secs()),
        None => log::info!("No audio source selected"),
    }
    log::info!("FFT size: {}, hop length: {}", defaults.fft_size, defaults.hop_length);

    if selection.analyze && selection.source().is_some() {
        simulate_progress(latency)?;
    }

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let pass = render::page::rerun(&selection, &mut rng);

    let output = match cli.format {
        OutputFormat::Html => {
            let options = PageOptions {
                title: cli.title.clone(),
                plotly_src: cfg.output.plotly_src.clone(),
                interactive: false,
            };
            render_page(&pass.page, &selection, &shell, &options)
        }
        OutputFormat::Json => serde_json::to_string_pretty(&pass.report())?,
    };

    let target = cli.output.clone().unwrap_or_else(|| cli.format.default_output());
    write_output(&target, &output)?;
    Ok(())
}

/// Config values apply only where the CLI flag is still at its default.
fn merge_config(cli: &mut Cli, cfg: &Config) {
    if cli.fft_size == FftSize::default() {
        match FftSize::try_from(cfg.analysis.fft_size) {
            Ok(size) => cli.fft_size = size,
            Err(err) => log::warn!("Ignoring config: {}", err),
        }
    }
    if cli.hop_length == HopLength::default() {
        match HopLength::try_from(cfg.analysis.hop_length) {
            Ok(hop) => cli.hop_length = hop,
            Err(err) => log::warn!("Ignoring config: {}", err),
        }
    }
    if cli.bind == config::default_bind() {
        cli.bind = cfg.server.bind.clone();
    }
    if cli.title == config::default_title() {
        cli.title = cfg.output.title.clone();
    }
}

fn simulate_progress(latency: Duration) -> Result<()> {
    const STEPS: u64 = 100;

    log::info!("Analyzing audio...");
    let pb = ProgressBar::new(STEPS);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")?
            .progress_chars("=>-"),
    );
    let step = latency / STEPS as u32;
    for _ in 0..STEPS {
        if !step.is_zero() {
            std::thread::sleep(step);
        }
        pb.inc(1);
    }
    pb.finish_with_message("Analysis complete!");
    Ok(())
}

fn write_output(target: &Path, contents: &str) -> Result<()> {
    if target.as_os_str() == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(contents.as_bytes())?;
        stdout.flush()?;
        return Ok(());
    }
    std::fs::write(target, contents)
        .with_context(|| format!("Failed to write output: {}", target.display()))?;
    log::info!("Done! Output: {}", target.display());
    Ok(())
}
