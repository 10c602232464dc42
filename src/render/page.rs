use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

use super::chart::{Chart, ChartKind};
use crate::audio::advanced::{AdvancedView, VizType};
use crate::audio::analysis::{self, Analysis, AnalysisRequest, Classification, FeatureSet, Overview};
use crate::audio::features::SpectralFeature;
use crate::audio::source::{AudioSource, SourceKind};
use crate::selection::Selection;

pub const PROMPT_ANALYZE: &str = "Please upload an audio file or select a sample track to begin analysis.";
pub const PROMPT_FEATURES: &str = "Please upload an audio file or select a sample track to extract features.";
pub const PROMPT_GENRES: &str = "Please upload an audio file or select a sample track for genre classification.";
pub const PROMPT_ADVANCED: &str =
    "Please upload an audio file or select a sample track for advanced visualization.";

#[derive(Clone, Debug)]
pub struct Page {
    pub tabs: Vec<Tab>,
}

#[derive(Clone, Debug)]
pub struct Tab {
    pub title: &'static str,
    pub panels: Vec<Panel>,
}

#[derive(Clone, Debug)]
pub enum Panel {
    Heading(String),
    Subheading(String),
    Text(String),
    Info(String),
    Success(String),
    /// Playback widget for an uploaded file
    Audio { mime: &'static str, data: Arc<[u8]> },
    KeyValues(Vec<(String, String)>),
    Metrics(Vec<Metric>),
    Headline { title: String, caption: String },
    Chart(Chart),
    Table(Table),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    fn row(mut self, cells: Vec<String>) -> Self {
        self.rows.push(cells);
        self
    }
}

#[cfg(test)]
impl Page {
    pub fn charts(&self) -> impl Iterator<Item = &Chart> {
        self.panels().filter_map(|p| match p {
            Panel::Chart(c) => Some(c),
            _ => None,
        })
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.panels().filter_map(|p| match p {
            Panel::Table(t) => Some(t),
            _ => None,
        })
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.tabs.iter().flat_map(|t| t.panels.iter())
    }
}

/// Result of one whole-page pass.
pub struct Rerun {
    pub page: Page,
    pub analysis: Option<Analysis>,
}

/// Machine-readable form of a pass: the analysis, or the prompt shown instead.
#[derive(Serialize)]
pub struct Report<'a> {
    pub analysis: Option<&'a Analysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl Rerun {
    pub fn report(&self) -> Report<'_> {
        Report {
            analysis: self.analysis.as_ref(),
            message: self.analysis.is_none().then_some(PROMPT_ANALYZE),
        }
    }
}

/// Regenerate every dataset for `selection` and lay out the page.
pub fn rerun<R: Rng + ?Sized>(selection: &Selection, rng: &mut R) -> Rerun {
    let Some(source) = selection.source() else {
        log::debug!("No audio source selected; rendering prompts");
        return Rerun {
            page: prompt_page(),
            analysis: None,
        };
    };

    let request = AnalysisRequest {
        source,
        settings: selection.settings,
        viz: selection.viz,
        run_overview: selection.analyze,
    };
    let analysis = analysis::analyze(&request, rng);
    let page = build_page(selection, source, &analysis);

    Rerun {
        page,
        analysis: Some(analysis),
    }
}

fn prompt_page() -> Page {
    Page {
        tabs: vec![
            Tab {
                title: "Upload & Analyze",
                panels: vec![Panel::Info(PROMPT_ANALYZE.into())],
            },
            Tab {
                title: "Feature Extraction",
                panels: vec![Panel::Info(PROMPT_FEATURES.into())],
            },
            Tab {
                title: "Genre Classification",
                panels: vec![Panel::Info(PROMPT_GENRES.into())],
            },
            Tab {
                title: "Advanced Visualization",
                panels: vec![Panel::Info(PROMPT_ADVANCED.into())],
            },
        ],
    }
}

fn build_page(selection: &Selection, source: AudioSource<'_>, analysis: &Analysis) -> Page {
    Page {
        tabs: vec![
            Tab {
                title: "Upload & Analyze",
                panels: upload_tab(source, analysis),
            },
            Tab {
                title: "Feature Extraction",
                panels: features_tab(&analysis.features, selection.feature),
            },
            Tab {
                title: "Genre Classification",
                panels: genre_tab(&analysis.classification),
            },
            Tab {
                title: "Advanced Visualization",
                panels: advanced_tab(&analysis.advanced),
            },
        ],
    }
}

fn upload_tab(source: AudioSource<'_>, analysis: &Analysis) -> Vec<Panel> {
    let summary = &analysis.source;
    let mut panels = vec![Panel::Heading("Upload Audio File".into())];

    if let AudioSource::Sample(track) = source {
        panels.push(Panel::Info(format!("Using sample: {}", track)));
    }
    panels.push(Panel::Success("Audio file loaded successfully!".into()));

    match source {
        AudioSource::Upload(file) => panels.push(Panel::Audio {
            mime: file.format.mime_type(),
            data: Arc::clone(&file.data),
        }),
        AudioSource::Sample(_) => panels.push(Panel::Info("Sample audio player would appear here".into())),
    }

    panels.push(Panel::Subheading("Audio Information".into()));
    let mut info = vec![
        ("Duration".to_string(), format!("{} seconds", summary.duration_secs)),
        ("Sample Rate".to_string(), format!("{} Hz", summary.sample_rate_hz)),
        ("Channels".to_string(), summary.channels.to_string()),
        ("File Format".to_string(), summary.format.to_string()),
        ("File Size".to_string(), summary.size.clone()),
        ("FFT Size".to_string(), analysis.settings.fft_size.to_string()),
        ("Hop Length".to_string(), analysis.settings.hop_length.to_string()),
    ];
    if summary.kind == SourceKind::Upload {
        info.insert(0, ("File Name".to_string(), summary.name.clone()));
    }
    panels.push(Panel::KeyValues(info));

    panels.push(Panel::Heading("Audio Analysis".into()));
    match &analysis.overview {
        Some(overview) => {
            panels.extend(overview_panels(overview));
            panels.push(Panel::Success("Analysis complete!".into()));
        }
        None => panels.push(Panel::Text("Press \"Analyze Audio\" to run the analysis.".into())),
    }
    panels
}

fn overview_panels(overview: &Overview) -> Vec<Panel> {
    let results = &overview.results;
    vec![
        Panel::Subheading("Waveform".into()),
        Panel::Chart(
            Chart::new(
                "Waveform",
                ChartKind::Line {
                    x: overview.waveform.times.clone(),
                    y: overview.waveform.amplitude.clone(),
                    x_label: "Time (s)".into(),
                    y_label: "Amplitude".into(),
                    x_range: Some(overview.waveform.window),
                },
            )
            .with_height(250),
        ),
        Panel::Subheading("Spectrogram".into()),
        Panel::Chart(Chart::new(
            "Mel-frequency spectrogram",
            ChartKind::Heatmap {
                z: overview.spectrogram.rows().to_vec(),
                x_labels: None,
                y_labels: None,
                x_label: "Time".into(),
                y_label: "Frequency bin".into(),
                colorscale: "Magma",
                z_range: None,
                colorbar: "dB".into(),
            },
        )),
        Panel::Subheading("Analysis Results".into()),
        Panel::Metrics(vec![
            metric("BPM", results.bpm.to_string()),
            metric("Key", results.key.to_string()),
            metric("Mood", results.mood.to_string()),
            metric("Energy", format!("{}%", results.energy_pct)),
        ]),
    ]
}

fn features_tab(features: &FeatureSet, selected: SpectralFeature) -> Vec<Panel> {
    let mut panels = vec![
        Panel::Heading("Audio Feature Extraction".into()),
        Panel::Text("Extracted features from the audio file:".into()),
        Panel::Subheading("Spectral Features".into()),
    ];

    let series = features.spectral_series(selected);
    panels.push(Panel::Chart(Chart::new(
        format!("{} over time", series.name),
        ChartKind::Line {
            x: (0..series.len()).map(|i| i as f64).collect(),
            y: series.values.clone(),
            x_label: "Frames".into(),
            y_label: series.name.clone(),
            x_range: None,
        },
    )));

    panels.push(Panel::Subheading("Feature Statistics".into()));
    let stats = features.spectral.iter().fold(
        Table::new(&["Feature", "Mean", "Std Dev", "Min", "Max"]),
        |table, s| {
            let st = s.stats();
            table.row(vec![s.name.clone(), num(st.mean), num(st.std_dev), num(st.min), num(st.max)])
        },
    );
    panels.push(Panel::Table(stats));

    panels.push(Panel::Subheading("Temporal Features".into()));
    for (series, title) in [
        (&features.zero_crossing_rate, "Zero Crossing Rate Over Time"),
        (&features.rms_energy, "RMS Energy Over Time"),
    ] {
        panels.push(Panel::Chart(Chart::new(
            title,
            ChartKind::Line {
                x: features.temporal_times.clone(),
                y: series.values.clone(),
                x_label: "Time (s)".into(),
                y_label: series.name.clone(),
                x_range: None,
            },
        )));
    }
    let temporal = features.temporal_summary.iter().fold(
        Table::new(&["Feature", "Mean", "Standard Deviation"]),
        |table, s| table.row(vec![s.feature.to_string(), num(s.mean), num(s.std_dev)]),
    );
    panels.push(Panel::Table(temporal));

    panels.push(Panel::Subheading("Mel-Frequency Cepstral Coefficients (MFCC)".into()));
    panels.push(Panel::Chart(
        Chart::new(
            "MFCC",
            ChartKind::Heatmap {
                z: features.mfcc.rows().to_vec(),
                x_labels: None,
                y_labels: Some((1..=features.mfcc.row_count()).map(|i| format!("MFCC {}", i)).collect()),
                x_label: "Time".into(),
                y_label: "Coefficient".into(),
                colorscale: "RdBu_r",
                z_range: None,
                colorbar: "Value".into(),
            },
        )
        .with_height(500),
    ));
    panels.push(Panel::Subheading("MFCC Statistics".into()));
    let mfcc = features.mfcc_stats().into_iter().fold(
        Table::new(&["MFCC Coefficient", "Mean", "Standard Deviation"]),
        |table, s| table.row(vec![s.coefficient, num(s.mean), num(s.std_dev)]),
    );
    panels.push(Panel::Table(mfcc));
    panels
}

fn genre_tab(classification: &Classification) -> Vec<Panel> {
    let genres = &classification.genres;
    let mut panels = vec![Panel::Heading("Genre Classification".into())];

    if let Some(top) = genres.top() {
        panels.push(Panel::Subheading("Predicted Genre".into()));
        panels.push(Panel::Headline {
            title: top.label.clone(),
            caption: "Primary genre classification".into(),
        });
    }

    panels.push(Panel::Subheading("Classification Confidence".into()));
    panels.push(Panel::Chart(Chart::new(
        "Classification Confidence",
        ChartKind::Bar {
            labels: genres.scores().iter().map(|s| s.label.clone()).collect(),
            values: genres.scores().iter().map(|s| s.value * 100.0).collect(),
            x_label: "Confidence (%)".into(),
            y_label: "Genre".into(),
            colorscale: "Viridis",
        },
    )));

    let importance = &classification.feature_importance;
    panels.push(Panel::Subheading("Feature Importance".into()));
    panels.push(Panel::Chart(Chart::new(
        "Feature Importance",
        ChartKind::Bar {
            labels: importance.scores().iter().map(|s| s.label.clone()).collect(),
            values: importance.scores().iter().map(|s| s.value * 100.0).collect(),
            x_label: "Importance (%)".into(),
            y_label: "Feature".into(),
            colorscale: "Oranges",
        },
    )));

    if let Some(sub) = &classification.subgenres {
        panels.push(Panel::Subheading("Sub-Genre Analysis".into()));
        panels.push(Panel::Chart(Chart::new(
            "Electronic Sub-Genres",
            ChartKind::Pie {
                labels: sub.scores().iter().map(|s| s.label.clone()).collect(),
                values: sub.scores().iter().map(|s| s.value).collect(),
            },
        )));
    }

    panels.push(Panel::Subheading("Detected Instruments".into()));
    panels.push(Panel::Chart(Chart::new(
        "Instrument detection confidence",
        ChartKind::Bar {
            labels: classification.instruments.iter().map(|(name, _)| name.clone()).collect(),
            values: classification.instruments.iter().map(|(_, pct)| *pct).collect(),
            x_label: "Confidence (%)".into(),
            y_label: "Instrument".into(),
            colorscale: "Blues",
        },
    )));
    panels
}

fn advanced_tab(view: &AdvancedView) -> Vec<Panel> {
    let mut panels = vec![Panel::Heading("Advanced Visualization".into())];

    match view {
        AdvancedView::FeatureSpace { spectral_centroid, tempo, spectral_contrast, energy } => {
            panels.push(Panel::Subheading("3D Feature Space Visualization".into()));
            panels.push(Panel::Chart(
                Chart::new(
                    "Audio Features in 3D Space",
                    ChartKind::Scatter3d {
                        x: spectral_centroid.clone(),
                        y: tempo.clone(),
                        z: spectral_contrast.clone(),
                        color: energy.clone(),
                        axis_labels: ["Spectral Centroid", "Tempo", "Spectral Contrast"],
                        color_label: "Energy",
                    },
                )
                .with_height(700),
            ));
            panels.push(Panel::Text(
                "Each point places a track in a space of three key audio features; colour encodes its energy level."
                    .into(),
            ));
        }
        AdvancedView::Correlation(corr) => {
            panels.push(Panel::Subheading("Feature Correlation Matrix".into()));
            panels.push(Panel::Chart(
                Chart::new(
                    "Feature Correlation",
                    ChartKind::Heatmap {
                        z: corr.values.rows().to_vec(),
                        x_labels: Some(corr.labels.clone()),
                        y_labels: Some(corr.labels.clone()),
                        x_label: "Feature".into(),
                        y_label: "Feature".into(),
                        colorscale: "RdBu_r",
                        z_range: Some([-1.0, 1.0]),
                        colorbar: "Correlation".into(),
                    },
                )
                .with_height(700),
            ));
            panels.push(Panel::Text(
                "Positive correlations mark features that rise together; negative ones mark features that move in opposite directions."
                    .into(),
            ));
        }
        AdvancedView::TempoDistribution { genres, current_tempo } => {
            panels.push(Panel::Subheading("Tempo Distribution Among Genres".into()));
            panels.push(Panel::Chart(
                Chart::new(
                    format!("Tempo Distribution by Genre (Current Track: {} BPM)", current_tempo),
                    ChartKind::Violin {
                        groups: genres.iter().map(|g| (g.name.clone(), g.values.clone())).collect(),
                        x_label: "Genre".into(),
                        y_label: "Tempo (BPM)".into(),
                        marker: Some(*current_tempo as f64),
                    },
                )
                .with_height(600),
            ));
            panels.push(Panel::Text(
                "The dashed red line marks the detected tempo of the current track against typical genre tempos."
                    .into(),
            ));
        }
        AdvancedView::Fingerprint { chromagram, signature } => {
            panels.push(Panel::Subheading("Audio Fingerprint Visualization".into()));
            panels.push(Panel::Chart(Chart::new(
                "Chromagram",
                ChartKind::Heatmap {
                    z: chromagram.rows().to_vec(),
                    x_labels: None,
                    y_labels: Some(PITCH_CLASSES.iter().map(|p| p.to_string()).collect()),
                    x_label: "Time".into(),
                    y_label: "Pitch class".into(),
                    colorscale: "Viridis",
                    z_range: None,
                    colorbar: "Energy".into(),
                },
            )));
            panels.push(Panel::Subheading("Unique Audio Signature".into()));
            panels.push(Panel::Chart(
                Chart::new(
                    "Audio Signature",
                    ChartKind::Heatmap {
                        z: signature.rows().to_vec(),
                        x_labels: None,
                        y_labels: None,
                        x_label: "Time".into(),
                        y_label: "Feature".into(),
                        colorscale: "Viridis",
                        z_range: None,
                        colorbar: "Magnitude".into(),
                    },
                )
                .with_height(500),
            ));
            panels.push(Panel::Text(
                "The fingerprint condenses the distinctive characteristics of a track for identification and similarity matching."
                    .into(),
            ));
        }
    }
    panels
}

const PITCH_CLASSES: [&str; 12] = ["C", "C♯", "D", "D♯", "E", "F", "F♯", "G", "G♯", "A", "A♯", "B"];

fn metric(label: &str, value: String) -> Metric {
    Metric {
        label: label.to_string(),
        value,
    }
}

fn num(value: f64) -> String {
    format!("{:.4}", value)
}

/// Labels for the visualization selector, in display order.
pub fn viz_options() -> impl Iterator<Item = (VizType, &'static str)> {
    VizType::ALL.into_iter().map(|v| (v, v.label()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::source::{SampleTrack, UploadedAudioRef};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_selection(sample: SampleTrack) -> Selection {
        Selection {
            sample: Some(sample),
            ..Default::default()
        }
    }

    #[test]
    fn no_source_renders_only_prompts() {
        let rerun = rerun(&Selection::default(), &mut StdRng::seed_from_u64(0));
        assert!(rerun.analysis.is_none());
        assert_eq!(rerun.page.tabs.len(), 4);
        assert_eq!(rerun.page.charts().count(), 0);
        assert_eq!(rerun.page.tables().count(), 0);
        for tab in &rerun.page.tabs {
            assert_eq!(tab.panels.len(), 1);
            assert!(matches!(&tab.panels[0], Panel::Info(msg) if msg.starts_with("Please upload")));
        }
        assert_eq!(rerun.report().message, Some(PROMPT_ANALYZE));
    }

    #[test]
    fn sample_selection_shows_fixed_duration_and_no_player() {
        let selection = sample_selection(SampleTrack::ClassicalPiano);
        let rerun = rerun(&selection, &mut StdRng::seed_from_u64(1));
        let info = rerun
            .page
            .panels()
            .find_map(|p| match p {
                Panel::KeyValues(kv) => Some(kv.clone()),
                _ => None,
            })
            .unwrap();
        assert!(info.contains(&("Duration".to_string(), "30 seconds".to_string())));
        assert!(info.contains(&("File Format".to_string(), "WAV".to_string())));
        assert!(rerun.page.panels().any(|p| matches!(p, Panel::Info(m) if m == "Using sample: Classical Piano")));
        assert!(!rerun.page.panels().any(|p| matches!(p, Panel::Audio { .. })));
    }

    #[test]
    fn upload_gets_a_player_and_upload_duration() {
        let selection = Selection {
            upload: Some(UploadedAudioRef::new("loop.ogg", vec![1, 2, 3, 4]).unwrap()),
            sample: Some(SampleTrack::PopSong),
            ..Default::default()
        };
        let rerun = rerun(&selection, &mut StdRng::seed_from_u64(2));
        assert!(rerun
            .page
            .panels()
            .any(|p| matches!(p, Panel::Audio { mime: "audio/ogg", data } if data.len() == 4)));
        assert!(!rerun.page.panels().any(|p| matches!(p, Panel::Info(m) if m.starts_with("Using sample"))));
        assert_eq!(rerun.analysis.map(|a| a.source.duration_secs), Some(45));
    }

    #[test]
    fn player_shares_the_upload_payload() {
        let selection = Selection {
            upload: Some(UploadedAudioRef::new("loop.wav", vec![0; 1024]).unwrap()),
            ..Default::default()
        };
        let rerun = rerun(&selection, &mut StdRng::seed_from_u64(8));
        let payload = selection.upload.as_ref().map(|u| &u.data).unwrap();
        assert!(rerun
            .page
            .panels()
            .any(|p| matches!(p, Panel::Audio { data, .. } if Arc::ptr_eq(data, payload))));
    }

    #[test]
    fn analyze_adds_overview_panels() {
        let mut selection = sample_selection(SampleTrack::ElectronicBeat);
        let quiet = rerun(&selection, &mut StdRng::seed_from_u64(3));
        assert!(!quiet.page.panels().any(|p| matches!(p, Panel::Metrics(_))));

        selection.analyze = true;
        let analyzed = rerun(&selection, &mut StdRng::seed_from_u64(3));
        let metrics = analyzed
            .page
            .panels()
            .find_map(|p| match p {
                Panel::Metrics(m) => Some(m.clone()),
                _ => None,
            })
            .unwrap();
        let labels: Vec<&str> = metrics.iter().map(|m| m.label.as_str()).collect();
        assert_eq!(labels, ["BPM", "Key", "Mood", "Energy"]);
        assert!(analyzed.page.charts().any(|c| c.title == "Waveform"));
        assert!(analyzed.page.panels().any(|p| matches!(p, Panel::Success(m) if m == "Analysis complete!")));
    }

    #[test]
    fn mfcc_table_has_twenty_rows() {
        let rerun = rerun(&sample_selection(SampleTrack::JazzSample), &mut StdRng::seed_from_u64(4));
        let mfcc = rerun
            .page
            .tables()
            .find(|t| t.headers[0] == "MFCC Coefficient")
            .unwrap();
        assert_eq!(mfcc.rows.len(), 20);
        assert_eq!(mfcc.rows[19][0], "MFCC 20");
    }

    #[test]
    fn every_viz_type_renders() {
        for viz in VizType::ALL {
            let selection = Selection {
                viz,
                ..sample_selection(SampleTrack::RockGuitar)
            };
            let rerun = rerun(&selection, &mut StdRng::seed_from_u64(5));
            let advanced = &rerun.page.tabs[3];
            assert_eq!(advanced.title, "Advanced Visualization");
            let charts: Vec<&str> = advanced
                .panels
                .iter()
                .filter_map(|p| match p {
                    Panel::Chart(c) => Some(c.kind_name()),
                    _ => None,
                })
                .collect();
            let expected: &[&str] = match viz {
                VizType::FeatureSpace3d => &["scatter3d"],
                VizType::FeatureCorrelation => &["heatmap"],
                VizType::TempoDistribution => &["violin"],
                VizType::AudioFingerprint => &["heatmap", "heatmap"],
            };
            assert_eq!(charts, expected, "{}", viz);
            for chart in rerun.page.charts() {
                assert!(chart.to_plotly()["data"].is_array());
            }
        }
    }

    #[test]
    fn selected_spectral_feature_is_plotted() {
        let selection = Selection {
            feature: SpectralFeature::Rolloff,
            ..sample_selection(SampleTrack::PopSong)
        };
        let rerun = rerun(&selection, &mut StdRng::seed_from_u64(6));
        assert!(rerun.page.charts().any(|c| c.title == "Spectral Rolloff over time"));
    }
}
