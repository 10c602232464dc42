use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::fmt::Write;

use super::page::{viz_options, Page, Panel, Table};
use crate::audio::features::{FftSize, HopLength, SpectralFeature};
use crate::audio::source::{AudioFormat, SampleTrack, UploadedAudioRef};
use crate::selection::Selection;
use crate::templates::loader::Shell;

/// Hidden form fields that carry the previous upload into the next pass.
pub const CARRIED_NAME_FIELD: &str = "file_name";
pub const CARRIED_DATA_FIELD: &str = "file_data";

#[derive(Clone, Debug)]
pub struct PageOptions {
    pub title: String,
    pub plotly_src: String,
    /// Emit the input form; a static export only lists the selections.
    pub interactive: bool,
}

pub fn render_page(page: &Page, selection: &Selection, shell: &Shell, options: &PageOptions) -> String {
    let mut content = String::new();
    let mut scripts = String::new();
    let mut chart_idx = 0usize;

    content.push_str("    <nav class=\"tabs\">\n");
    for (i, tab) in page.tabs.iter().enumerate() {
        let _ = writeln!(content, "      <a href=\"#tab-{}\">{}</a>", i, escape(tab.title));
    }
    content.push_str("    </nav>\n");

    for (i, tab) in page.tabs.iter().enumerate() {
        let _ = writeln!(content, "    <section class=\"tab\" id=\"tab-{}\">", i);
        let _ = writeln!(content, "      <h2>{}</h2>", escape(tab.title));
        for panel in &tab.panels {
            render_panel(panel, &mut content, &mut scripts, &mut chart_idx);
        }
        content.push_str("    </section>\n");
    }

    let scripts = if scripts.is_empty() {
        String::new()
    } else {
        format!("  <script>\n{}  </script>", scripts)
    };

    let sidebar = if options.interactive {
        sidebar_form(selection)
    } else {
        sidebar_summary(selection)
    };

    let title = escape(&options.title);
    let plotly_src = escape(&options.plotly_src);
    shell.fill(&[
        ("title", title.as_str()),
        ("plotly_src", plotly_src.as_str()),
        ("sidebar", sidebar.as_str()),
        ("content", content.as_str()),
        ("scripts", scripts.as_str()),
    ])
}

/// Stand-alone page for rejected input.
pub fn render_error(message: &str, shell: &Shell, options: &PageOptions) -> String {
    let content = format!(
        "    <div class=\"alert error\">{}</div>\n    <p><a href=\"/\">Back to the dashboard</a></p>\n",
        escape(message)
    );
    let title = escape(&options.title);
    let plotly_src = escape(&options.plotly_src);
    shell.fill(&[
        ("title", title.as_str()),
        ("plotly_src", plotly_src.as_str()),
        ("sidebar", ""),
        ("content", content.as_str()),
        ("scripts", ""),
    ])
}

fn render_panel(panel: &Panel, out: &mut String, scripts: &mut String, chart_idx: &mut usize) {
    match panel {
        Panel::Heading(text) => {
            let _ = writeln!(out, "      <h3>{}</h3>", escape(text));
        }
        Panel::Subheading(text) => {
            let _ = writeln!(out, "      <h4>{}</h4>", escape(text));
        }
        Panel::Text(text) => {
            let _ = writeln!(out, "      <p>{}</p>", escape(text));
        }
        Panel::Info(text) => {
            let _ = writeln!(out, "      <div class=\"alert info\">{}</div>", escape(text));
        }
        Panel::Success(text) => {
            let _ = writeln!(out, "      <div class=\"alert success\">{}</div>", escape(text));
        }
        Panel::Audio { mime, data } => {
            let _ = writeln!(
                out,
                "      <audio controls src=\"data:{};base64,{}\"></audio>",
                mime,
                BASE64.encode(data)
            );
        }
        Panel::KeyValues(pairs) => {
            out.push_str("      <dl class=\"meta\">\n");
            for (key, value) in pairs {
                let _ = writeln!(out, "        <dt>{}</dt><dd>{}</dd>", escape(key), escape(value));
            }
            out.push_str("      </dl>\n");
        }
        Panel::Metrics(metrics) => {
            out.push_str("      <div class=\"metrics\">\n");
            for m in metrics {
                let _ = writeln!(
                    out,
                    "        <div class=\"metric\"><span class=\"label\">{}</span><span class=\"value\">{}</span></div>",
                    escape(&m.label),
                    escape(&m.value)
                );
            }
            out.push_str("      </div>\n");
        }
        Panel::Headline { title, caption } => {
            let _ = writeln!(
                out,
                "      <div class=\"headline\"><h2>{}</h2><p>{}</p></div>",
                escape(title),
                escape(caption)
            );
        }
        Panel::Chart(chart) => {
            let id = format!("chart-{}", chart_idx);
            *chart_idx += 1;
            let _ = writeln!(
                out,
                "      <div class=\"chart\" id=\"{}\" data-kind=\"{}\"></div>",
                id,
                chart.kind_name()
            );
            let mut figure = chart.to_plotly();
            figure["config"] = serde_json::json!({ "responsive": true });
            let _ = writeln!(scripts, "    Plotly.newPlot(\"{}\", {});", id, script_safe(&figure.to_string()));
        }
        Panel::Table(table) => render_table(table, out),
    }
}

fn render_table(table: &Table, out: &mut String) {
    out.push_str("      <table>\n        <thead><tr>");
    for h in &table.headers {
        let _ = write!(out, "<th>{}</th>", escape(h));
    }
    out.push_str("</tr></thead>\n        <tbody>\n");
    for row in &table.rows {
        out.push_str("          <tr>");
        for (i, cell) in row.iter().enumerate() {
            if i == 0 {
                let _ = write!(out, "<td>{}</td>", escape(cell));
            } else {
                let _ = write!(out, "<td class=\"num\">{}</td>", escape(cell));
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("        </tbody>\n      </table>\n");
}

fn sidebar_form(selection: &Selection) -> String {
    let mut out = String::new();
    out.push_str("    <h2>About</h2>\n");
    out.push_str("    <p>Upload a track or pick a sample to explore its waveform, spectral features, MFCCs and genre profile.</p>\n");
    out.push_str("    <form method=\"post\" action=\"/\" enctype=\"multipart/form-data\">\n");

    let accept: Vec<String> = AudioFormat::ALL.iter().map(|f| format!(".{}", f.extension())).collect();
    let _ = writeln!(
        out,
        "      <label for=\"file\">Choose an audio file</label>\n      <input type=\"file\" id=\"file\" name=\"file\" accept=\"{}\">",
        accept.join(",")
    );
    if let Some(file) = &selection.upload {
        carried_upload(&mut out, file);
    }

    let mut samples = vec![("none".to_string(), "None".to_string(), selection.sample.is_none())];
    samples.extend(
        SampleTrack::ALL
            .iter()
            .map(|t| (t.slug().to_string(), t.display_name().to_string(), selection.sample == Some(*t))),
    );
    select_field(&mut out, "sample", "Sample track", &samples);

    let ffts: Vec<_> = FftSize::ALL
        .iter()
        .map(|v| (v.to_string(), v.to_string(), selection.settings.fft_size.get() == *v))
        .collect();
    select_field(&mut out, "fft_size", "FFT Size", &ffts);

    let hops: Vec<_> = HopLength::ALL
        .iter()
        .map(|v| (v.to_string(), v.to_string(), selection.settings.hop_length.get() == *v))
        .collect();
    select_field(&mut out, "hop_length", "Hop Length", &hops);

    let vizs: Vec<_> = viz_options()
        .map(|(v, label)| (v.slug().to_string(), label.to_string(), selection.viz == v))
        .collect();
    select_field(&mut out, "viz", "Visualization type", &vizs);

    let features: Vec<_> = SpectralFeature::ALL
        .iter()
        .map(|f| (f.slug().to_string(), f.label().to_string(), selection.feature == *f))
        .collect();
    select_field(&mut out, "feature", "Spectral feature", &features);

    out.push_str("      <button type=\"submit\" name=\"analyze\" value=\"1\">Analyze Audio</button>\n");
    out.push_str("      <button type=\"submit\" class=\"secondary\">Update</button>\n");
    out.push_str("    </form>\n");
    out
}

/// Re-submit the current upload with the next interaction unless a new file is picked.
fn carried_upload(out: &mut String, file: &UploadedAudioRef) {
    let _ = writeln!(
        out,
        "      <p class=\"current-file\">Current file: {}</p>",
        escape(&file.name)
    );
    let _ = writeln!(
        out,
        "      <input type=\"hidden\" name=\"{}\" value=\"{}\">",
        CARRIED_NAME_FIELD,
        escape(&file.name)
    );
    let _ = writeln!(
        out,
        "      <input type=\"hidden\" name=\"{}\" value=\"{}\">",
        CARRIED_DATA_FIELD,
        BASE64.encode(&file.data)
    );
}

fn select_field(out: &mut String, name: &str, label: &str, options: &[(String, String, bool)]) {
    let _ = writeln!(out, "      <label for=\"{0}\">{1}</label>\n      <select id=\"{0}\" name=\"{0}\">", name, label);
    for (value, text, selected) in options {
        let _ = writeln!(
            out,
            "        <option value=\"{}\"{}>{}</option>",
            escape(value),
            if *selected { " selected" } else { "" },
            escape(text)
        );
    }
    out.push_str("      </select>\n");
}

fn sidebar_summary(selection: &Selection) -> String {
    let source = match (&selection.upload, selection.sample) {
        (Some(file), _) => file.name.clone(),
        (None, Some(track)) => track.display_name().to_string(),
        (None, None) => "None".to_string(),
    };
    let rows = [
        ("Source", source),
        ("FFT Size", selection.settings.fft_size.to_string()),
        ("Hop Length", selection.settings.hop_length.to_string()),
        ("Visualization", selection.viz.label().to_string()),
        ("Spectral feature", selection.feature.label().to_string()),
    ];

    let mut out = String::from("    <h2>Selections</h2>\n    <dl class=\"meta\">\n");
    for (key, value) in rows {
        let _ = writeln!(out, "      <dt>{}</dt><dd>{}</dd>", key, escape(&value));
    }
    out.push_str("    </dl>\n");
    out
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// JSON embedded in a `<script>` block must not be able to close it.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
