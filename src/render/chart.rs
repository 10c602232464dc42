use serde_json::{json, Value};

const DEFAULT_HEIGHT: u32 = 400;

/// One chart panel, emitted as a Plotly figure (`{data, layout}`).
#[derive(Clone, Debug)]
pub struct Chart {
    pub title: String,
    pub height: u32,
    pub kind: ChartKind,
}

#[derive(Clone, Debug)]
pub enum ChartKind {
    Line {
        x: Vec<f64>,
        y: Vec<f64>,
        x_label: String,
        y_label: String,
        x_range: Option<[f64; 2]>,
    },
    Heatmap {
        z: Vec<Vec<f64>>,
        x_labels: Option<Vec<String>>,
        y_labels: Option<Vec<String>>,
        x_label: String,
        y_label: String,
        colorscale: &'static str,
        z_range: Option<[f64; 2]>,
        colorbar: String,
    },
    /// Horizontal bars, coloured by value.
    Bar {
        labels: Vec<String>,
        values: Vec<f64>,
        x_label: String,
        y_label: String,
        colorscale: &'static str,
    },
    Scatter3d {
        x: Vec<f64>,
        y: Vec<f64>,
        z: Vec<f64>,
        color: Vec<f64>,
        axis_labels: [&'static str; 3],
        color_label: &'static str,
    },
    Violin {
        groups: Vec<(String, Vec<f64>)>,
        x_label: String,
        y_label: String,
        /// Dashed horizontal reference line at this y value
        marker: Option<f64>,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<f64>,
    },
}

impl Chart {
    pub fn new(title: impl Into<String>, kind: ChartKind) -> Self {
        Self {
            title: title.into(),
            height: DEFAULT_HEIGHT,
            kind,
        }
    }

    pub fn with_height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ChartKind::Line { .. } => "line",
            ChartKind::Heatmap { .. } => "heatmap",
            ChartKind::Bar { .. } => "bar",
            ChartKind::Scatter3d { .. } => "scatter3d",
            ChartKind::Violin { .. } => "violin",
            ChartKind::Pie { .. } => "pie",
        }
    }

    pub fn to_plotly(&self) -> Value {
        let mut layout = json!({
            "title": { "text": self.title },
            "height": self.height,
            "margin": { "t": 48, "r": 24, "b": 48, "l": 64 },
        });

        let data = match &self.kind {
            ChartKind::Line { x, y, x_label, y_label, x_range } => {
                layout["xaxis"] = axis(x_label);
                layout["yaxis"] = axis(y_label);
                if let Some(range) = x_range {
                    layout["xaxis"]["range"] = json!(range);
                }
                json!([{ "type": "scatter", "mode": "lines", "x": x, "y": y }])
            }
            ChartKind::Heatmap { z, x_labels, y_labels, x_label, y_label, colorscale, z_range, colorbar } => {
                layout["xaxis"] = axis(x_label);
                layout["yaxis"] = axis(y_label);
                let mut trace = json!({
                    "type": "heatmap",
                    "z": z,
                    "colorscale": colorscale,
                    "colorbar": { "title": { "text": colorbar } },
                });
                if let Some(x) = x_labels {
                    trace["x"] = json!(x);
                }
                if let Some(y) = y_labels {
                    trace["y"] = json!(y);
                }
                if let Some([lo, hi]) = z_range {
                    trace["zmin"] = json!(lo);
                    trace["zmax"] = json!(hi);
                }
                json!([trace])
            }
            ChartKind::Bar { labels, values, x_label, y_label, colorscale } => {
                layout["xaxis"] = axis(x_label);
                layout["yaxis"] = axis(y_label);
                // Largest bar on top
                layout["yaxis"]["autorange"] = json!("reversed");
                json!([{
                    "type": "bar",
                    "orientation": "h",
                    "x": values,
                    "y": labels,
                    "marker": { "color": values, "colorscale": colorscale },
                }])
            }
            ChartKind::Scatter3d { x, y, z, color, axis_labels, color_label } => {
                layout["scene"] = json!({
                    "xaxis": axis(axis_labels[0]),
                    "yaxis": axis(axis_labels[1]),
                    "zaxis": axis(axis_labels[2]),
                });
                json!([{
                    "type": "scatter3d",
                    "mode": "markers",
                    "x": x,
                    "y": y,
                    "z": z,
                    "marker": {
                        "size": 4,
                        "color": color,
                        "colorscale": "Viridis",
                        "colorbar": { "title": { "text": color_label } },
                    },
                }])
            }
            ChartKind::Violin { groups, x_label, y_label, marker } => {
                layout["xaxis"] = axis(x_label);
                layout["yaxis"] = axis(y_label);
                layout["violingap"] = json!(0);
                layout["violingroupgap"] = json!(0);
                if let Some(y) = marker {
                    layout["shapes"] = json!([{
                        "type": "line",
                        "xref": "paper",
                        "x0": 0,
                        "x1": 1,
                        "y0": y,
                        "y1": y,
                        "line": { "color": "red", "width": 2, "dash": "dash" },
                    }]);
                }
                let traces: Vec<Value> = groups
                    .iter()
                    .map(|(name, values)| {
                        json!({
                            "type": "violin",
                            "name": name,
                            "x": vec![name; values.len()],
                            "y": values,
                            "box": { "visible": true },
                            "meanline": { "visible": true },
                        })
                    })
                    .collect();
                Value::Array(traces)
            }
            ChartKind::Pie { labels, values } => json!([{
                "type": "pie",
                "labels": labels,
                "values": values,
                "textposition": "inside",
                "textinfo": "percent+label",
            }]),
        };

        json!({ "data": data, "layout": layout })
    }
}

fn axis(title: &str) -> Value {
    json!({ "title": { "text": title } })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_chart_carries_axis_titles_and_range() {
        let chart = Chart::new(
            "Waveform",
            ChartKind::Line {
                x: vec![0.0, 1.0],
                y: vec![0.5, -0.5],
                x_label: "Time (s)".into(),
                y_label: "Amplitude".into(),
                x_range: Some([0.0, 10.0]),
            },
        );
        let fig = chart.to_plotly();
        assert_eq!(fig["data"][0]["type"], "scatter");
        assert_eq!(fig["layout"]["title"]["text"], "Waveform");
        assert_eq!(fig["layout"]["xaxis"]["title"]["text"], "Time (s)");
        assert_eq!(fig["layout"]["xaxis"]["range"], json!([0.0, 10.0]));
        assert_eq!(fig["layout"]["height"], 400);
    }

    #[test]
    fn violin_emits_one_trace_per_group_and_marker_line() {
        let chart = Chart::new(
            "Tempo",
            ChartKind::Violin {
                groups: vec![("Pop".into(), vec![100.0, 110.0]), ("Jazz".into(), vec![90.0])],
                x_label: "Genre".into(),
                y_label: "Tempo (BPM)".into(),
                marker: Some(120.0),
            },
        )
        .with_height(600);
        let fig = chart.to_plotly();
        assert_eq!(fig["data"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(fig["data"][0]["x"], json!(["Pop", "Pop"]));
        assert_eq!(fig["layout"]["shapes"][0]["y0"], 120.0);
        assert_eq!(fig["layout"]["height"], 600);
    }

    #[test]
    fn heatmap_sets_bounds_only_when_given() {
        let kind = |z_range| ChartKind::Heatmap {
            z: vec![vec![1.0, -1.0], vec![-1.0, 1.0]],
            x_labels: Some(vec!["a".into(), "b".into()]),
            y_labels: None,
            x_label: "Feature".into(),
            y_label: "Feature".into(),
            colorscale: "RdBu_r",
            z_range,
            colorbar: "Correlation".into(),
        };
        let bounded = Chart::new("Corr", kind(Some([-1.0, 1.0]))).to_plotly();
        assert_eq!(bounded["data"][0]["zmin"], -1.0);
        assert_eq!(bounded["data"][0]["x"], json!(["a", "b"]));
        assert!(bounded["data"][0].get("y").is_none());

        let open = Chart::new("Corr", kind(None)).to_plotly();
        assert!(open["data"][0].get("zmin").is_none());
    }
}
