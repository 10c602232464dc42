use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;

use super::ServerState;
use crate::audio::source::UploadedAudioRef;
use crate::error::InputError;
use crate::render::html::{render_error, render_page, CARRIED_DATA_FIELD, CARRIED_NAME_FIELD};
use crate::render::page::rerun;
use crate::selection::{RawSelection, Selection};

/// Room for the text fields next to a file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn make_app(state: ServerState) -> Router {
    // A carried-over upload travels base64-encoded, a third larger than the file.
    let limit = (state.max_upload_bytes / 3)
        .saturating_mul(4)
        .saturating_add(4)
        .saturating_add(FORM_OVERHEAD_BYTES);
    Router::new()
        .route("/", get(dashboard).post(dashboard_form).layer(DefaultBodyLimit::max(limit)))
        .route("/api/analysis", get(analysis_json))
        .route("/health", get(health))
        .with_state(state)
}

/// GET / - render with selections from the query string
async fn dashboard(State(state): State<ServerState>, Query(raw): Query<RawSelection>) -> Response {
    match raw.resolve(None, state.defaults) {
        Ok(selection) => render(&state, selection).await,
        Err(e) => input_error_page(&state, e),
    }
}

/// POST / - sidebar form submission (multipart/form-data)
async fn dashboard_form(State(state): State<ServerState>, multipart: Multipart) -> Response {
    let (raw, upload) = match read_form(multipart, state.max_upload_bytes).await {
        Ok(parts) => parts,
        Err((status, e)) => {
            log::warn!("Rejected form submission: {}", e);
            let page = render_error(&e.to_string(), &state.shell, &state.page);
            return (status, Html(page)).into_response();
        }
    };
    match raw.resolve(upload, state.defaults) {
        Ok(selection) => render(&state, selection).await,
        Err(e) => input_error_page(&state, e),
    }
}

/// GET /api/analysis - the same pass as GET /, as JSON
async fn analysis_json(State(state): State<ServerState>, Query(raw): Query<RawSelection>) -> Response {
    let selection = match raw.resolve(None, state.defaults) {
        Ok(selection) => selection,
        Err(e) => {
            log::warn!("Rejected API request: {}", e);
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
        }
    };
    simulate_latency(&state, &selection).await;
    let mut rng = state.rng();
    let pass = rerun(&selection, &mut rng);
    Json(pass.report()).into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn render(state: &ServerState, selection: Selection) -> Response {
    simulate_latency(state, &selection).await;
    let mut rng = state.rng();
    let pass = rerun(&selection, &mut rng);
    Html(render_page(&pass.page, &selection, &state.shell, &state.page)).into_response()
}

async fn simulate_latency(state: &ServerState, selection: &Selection) {
    if selection.analyze && selection.source().is_some() && !state.latency.is_zero() {
        log::debug!("Analyzing for {:?}", state.latency);
        tokio::time::sleep(state.latency).await;
    }
}

fn input_error_page(state: &ServerState, e: InputError) -> Response {
    log::warn!("Rejected input: {}", e);
    let page = render_error(&e.to_string(), &state.shell, &state.page);
    (StatusCode::BAD_REQUEST, Html(page)).into_response()
}

/// Split the form into its text fields and the optional file. A file input
/// left empty arrives with a blank file name; the upload carried over from
/// the previous pass is used instead, if the form has one.
async fn read_form(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(RawSelection, Option<UploadedAudioRef>), (StatusCode, InputError)> {
    let mut raw = RawSelection::default();
    let mut upload = None;
    let mut carried_name = None;
    let mut carried_data = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err((e.status(), InputError::Upload(e.body_text()))),
        };
        let name = field.name().unwrap_or("").to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| (e.status(), InputError::Upload(e.body_text())))?;
            if file_name.is_empty() || bytes.is_empty() {
                continue;
            }
            log::debug!("Received upload {} ({} bytes)", file_name, bytes.len());
            upload = Some(accept_upload(file_name, bytes.to_vec(), max_bytes)?);
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| (e.status(), InputError::Upload(e.body_text())))?;
        match name.as_str() {
            CARRIED_NAME_FIELD => carried_name = Some(text),
            CARRIED_DATA_FIELD => carried_data = Some(text),
            _ => {
                if !raw.set(&name, text) {
                    log::debug!("Ignoring unknown form field '{}'", name);
                }
            }
        }
    }

    if upload.is_none() {
        if let (Some(name), Some(data)) = (carried_name, carried_data) {
            if !name.trim().is_empty() && !data.trim().is_empty() {
                let bytes = BASE64.decode(data.trim()).map_err(|e| {
                    (StatusCode::BAD_REQUEST, InputError::Upload(format!("invalid carried file data: {}", e)))
                })?;
                log::debug!("Reusing upload {} ({} bytes)", name, bytes.len());
                upload = Some(accept_upload(name, bytes, max_bytes)?);
            }
        }
    }

    Ok((raw, upload))
}

fn accept_upload(
    name: String,
    data: Vec<u8>,
    max_bytes: usize,
) -> Result<UploadedAudioRef, (StatusCode, InputError)> {
    if data.len() > max_bytes {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            InputError::UploadTooLarge {
                size: data.len() as u64,
                limit: max_bytes as u64,
            },
        ));
    }
    UploadedAudioRef::new(name, data).map_err(|e| (StatusCode::BAD_REQUEST, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::DisplaySettings;
    use crate::render::html::PageOptions;
    use crate::templates::loader::Shell;
    use axum::body::Body;
    use axum::http::{header, Request};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for `oneshot`

    const BOUNDARY: &str = "audiovizboundary";

    fn test_state() -> ServerState {
        ServerState {
            defaults: DisplaySettings::default(),
            seed: Some(42),
            latency: Duration::ZERO,
            page: PageOptions {
                title: "AudioViz AI".into(),
                plotly_src: "plotly.js".into(),
                interactive: true,
            },
            max_upload_bytes: 1024 * 1024,
            shell: Arc::new(Shell::embedded()),
        }
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        send_to(test_state(), request).await
    }

    async fn send_to(state: ServerState, request: Request<Body>) -> (StatusCode, String) {
        let response = make_app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get(uri: &str) -> (StatusCode, String) {
        send(Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    fn form_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn post_form(body: Vec<u8>) -> (StatusCode, String) {
        send(form_request(body)).await
    }

    fn hidden_value<'a>(html: &'a str, name: &str) -> Option<&'a str> {
        let marker = format!("name=\"{name}\" value=\"");
        let start = html.find(&marker)? + marker.len();
        let len = html[start..].find('"')?;
        Some(&html[start..start + len])
    }

    #[tokio::test]
    async fn bare_dashboard_shows_prompts() {
        let (status, html) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Please upload an audio file or select a sample track to begin analysis."));
        assert!(html.contains("Analyze Audio"));
        assert!(!html.contains("Plotly.newPlot"));
    }

    #[tokio::test]
    async fn sample_query_renders_charts() {
        let (status, html) = get("/?sample=jazz-sample&viz=correlation&analyze=1").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Using sample: Jazz Sample"));
        assert!(html.contains("Analysis complete!"));
        assert!(html.contains("Plotly.newPlot"));
    }

    #[tokio::test]
    async fn posted_file_gets_a_player() {
        let body = multipart_body(&[("fft_size", "1024")], Some(("song.mp3", b"ID3data".as_slice())));
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<audio controls src=\"data:audio/mpeg;base64,"));
        assert!(html.contains("song.mp3"));
    }

    #[tokio::test]
    async fn upload_survives_the_next_interaction() {
        let body = multipart_body(&[], Some(("song.mp3", b"ID3data".as_slice())));
        let (_, first) = post_form(body).await;
        assert_eq!(hidden_value(&first, "file_name"), Some("song.mp3"));
        let data = hidden_value(&first, "file_data").unwrap().to_string();

        let body = multipart_body(
            &[("file_name", "song.mp3"), ("file_data", data.as_str()), ("sample", "none"), ("viz", "correlation")],
            Some(("", b"".as_slice())),
        );
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("<audio controls src=\"data:audio/mpeg;base64,SUQzZGF0YQ==\"></audio>"));
        assert!(!html.contains("Please upload an audio file"));
        assert!(html.contains("<option value=\"correlation\" selected>"));
    }

    #[tokio::test]
    async fn new_file_replaces_the_carried_one() {
        let body = multipart_body(
            &[("file_name", "old.mp3"), ("file_data", "SUQz")],
            Some(("new.ogg", b"OggS".as_slice())),
        );
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("data:audio/ogg;base64,"));
        assert!(!html.contains("old.mp3"));
    }

    #[tokio::test]
    async fn corrupt_carried_upload_is_rejected() {
        let body = multipart_body(&[("file_name", "song.mp3"), ("file_data", "not base64!")], None);
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("invalid carried file data"));
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let small_limit = || ServerState {
            max_upload_bytes: 1024,
            ..test_state()
        };

        let body = multipart_body(&[], Some(("big.wav", vec![0u8; 4096].as_slice())));
        let (status, html) = send_to(small_limit(), form_request(body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(html.contains("upload of 4096 bytes exceeds the 1024 byte limit"));
        assert!(html.contains("Back to the dashboard"));

        let body = multipart_body(&[], Some(("huge.wav", vec![0u8; 256 * 1024].as_slice())));
        let (status, html) = send_to(small_limit(), form_request(body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(html.contains("Back to the dashboard"));
    }

    #[tokio::test]
    async fn empty_file_input_falls_back_to_sample() {
        let body = multipart_body(&[("sample", "pop-song")], Some(("", b"".as_slice())));
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Using sample: Pop Song"));
        assert!(!html.contains("<audio"));
    }

    #[tokio::test]
    async fn unsupported_extension_is_rejected() {
        let body = multipart_body(&[], Some(("notes.txt", b"hello".as_slice())));
        let (status, html) = post_form(body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("unsupported audio format"));
    }

    #[tokio::test]
    async fn invalid_fft_size_is_rejected() {
        let (status, html) = get("/?sample=pop-song&fft_size=300").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(html.contains("FFT size 300"));
    }

    #[tokio::test]
    async fn api_returns_analysis_json() {
        let (status, body) = get("/api/analysis?sample=rock-guitar&analyze=1").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["analysis"]["source"]["name"], "Rock Guitar");
        assert!(value["analysis"]["overview"].is_object());

        let (status, body) = get("/api/analysis").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert!(value["analysis"].is_null());
        assert!(value["message"].is_string());

        let (status, body) = get("/api/analysis?viz=spiral").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("unknown visualization type"));
    }

    #[tokio::test]
    async fn seeded_server_is_reproducible() {
        let (_, first) = get("/api/analysis?sample=electronic-beat").await;
        let (_, second) = get("/api/analysis?sample=electronic-beat").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn health_check() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }
}
