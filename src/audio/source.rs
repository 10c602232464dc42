use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::InputError;

/// Display duration for an uploaded file. Nothing is decoded, so this is fixed.
pub const UPLOAD_DURATION_SECS: u32 = 45;
/// Display duration for every bundled sample track.
pub const SAMPLE_DURATION_SECS: u32 = 30;

const SAMPLE_RATE_HZ: u32 = 44_100;
const SAMPLE_SIZE_LABEL: &str = "2.5 MB";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 3] = [AudioFormat::Mp3, AudioFormat::Wav, AudioFormat::Ogg];

    /// Match a file extension against the upload allow-list (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" => Some(AudioFormat::Wav),
            "ogg" => Some(AudioFormat::Ogg),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "MP3",
            AudioFormat::Wav => "WAV",
            AudioFormat::Ogg => "OGG",
        }
    }
}

/// A user-supplied file. The payload is only kept for the playback widget
/// and is shared, not copied, with the page that plays it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedAudioRef {
    pub name: String,
    pub size_bytes: u64,
    pub format: AudioFormat,
    pub data: Arc<[u8]>,
}

impl UploadedAudioRef {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Result<Self, InputError> {
        let name = name.into();
        let ext = Path::new(&name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        let format = AudioFormat::from_extension(ext)
            .ok_or_else(|| InputError::UnsupportedFormat(name.clone()))?;

        Ok(Self {
            name,
            size_bytes: data.len() as u64,
            format,
            data: data.into(),
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Invalid audio file name: {}", path.display()))?
            .to_string();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read audio file: {}", path.display()))?;
        Ok(Self::new(name, data)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SampleTrack {
    ElectronicBeat,
    JazzSample,
    ClassicalPiano,
    PopSong,
    RockGuitar,
}

impl SampleTrack {
    pub const ALL: [SampleTrack; 5] = [
        SampleTrack::ElectronicBeat,
        SampleTrack::JazzSample,
        SampleTrack::ClassicalPiano,
        SampleTrack::PopSong,
        SampleTrack::RockGuitar,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SampleTrack::ElectronicBeat => "Electronic Beat",
            SampleTrack::JazzSample => "Jazz Sample",
            SampleTrack::ClassicalPiano => "Classical Piano",
            SampleTrack::PopSong => "Pop Song",
            SampleTrack::RockGuitar => "Rock Guitar",
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            SampleTrack::ElectronicBeat => "electronic-beat",
            SampleTrack::JazzSample => "jazz-sample",
            SampleTrack::ClassicalPiano => "classical-piano",
            SampleTrack::PopSong => "pop-song",
            SampleTrack::RockGuitar => "rock-guitar",
        }
    }

    /// Parse a form value where `none` (or nothing) means no sample.
    pub fn parse_optional(value: &str) -> Result<Option<Self>, InputError> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(None);
        }
        trimmed.parse().map(Some)
    }
}

impl FromStr for SampleTrack {
    type Err = InputError;

    /// Accepts the slug (`jazz-sample`) or the display name (`Jazz Sample`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        SampleTrack::ALL
            .into_iter()
            .find(|t| t.slug().eq_ignore_ascii_case(wanted) || t.display_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InputError::UnknownSample(wanted.to_string()))
    }
}

impl fmt::Display for SampleTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whatever drives the current render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioSource<'a> {
    Upload(&'a UploadedAudioRef),
    Sample(SampleTrack),
}

/// An uploaded file wins over a selected sample.
pub fn select(upload: Option<&UploadedAudioRef>, sample: Option<SampleTrack>) -> Option<AudioSource<'_>> {
    match (upload, sample) {
        (Some(file), _) => Some(AudioSource::Upload(file)),
        (None, Some(track)) => Some(AudioSource::Sample(track)),
        (None, None) => None,
    }
}

impl AudioSource<'_> {
    pub fn duration_secs(&self) -> u32 {
        match self {
            AudioSource::Upload(_) => UPLOAD_DURATION_SECS,
            AudioSource::Sample(_) => SAMPLE_DURATION_SECS,
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            AudioSource::Upload(file) => &file.name,
            AudioSource::Sample(track) => track.display_name(),
        }
    }

    pub fn summary(&self) -> SourceSummary {
        let (kind, format, size, size_bytes) = match self {
            AudioSource::Upload(file) => (
                SourceKind::Upload,
                file.format.label(),
                format_size(file.size_bytes),
                Some(file.size_bytes),
            ),
            AudioSource::Sample(_) => (
                SourceKind::Sample,
                AudioFormat::Wav.label(),
                SAMPLE_SIZE_LABEL.to_string(),
                None,
            ),
        };

        SourceSummary {
            kind,
            name: self.display_name().to_string(),
            duration_secs: self.duration_secs(),
            sample_rate_hz: SAMPLE_RATE_HZ,
            channels: "Stereo",
            format,
            size,
            size_bytes,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Upload,
    Sample,
}

/// Metadata panel contents. Only the upload size and format are real.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceSummary {
    pub kind: SourceKind,
    pub name: String,
    pub duration_secs: u32,
    pub sample_rate_hz: u32,
    pub channels: &'static str,
    pub format: &'static str,
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
}

pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}
