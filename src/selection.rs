use serde::Deserialize;

use crate::audio::advanced::VizType;
use crate::audio::features::{DisplaySettings, FftSize, HopLength, SpectralFeature};
use crate::audio::source::{self, AudioSource, SampleTrack, UploadedAudioRef};
use crate::error::InputError;

/// Every control on the dashboard, as chosen for one render pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    pub upload: Option<UploadedAudioRef>,
    pub sample: Option<SampleTrack>,
    pub settings: DisplaySettings,
    pub viz: VizType,
    pub feature: SpectralFeature,
    /// The Analyze trigger fired on this pass.
    pub analyze: bool,
}

impl Selection {
    pub fn source(&self) -> Option<AudioSource<'_>> {
        source::select(self.upload.as_ref(), self.sample)
    }
}

/// Untyped form / query-string values.
#[derive(Debug, Default, Deserialize)]
pub struct RawSelection {
    pub sample: Option<String>,
    pub fft_size: Option<String>,
    pub hop_length: Option<String>,
    pub viz: Option<String>,
    pub feature: Option<String>,
    pub analyze: Option<String>,
}

impl RawSelection {
    /// Store a multipart text field. Returns false for unknown field names.
    pub fn set(&mut self, field: &str, value: String) -> bool {
        let slot = match field {
            "sample" => &mut self.sample,
            "fft_size" => &mut self.fft_size,
            "hop_length" => &mut self.hop_length,
            "viz" => &mut self.viz,
            "feature" => &mut self.feature,
            "analyze" => &mut self.analyze,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Validate against the fixed enumerations; blank fields take `defaults`.
    pub fn resolve(
        self,
        upload: Option<UploadedAudioRef>,
        defaults: DisplaySettings,
    ) -> Result<Selection, InputError> {
        let sample = match non_blank(self.sample) {
            Some(name) => SampleTrack::parse_optional(&name)?,
            None => None,
        };
        let fft_size = match non_blank(self.fft_size) {
            Some(v) => v.parse::<FftSize>()?,
            None => defaults.fft_size,
        };
        let hop_length = match non_blank(self.hop_length) {
            Some(v) => v.parse::<HopLength>()?,
            None => defaults.hop_length,
        };
        let viz = non_blank(self.viz).map(|v| v.parse::<VizType>()).transpose()?.unwrap_or_default();
        let feature = non_blank(self.feature).map(|v| v.parse::<SpectralFeature>()).transpose()?.unwrap_or_default();
        let analyze = non_blank(self.analyze).is_some_and(|v| !matches!(v.as_str(), "0" | "false" | "off"));

        Ok(Selection {
            upload,
            sample,
            settings: DisplaySettings { fft_size, hop_length },
            viz,
            feature,
            analyze,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_fall_back_to_defaults() {
        let selection = RawSelection::default()
            .resolve(None, DisplaySettings::default())
            .unwrap();
        assert_eq!(selection, Selection::default());
        assert!(selection.source().is_none());
    }

    #[test]
    fn resolves_every_field() {
        let mut raw = RawSelection::default();
        assert!(raw.set("sample", "Jazz Sample".into()));
        assert!(raw.set("fft_size", "4096".into()));
        assert!(raw.set("hop_length", "1024".into()));
        assert!(raw.set("viz", "fingerprint".into()));
        assert!(raw.set("feature", "contrast".into()));
        assert!(raw.set("analyze", "1".into()));
        assert!(!raw.set("colour", "red".into()));

        let s = raw.resolve(None, DisplaySettings::default()).unwrap();
        assert_eq!(s.sample, Some(SampleTrack::JazzSample));
        assert_eq!(s.settings.fft_size.get(), 4096);
        assert_eq!(s.settings.hop_length.get(), 1024);
        assert_eq!(s.viz, VizType::AudioFingerprint);
        assert_eq!(s.feature, SpectralFeature::Contrast);
        assert!(s.analyze);
    }

    #[test]
    fn rejects_values_outside_the_enumerations() {
        let raw = RawSelection {
            fft_size: Some("300".into()),
            ..Default::default()
        };
        assert_eq!(
            raw.resolve(None, DisplaySettings::default()),
            Err(InputError::InvalidFftSize(300))
        );

        let raw = RawSelection {
            sample: Some("Opera".into()),
            ..Default::default()
        };
        assert!(matches!(
            raw.resolve(None, DisplaySettings::default()),
            Err(InputError::UnknownSample(_))
        ));
    }

    #[test]
    fn analyze_flag_accepts_common_false_spellings() {
        for (value, expected) in [("analyze", true), ("on", true), ("false", false), ("0", false), ("", false)] {
            let raw = RawSelection {
                analyze: Some(value.into()),
                ..Default::default()
            };
            let s = raw.resolve(None, DisplaySettings::default()).unwrap();
            assert_eq!(s.analyze, expected, "{value:?}");
        }
    }

    #[test]
    fn upload_wins_over_selected_sample() {
        let file = UploadedAudioRef::new("take.wav", vec![9; 10]).unwrap();
        let raw = RawSelection {
            sample: Some("pop-song".into()),
            ..Default::default()
        };
        let s = raw.resolve(Some(file.clone()), DisplaySettings::default()).unwrap();
        assert_eq!(s.source(), Some(AudioSource::Upload(&file)));
    }
}
