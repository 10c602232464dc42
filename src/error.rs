use thiserror::Error;

/// Rejected user input. Everything else that can fail is an `anyhow` error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("unsupported audio format '{0}' (expected mp3, wav or ogg)")]
    UnsupportedFormat(String),

    #[error("FFT size {0} is not one of 512, 1024, 2048, 4096")]
    InvalidFftSize(u32),

    #[error("hop length {0} is not one of 256, 512, 1024")]
    InvalidHopLength(u32),

    #[error("unknown sample track '{0}'")]
    UnknownSample(String),

    #[error("unknown visualization type '{0}'")]
    UnknownVisualization(String),

    #[error("unknown spectral feature '{0}'")]
    UnknownFeature(String),

    #[error("invalid value for {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("upload of {size} bytes exceeds the {limit} byte limit")]
    UploadTooLarge { size: u64, limit: u64 },

    #[error("failed to read upload: {0}")]
    Upload(String),
}
