use thiserror::Error;

/// Which of the two input tracks an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Track {
    Reference,
    Degraded,
}

impl std::fmt::Display for Track {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Track::Reference => f.write_str("reference"),
            Track::Degraded => f.write_str("degraded"),
        }
    }
}

/// All errors produced by voxgrade-core.
#[derive(Debug, Error)]
pub enum RatingError {
    #[error(
        "{track} signal below 1/4 second: {usable_samples} usable samples, \
         need at least {required_samples}"
    )]
    InputTooShort {
        track: Track,
        usable_samples: i64,
        required_samples: i64,
    },

    #[error("internal inconsistency: {0}")]
    InternalInconsistency(String),

    #[error("WAV decode error: {0}")]
    Wav(#[from] hound::Error),

    #[error("resampler error: {0}")]
    Resample(String),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RatingError>;
