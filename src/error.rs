use std::fmt;
use std::path::PathBuf;

/// All errors that can occur while building or training a cWGAN.
#[derive(Debug)]
pub enum WganError {
    /// Invalid configuration, caught before training starts.
    Configuration(String),
    /// A batch larger than the dataset was requested.
    InsufficientData { batch_size: usize, available: usize },
    /// A loss or gradient contained NaN or Inf; the update was not applied.
    NumericalInstability { network: &'static str, detail: String },
    /// Writing a checkpoint or a loss log failed.
    Persistence { path: PathBuf, detail: String },
    /// Malformed or inconsistent training data.
    Data(String),
    /// Parameter shapes do not line up (e.g. restoring into another architecture).
    Shape(String),
    /// An underlying I/O error not covered by the above variants.
    Io(std::io::Error),
}

impl fmt::Display for WganError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "configuration error: {msg}"),
            Self::InsufficientData {
                batch_size,
                available,
            } => write!(
                f,
                "insufficient data: batch size {batch_size} exceeds {available} training examples"
            ),
            Self::NumericalInstability { network, detail } => {
                write!(f, "numerical instability in {network}: {detail}")
            }
            Self::Persistence { path, detail } => {
                write!(f, "failed to persist {}: {detail}", path.display())
            }
            Self::Data(msg) => write!(f, "data error: {msg}"),
            Self::Shape(msg) => write!(f, "shape mismatch: {msg}"),
            Self::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl std::error::Error for WganError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for WganError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, WganError>;
