use std::{error::Error, fmt, io};

use devlink::LinkError;

/// Fitter runtime failures.
///
/// A point failing the residual test is never an error: exclusion is the
/// expected outcome that drives the loop, not a failure surfaced here.
#[derive(Debug)]
pub enum FitterErr {
    /// Invalid configuration — caught before any device exchange.
    InvalidConfig(String),
    /// The dataset has no points at all.
    EmptyDataset,
    /// The link to the device failed; fatal to the session.
    Link(LinkError),
}

impl fmt::Display for FitterErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitterErr::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            FitterErr::EmptyDataset => write!(f, "dataset is empty"),
            FitterErr::Link(e) => write!(f, "link error: {e}"),
        }
    }
}

impl Error for FitterErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            FitterErr::Link(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LinkError> for FitterErr {
    fn from(value: LinkError) -> Self {
        Self::Link(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<FitterErr> for io::Error {
    fn from(value: FitterErr) -> Self {
        match value {
            FitterErr::Link(LinkError::Io(e)) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
