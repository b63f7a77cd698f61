use std::{error::Error, fmt, io, time::Duration};

/// Link-level failures. All of them end the session: the wire format has no
/// resynchronization primitive, so continuing after a fault would read every
/// following field misaligned.
#[derive(Debug)]
pub enum LinkError {
    /// The channel could not be acquired at all.
    Connect {
        addr: String,
        source: io::Error,
    },
    Io(io::Error),
    /// A blocking read exceeded the configured deadline.
    Timeout(Duration),
    /// The response violated the expected shape (e.g. it ended before the
    /// announced coefficient count was delivered).
    Protocol(String),
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Connect { addr, source } => {
                write!(f, "could not open {addr}: {source}")
            }
            LinkError::Io(e) => write!(f, "io error: {e}"),
            LinkError::Timeout(limit) => {
                write!(f, "no response within {limit:?}")
            }
            LinkError::Protocol(msg) => write!(f, "protocol violation: {msg}"),
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            LinkError::Connect { source, .. } => Some(source),
            LinkError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for LinkError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<LinkError> for io::Error {
    fn from(value: LinkError) -> Self {
        match value {
            LinkError::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
