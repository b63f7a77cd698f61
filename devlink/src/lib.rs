//! Host side of the serial link to the curve-fitting device.
//!
//! The device speaks a positional binary protocol: fixed-width little-endian
//! fields with no delimiters, no checksum and no resynchronization marker.
//! Both ends must agree on byte boundaries at all times; a single dropped
//! byte desynchronizes the rest of the session, which is why every link
//! failure here is fatal to the session rather than retried.

mod codec;
mod error;
mod link;

pub mod fit;

pub use codec::{WireScalar, recv_array, recv_scalar, send_array, send_scalar};
pub use error::LinkError;
pub use link::Link;

/// The link module's result type.
pub type Result<T> = std::result::Result<T, LinkError>;
