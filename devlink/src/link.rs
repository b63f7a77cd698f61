//! Exclusive handle over the byte channel to the device.

use std::{io, time::Duration};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};

use crate::{LinkError, Result};

/// Time some boards need to come out of the reset triggered by opening the port.
const SETTLE_TIME: Duration = Duration::from_secs(2);

/// Single-owner handle over one duplex byte channel.
///
/// The protocol is strictly half-duplex: one request is written in full, then
/// its response is read in full. There is never more than one outstanding
/// operation, so no locking is needed.
pub struct Link<P>
where
    P: AsyncRead + AsyncWrite + Unpin,
{
    port: Option<P>,
    read_deadline: Option<Duration>,
}

impl Link<SerialStream> {
    /// Opens the physical serial port at 8N1 and waits out the device reset.
    ///
    /// Any bytes already buffered in either direction are discarded so the
    /// session starts from a clean byte boundary.
    ///
    /// # Args
    /// * `path` - Device path, e.g. `/dev/ttyACM0`.
    /// * `baud` - Line speed, e.g. `115200`.
    ///
    /// # Errors
    /// Returns `LinkError::Connect` if the port cannot be acquired.
    pub async fn open_serial(path: &str, baud: u32) -> Result<Self> {
        let connect = |e: tokio_serial::Error| LinkError::Connect {
            addr: path.to_string(),
            source: io::Error::other(e),
        };

        let port = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()
            .map_err(connect)?;

        tokio::time::sleep(SETTLE_TIME).await;
        port.clear(ClearBuffer::All).map_err(connect)?;

        Ok(Self::new(port))
    }
}

impl<P: AsyncRead + AsyncWrite + Unpin> Link<P> {
    /// Wraps an already-open channel. Tests use the halves of a
    /// `tokio::io::duplex` pair here.
    pub fn new(port: P) -> Self {
        Self {
            port: Some(port),
            read_deadline: None,
        }
    }

    /// Sets the deadline applied to every blocking read. `None` restores the
    /// original wait-forever behavior.
    pub fn set_read_deadline(&mut self, deadline: Option<Duration>) {
        self.read_deadline = deadline;
    }

    fn port_mut(&mut self) -> Result<&mut P> {
        self.port
            .as_mut()
            .ok_or_else(|| LinkError::Io(io::Error::new(io::ErrorKind::NotConnected, "link closed")))
    }

    /// Writes all of `bytes` to the channel and flushes.
    ///
    /// # Errors
    /// Returns `LinkError::Io` on a channel fault.
    pub async fn send_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_mut()?;
        port.write_all(bytes).await?;
        port.flush().await?;
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes from the channel. No partial read is
    /// observable to the caller.
    ///
    /// # Errors
    /// Returns `LinkError::Timeout` if the configured deadline expires and
    /// `LinkError::Io` if the channel closes mid-read.
    pub async fn recv_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let deadline = self.read_deadline;
        let port = self.port_mut()?;

        match deadline {
            Some(limit) => match tokio::time::timeout(limit, port.read_exact(buf)).await {
                Ok(read) => {
                    read?;
                    Ok(())
                }
                Err(_) => Err(LinkError::Timeout(limit)),
            },
            None => {
                port.read_exact(buf).await?;
                Ok(())
            }
        }
    }

    /// Closes the channel. Idempotent; also implied by drop, so every exit
    /// path releases the port.
    pub fn close(&mut self) {
        self.port = None;
    }
}
