//! Fixed-width little-endian scalar and array framing.
//!
//! There are no delimiters: every field width is implicit from protocol
//! position, so the caller must read and write fields in the exact order the
//! device expects.

use tokio::io::{AsyncRead, AsyncWrite};

use crate::{Link, Result};

/// Largest supported scalar width, in bytes.
const MAX_SCALAR: usize = 8;

/// Fixed-width scalar that crosses the wire in little-endian byte order.
pub trait WireScalar: bytemuck::Pod {
    const SIZE: usize;

    fn put_le(&self, buf: &mut [u8]);
    fn from_le(buf: &[u8]) -> Self;
}

macro_rules! wire_scalar {
    ($($t:ty),* $(,)?) => {$(
        impl WireScalar for $t {
            const SIZE: usize = size_of::<$t>();

            fn put_le(&self, buf: &mut [u8]) {
                buf[..Self::SIZE].copy_from_slice(&self.to_le_bytes());
            }

            fn from_le(buf: &[u8]) -> Self {
                // SAFETY: callers always hand a slice of at least `SIZE` bytes.
                Self::from_le_bytes(buf[..Self::SIZE].try_into().unwrap())
            }
        }
    )*};
}

wire_scalar!(u8, i8, u16, i32, f32);

/// Serializes one scalar and hands it to the link.
pub async fn send_scalar<P, T>(link: &mut Link<P>, value: T) -> Result<()>
where
    P: AsyncRead + AsyncWrite + Unpin,
    T: WireScalar,
{
    let mut buf = [0u8; MAX_SCALAR];
    value.put_le(&mut buf);
    link.send_bytes(&buf[..T::SIZE]).await
}

/// Reads exactly `T::SIZE` bytes and decodes one scalar.
pub async fn recv_scalar<P, T>(link: &mut Link<P>) -> Result<T>
where
    P: AsyncRead + AsyncWrite + Unpin,
    T: WireScalar,
{
    let mut buf = [0u8; MAX_SCALAR];
    link.recv_bytes(&mut buf[..T::SIZE]).await?;
    Ok(T::from_le(&buf[..T::SIZE]))
}

/// Writes each element in input order. Does not prefix a count; the protocol
/// layer sends the count separately beforehand.
pub async fn send_array<P, T>(link: &mut Link<P>, values: &[T]) -> Result<()>
where
    P: AsyncRead + AsyncWrite + Unpin,
    T: WireScalar,
{
    let mut buf = vec![0u8; values.len() * T::SIZE];
    for (chunk, value) in buf.chunks_exact_mut(T::SIZE).zip(values) {
        value.put_le(chunk);
    }
    link.send_bytes(&buf).await
}

/// Reads `count` scalars in order.
pub async fn recv_array<P, T>(link: &mut Link<P>, count: usize) -> Result<Vec<T>>
where
    P: AsyncRead + AsyncWrite + Unpin,
    T: WireScalar,
{
    let mut buf = vec![0u8; count * T::SIZE];
    link.recv_bytes(&mut buf).await?;
    Ok(buf.chunks_exact(T::SIZE).map(T::from_le).collect())
}
