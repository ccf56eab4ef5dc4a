//! Length-prefixed framing for JSON messages over a stream socket:
//! `[len: u32 big-endian][json bytes]`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::error::WireError;

/// Maximum frame size accepted from the KMS, guarding against a
/// misbehaving or malicious peer claiming an absurd length.
pub const MAX_FRAME_BYTES: u32 = 16 * 1024 * 1024;

/// Write one length-prefixed JSON frame.
pub async fn write_frame<W, T>(w: &mut W, value: &T) -> Result<(), WireError>
where
    W: tokio::io::AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let payload = serde_json::to_vec(value)?;
    if payload.len() as u64 > MAX_FRAME_BYTES as u64 {
        return Err(WireError::FrameTooLarge(payload.len()));
    }
    w.write_all(&(payload.len() as u32).to_be_bytes()).await?;
    w.write_all(&payload).await?;
    w.flush().await?;
    Ok(())
}

/// Read one length-prefixed JSON frame.
pub async fn read_frame<R, T>(r: &mut R) -> Result<T, WireError>
where
    R: tokio::io::AsyncRead + Unpin,
    T: serde::de::DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf).await?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_BYTES {
        return Err(WireError::FrameTooLarge(len as usize));
    }
    let mut payload = vec![0u8; len as usize];
    r.read_exact(&mut payload).await?;
    Ok(serde_json::from_slice(&payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        a: u32,
        b: String,
    }

    #[tokio::test]
    async fn roundtrips_through_a_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let value = Sample { a: 1, b: "hi".into() };
        write_frame(&mut client, &value).await.unwrap();
        let got: Sample = read_frame(&mut server).await.unwrap();
        assert_eq!(got, value);
    }
}
