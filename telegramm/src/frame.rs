//! The frame format both sides of a connection speak: a little-endian
//! `u32` length, then that many bytes of postcard payload.

use crate::Error;
use std::{convert::TryInto, io};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Read one frame. `Ok(None)` means the peer hung up cleanly between
/// frames.
pub(crate) async fn read<S>(stream: &mut S) -> Result<Option<Vec<u8>>, Error>
where
    S: AsyncRead + Unpin,
{
    let mut length = [0; 4];
    match stream.read_exact(&mut length).await {
        Ok(_) => {}
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err.into()),
    }

    let mut payload = vec![0; u32::from_le_bytes(length) as usize];
    stream.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one frame.
pub(crate) async fn write<S>(stream: &mut S, payload: &[u8]) -> Result<(), Error>
where
    S: AsyncWrite + Unpin,
{
    let length: u32 = payload
        .len()
        .try_into()
        .map_err(|_| Error::MessageTooLong)?;
    stream.write_all(&length.to_le_bytes()).await?;
    stream.write_all(payload).await?;
    Ok(())
}
