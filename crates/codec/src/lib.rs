//! Length-delimited record framing on ordered byte streams.
//!
//! Each record is an unsigned varint byte length followed by exactly that
//! many payload bytes. Readers enforce a maximum record size before
//! allocating anything, so a hostile length prefix cannot exhaust memory.

use prost::Message;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default cap on a single record: 100 MiB.
pub const MAX_MESSAGE_SIZE: usize = 100 * 1024 * 1024;

/// Longest legal varint encoding of a u64 length.
const MAX_VARINT_BYTES: usize = 10;

#[derive(Debug, Error)]
pub enum Error {
    /// The stream ended cleanly before the first byte of a record.
    #[error("end of stream")]
    EndOfStream,

    /// The stream ended in the middle of a record.
    #[error("truncated record")]
    TruncatedRecord,

    /// The length prefix is not a valid varint.
    #[error("malformed length prefix")]
    MalformedLength,

    /// The declared length exceeds the configured maximum.
    #[error("record too large: {len} bytes exceeds maximum of {max}")]
    RecordTooLarge { len: u64, max: usize },

    #[error("malformed record: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("failed to encode record: {0}")]
    Encode(#[from] prost::EncodeError),

    #[error(transparent)]
    Io(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::TruncatedRecord,
            _ => Error::Io(e),
        }
    }
}

/// Write one length-delimited record to `writer`.
///
/// The caller decides when to flush; a buffered writer is not flushed here.
pub async fn write_msg<M, W>(writer: &mut W, msg: &M) -> Result<(), Error>
where
    M: Message,
    W: AsyncWrite + Unpin,
{
    let len = msg.encoded_len();

    let mut buf = Vec::with_capacity(len + MAX_VARINT_BYTES);
    prost::encoding::encode_varint(len as u64, &mut buf);
    msg.encode(&mut buf)?;

    writer.write_all(&buf).await?;

    Ok(())
}

/// Read one length-delimited record from `reader`, rejecting records longer
/// than `max_size` without allocating the claimed length.
///
/// EOF before the first byte is [`Error::EndOfStream`]; EOF anywhere inside
/// the record is [`Error::TruncatedRecord`].
pub async fn read_msg<M, R>(reader: &mut R, max_size: usize) -> Result<M, Error>
where
    M: Message + Default,
    R: AsyncRead + Unpin,
{
    let len = read_varint(reader).await?;

    if len > max_size as u64 {
        return Err(Error::RecordTooLarge { len, max: max_size });
    }

    let mut buf = vec![0; len as usize];
    reader.read_exact(&mut buf).await?;

    Ok(M::decode(buf.as_slice())?)
}

/// Read a varint length prefix byte by byte.
async fn read_varint<R>(reader: &mut R) -> Result<u64, Error>
where
    R: AsyncRead + Unpin,
{
    let mut value: u64 = 0;

    for i in 0..MAX_VARINT_BYTES {
        let byte = match reader.read_u8().await {
            Ok(byte) => byte,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                // EOF on the very first byte is a clean end of stream.
                return Err(if i == 0 {
                    Error::EndOfStream
                } else {
                    Error::TruncatedRecord
                });
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let bits = u64::from(byte & 0x7f);
        value |= bits
            .checked_shl(7 * i as u32)
            .ok_or(Error::MalformedLength)?;

        if byte & 0x80 == 0 {
            // The tenth byte may only contribute one bit.
            if i == MAX_VARINT_BYTES - 1 && byte > 1 {
                return Err(Error::MalformedLength);
            }
            return Ok(value);
        }
    }

    Err(Error::MalformedLength)
}
