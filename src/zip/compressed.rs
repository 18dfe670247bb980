use std::pin::Pin;
use std::task::{Context, Poll};

use async_compression::tokio::bufread::DeflateDecoder;
use pin_project::pin_project;
use tokio::io::{AsyncBufRead, AsyncRead, ReadBuf};

use super::structures::CompressionMethod;
use crate::error::{Error, Result};

/// A wrapping reader holding the concrete decoder for each supported
/// compression method. ZIP entries carry raw DEFLATE, no zlib wrapper.
#[pin_project(project = CompressedReaderProj)]
pub(crate) enum CompressedReader<R> {
    Stored(#[pin] R),
    Deflate(#[pin] DeflateDecoder<R>),
}

impl<R> CompressedReader<R>
where
    R: AsyncBufRead,
{
    pub(crate) fn new(reader: R, compression: CompressionMethod) -> Result<Self> {
        match compression {
            CompressionMethod::Stored => Ok(CompressedReader::Stored(reader)),
            CompressionMethod::Deflate => Ok(CompressedReader::Deflate(DeflateDecoder::new(reader))),
            CompressionMethod::Unknown(method) => Err(Error::UnsupportedCompression(method)),
        }
    }
}

impl<R> AsyncRead for CompressedReader<R>
where
    R: AsyncBufRead,
{
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.project() {
            CompressedReaderProj::Stored(inner) => inner.poll_read(cx, buf),
            CompressedReaderProj::Deflate(inner) => inner.poll_read(cx, buf),
        }
    }
}
