// src/services/exports/gzip.rs
use bytes::Bytes;
use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;
use futures_util::stream::{self, Stream, StreamExt};
use std::io::{self, Write};

use super::{ByteStream, ExportError};

/// Collects decompressed output and refuses any write that would cross `limit`.
struct CappedSink {
    buf: Vec<u8>,
    limit: u64,
    exceeded: bool,
}

impl Write for CappedSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if (self.buf.len() + data.len()) as u64 > self.limit {
            self.exceeded = true;
            return Err(io::Error::new(io::ErrorKind::Other, "decompressed size limit exceeded"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Incremental gunzip with a hard ceiling on the decompressed size.
///
/// Compressed chunks are pushed as they arrive; the running decompressed total
/// is checked on every write, so at most `limit` decompressed bytes are ever held.
pub struct BoundedGunzip {
    decoder: GzDecoder<CappedSink>,
    limit: u64,
}

impl BoundedGunzip {
    pub fn new(limit: u64) -> Self {
        BoundedGunzip {
            decoder: GzDecoder::new(CappedSink {
                buf: Vec::new(),
                limit,
                exceeded: false,
            }),
            limit,
        }
    }

    fn classify(&self, err: io::Error) -> ExportError {
        if self.decoder.get_ref().exceeded {
            ExportError::TooLarge { limit: self.limit }
        } else {
            ExportError::Io(err)
        }
    }

    pub fn push(&mut self, chunk: &[u8]) -> Result<(), ExportError> {
        match self.decoder.write_all(chunk) {
            Ok(()) => Ok(()),
            Err(err) => Err(self.classify(err)),
        }
    }

    pub fn decompressed_len(&self) -> usize {
        self.decoder.get_ref().buf.len()
    }

    pub fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        if let Err(err) = self.decoder.try_finish() {
            return Err(self.classify(err));
        }
        let sink = self.decoder.finish()?;
        Ok(sink.buf)
    }
}

pub fn gzip_bytes(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Passes chunks through until more than `limit` bytes have gone by, then
/// yields `TooLarge` once and ends.
pub fn cap_stream<S>(inner: S, limit: u64) -> ByteStream
where
    S: Stream<Item = Result<Bytes, ExportError>> + Send + 'static,
{
    let capped = stream::unfold(
        (Box::pin(inner), 0u64, false),
        move |(mut inner, total, done)| async move {
            if done {
                return None;
            }
            match inner.next().await {
                Some(Ok(chunk)) => {
                    let total = total + chunk.len() as u64;
                    if total > limit {
                        Some((Err(ExportError::TooLarge { limit }), (inner, total, true)))
                    } else {
                        Some((Ok(chunk), (inner, total, false)))
                    }
                }
                Some(Err(err)) => Some((Err(err), (inner, total, true))),
                None => None,
            }
        },
    );
    Box::pin(capped)
}
