use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::io::{self, Write};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

use crate::error::ImageLoaderError;

/// Size of the byte chunks handed to the response
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Chunks buffered between the encoder thread and the consumer
const CHANNEL_CAPACITY: usize = 4;

enum Frame {
    Data(Bytes),
    End,
    Failed(ImageLoaderError),
}

/// Lazily produced output of an encoder running on the blocking pool.
///
/// Yields byte chunks until the producer signals completion. A failure is
/// yielded once as an `Err` item, after which the stream is finished. If the
/// producer goes away without signalling completion the stream yields a
/// `TranscodeFailure` instead of ending silently.
pub struct EncodedStream {
    rx: mpsc::Receiver<Frame>,
    finished: bool,
}

impl EncodedStream {
    /// Run `produce` on tokio's blocking pool, streaming everything it writes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(produce: F) -> Self
    where
        F: FnOnce(&mut ChunkWriter) -> Result<(), ImageLoaderError> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            let mut writer = ChunkWriter::new(tx.clone());
            let outcome = produce(&mut writer).and_then(|()| writer.finish());
            if let Err(err) = outcome {
                // The receiver may already be gone, in which case nobody is listening
                let _ = tx.blocking_send(Frame::Failed(err));
            }
        });

        Self {
            rx,
            finished: false,
        }
    }

    /// Drain the stream into a single buffer
    pub async fn collect_bytes(mut self) -> Result<Bytes, ImageLoaderError> {
        use futures::StreamExt;

        let mut out = BytesMut::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.freeze())
    }
}

impl Stream for EncodedStream {
    type Item = Result<Bytes, ImageLoaderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.rx.poll_recv(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Frame::Data(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Frame::End)) => {
                self.finished = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Frame::Failed(err))) => {
                self.finished = true;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(Some(Err(ImageLoaderError::TranscodeFailure(
                    "encoder stopped before completing the image".to_string(),
                ))))
            }
        }
    }
}

/// `Write` sink that forwards fixed-size chunks to an `EncodedStream`
pub struct ChunkWriter {
    tx: mpsc::Sender<Frame>,
    buf: Vec<u8>,
}

impl ChunkWriter {
    fn new(tx: mpsc::Sender<Frame>) -> Self {
        Self {
            tx,
            buf: Vec::with_capacity(CHUNK_SIZE),
        }
    }

    fn send_buffered(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = Bytes::from(std::mem::replace(&mut self.buf, Vec::with_capacity(CHUNK_SIZE)));
        self.tx
            .blocking_send(Frame::Data(chunk))
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "encoded stream was dropped"))
    }

    /// Flush the remaining bytes and signal completion
    fn finish(mut self) -> Result<(), ImageLoaderError> {
        self.send_buffered()?;
        self.tx.blocking_send(Frame::End).map_err(|_| {
            io::Error::new(io::ErrorKind::BrokenPipe, "encoded stream was dropped")
        })?;
        Ok(())
    }
}

impl Write for ChunkWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let room = CHUNK_SIZE - self.buf.len();
        let taken = room.min(data.len());
        self.buf.extend_from_slice(&data[..taken]);
        if self.buf.len() == CHUNK_SIZE {
            self.send_buffered()?;
        }
        Ok(taken)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.send_buffered()
    }
}
