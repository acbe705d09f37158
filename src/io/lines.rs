use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt, future};
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec};

use super::error::SourceError;

/// Async stream of text lines, one element per line
pub struct LineSource {
    inner: Pin<Box<dyn Stream<Item = Result<String, SourceError>> + Send>>,
}

impl LineSource {
    /// Create a line stream from an async reader
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        let stream = FramedRead::new(reader, LinesCodec::new())
            .map(|result| result.map_err(SourceError::from));

        Self {
            inner: Box::pin(stream),
        }
    }

    /// Create a line stream from a file path
    ///
    /// # Example
    /// ```rust,ignore
    /// let source = LineSource::from_file("messages.txt").await?.skip_blank();
    /// ```
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let file = File::open(path.as_ref()).await?;
        Ok(Self::new(file))
    }

    /// Drop lines that are empty or only whitespace
    pub fn skip_blank(self) -> Self {
        let stream = self.inner.filter(|result| {
            future::ready(!matches!(result, Ok(line) if line.trim().is_empty()))
        });

        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for LineSource {
    type Item = Result<String, SourceError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}
