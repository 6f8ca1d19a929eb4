use std::{
    future::Future,
    task::{Context, Poll},
};

use futures::{future::poll_fn, FutureExt};
use tracing::debug;

use crate::{
    boundary::request_boundary, tokenizer::Cursor, ByteSource, ErrorCause, HeaderSource,
    MultipartParseError, ParseOptions, Part,
};

/// A multipart body being parsed, one [`Part`] at a time.
///
/// Nothing is read from the body until the first part is requested. Errors
/// are terminal: after one is returned the parse is over.
///
/// ```no_run
/// # use actix_multipart_stream::{Multipart, ByteSource, MultipartParseError};
/// # async fn run<S: ByteSource>(mut multipart: Multipart<S>) -> Result<(), MultipartParseError> {
/// while let Some(part) = multipart.next_part().await? {
///     let name = part.name().unwrap_or_default().to_owned();
///     let data = part.bytes().await?;
///     println!("{name}: {} bytes", data.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Multipart<S> {
    cursor: Cursor<S>,
    boundary: Option<String>,
}

impl<S: ByteSource> Multipart<S> {
    /// Get the next part, skipping any unread body of the previous one.
    ///
    /// Returns `Ok(None)` after the final boundary.
    pub async fn next_part(&mut self) -> Result<Option<Part<'_, S>>, MultipartParseError> {
        let meta = poll_fn(|cx| self.cursor.poll_next_part(cx)).await?;
        Ok(meta.map(|meta| Part::new(meta, &mut self.cursor)))
    }

    /// Poll for the next part, see [`Multipart::next_part`].
    pub fn poll_next_part(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Part<'_, S>>, MultipartParseError>> {
        match self.cursor.poll_next_part(cx) {
            Poll::Ready(Ok(Some(meta))) => Poll::Ready(Ok(Some(Part::new(meta, &mut self.cursor)))),
            Poll::Ready(Ok(None)) => Poll::Ready(Ok(None)),
            Poll::Ready(Err(err)) => Poll::Ready(Err(err)),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Abort the parse once `signal` completes.
    ///
    /// The signal is checked whenever the parser waits for more body bytes;
    /// once it fires, pending and later requests fail with
    /// [`ErrorCause::Aborted`].
    pub fn with_cancellation<F>(mut self, signal: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cursor.set_cancel(signal.boxed());
        self
    }

    /// The boundary in use, if one was found.
    pub fn boundary(&self) -> Option<&str> {
        self.boundary.as_deref()
    }

    pub fn options(&self) -> &ParseOptions {
        self.cursor.options()
    }
}

/// Parse the multipart body of a request.
///
/// The request must declare a `multipart/form-data` or `multipart/mixed`
/// content type with a boundary; otherwise the first call to
/// [`Multipart::next_part`] fails without reading the body.
pub fn parse_multipart_request<H, S>(request: &H, body: S, options: ParseOptions) -> Multipart<S>
where
    H: HeaderSource + ?Sized,
    S: ByteSource,
{
    match request_boundary(request) {
        Ok(boundary) => parse_multipart_stream(body, &boundary, options),
        Err(cause) => Multipart {
            cursor: Cursor::failed(body, cause, options),
            boundary: None,
        },
    }
}

/// Parse a multipart body delimited by `boundary`.
pub fn parse_multipart_stream<S: ByteSource>(
    body: S,
    boundary: &str,
    options: ParseOptions,
) -> Multipart<S> {
    if boundary.is_empty() {
        return Multipart {
            cursor: Cursor::failed(body, ErrorCause::MissingBoundary, options),
            boundary: None,
        };
    }

    debug!(boundary, ?options, "parsing multipart body");

    Multipart {
        cursor: Cursor::new(body, boundary, options),
        boundary: Some(boundary.to_owned()),
    }
}
