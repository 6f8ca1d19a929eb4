//! The byte level state machine shared by the part iterator and the body of
//! the part currently being read.
//!
//! A single [`Cursor`] owns the body source and a small window of unconsumed
//! bytes. Delimiters are located with a linear substring search, and
//! anything that cannot be the start of a delimiter is handed out right
//! away, so the window never holds more than the last chunk plus a
//! delimiter sized tail.

use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use futures::{future::BoxFuture, ready, FutureExt};
use memchr::memmem::Finder;
use tracing::{debug, trace};

use crate::{headers::PartHeaders, ByteSource, ErrorCause, MultipartParseError, ParseOptions};

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone)]
pub(crate) enum ParseState {
    SeekingFirstBoundary,
    ParsingHeaders,
    StreamingBody,
    SeekingNextBoundaryOrEnd,
    Done,
    Failed(ErrorCause),
}

pub(crate) struct Cursor<S> {
    source: S,
    buf: BytesMut,
    /// Finds `CRLF "--" boundary`.
    separator: Finder<'static>,
    state: ParseState,
    options: ParseOptions,
    /// Offset in `buf` below which no header terminator can start.
    header_scan: usize,
    /// Transport padding skipped after the current delimiter.
    padding: usize,
    body_len: usize,
    cancel: Option<BoxFuture<'static, ()>>,
}

impl<S: ByteSource> Cursor<S> {
    pub(crate) fn new(source: S, boundary: &str, options: ParseOptions) -> Self {
        let mut separator = Vec::with_capacity(boundary.len() + 4);
        separator.extend_from_slice(CRLF);
        separator.extend_from_slice(b"--");
        separator.extend_from_slice(boundary.as_bytes());

        // The first delimiter opens the body without a CRLF in front of it.
        let mut buf = BytesMut::with_capacity(separator.len() * 2);
        buf.extend_from_slice(CRLF);

        Self {
            source,
            buf,
            separator: Finder::new(&separator).into_owned(),
            state: ParseState::SeekingFirstBoundary,
            options,
            header_scan: 0,
            padding: 0,
            body_len: 0,
            cancel: None,
        }
    }

    /// A cursor that fails on first use, before reading from `source`.
    pub(crate) fn failed(source: S, cause: ErrorCause, options: ParseOptions) -> Self {
        Self {
            source,
            buf: BytesMut::new(),
            separator: Finder::new(b"").into_owned(),
            state: ParseState::Failed(cause),
            options,
            header_scan: 0,
            padding: 0,
            body_len: 0,
            cancel: None,
        }
    }

    pub(crate) fn set_cancel(&mut self, signal: BoxFuture<'static, ()>) {
        self.cancel = Some(signal);
    }

    pub(crate) fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub(crate) fn body_len(&self) -> usize {
        self.body_len
    }

    fn marker_len(&self) -> usize {
        self.separator.needle().len()
    }

    fn fail(&mut self, cause: ErrorCause) -> MultipartParseError {
        debug!(cause = %cause, "multipart parse failed");
        self.state = ParseState::Failed(cause.clone());
        cause.into()
    }

    /// Pull the next chunk into the window.
    ///
    /// Resolves to `false` when the source is exhausted.
    fn poll_fill(&mut self, cx: &mut Context<'_>) -> Poll<Result<bool, ErrorCause>> {
        if let Some(signal) = self.cancel.as_mut() {
            if signal.poll_unpin(cx).is_ready() {
                self.cancel = None;
                return Poll::Ready(Err(ErrorCause::Aborted));
            }
        }

        loop {
            match self.source.poll_chunk(cx) {
                Poll::Ready(Some(Ok(chunk))) if chunk.is_empty() => continue,
                Poll::Ready(Some(Ok(chunk))) => {
                    trace!(len = chunk.len(), "read body chunk");
                    self.buf.extend_from_slice(&chunk);
                    return Poll::Ready(Ok(true));
                }
                Poll::Ready(Some(Err(err))) => return Poll::Ready(Err(err.into())),
                Poll::Ready(None) => return Poll::Ready(Ok(false)),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    /// Fill the window, treating the end of the source as a truncated body.
    fn poll_more(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), MultipartParseError>> {
        match self.poll_fill(cx) {
            Poll::Ready(Ok(true)) => Poll::Ready(Ok(())),
            Poll::Ready(Ok(false)) => Poll::Ready(Err(self.fail(ErrorCause::Unterminated))),
            Poll::Ready(Err(cause)) => Poll::Ready(Err(self.fail(cause))),
            Poll::Pending => Poll::Pending,
        }
    }

    /// Advance to the next header block, discarding whatever is left of the
    /// current part's body.
    ///
    /// Resolves to `None` once the terminal delimiter has been read.
    pub(crate) fn poll_next_part(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<PartHeaders>, MultipartParseError>> {
        loop {
            match self.state {
                ParseState::SeekingFirstBoundary => {
                    if let Some(idx) = self.separator.find(&self.buf) {
                        self.buf.advance(idx + self.marker_len());
                        self.padding = 0;
                        self.state = ParseState::SeekingNextBoundaryOrEnd;
                        continue;
                    }

                    // Preamble; keep only what could be the start of a delimiter.
                    let keep = self.marker_len() - 1;
                    if self.buf.len() > keep {
                        self.buf.advance(self.buf.len() - keep);
                    }
                }
                ParseState::SeekingNextBoundaryOrEnd => {
                    while let Some(b' ' | b'\t') = self.buf.first() {
                        self.buf.advance(1);
                        self.padding += 1;
                        if self.padding > self.options.max_header_size {
                            let limit = self.options.max_header_size;
                            let err = self.fail(ErrorCause::HeaderTooLarge { limit });
                            return Poll::Ready(Err(err));
                        }
                    }

                    if self.buf.len() >= 2 {
                        if self.buf.starts_with(b"--") {
                            debug!("reached final multipart boundary");
                            self.state = ParseState::Done;
                            return Poll::Ready(Ok(None));
                        }
                        if self.buf.starts_with(CRLF) {
                            self.buf.advance(2);
                            self.header_scan = 0;
                            self.state = ParseState::ParsingHeaders;
                            continue;
                        }
                        return Poll::Ready(Err(self.fail(ErrorCause::MalformedDelimiter)));
                    }
                }
                ParseState::ParsingHeaders => {
                    if let Some(headers) = self.take_header_block()? {
                        self.body_len = 0;
                        self.state = ParseState::StreamingBody;
                        debug!(
                            name = headers.name.as_deref(),
                            filename = headers.filename.as_deref(),
                            "multipart part started"
                        );
                        return Poll::Ready(Ok(Some(headers)));
                    }
                }
                ParseState::StreamingBody => {
                    // The previous part was abandoned before its body ended.
                    match self.poll_body_chunk(cx) {
                        Poll::Ready(Some(Ok(_))) => continue,
                        Poll::Ready(Some(Err(err))) => return Poll::Ready(Err(err)),
                        Poll::Ready(None) => continue,
                        Poll::Pending => return Poll::Pending,
                    }
                }
                ParseState::Done => return Poll::Ready(Ok(None)),
                ParseState::Failed(ref cause) => return Poll::Ready(Err(cause.clone().into())),
            }

            if let Err(err) = ready!(self.poll_more(cx)) {
                return Poll::Ready(Err(err));
            }
        }
    }

    /// Split a complete header block off the window, if one is buffered.
    fn take_header_block(&mut self) -> Result<Option<PartHeaders>, MultipartParseError> {
        let limit = self.options.max_header_size;

        if self.buf.starts_with(CRLF) {
            self.buf.advance(2);
            return Ok(Some(PartHeaders::default()));
        }
        if self.buf.len() < 2 {
            return Ok(None);
        }

        match memchr::memmem::find(&self.buf[self.header_scan..], b"\r\n\r\n") {
            Some(idx) => {
                let end = self.header_scan + idx;
                if end > limit {
                    return Err(self.fail(ErrorCause::HeaderTooLarge { limit }));
                }

                let block = self.buf.split_to(end);
                self.buf.advance(4);
                Ok(Some(PartHeaders::parse(&block)))
            }
            None => {
                // The block is at least as long as everything before a
                // possible partial terminator at the end of the window.
                let scanned = self.buf.len().saturating_sub(3);
                if scanned > limit {
                    return Err(self.fail(ErrorCause::HeaderTooLarge { limit }));
                }
                self.header_scan = scanned;
                Ok(None)
            }
        }
    }

    /// Hand out the next slice of the current part's body.
    ///
    /// Resolves to `None` once the delimiter ending the part is reached, or
    /// when no part body is being streamed.
    pub(crate) fn poll_body_chunk(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, MultipartParseError>>> {
        loop {
            match self.state {
                ParseState::StreamingBody => {}
                ParseState::Failed(ref cause) => {
                    return Poll::Ready(Some(Err(cause.clone().into())));
                }
                _ => return Poll::Ready(None),
            }

            let ready = match self.separator.find(&self.buf) {
                Some(0) => {
                    self.buf.advance(self.marker_len());
                    self.padding = 0;
                    self.state = ParseState::SeekingNextBoundaryOrEnd;
                    return Poll::Ready(None);
                }
                Some(idx) => idx,
                None => self.buf.len().saturating_sub(self.marker_len() - 1),
            };

            if ready > 0 {
                self.body_len += ready;
                if self.body_len > self.options.max_file_size {
                    let limit = self.options.max_file_size;
                    return Poll::Ready(Some(Err(self.fail(ErrorCause::PartTooLarge { limit }))));
                }
                return Poll::Ready(Some(Ok(self.buf.split_to(ready).freeze())));
            }

            if let Err(err) = ready!(self.poll_more(cx)) {
                return Poll::Ready(Some(Err(err)));
            }
        }
    }
}
