use std::{
    pin::Pin,
    task::{Context, Poll},
};

use actix_web::http::header::{ContentDisposition, HeaderMap};
use bytes::{Bytes, BytesMut};
use futures::{Stream, TryStreamExt};

use crate::{headers::PartHeaders, tokenizer::Cursor, ByteSource, MultipartParseError};

/// One part of a multipart body: a form field or an uploaded file.
///
/// The part is itself the stream of its body bytes. It borrows the parser,
/// so only one part can be read at a time; dropping it unread is fine, the
/// parser skips the rest of its body when asked for the next part.
pub struct Part<'a, S> {
    meta: PartHeaders,
    cursor: &'a mut Cursor<S>,
}

impl<'a, S: ByteSource> Part<'a, S> {
    pub(crate) fn new(meta: PartHeaders, cursor: &'a mut Cursor<S>) -> Self {
        Self { meta, cursor }
    }

    /// The `name` parameter of the part's `Content-Disposition`.
    pub fn name(&self) -> Option<&str> {
        self.meta.name.as_deref()
    }

    /// The `filename` parameter of the part's `Content-Disposition`,
    /// falling back to `filename*`.
    pub fn filename(&self) -> Option<&str> {
        self.meta.filename.as_deref()
    }

    /// The part's `Content-Type`, if it declared one.
    pub fn media_type(&self) -> Option<&str> {
        self.meta.media_type.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.meta.headers
    }

    pub fn content_disposition(&self) -> Option<&ContentDisposition> {
        self.meta.disposition.as_ref()
    }

    /// Whether the part is a file upload, i.e. it has a filename.
    pub fn is_file(&self) -> bool {
        self.meta.filename.is_some()
    }

    /// Number of body bytes handed out so far.
    pub fn bytes_read(&self) -> usize {
        self.cursor.body_len()
    }

    /// Read the rest of the body into memory.
    pub async fn bytes(mut self) -> Result<Bytes, MultipartParseError> {
        let mut data = BytesMut::new();
        while let Some(chunk) = self.try_next().await? {
            data.extend_from_slice(&chunk);
        }
        Ok(data.freeze())
    }

    /// Read the rest of the body as text.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    pub async fn text(self) -> Result<String, MultipartParseError> {
        let data = self.bytes().await?;
        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

impl<S: ByteSource> Stream for Part<'_, S> {
    type Item = Result<Bytes, MultipartParseError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().cursor.poll_body_chunk(cx)
    }
}

impl<S> std::fmt::Debug for Part<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Part")
            .field("name", &self.meta.name)
            .field("filename", &self.meta.filename)
            .field("media_type", &self.meta.media_type)
            .field("headers", &self.meta.headers)
            .finish()
    }
}
