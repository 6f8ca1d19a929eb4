use std::task::{Context, Poll};

use actix_web::{http::header::HeaderMap, HttpRequest};
use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::BoxError;

/// Read access to request headers.
///
/// Lookups are case-insensitive on the header name.
pub trait HeaderSource {
    fn header(&self, name: &str) -> Option<&str>;

    /// All headers with a textual value, in source order.
    fn header_pairs(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_>;
}

impl HeaderSource for HeaderMap {
    fn header(&self, name: &str) -> Option<&str> {
        self.get(name)?.to_str().ok()
    }

    fn header_pairs(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(
            self.iter()
                .filter_map(|(name, value)| Some((name.as_str(), value.to_str().ok()?))),
        )
    }
}

impl HeaderSource for HttpRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().header(name)
    }

    fn header_pairs(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        self.headers().header_pairs()
    }
}

impl<K: AsRef<str>, V: AsRef<str>> HeaderSource for [(K, V)] {
    fn header(&self, name: &str) -> Option<&str> {
        self.iter()
            .find(|(key, _)| key.as_ref().eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_ref())
    }

    fn header_pairs(&self) -> Box<dyn Iterator<Item = (&str, &str)> + '_> {
        Box::new(self.iter().map(|(key, value)| (key.as_ref(), value.as_ref())))
    }
}

/// A pull-based source of body chunks.
///
/// Chunks may have any size and need not line up with the multipart
/// structure. Nothing is read until the parser asks for it, and dropping the
/// source releases the underlying body.
///
/// Implemented for every [`Stream`] of `Result<impl Into<Bytes>, impl Into<BoxError>>`,
/// which covers [`actix_web::dev::Payload`].
pub trait ByteSource {
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, BoxError>>>;
}

impl<S, B, E> ByteSource for S
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: Into<Bytes>,
    E: Into<BoxError>,
{
    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<Result<Bytes, BoxError>>> {
        self.poll_next_unpin(cx)
            .map(|item| item.map(|chunk| chunk.map(Into::into).map_err(Into::into)))
    }
}
