use actix_web::http::header::{
    ContentDisposition, HeaderMap, HeaderName, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE,
};
use tracing::trace;

/// Metadata parsed from one part's header block.
#[derive(Debug, Clone, Default)]
pub(crate) struct PartHeaders {
    pub(crate) headers: HeaderMap,
    pub(crate) disposition: Option<ContentDisposition>,
    pub(crate) name: Option<String>,
    pub(crate) filename: Option<String>,
    pub(crate) media_type: Option<String>,
}

impl PartHeaders {
    /// Parse a header block (without the terminating blank line).
    ///
    /// Lines without a `:`, and lines whose name or value is not a valid
    /// header, are skipped rather than failing the part.
    pub(crate) fn parse(block: &[u8]) -> Self {
        let mut headers = HeaderMap::new();

        for line in block.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let Some(colon) = line.iter().position(|&b| b == b':') else {
                trace!(
                    line = %String::from_utf8_lossy(line),
                    "dropping header line without separator"
                );
                continue;
            };

            let (name, value) = (line[..colon].trim_ascii(), line[colon + 1..].trim_ascii());
            match (HeaderName::from_bytes(name), HeaderValue::from_bytes(value)) {
                (Ok(name), Ok(value)) => headers.append(name, value),
                _ => trace!(line = %String::from_utf8_lossy(line), "dropping invalid header line"),
            }
        }

        let disposition = headers
            .get(&CONTENT_DISPOSITION)
            .and_then(|value| ContentDisposition::from_raw(value).ok());

        let name = disposition
            .as_ref()
            .and_then(|cd| cd.get_name())
            .map(str::to_owned);

        let filename = disposition.as_ref().and_then(|cd| {
            cd.get_filename().map(str::to_owned).or_else(|| {
                cd.get_filename_ext()
                    .map(|ext| String::from_utf8_lossy(&ext.value).into_owned())
            })
        });

        let media_type = headers
            .get(&CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        Self {
            headers,
            disposition,
            name,
            filename,
            media_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_headers() {
        let parsed = PartHeaders::parse(b"Content-Disposition: form-data; name=\"field1\"");

        assert_eq!(parsed.name.as_deref(), Some("field1"));
        assert_eq!(parsed.filename, None);
        assert_eq!(parsed.media_type, None);
        assert_eq!(parsed.headers.len(), 1);
    }

    #[test]
    fn file_headers() {
        let parsed = PartHeaders::parse(
            b"content-disposition: form-data; name=\"upload\"; filename=\"test.txt\"\r\n\
              Content-Type: text/plain",
        );

        assert_eq!(parsed.name.as_deref(), Some("upload"));
        assert_eq!(parsed.filename.as_deref(), Some("test.txt"));
        assert_eq!(parsed.media_type.as_deref(), Some("text/plain"));
    }

    #[test]
    fn extended_filename_fallback() {
        let parsed = PartHeaders::parse(
            b"Content-Disposition: form-data; name=\"doc\"; filename*=UTF-8''na%C3%AFve.txt",
        );

        assert_eq!(parsed.filename.as_deref(), Some("na\u{ef}ve.txt"));
    }

    #[test]
    fn lines_without_colon_are_dropped() {
        let parsed = PartHeaders::parse(
            b"Content-Disposition: form-data; name=\"field1\"\r\n\
              Invalid-Header\r\n\
              X-Extra:  padded value  ",
        );

        assert_eq!(parsed.name.as_deref(), Some("field1"));
        assert!(!parsed.headers.contains_key("invalid-header"));
        assert_eq!(parsed.headers.len(), 2);
        assert_eq!(parsed.headers.get("x-extra").unwrap(), "padded value");
    }

    #[test]
    fn value_keeps_later_colons() {
        let parsed = PartHeaders::parse(b"X-Time: 12:30:00");
        assert_eq!(parsed.headers.get("x-time").unwrap(), "12:30:00");
    }

    #[test]
    fn empty_block() {
        let parsed = PartHeaders::parse(b"");

        assert!(parsed.headers.is_empty());
        assert_eq!(parsed.name, None);
        assert!(parsed.disposition.is_none());
    }
}
