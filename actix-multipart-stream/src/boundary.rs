//! Content type inspection: deciding whether a request is multipart and
//! pulling the boundary out of its `Content-Type`.

use actix_web::http::header::CONTENT_TYPE;

use crate::{ErrorCause, HeaderSource};

/// The `type/subtype` of a media type, without parameters.
fn essence(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or("").trim()
}

/// Split a parameter list on `;`, leaving separators inside quoted strings alone.
fn split_params(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;

    for (i, c) in params.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

fn unquote(value: &str) -> String {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => {
            let mut out = String::with_capacity(inner.len());
            let mut chars = inner.chars();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => out.extend(chars.next()),
                    c => out.push(c),
                }
            }
            out
        }
        None => value.to_owned(),
    }
}

/// Get the `boundary` parameter of a multipart `Content-Type` value.
///
/// Returns `None` when the media type is not `multipart/*` or the boundary
/// parameter is missing or empty. Parameter names match case-insensitively
/// and quoted values are unescaped.
pub fn get_multipart_boundary(content_type: &str) -> Option<String> {
    let (media_type, params) = match content_type.split_once(';') {
        Some((media_type, params)) => (media_type.trim(), params),
        None => (content_type.trim(), ""),
    };

    let (kind, _) = media_type.split_once('/')?;
    if !kind.trim().eq_ignore_ascii_case("multipart") {
        return None;
    }

    split_params(params).into_iter().find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if !name.trim().eq_ignore_ascii_case("boundary") {
            return None;
        }

        let boundary = unquote(value.trim());
        (!boundary.is_empty()).then_some(boundary)
    })
}

/// Whether the request declares a `multipart/form-data` or `multipart/mixed` body.
///
/// Only the media type is looked at; the boundary is checked when parsing
/// starts.
pub fn is_multipart_request<H: HeaderSource + ?Sized>(request: &H) -> bool {
    request
        .header(CONTENT_TYPE.as_str())
        .map(essence)
        .map_or(false, |media_type| {
            media_type.eq_ignore_ascii_case("multipart/form-data")
                || media_type.eq_ignore_ascii_case("multipart/mixed")
        })
}

/// Check the request is multipart and return its boundary.
pub(crate) fn request_boundary<H: HeaderSource + ?Sized>(
    request: &H,
) -> Result<String, ErrorCause> {
    if !is_multipart_request(request) {
        return Err(ErrorCause::NotMultipart);
    }

    request
        .header(CONTENT_TYPE.as_str())
        .and_then(get_multipart_boundary)
        .ok_or(ErrorCause::MissingBoundary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_from_form_data() {
        assert_eq!(
            get_multipart_boundary("multipart/form-data; boundary=boundary123").as_deref(),
            Some("boundary123")
        );
        let webkit = "multipart/form-data; boundary=----WebKitFormBoundary7MA4YWxkTrZu0gW";
        assert_eq!(
            get_multipart_boundary(webkit).as_deref(),
            Some("----WebKitFormBoundary7MA4YWxkTrZu0gW")
        );
    }

    #[test]
    fn boundary_missing() {
        assert_eq!(get_multipart_boundary("multipart/form-data"), None);
        assert_eq!(get_multipart_boundary("multipart/form-data; charset=utf-8"), None);
        assert_eq!(get_multipart_boundary("multipart/form-data; boundary="), None);
    }

    #[test]
    fn boundary_requires_multipart() {
        assert_eq!(get_multipart_boundary("text/plain"), None);
        assert_eq!(get_multipart_boundary("text/plain; boundary=abc"), None);
    }

    #[test]
    fn boundary_quoted_and_case_insensitive() {
        assert_eq!(
            get_multipart_boundary(r#"Multipart/Mixed; charset=utf-8; BOUNDARY="a;b \"c\"""#)
                .as_deref(),
            Some(r#"a;b "c""#)
        );
    }

    #[test]
    fn classify_requests() {
        let form = [("Content-Type", "multipart/form-data; boundary=x")];
        let mixed = [("content-type", "multipart/mixed")];
        let text = [("Content-Type", "text/plain")];
        let none: [(&str, &str); 0] = [];

        assert!(is_multipart_request(&form[..]));
        assert!(is_multipart_request(&mixed[..]));
        assert!(!is_multipart_request(&text[..]));
        assert!(!is_multipart_request(&none[..]));
    }

    #[test]
    fn request_boundary_errors() {
        let text = [("Content-Type", "text/plain")];
        let bare = [("Content-Type", "multipart/form-data")];
        let good = [("Content-Type", "multipart/form-data; boundary=abc")];

        assert!(matches!(request_boundary(&text[..]), Err(ErrorCause::NotMultipart)));
        assert!(matches!(request_boundary(&bare[..]), Err(ErrorCause::MissingBoundary)));
        assert_eq!(request_boundary(&good[..]).ok().as_deref(), Some("abc"));
    }
}
