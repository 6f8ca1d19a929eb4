use actix_web::{
    dev::Payload, http::ConnectionType, FromRequest, HttpRequest, HttpResponse, ResponseError,
};
use futures::future::{ready, Ready};

use crate::{
    boundary::request_boundary, parse_multipart_stream, Multipart, MultipartConfig,
    MultipartParseError,
};

/// Extract a streaming multipart body from the request.
///
/// The content type and boundary are checked up front; parts are parsed as
/// the handler asks for them, using the [`ParseOptions`](crate::ParseOptions)
/// of the registered [`MultipartConfig`], or the defaults.
impl FromRequest for Multipart<Payload> {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let config = req.app_data::<MultipartConfig>();
        let options = config.map(|config| config.options).unwrap_or_default();

        ready(match request_boundary(req) {
            Ok(boundary) => Ok(parse_multipart_stream(payload.take(), &boundary, options)),
            Err(cause) => Err(handle_error(cause.into(), config)),
        })
    }
}

fn handle_error(error: MultipartParseError, config: Option<&MultipartConfig>) -> actix_web::Error {
    let mut res = error.to_response(config);

    // The body was never read, so the connection can't serve another request.
    res.head_mut().set_connection_type(ConnectionType::Close);

    actix_web::error::InternalError::from_response("invalid multipart", res).into()
}

impl MultipartParseError {
    /// Build the response for this error, using the config's error handler if set.
    pub fn to_response(&self, config: Option<&MultipartConfig>) -> HttpResponse {
        match config.and_then(|config| config.error_handler.as_ref()) {
            Some(error_handler) => error_handler(self.clone()),
            None => self.error_response(),
        }
    }
}
