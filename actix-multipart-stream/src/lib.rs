//! Streaming `multipart/form-data` and `multipart/mixed` body parsing.
//!
//! Parts are produced one at a time from a pull-based body stream, and each
//! part's body is itself a stream, so request bodies are never buffered in
//! full. Header block and part sizes are limited by [`ParseOptions`] while
//! bytes arrive.
//!
//! In an actix-web handler, take [`Multipart<Payload>`](Multipart) as an
//! argument:
//!
//! ```no_run
//! use actix_multipart_stream::{Multipart, MultipartParseError};
//! use actix_web::dev::Payload;
//!
//! async fn upload(mut form: Multipart<Payload>) -> Result<String, MultipartParseError> {
//!     let mut names = Vec::new();
//!     while let Some(part) = form.next_part().await? {
//!         names.push(part.name().unwrap_or_default().to_owned());
//!     }
//!     Ok(names.join(","))
//! }
//! ```

mod boundary;
mod config;
mod error;
mod extractor;
mod headers;
mod multipart;
mod part;
mod source;
mod tokenizer;

pub use boundary::*;
pub use config::*;
pub use error::*;
pub use multipart::*;
pub use part::*;
pub use source::*;
