use actix_web::HttpResponse;
use serde::{de, Deserialize, Deserializer};

use crate::MultipartParseError;

/// Default limit for a single part's header block (8 KiB).
pub const DEFAULT_MAX_HEADER_SIZE: usize = 8 * 1024;

/// Default limit for a single part's body (2 MiB).
pub const DEFAULT_MAX_FILE_SIZE: usize = 2 * 1024 * 1024;

type MultipartErrorHandler =
    Box<dyn Fn(MultipartParseError) -> HttpResponse + Send + Sync + 'static>;

/// Size limits applied while a multipart body is parsed.
///
/// Both limits are checked as bytes arrive, so an oversized header block or
/// part fails the parse as soon as the limit is crossed.
///
/// When deserialized, each limit may be a byte count or a human readable
/// size such as `"10 MiB"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Maximum size of a single part's header block in bytes.
    #[serde(deserialize_with = "deserialize_size")]
    pub max_header_size: usize,
    /// Maximum size of a single part's body in bytes.
    #[serde(deserialize_with = "deserialize_size")]
    pub max_file_size: usize,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_header_size(mut self, max_header_size: usize) -> Self {
        self.max_header_size = max_header_size;
        self
    }

    pub fn max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Human(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let bytes = match RawSize::deserialize(deserializer)? {
        RawSize::Bytes(bytes) => bytes,
        RawSize::Human(size) => parse_size::parse_size(&size)
            .map_err(|err| de::Error::custom(format!("invalid size {size:?}: {err}")))?,
    };

    usize::try_from(bytes).map_err(|_| de::Error::custom("size does not fit in usize"))
}

/// Config for Multipart data, insert with [`actix_web::App::app_data`] to actix
pub struct MultipartConfig {
    pub error_handler: Option<MultipartErrorHandler>,
    pub options: ParseOptions,
}

impl MultipartConfig {
    pub fn set_error_handler<F>(mut self, error_handler: F) -> Self
    where
        F: Fn(MultipartParseError) -> HttpResponse + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(error_handler));
        self
    }

    pub fn set_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }
}

impl Default for MultipartConfig {
    fn default() -> Self {
        Self {
            error_handler: None,
            options: ParseOptions::default(),
        }
    }
}
