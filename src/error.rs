//! Error taxonomy for the country store
//!
//! Every fallible domain and storage operation returns [`CountryError`].
//! The HTTP layer maps each variant to a status code via [`CountryError::status`].

use hyper::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CountryError {
    /// Backing file exists but is not a `{"countries": [...]}` document
    #[error("country store at '{path}' is corrupt: {source}")]
    CorruptStore {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode country collection: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Country name and rank must be unique")]
    DuplicateEntry,

    #[error("file type '{mime}' is not allowed, only .jpg and .png files are accepted")]
    InvalidFileType { mime: String },

    /// Image payload exceeds `upload.max_image_size`
    #[error("image is {size} bytes, exceeding the {limit} byte limit")]
    UnsupportedMedia { size: usize, limit: usize },

    #[error("{0}")]
    InvalidField(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
}

impl CountryError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::DuplicateEntry | Self::InvalidField(_) | Self::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::UnsupportedMedia { .. } | Self::PayloadTooLarge { .. } => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::CorruptStore { .. } | Self::Io(_) | Self::Encode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether the failure is the server's fault rather than the client's
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_message_is_stable() {
        assert_eq!(
            CountryError::DuplicateEntry.to_string(),
            "Country name and rank must be unique"
        );
        assert_eq!(CountryError::DuplicateEntry.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upload_errors_are_client_errors() {
        let wrong_type = CountryError::InvalidFileType {
            mime: "image/gif".to_string(),
        };
        let too_big = CountryError::UnsupportedMedia {
            size: 5 * 1024 * 1024,
            limit: 4 * 1024 * 1024,
        };
        assert_eq!(wrong_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(too_big.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(!wrong_type.is_server_error());
        assert!(!too_big.is_server_error());
    }

    #[test]
    fn test_corrupt_store_is_server_error() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = CountryError::CorruptStore {
            path: "data.json".to_string(),
            source,
        };
        assert!(err.is_server_error());
        assert!(err.to_string().contains("data.json"));
    }
}
